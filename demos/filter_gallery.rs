// demos/filter_gallery.rs — Browse the filter catalog applied to one image.
//
// Loads an image (or generates a checkerboard), converts it to normalized
// luma, runs every catalog filter on the configured backend, and shows the
// results one at a time, led by the unfiltered source unless
// STENCIL_ORIGINAL=0:
//
//   Right   next result
//   Left    previous result
//   Q, Esc  quit
//
// USAGE
// ─────
//   cargo run --example filter_gallery                      # checkerboard
//   cargo run --example filter_gallery -- path/to/img.png
//   STENCIL_BACKEND=cpu STENCIL_ZOOM=2 cargo run --example filter_gallery

use std::error::Error;
use std::time::Duration;

use log::info;
use minifb::{Key, KeyRepeat, Window, WindowOptions};

use stencil_gallery::config::{BackendKind, GalleryConfig};
use stencil_gallery::convert::{luma_from_rgb8, to_framebuffer, u8_to_f32_normalized};
use stencil_gallery::gallery::{build_filter_gallery, Gallery, NavEvent, Navigator};
use stencil_gallery::gpu::device::GpuDevice;
use stencil_gallery::image::Image;
use stencil_gallery::{filters, CpuBackend, GpuBackend};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = GalleryConfig::from_env()?;
    let src = match std::env::args().nth(1) {
        Some(path) => load_image(&path)?,
        None => {
            info!("no image path given, using generated checkerboard");
            checkerboard(128, 96, 8)
        }
    };
    info!("source {}×{}, backend {}", src.width(), src.height(), cfg.backend);

    let catalog = filters::gallery_order();
    let original = cfg.include_original;
    let gallery = match cfg.backend {
        BackendKind::Cpu => build_filter_gallery(&CpuBackend, &src, &catalog, original)?,
        BackendKind::Gpu => {
            let mut gpu = GpuDevice::new_with_profile(cfg.profile)?;
            if let Some((x, y)) = cfg.workgroup {
                gpu.set_workgroup_size(x, y)?;
            }
            build_filter_gallery(&GpuBackend::new(gpu)?, &src, &catalog, original)?
        }
    };

    browse(&gallery, cfg.display_zoom, "filter gallery")
}

/// Show one gallery entry at a time until the user quits or closes the window.
fn browse(gallery: &Gallery, zoom: usize, title: &str) -> Result<(), Box<dyn Error>> {
    let (w, h) = gallery.select(0).image.dimensions();
    let (w, h) = (w * zoom, h * zoom);
    let mut window = Window::new(title, w, h, WindowOptions::default())?;
    window.limit_update_rate(Some(Duration::from_millis(16)));

    let mut nav = Navigator::new(gallery);
    let mut shown = None;
    let mut frame = (Vec::new(), w, h);
    while window.is_open() {
        for key in window.get_keys_pressed(KeyRepeat::No) {
            let event = match key {
                Key::Right => NavEvent::Next,
                Key::Left => NavEvent::Prev,
                Key::Q | Key::Escape => NavEvent::Quit,
                _ => continue,
            };
            nav.apply(event)?;
            if nav.is_terminal() {
                return Ok(());
            }
        }

        let Some(i) = nav.current() else { break };
        let entry = gallery.select(i as isize);
        if shown != Some(i) {
            info!("[{}/{}] {}", i + 1, gallery.count(), entry.name);
            window.set_title(&format!("{title}: {}", entry.name));
            frame = to_framebuffer(&entry.image, zoom);
            shown = Some(i);
        }
        let (fb, fw, fh) = &frame;
        window.update_with_buffer(fb, *fw, *fh)?;
    }
    Ok(())
}

fn load_image(path: &str) -> Result<Image<f32>, Box<dyn Error>> {
    let rgb = image::open(path)?.to_rgb8();
    let (w, h) = rgb.dimensions();
    let luma = luma_from_rgb8(w as usize, h as usize, rgb.as_raw())?;
    Ok(u8_to_f32_normalized(&luma))
}

fn checkerboard(width: usize, height: usize, tile: usize) -> Image<f32> {
    let pixels = (0..width * height)
        .map(|i| {
            let (x, y) = (i % width, i / width);
            if (x / tile + y / tile) % 2 == 0 { 0.85 } else { 0.15 }
        })
        .collect();
    Image::from_vec(width, height, pixels)
}
