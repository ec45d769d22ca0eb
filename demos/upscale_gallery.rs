// demos/upscale_gallery.rs — Compare integer upscaling filters.
//
// Enlarges an image by STENCIL_SCALE (default 2) with each smoothing filter
// on the configured backend. With STENCIL_REFERENCE on (default) and scale
// 2, the first entry is the host pyrUp expansion for comparison.
//
//   Right   next result
//   Left    previous result
//   Q, Esc  quit
//
// USAGE
// ─────
//   cargo run --example upscale_gallery -- path/to/img.png
//   STENCIL_SCALE=3 STENCIL_ZOOM=2 cargo run --example upscale_gallery

use std::error::Error;
use std::time::Duration;

use log::info;
use minifb::{Key, KeyRepeat, Window, WindowOptions};

use stencil_gallery::config::{BackendKind, GalleryConfig};
use stencil_gallery::convert::{luma_from_rgb8, to_framebuffer, u8_to_f32_normalized};
use stencil_gallery::gallery::{build_upscale_gallery, Gallery, NavEvent, Navigator};
use stencil_gallery::gpu::device::GpuDevice;
use stencil_gallery::image::Image;
use stencil_gallery::{filters, CpuBackend, GpuBackend};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = GalleryConfig::from_env()?;
    let scale = cfg.scale()?;
    let src = match std::env::args().nth(1) {
        Some(path) => load_image(&path)?,
        None => {
            info!("no image path given, using generated ramp");
            ramp(64, 48)
        }
    };
    info!(
        "source {}×{}, scale {scale}, backend {}",
        src.width(),
        src.height(),
        cfg.backend
    );

    let catalog = filters::upscale_catalog();
    let reference = cfg.include_pyr_up_reference;
    let gallery = match cfg.backend {
        BackendKind::Cpu => build_upscale_gallery(&CpuBackend, &src, scale, &catalog, reference)?,
        BackendKind::Gpu => {
            let mut gpu = GpuDevice::new_with_profile(cfg.profile)?;
            if let Some((x, y)) = cfg.workgroup {
                gpu.set_workgroup_size(x, y)?;
            }
            build_upscale_gallery(&GpuBackend::new(gpu)?, &src, scale, &catalog, reference)?
        }
    };

    browse(&gallery, cfg.display_zoom, "upscale gallery")
}

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

/// Diagonal gradient with a bright square, so both smooth and hard edges show.
fn ramp(width: usize, height: usize) -> Image<f32> {
    let mut img = Image::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let v = (x + y) as f32 / (width + height - 2) as f32;
            let inside = (width / 3..2 * width / 3).contains(&x) && (height / 3..2 * height / 3).contains(&y);
            img.set(x, y, if inside { 1.0 } else { v });
        }
    }
    img
}
