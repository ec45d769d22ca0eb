// benches/stencil.rs — Filter and upscale throughput, CPU vs GPU.
//
//   cargo bench --bench stencil
//
// GPU numbers include upload of coefficients, dispatch, wait and readback:
// that is the latency a gallery build pays per entry. GPU groups are skipped
// when no adapter is available.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;

use stencil_gallery::convolution::ScaleFactor;
use stencil_gallery::filters;
use stencil_gallery::gpu::device::GpuDevice;
use stencil_gallery::image::Image;
use stencil_gallery::pyramid::pyr_up;
use stencil_gallery::{CpuBackend, GpuBackend, StencilBackend};

fn make_scene(w: usize, h: usize) -> Image<f32> {
    let mut img = Image::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let base = (x as f32 / w as f32) * 0.8 + (y as f32 / h as f32) * 0.2;
            let tile = if (x / 32 + y / 32) % 2 == 0 { 0.1 } else { 0.0 };
            img.set(x, y, base + tile);
        }
    }
    img
}

fn gpu_backend() -> Option<GpuBackend> {
    let gpu = GpuDevice::new().ok()?;
    GpuBackend::new(gpu).ok()
}

// ============================================================
// Filter: every 3×3 / 5×5 size on each backend
// ============================================================

fn bench_filter(c: &mut Criterion) {
    let img = make_scene(640, 480);
    let gpu = gpu_backend();

    let mut group = c.benchmark_group("filter_640x480");
    group.warm_up_time(Duration::from_secs(2));

    for f in [filters::box_3x3(), filters::gaussian_5x5()] {
        let cpu_src = CpuBackend.load(&img).unwrap();
        group.bench_with_input(BenchmarkId::new("cpu", f.name()), &f, |b, f| {
            b.iter(|| CpuBackend.run_filter(&cpu_src, f).unwrap())
        });

        if let Some(gpu) = &gpu {
            let gpu_src = gpu.load(&img).unwrap();
            group.bench_with_input(BenchmarkId::new("gpu", f.name()), &f, |b, f| {
                b.iter(|| gpu.run_filter(&gpu_src, f).unwrap())
            });
        }
    }

    group.finish();
}

// ============================================================
// Upscale ×2 vs the host pyrUp reference
// ============================================================

fn bench_upscale(c: &mut Criterion) {
    let img = make_scene(320, 240);
    let scale = ScaleFactor::new(2).unwrap();
    let f = filters::gaussian_5x5();
    let gpu = gpu_backend();

    let mut group = c.benchmark_group("upscale_x2_320x240");
    group.warm_up_time(Duration::from_secs(2));

    group.bench_function("pyr_up", |b| b.iter(|| pyr_up(&img)));

    let cpu_src = CpuBackend.load(&img).unwrap();
    group.bench_function("cpu_gaussian_5x5", |b| {
        b.iter(|| CpuBackend.run_upscale(&cpu_src, scale, &f).unwrap())
    });

    if let Some(gpu) = &gpu {
        let gpu_src = gpu.load(&img).unwrap();
        group.bench_function("gpu_gaussian_5x5", |b| {
            b.iter(|| gpu.run_upscale(&gpu_src, scale, &f).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_filter, bench_upscale);
criterion_main!(benches);
