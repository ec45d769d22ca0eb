// backend.rs — Where stencil dispatches run.
//
// The gallery builders only need three things from an execution target:
// make a resident copy of the source image, run a filter over it, and run
// an upscale over it. `StencilBackend` is that seam. Two implementations:
//
//   CpuBackend   rayon over `convolution::{filter_2d, upscale_2d}`
//   GpuBackend   wgpu, via `gpu::stencil::GpuStencil`
//
// Both return fully materialized host grids, so everything downstream of a
// dispatch (gallery, display) is backend-agnostic.

use log::info;

use crate::convolution::{self, ScaleFactor};
use crate::error::{Result, StencilError};
use crate::filters::Filter;
use crate::gpu::device::GpuDevice;
use crate::gpu::stencil::{GpuStencil, SourceImage};
use crate::image::Image;

/// An execution target for stencil dispatches.
pub trait StencilBackend {
    /// Backend-resident copy of a source image.
    type Source;

    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Make `image` available to subsequent dispatches.
    ///
    /// # Errors
    /// `DispatchFailure` for an image with no pixels.
    fn load(&self, image: &Image<f32>) -> Result<Self::Source>;

    /// Filter every pixel; the result has the source's dimensions.
    fn run_filter(&self, src: &Self::Source, filter: &Filter) -> Result<Image<f32>>;

    /// Enlarge by `scale` and filter; the result is `(w·s) × (h·s)`.
    fn run_upscale(&self, src: &Self::Source, scale: ScaleFactor, filter: &Filter) -> Result<Image<f32>>;
}

// ---------------------------------------------------------------------------
// CPU
// ---------------------------------------------------------------------------

/// Host reference backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuBackend;

impl StencilBackend for CpuBackend {
    type Source = Image<f32>;

    fn name(&self) -> &'static str {
        "cpu"
    }

    fn load(&self, image: &Image<f32>) -> Result<Image<f32>> {
        if image.is_empty() {
            return Err(StencilError::DispatchFailure {
                entry: "cpu load",
                reason: format!("unsupported grid shape {}×{}", image.width(), image.height()),
            });
        }
        Ok(image.clone())
    }

    fn run_filter(&self, src: &Image<f32>, filter: &Filter) -> Result<Image<f32>> {
        Ok(convolution::filter_2d(src, filter))
    }

    fn run_upscale(&self, src: &Image<f32>, scale: ScaleFactor, filter: &Filter) -> Result<Image<f32>> {
        Ok(convolution::upscale_2d(src, scale, filter))
    }
}

// ---------------------------------------------------------------------------
// GPU
// ---------------------------------------------------------------------------

/// wgpu backend. Owns its device context and compiled pipelines.
pub struct GpuBackend {
    gpu: GpuDevice,
    stencil: GpuStencil,
}

impl GpuBackend {
    /// Compile the stencil pipelines for `gpu`.
    pub fn new(gpu: GpuDevice) -> Result<Self> {
        let stencil = GpuStencil::new(&gpu)?;
        info!("GPU backend ready: {gpu}");
        Ok(GpuBackend { gpu, stencil })
    }

    pub fn device(&self) -> &GpuDevice {
        &self.gpu
    }
}

impl StencilBackend for GpuBackend {
    type Source = SourceImage;

    fn name(&self) -> &'static str {
        "gpu"
    }

    fn load(&self, image: &Image<f32>) -> Result<SourceImage> {
        self.stencil.upload_image(&self.gpu, image)
    }

    fn run_filter(&self, src: &SourceImage, filter: &Filter) -> Result<Image<f32>> {
        self.stencil.run_filter(&self.gpu, src, filter)?.materialize(&self.gpu)
    }

    fn run_upscale(&self, src: &SourceImage, scale: ScaleFactor, filter: &Filter) -> Result<Image<f32>> {
        self.stencil
            .run_upscale(&self.gpu, src, scale, filter)?
            .materialize(&self.gpu)
    }
}
