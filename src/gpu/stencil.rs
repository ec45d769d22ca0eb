// gpu/stencil.rs — Stencil dispatcher: filter and upscale kernels on the GPU.
//
// Mirrors `convolution::filter_2d` / `convolution::upscale_2d`. The CPU
// versions are the reference; the tests at the bottom check agreement.
//
// One dispatch is the blocking sequence
//
//   allocate private coefficient buffer → upload coefficients
//   allocate output buffer → bind (src, coeffs, dst, params) → dispatch
//   wait for completion → release coefficient buffer
//
// Every dispatch gets its own coefficient buffer, sized from the filter it
// carries, so a k×k buffer is never bound to a dispatch declaring a
// different size and no buffer is shared between dispatches. The output
// buffer is handed back to the caller inside a `StencilOutput`, which is
// consumed by `materialize`.
//
// PIPELINE LIFETIME
// ─────────────────
// `GpuStencil::new` compiles the shader and builds both pipelines; create
// it once per device and reuse it for every dispatch.

use log::debug;
use wgpu::util::DeviceExt;

use crate::convolution::ScaleFactor;
use crate::error::{Result, StencilError};
use crate::filters::Filter;
use crate::gpu::buffer::{BufferManager, BufferRole, DeviceBuffer, SAMPLE_BYTES};
use crate::gpu::device::GpuDevice;
use crate::image::Image;
use crate::materialize;

/// Version of the binding/entry-point contract with `stencil.wgsl`.
pub const STENCIL_ABI_VERSION: u32 = 1;
/// Entry point for plain filtering: grid = input grid.
pub const FILTER_ENTRY: &str = "filter_stencil";
/// Entry point for upscaling: grid = input grid × scale.
pub const UPSCALE_ENTRY: &str = "upscale_stencil";

const SHADER_TEMPLATE: &str = include_str!("../shaders/stencil.wgsl");

// ---------------------------------------------------------------------------
// Uniform block (must match `StencilParams` in stencil.wgsl)
// ---------------------------------------------------------------------------

/// Scalar kernel arguments.
///
/// Layout (8 × u32 = 32 bytes):
///   width, height, filter_size, scale, out_width, out_height, _pad0, _pad1
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
struct StencilParams {
    width: u32,
    height: u32,
    filter_size: u32,
    scale: u32,
    out_width: u32,
    out_height: u32,
    _pad0: u32,
    _pad1: u32,
}

impl StencilParams {
    fn new(width: u32, height: u32, filter: &Filter, scale: ScaleFactor) -> Self {
        let s = scale.get();
        StencilParams {
            width,
            height,
            filter_size: filter.size().side() as u32,
            scale: s,
            out_width: width * s,
            out_height: height * s,
            _pad0: 0,
            _pad1: 0,
        }
    }
}

/// Fill the workgroup placeholders in the shader template.
fn specialize_shader(wg_x: u32, wg_y: u32) -> String {
    SHADER_TEMPLATE
        .replace("{{WG_X}}", &wg_x.to_string())
        .replace("{{WG_Y}}", &wg_y.to_string())
}

// ---------------------------------------------------------------------------
// Device-resident source and output
// ---------------------------------------------------------------------------

/// The device copy of an input image.
pub struct SourceImage {
    buffer: DeviceBuffer,
    width: u32,
    height: u32,
}

impl SourceImage {
    pub fn width(&self) -> usize {
        self.width as usize
    }

    pub fn height(&self) -> usize {
        self.height as usize
    }
}

/// The output buffer of one completed dispatch.
pub struct StencilOutput {
    buffer: DeviceBuffer,
    width: usize,
    height: usize,
}

impl StencilOutput {
    /// Dimensions of the dispatch grid (and of the materialized result).
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Read the output back, reshape it, and free the device buffer.
    pub fn materialize(self, gpu: &GpuDevice) -> Result<Image<f32>> {
        let mgr = BufferManager::new(gpu);
        let flat = mgr.download(&self.buffer);
        mgr.release(self.buffer);
        materialize::to_matrix(flat?, self.width, self.height)
    }
}

// ---------------------------------------------------------------------------
// GpuStencil
// ---------------------------------------------------------------------------

/// Compiled filter and upscale pipelines sharing one bind group layout.
pub struct GpuStencil {
    filter_pipeline: wgpu::ComputePipeline,
    upscale_pipeline: wgpu::ComputePipeline,
    bgl: wgpu::BindGroupLayout,
}

impl GpuStencil {
    /// Compile `stencil.wgsl` for the device's workgroup size.
    ///
    /// # Errors
    /// `DispatchFailure` if the shader or a pipeline fails validation.
    pub fn new(gpu: &GpuDevice) -> Result<Self> {
        let src = specialize_shader(gpu.workgroup_size.x, gpu.workgroup_size.y);

        let (built, err) = gpu.scoped(wgpu::ErrorFilter::Validation, || {
            let shader = gpu.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("stencil.wgsl"),
                source: wgpu::ShaderSource::Wgsl(src.into()),
            });

            let storage = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            };
            let bgl = gpu.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("GpuStencil BGL"),
                entries: &[
                    storage(0, true),  // src
                    storage(1, true),  // coeffs
                    storage(2, false), // dst
                    wgpu::BindGroupLayoutEntry {
                        binding: 3,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });

            let layout = gpu.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("GpuStencil pipeline layout"),
                bind_group_layouts: &[&bgl],
                push_constant_ranges: &[],
            });

            let pipeline = |entry: &'static str| {
                gpu.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(entry),
                    layout: Some(&layout),
                    module: &shader,
                    entry_point: entry,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    cache: None,
                })
            };
            let filter_pipeline = pipeline(FILTER_ENTRY);
            let upscale_pipeline = pipeline(UPSCALE_ENTRY);

            GpuStencil { filter_pipeline, upscale_pipeline, bgl }
        });

        match err {
            Some(e) => Err(StencilError::DispatchFailure {
                entry: "pipeline creation",
                reason: e.to_string(),
            }),
            None => {
                debug!("stencil pipelines ready (ABI v{STENCIL_ABI_VERSION})");
                Ok(built)
            }
        }
    }

    /// Copy `image` to the device. The copy is independent of the host image
    /// and lives until the returned `SourceImage` is dropped.
    pub fn upload_image(&self, gpu: &GpuDevice, image: &Image<f32>) -> Result<SourceImage> {
        let (width, height) = grid_u32(image.width(), image.height(), "source image")?;
        let buffer = BufferManager::new(gpu).allocate_init(
            image.as_slice(),
            BufferRole::Source,
            "source image",
        )?;
        Ok(SourceImage { buffer, width, height })
    }

    /// Filter every pixel of `src`. Output grid = `width × height`.
    pub fn run_filter(&self, gpu: &GpuDevice, src: &SourceImage, filter: &Filter) -> Result<StencilOutput> {
        self.dispatch(gpu, FILTER_ENTRY, &self.filter_pipeline, src, ScaleFactor::ONE, filter)
    }

    /// Enlarge `src` by `scale` and filter. Output grid = `(w·s) × (h·s)`.
    pub fn run_upscale(
        &self,
        gpu: &GpuDevice,
        src: &SourceImage,
        scale: ScaleFactor,
        filter: &Filter,
    ) -> Result<StencilOutput> {
        self.dispatch(gpu, UPSCALE_ENTRY, &self.upscale_pipeline, src, scale, filter)
    }

    fn dispatch(
        &self,
        gpu: &GpuDevice,
        entry: &'static str,
        pipeline: &wgpu::ComputePipeline,
        src: &SourceImage,
        scale: ScaleFactor,
        filter: &Filter,
    ) -> Result<StencilOutput> {
        let fail = |reason: String| StencilError::DispatchFailure { entry, reason };

        let (out_w, out_h) = scale.output_dimensions(src.width(), src.height());
        let (out_w32, out_h32) = grid_u32(out_w, out_h, entry)?;
        let (groups_x, groups_y) = gpu.dispatch_size(out_w32, out_h32);
        let max_groups = gpu.limits().max_compute_workgroups_per_dimension;
        if groups_x > max_groups || groups_y > max_groups {
            return Err(fail(format!(
                "grid {out_w}×{out_h} needs {groups_x}×{groups_y} workgroups (limit {max_groups})"
            )));
        }

        let mgr = BufferManager::new(gpu);
        let coeffs = mgr.allocate_init(
            filter.coeffs(),
            BufferRole::Coefficients,
            &format!("coeffs: {}", filter.name()),
        )?;
        if coeffs.len() != filter.size().len() {
            return Err(fail(format!(
                "`{}` holds {} values but `{}` is declared {}",
                coeffs.label(),
                coeffs.len(),
                filter.name(),
                filter.size()
            )));
        }
        let output = mgr.allocate(
            (out_w * out_h) as u64 * SAMPLE_BYTES,
            BufferRole::Output,
            &format!("output: {}", filter.name()),
        )?;

        let params = StencilParams::new(src.width, src.height, filter, scale);
        let ((), err) = gpu.scoped(wgpu::ErrorFilter::Validation, || {
            let params_buf = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("StencilParams"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            });

            let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("stencil bind group"),
                layout: &self.bgl,
                entries: &[
                    wgpu::BindGroupEntry { binding: 0, resource: src.buffer.raw().as_entire_binding() },
                    wgpu::BindGroupEntry { binding: 1, resource: coeffs.raw().as_entire_binding() },
                    wgpu::BindGroupEntry { binding: 2, resource: output.raw().as_entire_binding() },
                    wgpu::BindGroupEntry { binding: 3, resource: params_buf.as_entire_binding() },
                ],
            });

            let mut encoder = gpu.device.create_command_encoder(
                &wgpu::CommandEncoderDescriptor { label: Some(entry) },
            );
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some(entry),
                    timestamp_writes: None,
                });
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &bind_group, &[]);
                pass.dispatch_workgroups(groups_x, groups_y, 1);
            }
            gpu.queue.submit(std::iter::once(encoder.finish()));
        });
        gpu.wait_idle();
        mgr.release(coeffs);

        if let Some(e) = err {
            mgr.release(output);
            return Err(fail(e.to_string()));
        }

        debug!(
            "{entry}: `{}` {} on {}×{} → {out_w}×{out_h} ({groups_x}×{groups_y} groups)",
            filter.name(),
            filter.size(),
            src.width,
            src.height,
        );
        Ok(StencilOutput { buffer: output, width: out_w, height: out_h })
    }
}

/// Grid dimensions as u32, rejecting empty or oversized grids.
fn grid_u32(w: usize, h: usize, what: &'static str) -> Result<(u32, u32)> {
    match (u32::try_from(w), u32::try_from(h)) {
        (Ok(w32), Ok(h32)) if w32 > 0 && h32 > 0 => Ok((w32, h32)),
        _ => Err(StencilError::DispatchFailure {
            entry: what,
            reason: format!("unsupported grid shape {w}×{h}"),
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
