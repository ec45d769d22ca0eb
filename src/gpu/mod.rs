// gpu/mod.rs — wgpu compute layer.
//
// The CPU functions in `convolution` are the reference; every kernel here is
// checked against them sample for sample.
//
//   device    adapter selection, limits profiles, error scopes
//   buffer    allocate / upload / download / release of f32 storage buffers
//   stencil   filter and upscale pipelines over `shaders/stencil.wgsl`
//
// All operations block until the device is idle. There is no queueing
// across dispatches: one dispatch completes before the next is issued.

pub mod device;
pub mod buffer;
pub mod stencil;
