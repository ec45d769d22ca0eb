// stencil-gallery: 2D stencil filtering and integer upscaling on the GPU
//
// A fixed catalog of 3×3 / 5×5 filters runs over a grayscale image on a
// wgpu compute device (or the rayon CPU reference), and the named results
// are collected into a cyclically browsable gallery.

pub mod error;
pub mod image;
pub mod convert;
pub mod filters;
pub mod convolution;
pub mod materialize;
pub mod pyramid;
pub mod backend;
pub mod gallery;
pub mod config;
pub mod gpu;

pub use backend::{CpuBackend, GpuBackend, StencilBackend};
pub use error::{Result, StencilError};
pub use gallery::{Gallery, GalleryEntry, NavEvent, NavState, Navigator};
