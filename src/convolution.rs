// convolution.rs — CPU reference for the 2D stencil kernels.
//
// This is the authoritative implementation: the WGSL kernels in
// shaders/stencil.wgsl compute the same formula and are validated against
// these functions sample-for-sample.
//
// For an output pixel whose stencil is centred on input pixel (cx, cy):
//
//   out = Σ_{i,j < k}  src[b(cy + i - k/2), b(cx + j - k/2)] * f[i][j]
//
// Plain filtering centres on (x, y) itself. Upscaling by s produces a
// (w·s)×(h·s) grid and centres output (X, Y) on input (X / s, Y / s); the
// window is scanned in *input* pixel units, so the result is a blocky
// replicate-then-filter enlargement rather than sub-pixel interpolation.
//
// BORDER HANDLING: Clamp (replicate edge pixels).
// Out-of-range taps read the nearest edge pixel. A constant image therefore
// maps to (constant × Σf) everywhere, borders included.
//
// Work is split across rayon workers one output row at a time; each row is
// written by exactly one worker.

use std::fmt;
use std::num::NonZeroU32;

use rayon::prelude::*;

use crate::error::{Result, StencilError};
use crate::filters::Filter;
use crate::image::Image;

/// Integer enlargement factor for the upscaling kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScaleFactor(NonZeroU32);

impl ScaleFactor {
    /// Plain filtering: output grid equals input grid.
    pub const ONE: ScaleFactor = ScaleFactor(NonZeroU32::MIN);

    /// # Errors
    /// `InvalidScaleFactor` for 0.
    pub fn new(factor: u32) -> Result<Self> {
        NonZeroU32::new(factor)
            .map(ScaleFactor)
            .ok_or(StencilError::InvalidScaleFactor(factor))
    }

    #[inline]
    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// Output grid for an input of `width × height`.
    #[inline]
    pub fn output_dimensions(self, width: usize, height: usize) -> (usize, usize) {
        let s = self.get() as usize;
        (width * s, height * s)
    }
}

impl fmt::Display for ScaleFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "×{}", self.get())
    }
}

/// Evaluate the stencil centred on input pixel (cx, cy).
#[inline]
pub fn stencil_at(src: &Image<f32>, filter: &Filter, cx: usize, cy: usize) -> f32 {
    let k = filter.size().side();
    let r = filter.size().radius() as isize;
    let coeffs = filter.coeffs();
    let mut acc = 0.0f32;
    for i in 0..k {
        let sy = cy as isize + i as isize - r;
        for j in 0..k {
            let sx = cx as isize + j as isize - r;
            acc += src.get_clamped(sx, sy) * coeffs[i * k + j];
        }
    }
    acc
}

/// Apply `filter` at every pixel. Output has the input's dimensions.
///
/// # Panics
/// Panics if `src` is empty.
pub fn filter_2d(src: &Image<f32>, filter: &Filter) -> Image<f32> {
    upscale_2d(src, ScaleFactor::ONE, filter)
}

/// Enlarge `src` by `scale` and filter in one pass.
///
/// Output is `(w·s) × (h·s)`; output (X, Y) is the stencil centred on input
/// (X / s, Y / s).
///
/// # Panics
/// Panics if `src` is empty.
pub fn upscale_2d(src: &Image<f32>, scale: ScaleFactor, filter: &Filter) -> Image<f32> {
    assert!(!src.is_empty(), "cannot filter an empty image");
    let s = scale.get() as usize;
    let (out_w, out_h) = scale.output_dimensions(src.width(), src.height());
    let mut dst = Image::<f32>::new(out_w, out_h);

    dst.as_mut_slice()
        .par_chunks_mut(out_w)
        .enumerate()
        .for_each(|(y, row)| {
            let cy = y / s;
            for (x, out) in row.iter_mut().enumerate() {
                *out = stencil_at(src, filter, x / s, cy);
            }
        });
    dst
}
