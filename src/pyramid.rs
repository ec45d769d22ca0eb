// pyramid.rs — Gaussian pyramid-up (2× expansion) on the host.
//
// The classic Burt–Adelson expand step:
//   1. Insert a zero between every pair of samples in both directions
//      (2w × 2h, source pixel (x, y) lands on (2x, 2y)).
//   2. Blur with the 5×5 binomial kernel and multiply by 4 to restore the
//      energy removed by the zero insertion.
//
// The kernel is separable ([1 4 6 4 1] / 16 on each axis), so we run one
// horizontal and one vertical pass, each scaled by 2. This is the smooth
// reference that the blocky GPU upscale results are compared against in
// the upscaling gallery.
//
// BORDER HANDLING: taps that fall outside the upsampled grid read the
// nearest source sample (clamp), which keeps constant images constant.

use crate::image::Image;

/// 1D binomial taps, offsets -2..=2.
const EXPAND_TAPS: [f32; 5] = [1.0 / 16.0, 4.0 / 16.0, 6.0 / 16.0, 4.0 / 16.0, 1.0 / 16.0];

/// Expand `src` to `2w × 2h` with Gaussian interpolation.
///
/// # Panics
/// Panics if `src` is empty.
pub fn pyr_up(src: &Image<f32>) -> Image<f32> {
    assert!(!src.is_empty(), "cannot expand an empty image");
    let (w, h) = src.dimensions();

    // Horizontal pass: w → 2w, rows stay at source resolution.
    let mut wide = Image::<f32>::new(2 * w, h);
    for y in 0..h {
        let row = src.row(y);
        for ox in 0..2 * w {
            wide.set(ox, y, expand_1d(ox, w, |sx| row[sx]));
        }
    }

    // Vertical pass: h → 2h.
    let mut dst = Image::<f32>::new(2 * w, 2 * h);
    for oy in 0..2 * h {
        for ox in 0..2 * w {
            dst.set(ox, oy, expand_1d(oy, h, |sy| wide.get(ox, sy)));
        }
    }
    dst
}

/// One output sample of the 1D expand at upsampled position `o`.
///
/// Only even upsampled positions carry source data; odd ones are the
/// inserted zeros and contribute nothing.
#[inline]
fn expand_1d(o: usize, src_len: usize, sample: impl Fn(usize) -> f32) -> f32 {
    let mut acc = 0.0f32;
    for (t, &k) in EXPAND_TAPS.iter().enumerate() {
        let p = o as isize + t as isize - 2;
        if p.rem_euclid(2) != 0 {
            continue;
        }
        let s = (p.div_euclid(2)).clamp(0, src_len as isize - 1) as usize;
        acc += sample(s) * k;
    }
    2.0 * acc
}
