// materialize.rs — Flat device output ⇄ 2D result grid.
//
// A dispatch writes its result into one flat f32 buffer addressed as
// `y * out_width + x`, where `out_width` is the width of the dispatch grid
// (the input width for filtering, input width × scale for upscaling).
// Reshaping is therefore the identity on the data plus a length check.

use crate::convolution::ScaleFactor;
use crate::error::Result;
use crate::image::Image;

/// Reshape a flat row-major buffer into an `out_width × out_height` grid.
///
/// `grid[y][x] = flat[y * out_width + x]`.
///
/// # Errors
/// `ShapeMismatch` if `flat.len() != out_width * out_height`; the buffer is
/// never truncated or padded to fit.
pub fn to_matrix(flat: Vec<f32>, out_width: usize, out_height: usize) -> Result<Image<f32>> {
    Image::try_from_vec(out_width, out_height, flat)
}

/// Reshape a buffer produced by a dispatch over an input of
/// `width × height` at `scale`.
pub fn to_scaled_matrix(
    flat: Vec<f32>,
    width: usize,
    height: usize,
    scale: ScaleFactor,
) -> Result<Image<f32>> {
    let (out_w, out_h) = scale.output_dimensions(width, height);
    to_matrix(flat, out_w, out_h)
}

/// Inverse of [`to_matrix`].
pub fn flatten(grid: &Image<f32>) -> Vec<f32> {
    grid.as_slice().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StencilError;

    #[test]
    fn test_address_formula() {
        let flat: Vec<f32> = (0..6).map(|v| v as f32).collect();
        let m = to_matrix(flat, 3, 2).unwrap();
        for y in 0..2 {
            for x in 0..3 {
                assert_eq!(m.get(x, y), (y * 3 + x) as f32);
            }
        }
    }

    #[test]
    fn test_scaled_shape() {
        let s = ScaleFactor::new(2).unwrap();
        let m = to_scaled_matrix(vec![0.0; 24], 3, 2, s).unwrap();
        assert_eq!(m.dimensions(), (6, 4));
        assert!(matches!(
            to_scaled_matrix(vec![0.0; 6], 3, 2, s),
            Err(StencilError::ShapeMismatch { expected: 24, actual: 6, .. })
        ));
    }

    #[test]
    fn test_overlong_buffer_rejected() {
        assert!(to_matrix(vec![0.0; 10], 3, 3).is_err());
    }
}
