// convert.rs — Conversions at the edges of the engine.
//
// Input side:  packed RGB8 → luma u8 → normalized f32 in [0, 1].
// Output side: f32 results → u8, nearest-neighbour zoom, and a packed
//              0x00RRGGBB framebuffer for a window.
//
// None of these touch the device. They exist so a frontend can feed the
// engine and look at what comes out without reimplementing pixel plumbing.

use crate::error::{Result, StencilError};
use crate::image::{Image, Pixel};

/// Convert an Image<u8> to Image<f32> with normalized values in [0.0, 1.0].
/// u8 0 → 0.0, u8 255 → 1.0.
pub fn u8_to_f32_normalized(src: &Image<u8>) -> Image<f32> {
    let data = src.as_slice().iter().map(|&v| v as f32 / 255.0).collect();
    Image::from_vec(src.width(), src.height(), data)
}

/// Convert an Image<f32> (assumed [0.0, 1.0]) to Image<u8>.
/// Values are clamped to [0, 255] and rounded.
pub fn f32_normalized_to_u8(src: &Image<f32>) -> Image<u8> {
    let data = src.as_slice().iter().map(|&v| u8::from_f32(v * 255.0)).collect();
    Image::from_vec(src.width(), src.height(), data)
}

/// Collapse packed RGB8 samples to a single luma channel.
///
/// Weights are ITU-R BT.601 (0.299 R + 0.587 G + 0.114 B), the usual
/// "colour to gray" conversion for 8-bit photographs.
///
/// # Errors
/// `ShapeMismatch` if `rgb.len() != width * height * 3`.
pub fn luma_from_rgb8(width: usize, height: usize, rgb: &[u8]) -> Result<Image<u8>> {
    if rgb.len() != width * height * 3 {
        return Err(StencilError::ShapeMismatch {
            width,
            height,
            expected: width * height * 3,
            actual: rgb.len(),
        });
    }
    let data = rgb
        .chunks_exact(3)
        .map(|px| {
            let l = 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32;
            u8::from_f32(l)
        })
        .collect();
    Ok(Image::from_vec(width, height, data))
}

/// Enlarge an image by an integer factor, replicating each pixel into a
/// `factor × factor` block. Output pixel (X, Y) = input (X / factor, Y / factor).
///
/// # Panics
/// Panics if `factor == 0`.
pub fn zoom_nearest<T: Pixel>(src: &Image<T>, factor: usize) -> Image<T> {
    assert!(factor > 0, "zoom factor must be positive");
    let out_w = src.width() * factor;
    let out_h = src.height() * factor;
    let mut data = Vec::with_capacity(out_w * out_h);
    for y in 0..out_h {
        let row = src.row(y / factor);
        data.extend((0..out_w).map(|x| row[x / factor]));
    }
    Image::from_vec(out_w, out_h, data)
}

/// Render a normalized f32 image into a packed `0x00RRGGBB` framebuffer,
/// zoomed by `factor`. Returns `(buffer, width, height)`.
///
/// Values outside [0, 1] saturate, so edge-detector responses show up as
/// black/white rather than wrapping.
pub fn to_framebuffer(src: &Image<f32>, factor: usize) -> (Vec<u32>, usize, usize) {
    let zoomed = zoom_nearest(src, factor);
    let (w, h) = zoomed.dimensions();
    let fb = zoomed
        .as_slice()
        .iter()
        .map(|&v| {
            let g = u8::from_f32(v * 255.0) as u32;
            (g << 16) | (g << 8) | g
        })
        .collect();
    (fb, w, h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_round_trip() {
        let src = Image::from_vec(4, 1, vec![0u8, 1, 128, 255]);
        let f = u8_to_f32_normalized(&src);
        assert_eq!(f.get(0, 0), 0.0);
        assert!((f.get(3, 0) - 1.0).abs() < 1e-7);
        assert_eq!(f32_normalized_to_u8(&f), src);
    }

    #[test]
    fn test_luma_weights() {
        // Pure red, green, blue, white.
        let rgb = [255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255];
        let luma = luma_from_rgb8(4, 1, &rgb).unwrap();
        assert_eq!(luma.as_slice(), &[76, 150, 29, 255]);
    }

    #[test]
    fn test_luma_rejects_short_buffer() {
        assert!(matches!(
            luma_from_rgb8(2, 2, &[0; 11]),
            Err(StencilError::ShapeMismatch { expected: 12, actual: 11, .. })
        ));
    }

    #[test]
    fn test_zoom_replicates_blocks() {
        let src = Image::from_vec(2, 1, vec![1u8, 2]);
        let z = zoom_nearest(&src, 3);
        assert_eq!(z.dimensions(), (6, 3));
        for y in 0..3 {
            assert_eq!(z.row(y), &[1, 1, 1, 2, 2, 2]);
        }
    }

    #[test]
    fn test_framebuffer_saturates() {
        let src = Image::from_vec(3, 1, vec![-0.5f32, 0.5, 2.0]);
        let (fb, w, h) = to_framebuffer(&src, 1);
        assert_eq!((w, h), (3, 1));
        assert_eq!(fb[0], 0);
        assert_eq!(fb[1], 0x0080_8080);
        assert_eq!(fb[2], 0x00FF_FFFF);
    }
}
