// image.rs — Dense, row-major image container, generic over pixel type.
//
// Every grid the engine touches is an `Image<T>`: the source intensities
// handed to a backend, the flat buffers read back from the device (after
// reshaping), and every gallery result. Rows are packed with no padding, so
// the sample at (x, y) lives at index `y * width + x`. This is exactly the
// layout the device buffers use, which keeps upload and readback a single
// contiguous copy.
//
// Coordinates are always (x, y) = (column, row).

use std::fmt;

use crate::error::{Result, StencilError};

// ---------------------------------------------------------------------------
// Pixel Trait
// ---------------------------------------------------------------------------

/// Trait for types that can serve as pixel values in an Image.
pub trait Pixel: Copy + Default + Send + Sync + PartialOrd + 'static {
    /// Construct a pixel from an f32 value (with appropriate clamping/rounding).
    fn from_f32(v: f32) -> Self;
}

impl Pixel for u8 {
    #[inline]
    fn from_f32(v: f32) -> Self {
        v.clamp(0.0, 255.0).round() as u8
    }
}

impl Pixel for f32 {
    #[inline]
    fn from_f32(v: f32) -> Self {
        v
    }
}

// ---------------------------------------------------------------------------
// Image<T>
// ---------------------------------------------------------------------------

/// A 2D image with runtime dimensions, generic over pixel type `T`.
#[derive(Clone, PartialEq)]
pub struct Image<T: Pixel> {
    /// Pixel data in row-major order. Length = width * height.
    data: Vec<T>,
    width: usize,
    height: usize,
}

impl<T: Pixel> Image<T> {
    /// Create a zero-initialized image with the given dimensions.
    pub fn new(width: usize, height: usize) -> Self {
        Image {
            data: vec![T::default(); width * height],
            width,
            height,
        }
    }

    /// Create an image where every pixel holds `value`.
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Image {
            data: vec![value; width * height],
            width,
            height,
        }
    }

    /// Create an image from an existing pixel vector.
    ///
    /// # Panics
    /// Panics if `data.len() != width * height`. Use [`Image::try_from_vec`]
    /// when the length comes from outside the program (device readback).
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Self {
        assert_eq!(
            data.len(),
            width * height,
            "data length ({}) must equal width * height ({})",
            data.len(),
            width * height,
        );
        Image { data, width, height }
    }

    /// Fallible variant of [`Image::from_vec`].
    ///
    /// # Errors
    /// `ShapeMismatch` if `data.len() != width * height`.
    pub fn try_from_vec(width: usize, height: usize, data: Vec<T>) -> Result<Self> {
        let expected = width * height;
        if data.len() != expected {
            return Err(StencilError::ShapeMismatch {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Image { data, width, height })
    }

    // --- Accessors ---

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// `(width, height)` in one call.
    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Number of pixels (`width * height`).
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the pixel value at (x, y).
    ///
    /// # Panics
    /// Panics if (x, y) is out of bounds.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.bounds_check(x, y);
        self.data[y * self.width + x]
    }

    /// Get the pixel at signed coordinates, clamping each axis to the image.
    ///
    /// This is the stencil boundary policy: reads past an edge return the
    /// nearest edge pixel (clamp-to-edge / replicate).
    ///
    /// # Panics
    /// Panics if the image is empty.
    #[inline]
    pub fn get_clamped(&self, x: isize, y: isize) -> T {
        assert!(!self.is_empty(), "cannot sample an empty image");
        let cx = x.clamp(0, self.width as isize - 1) as usize;
        let cy = y.clamp(0, self.height as isize - 1) as usize;
        self.data[cy * self.width + cx]
    }

    /// Get a mutable reference to the pixel at (x, y).
    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut T {
        self.bounds_check(x, y);
        let idx = y * self.width + x;
        &mut self.data[idx]
    }

    /// Set the pixel at (x, y) to the given value.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        *self.get_mut(x, y) = value;
    }

    /// Borrow a single row as a slice.
    #[inline]
    pub fn row(&self, y: usize) -> &[T] {
        assert!(y < self.height, "row {y} out of bounds (height {})", self.height);
        let start = y * self.width;
        &self.data[start..start + self.width]
    }

    /// Iterate over all pixels as `(x, y, value)` tuples, row by row.
    pub fn pixels(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        let w = self.width;
        self.data
            .iter()
            .enumerate()
            .map(move |(i, &v)| (i % w, i / w, v))
    }

    /// The packed row-major sample buffer.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Mutable access to the packed sample buffer.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Give up ownership of the packed sample buffer.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    #[inline]
    fn bounds_check(&self, x: usize, y: usize) {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x},{y}) out of bounds for image {}×{}",
            self.width,
            self.height,
        );
    }
}

// Debug formatting: prints at most an 8×16 corner, enough for tests.
impl<T: Pixel + fmt::Debug> fmt::Debug for Image<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Image<{}> {{ {}×{} }}",
            std::any::type_name::<T>(),
            self.width,
            self.height,
        )?;
        for y in 0..self.height.min(8) {
            write!(f, "  row {y}: [")?;
            for x in 0..self.width.min(16) {
                if x > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{:?}", self.get(x, y))?;
            }
            if self.width > 16 {
                write!(f, ", ...")?;
            }
            writeln!(f, "]")?;
        }
        if self.height > 8 {
            writeln!(f, "  ... ({} more rows)", self.height - 8)?;
        }
        Ok(())
    }
}

impl<T: Pixel> std::ops::Index<(usize, usize)> for Image<T> {
    type Output = T;

    #[inline]
    fn index(&self, (x, y): (usize, usize)) -> &T {
        self.bounds_check(x, y);
        &self.data[y * self.width + x]
    }
}

impl<T: Pixel> std::ops::IndexMut<(usize, usize)> for Image<T> {
    #[inline]
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut T {
        self.get_mut(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        let img: Image<f32> = Image::new(3, 2);
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.len(), 6);
        assert!(img.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_row_major_layout() {
        let img = Image::from_vec(3, 2, vec![0u8, 1, 2, 3, 4, 5]);
        assert_eq!(img.get(2, 0), 2);
        assert_eq!(img.get(0, 1), 3);
        assert_eq!(img[(1, 1)], 4);
        assert_eq!(img.row(1), &[3, 4, 5]);
    }

    #[test]
    fn test_try_from_vec_rejects_wrong_length() {
        let err = Image::<f32>::try_from_vec(4, 4, vec![0.0; 15]).unwrap_err();
        assert!(matches!(
            err,
            StencilError::ShapeMismatch { width: 4, height: 4, expected: 16, actual: 15 }
        ));
    }

    #[test]
    fn test_get_clamped_replicates_edges() {
        let img = Image::from_vec(2, 2, vec![1.0f32, 2.0, 3.0, 4.0]);
        assert_eq!(img.get_clamped(-1, -1), 1.0);
        assert_eq!(img.get_clamped(5, 0), 2.0);
        assert_eq!(img.get_clamped(0, 9), 3.0);
        assert_eq!(img.get_clamped(3, 3), 4.0);
    }

    #[test]
    fn test_pixels_visits_row_major() {
        let img = Image::from_vec(2, 2, vec![10u8, 11, 12, 13]);
        let coords: Vec<_> = img.pixels().collect();
        assert_eq!(coords, vec![(0, 0, 10), (1, 0, 11), (0, 1, 12), (1, 1, 13)]);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_get_out_of_bounds_panics() {
        let img: Image<u8> = Image::new(2, 2);
        img.get(2, 0);
    }
}
