// filters.rs — The fixed catalog of 2D stencil kernels.
//
// Every filter is a square, row-major coefficient matrix of odd size k.
// Entries are constants: they are built on demand from literal tables and
// never mutated afterwards.
//
// Normalization targets:
//   smoothing (box, Gaussian)            Σ = 1   preserves brightness
//   sharpen, corner edge + original      Σ = 1   original plus detail
//   unsharp mask (÷ -256)                Σ = 1
//   Laplacian edge, corner edge          Σ = 0   flat regions go to 0

use std::fmt;

use crate::error::{Result, StencilError};

/// Supported stencil sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterSize {
    Three,
    Five,
}

impl FilterSize {
    /// Side length k of the k×k matrix.
    pub fn side(self) -> usize {
        match self {
            FilterSize::Three => 3,
            FilterSize::Five => 5,
        }
    }

    /// Number of coefficients (k²).
    pub fn len(self) -> usize {
        self.side() * self.side()
    }

    /// Offset from the window's top-left corner to its centre (k / 2).
    pub fn radius(self) -> usize {
        self.side() / 2
    }

    /// Parse a side length.
    ///
    /// # Errors
    /// `UnsupportedFilterSize` for anything other than 3 or 5.
    pub fn from_side(k: usize) -> Result<Self> {
        match k {
            3 => Ok(FilterSize::Three),
            5 => Ok(FilterSize::Five),
            other => Err(StencilError::UnsupportedFilterSize(other)),
        }
    }
}

impl fmt::Display for FilterSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{0}×{0}", self.side())
    }
}

/// A named, immutable stencil kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    name: String,
    size: FilterSize,
    coeffs: Vec<f32>,
    expected_sum: f32,
}

impl Filter {
    /// Build a filter from row-major coefficients.
    ///
    /// The documented normalization target is taken to be the actual sum of
    /// `coeffs`; catalog entries override it with their documented value.
    ///
    /// # Errors
    /// `UnsupportedFilterSize` if `side` is not 3 or 5;
    /// `FilterSizeMismatch` if `coeffs.len() != side * side`.
    pub fn new(name: impl Into<String>, side: usize, coeffs: Vec<f32>) -> Result<Self> {
        let name = name.into();
        let size = FilterSize::from_side(side)?;
        if coeffs.len() != size.len() {
            return Err(StencilError::FilterSizeMismatch {
                name,
                size: side,
                actual: coeffs.len(),
            });
        }
        let expected_sum = coeffs.iter().sum();
        Ok(Filter { name, size, coeffs, expected_sum })
    }

    /// Catalog constructor: literal table, scaled by `1 / divisor`.
    fn catalog_entry(
        name: &str,
        size: FilterSize,
        table: &[f32],
        divisor: f32,
        expected_sum: f32,
    ) -> Self {
        debug_assert_eq!(table.len(), size.len(), "catalog table for `{name}`");
        Filter {
            name: name.to_string(),
            size,
            coeffs: table.iter().map(|&c| c / divisor).collect(),
            expected_sum,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> FilterSize {
        self.size
    }

    /// Row-major coefficients, `size().len()` of them.
    pub fn coeffs(&self) -> &[f32] {
        &self.coeffs
    }

    /// Coefficient at row `i`, column `j` of the window.
    #[inline]
    pub fn at(&self, i: usize, j: usize) -> f32 {
        self.coeffs[i * self.size.side() + j]
    }

    /// The documented normalization target (sum of all coefficients).
    pub fn expected_sum(&self) -> f32 {
        self.expected_sum
    }

    /// Actual sum of the coefficients.
    pub fn sum(&self) -> f32 {
        self.coeffs.iter().sum()
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

pub const BOX_3X3: &str = "box blur 3x3";
pub const GAUSSIAN_3X3: &str = "gaussian blur 3x3";
pub const GAUSSIAN_5X5: &str = "gaussian blur 5x5";
pub const SHARPEN_3X3: &str = "sharpen 3x3";
pub const EDGE_3X3: &str = "edge 3x3";
pub const CORNER_EDGE_3X3: &str = "corner edge 3x3";
pub const CORNER_EDGE_PLUS_ORIGINAL_3X3: &str = "corner edge + original 3x3";
pub const UNSHARP_MASK_5X5: &str = "unsharp mask 5x5";

/// Binomial 5×5 weights (outer product of [1 4 6 4 1]).
#[rustfmt::skip]
const BINOMIAL_5X5: [f32; 25] = [
    1.0,  4.0,  6.0,  4.0, 1.0,
    4.0, 16.0, 24.0, 16.0, 4.0,
    6.0, 24.0, 36.0, 24.0, 6.0,
    4.0, 16.0, 24.0, 16.0, 4.0,
    1.0,  4.0,  6.0,  4.0, 1.0,
];

pub fn box_3x3() -> Filter {
    Filter::catalog_entry(BOX_3X3, FilterSize::Three, &[1.0; 9], 9.0, 1.0)
}

/// 3×3 binomial blur; equivalent to bilinear smoothing.
#[rustfmt::skip]
pub fn gaussian_3x3() -> Filter {
    Filter::catalog_entry(GAUSSIAN_3X3, FilterSize::Three, &[
        1.0, 2.0, 1.0,
        2.0, 4.0, 2.0,
        1.0, 2.0, 1.0,
    ], 16.0, 1.0)
}

pub fn gaussian_5x5() -> Filter {
    Filter::catalog_entry(GAUSSIAN_5X5, FilterSize::Five, &BINOMIAL_5X5, 256.0, 1.0)
}

#[rustfmt::skip]
pub fn sharpen_3x3() -> Filter {
    Filter::catalog_entry(SHARPEN_3X3, FilterSize::Three, &[
         0.0, -1.0,  0.0,
        -1.0,  5.0, -1.0,
         0.0, -1.0,  0.0,
    ], 1.0, 1.0)
}

/// Laplacian: centre -4, 4-connected neighbours +1.
#[rustfmt::skip]
pub fn edge_3x3() -> Filter {
    Filter::catalog_entry(EDGE_3X3, FilterSize::Three, &[
        0.0,  1.0, 0.0,
        1.0, -4.0, 1.0,
        0.0,  1.0, 0.0,
    ], 1.0, 0.0)
}

#[rustfmt::skip]
pub fn corner_edge_3x3() -> Filter {
    Filter::catalog_entry(CORNER_EDGE_3X3, FilterSize::Three, &[
        -1.0, -1.0, -1.0,
        -1.0,  8.0, -1.0,
        -1.0, -1.0, -1.0,
    ], 1.0, 0.0)
}

#[rustfmt::skip]
pub fn corner_edge_plus_original_3x3() -> Filter {
    Filter::catalog_entry(CORNER_EDGE_PLUS_ORIGINAL_3X3, FilterSize::Three, &[
        -1.0, -1.0, -1.0,
        -1.0,  9.0, -1.0,
        -1.0, -1.0, -1.0,
    ], 1.0, 1.0)
}

/// Binomial 5×5 with the centre replaced by -476, all divided by -256.
/// Sum: (256 - 36 - 476) / -256 = 1.
pub fn unsharp_mask_5x5() -> Filter {
    let mut table = BINOMIAL_5X5;
    table[12] = -476.0;
    Filter::catalog_entry(UNSHARP_MASK_5X5, FilterSize::Five, &table, -256.0, 1.0)
}

/// The full catalog, in definition order.
pub fn catalog() -> Vec<Filter> {
    vec![
        box_3x3(),
        gaussian_3x3(),
        gaussian_5x5(),
        sharpen_3x3(),
        edge_3x3(),
        corner_edge_3x3(),
        corner_edge_plus_original_3x3(),
        unsharp_mask_5x5(),
    ]
}

/// The catalog in browsing order: smoothing first, then sharpening, then
/// the pure edge responses.
pub fn gallery_order() -> Vec<Filter> {
    vec![
        box_3x3(),
        gaussian_3x3(),
        gaussian_5x5(),
        sharpen_3x3(),
        unsharp_mask_5x5(),
        corner_edge_plus_original_3x3(),
        edge_3x3(),
        corner_edge_3x3(),
    ]
}

/// Smoothing filters used for upscaling.
pub fn upscale_catalog() -> Vec<Filter> {
    vec![box_3x3(), gaussian_3x3(), gaussian_5x5()]
}

/// Look up a catalog entry by name.
pub fn by_name(name: &str) -> Option<Filter> {
    catalog().into_iter().find(|f| f.name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_entry_matches_its_normalization() {
        for f in catalog() {
            assert!(
                (f.sum() - f.expected_sum()).abs() < 1e-6,
                "{}: sum {} != expected {}",
                f.name(),
                f.sum(),
                f.expected_sum()
            );
        }
    }

    #[test]
    fn test_declared_sizes() {
        let sizes: Vec<usize> = catalog().iter().map(|f| f.size().side()).collect();
        assert_eq!(sizes, vec![3, 3, 5, 3, 3, 3, 3, 5]);
        for f in catalog() {
            assert_eq!(f.coeffs().len(), f.size().len(), "{}", f.name());
        }
    }

    #[test]
    fn test_gallery_order_is_a_permutation() {
        let mut a: Vec<String> = catalog().iter().map(|f| f.name().to_string()).collect();
        let mut b: Vec<String> = gallery_order().iter().map(|f| f.name().to_string()).collect();
        assert_eq!(b[4], UNSHARP_MASK_5X5);
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unsharp_centre() {
        let f = unsharp_mask_5x5();
        assert!((f.at(2, 2) - 476.0 / 256.0).abs() < 1e-7);
        assert!((f.at(0, 0) + 1.0 / 256.0).abs() < 1e-7);
    }

    #[test]
    fn test_new_rejects_wrong_count() {
        let err = Filter::new("bad", 3, vec![0.0; 8]).unwrap_err();
        assert!(matches!(err, StencilError::FilterSizeMismatch { size: 3, actual: 8, .. }));
        assert!(matches!(
            Filter::new("four", 4, vec![0.0; 16]),
            Err(StencilError::UnsupportedFilterSize(4))
        ));
    }

    #[test]
    fn test_by_name() {
        assert_eq!(by_name(EDGE_3X3).unwrap().at(1, 1), -4.0);
        assert!(by_name("emboss").is_none());
    }
}
