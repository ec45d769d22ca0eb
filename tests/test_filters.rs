// tests/test_filters.rs — Integration tests for the filter catalog.

use stencil_gallery::error::StencilError;
use stencil_gallery::filters::{self, Filter, FilterSize};

#[test]
fn catalog_has_eight_named_entries() {
    let names: Vec<String> = filters::catalog().iter().map(|f| f.name().to_string()).collect();
    assert_eq!(names.len(), 8);
    for name in [
        filters::BOX_3X3,
        filters::GAUSSIAN_3X3,
        filters::GAUSSIAN_5X5,
        filters::SHARPEN_3X3,
        filters::EDGE_3X3,
        filters::CORNER_EDGE_3X3,
        filters::CORNER_EDGE_PLUS_ORIGINAL_3X3,
        filters::UNSHARP_MASK_5X5,
    ] {
        assert!(names.iter().any(|n| n == name), "missing {name}");
    }
}

#[test]
fn coefficient_count_matches_size() {
    for f in filters::catalog() {
        assert_eq!(f.coeffs().len(), f.size().len(), "{}", f.name());
    }
}

#[test]
fn normalization_targets() {
    for f in filters::catalog() {
        assert!(
            (f.sum() - f.expected_sum()).abs() < 1e-5,
            "{}: Σ = {} but expected {}",
            f.name(),
            f.sum(),
            f.expected_sum()
        );
    }
    assert_eq!(filters::edge_3x3().expected_sum(), 0.0);
    assert_eq!(filters::corner_edge_3x3().expected_sum(), 0.0);
    assert_eq!(filters::gaussian_5x5().expected_sum(), 1.0);
}

#[test]
fn kernels_are_symmetric() {
    for f in filters::catalog() {
        let k = f.size().side();
        for i in 0..k {
            for j in 0..k {
                assert_eq!(f.at(i, j), f.at(j, i), "{} transposed at ({i},{j})", f.name());
                assert_eq!(f.at(i, j), f.at(k - 1 - i, k - 1 - j), "{} rotated", f.name());
            }
        }
    }
}

#[test]
fn unsharp_mask_centre() {
    let f = filters::unsharp_mask_5x5();
    assert_eq!(f.size(), FilterSize::Five);
    assert!((f.at(2, 2) - 476.0 / 256.0).abs() < 1e-6);
    assert!((f.at(0, 0) + 1.0 / 256.0).abs() < 1e-7);
}

#[test]
fn gallery_order_is_a_permutation_of_catalog() {
    let mut a: Vec<String> = filters::catalog().iter().map(|f| f.name().to_string()).collect();
    let mut b: Vec<String> = filters::gallery_order().iter().map(|f| f.name().to_string()).collect();
    assert_eq!(b[0], filters::BOX_3X3);
    assert_eq!(b[7], filters::CORNER_EDGE_3X3);
    a.sort();
    b.sort();
    assert_eq!(a, b);
}

#[test]
fn upscale_catalog_is_smoothing_only() {
    let names: Vec<String> = filters::upscale_catalog().iter().map(|f| f.name().to_string()).collect();
    assert_eq!(names, [filters::BOX_3X3, filters::GAUSSIAN_3X3, filters::GAUSSIAN_5X5]);
}

#[test]
fn lookup_by_name() {
    assert_eq!(filters::by_name(filters::SHARPEN_3X3), Some(filters::sharpen_3x3()));
    assert_eq!(filters::by_name("emboss 3x3"), None);
}

#[test]
fn custom_filter_validation() {
    let f = Filter::new("identity", 3, vec![0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
    assert_eq!(f.expected_sum(), 1.0);

    assert!(matches!(
        Filter::new("short", 5, vec![0.0; 9]),
        Err(StencilError::FilterSizeMismatch { size: 5, actual: 9, .. })
    ));
    assert!(matches!(
        Filter::new("even", 4, vec![0.0; 16]),
        Err(StencilError::UnsupportedFilterSize(4))
    ));
}
