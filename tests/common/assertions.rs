//! Assertion utilities for testing.
//!
//! Float comparisons and NaN-aware grid comparisons.

use ndarray::Array2;

/// Default epsilon for floating-point comparisons
pub const DEFAULT_EPSILON: f32 = 1e-6;

/// Assert that two floating-point values are approximately equal.
pub fn assert_approx_eq(actual: f32, expected: f32, epsilon: Option<f32>) {
    let epsilon = epsilon.unwrap_or(DEFAULT_EPSILON);
    let diff = (actual - expected).abs();

    assert!(
        diff <= epsilon,
        "Values not approximately equal: actual = {}, expected = {}, diff = {}, epsilon = {}",
        actual,
        expected,
        diff,
        epsilon
    );
}

/// Assert that a grid row holds the expected values; `None` means NaN.
pub fn assert_row_eq(grid: &Array2<f32>, row: usize, expected: &[Option<f32>]) {
    let actual: Vec<Option<f32>> = grid
        .row(row)
        .iter()
        .map(|v| (!v.is_nan()).then_some(*v))
        .collect();
    assert_eq!(actual, expected, "Row {} differs", row);
}

/// Assert two grids are identical, treating NaN as equal to NaN.
pub fn assert_grids_identical(actual: &Array2<f32>, expected: &Array2<f32>) {
    assert_eq!(actual.dim(), expected.dim(), "Grid shapes differ");
    for ((index, a), e) in actual.indexed_iter().zip(expected.iter()) {
        let same = (a.is_nan() && e.is_nan()) || a == e;
        assert!(
            same,
            "Grids differ at {:?}: actual = {}, expected = {}",
            index, a, e
        );
    }
}

/// Assert every cell of the grid is NaN.
pub fn assert_all_nan(grid: &Array2<f32>) {
    let filled = grid.iter().filter(|v| !v.is_nan()).count();
    assert_eq!(filled, 0, "Expected an empty grid, found {} values", filled);
}
