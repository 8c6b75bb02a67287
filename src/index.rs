//! Nearest-neighbour lookup over monotonic coordinate arrays.
//!
//! The spacing of the first two coordinates gives a first estimate of the
//! index, which is then walked towards the closest value. Files with uneven
//! spacing are handled by the walk; no full scan is needed.

/// Direction of a coordinate array, decided by its first and last values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrder {
    Ascending,
    Descending,
}

impl AxisOrder {
    pub fn of(coords: &[f64]) -> Self {
        match (coords.first(), coords.last()) {
            (Some(first), Some(last)) if first > last => AxisOrder::Descending,
            _ => AxisOrder::Ascending,
        }
    }
}

/// Index of the coordinate nearest to `desired`, or `None` when `desired`
/// lies more than half a cell outside the array.
pub fn nearest_index(coords: &[f64], desired: f64) -> Option<usize> {
    if coords.is_empty() || desired.is_nan() {
        return None;
    }
    if coords.len() == 1 {
        return (coords[0] == desired).then_some(0);
    }

    match AxisOrder::of(coords) {
        AxisOrder::Ascending => nearest_ascending(coords, desired),
        AxisOrder::Descending => nearest_descending(coords, desired),
    }
}

fn resolution(coords: &[f64]) -> f64 {
    (coords[1] - coords[0]).abs()
}

fn nearest_ascending(coords: &[f64], desired: f64) -> Option<usize> {
    let last = coords.len() - 1;
    let min = coords[0];
    let max = coords[last];
    let half = resolution(coords) / 2.0;

    if desired < min {
        return ((min - desired) <= half).then_some(0);
    }
    if desired > max {
        return ((desired - max) <= half).then_some(last);
    }

    let estimate = estimate_index((desired - min) / resolution(coords), last);
    Some(refine(coords, desired, estimate))
}

// Below the minimum the half-cell tolerance is exclusive, above the maximum
// it is inclusive.
fn nearest_descending(coords: &[f64], desired: f64) -> Option<usize> {
    let last = coords.len() - 1;
    let max = coords[0];
    let min = coords[last];
    let half = resolution(coords) / 2.0;

    if desired < min {
        return ((min - desired) < half).then_some(last);
    }
    if desired > max {
        return ((desired - max) <= half).then_some(0);
    }

    let estimate = estimate_index((max - desired) / resolution(coords), last);
    Some(refine(coords, desired, estimate))
}

fn estimate_index(steps: f64, last: usize) -> usize {
    if !steps.is_finite() || steps <= 0.0 {
        return 0;
    }
    (steps.round() as usize).min(last)
}

/// Walk from `start` towards the closest coordinate.
fn refine(coords: &[f64], desired: f64, start: usize) -> usize {
    let last = coords.len() - 1;
    let distance = |i: usize| (coords[i] - desired).abs();

    if start == 0 {
        return walk_right(coords, desired, 0);
    }
    if start == last {
        return walk_left(coords, desired, last);
    }

    let prev = distance(start - 1);
    let curr = distance(start);
    let next = distance(start + 1);

    if prev <= curr && prev < next {
        walk_left(coords, desired, start - 1)
    } else if next < curr && next < prev {
        walk_right(coords, desired, start + 1)
    } else {
        start
    }
}

fn walk_right(coords: &[f64], desired: f64, mut index: usize) -> usize {
    let last = coords.len() - 1;
    while index < last && (coords[index + 1] - desired).abs() < (coords[index] - desired).abs() {
        index += 1;
    }
    index
}

// Ties move left.
fn walk_left(coords: &[f64], desired: f64, mut index: usize) -> usize {
    while index > 0 && (coords[index - 1] - desired).abs() <= (coords[index] - desired).abs() {
        index -= 1;
    }
    index
}

/// First position holding exactly `value`.
pub fn find_exact(values: &[f64], value: f64) -> Option<usize> {
    values.iter().position(|v| *v == value)
}

/// Exact match in a row-major two-dimensional array with `columns` columns.
///
/// With `row` fixed only that row is searched. Otherwise every row is
/// searched and the last match wins. Returns `(row, column)`.
pub fn find_exact_in_rows(
    values: &[f64],
    columns: usize,
    value: f64,
    row: Option<usize>,
) -> Option<(usize, usize)> {
    if columns == 0 {
        return None;
    }
    values
        .chunks(columns)
        .enumerate()
        .filter(|(r, _)| row.map_or(true, |wanted| wanted == *r))
        .flat_map(|(r, cells)| {
            cells
                .iter()
                .enumerate()
                .filter(move |(_, v)| **v == value)
                .map(move |(c, _)| (r, c))
        })
        .last()
}

/// Largest value in one row of a row-major two-dimensional array.
pub fn max_in_row(values: &[f64], columns: usize, row: usize) -> Option<f64> {
    if columns == 0 {
        return None;
    }
    values
        .chunks(columns)
        .nth(row)?
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(None, |best, v| match best {
            Some(b) if b >= v => Some(b),
            _ => Some(v),
        })
}
