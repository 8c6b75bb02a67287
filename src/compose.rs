//! Fields derived from two extractions of the same grid.

use ndarray::{Array2, Zip};

use crate::error::{NcGridError, Result};

/// Cell-wise vector magnitude `sqrt(u² + v²)`. NaN wherever either
/// component is NaN.
pub fn magnitude(u: &Array2<f32>, v: &Array2<f32>) -> Result<Array2<f32>> {
    if u.dim() != v.dim() {
        return Err(NcGridError::InvalidParameter {
            param: "v".to_string(),
            message: format!(
                "component shapes differ: {:?} and {:?}",
                u.dim(),
                v.dim()
            ),
        });
    }
    // hypot(NaN, inf) is inf; a missing component must stay missing
    Ok(Zip::from(u).and(v).map_collect(|a, b| {
        if a.is_nan() || b.is_nan() {
            f32::NAN
        } else {
            a.hypot(*b)
        }
    }))
}
