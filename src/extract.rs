//! Extraction of one parameter onto a regular output grid.
//!
//! Builds the target grid, resolves the non-spatial axes, maps every target
//! longitude and latitude onto the file's coordinate arrays, picks a read
//! strategy and lets the matching reader fill the grid.

use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

use crate::axis::{AxisNames, AxisRole};
use crate::dimension::{self, DimensionRequest, ElevationTarget};
use crate::error::{NcGridError, Result};
use crate::grid::{Envelope, OutputGrid};
use crate::index::nearest_index;
use crate::logging::log_extraction_stats;
use crate::reader::{reader_for, AxisAttributes, IndexMap, ReadPlan};
use crate::source::FileInspector;
use crate::strategy::{self, ReadStrategy, StrategyPreference, FILE_WINDOW_THRESHOLD};

const WRAP_TOLERANCE: f64 = 1e-6;

/// Largest output grid, in cells, an extraction will allocate by default.
pub const MAX_GRID_CELLS: usize = 10_000_000;

/// One extraction request.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractRequest {
    pub parameter: String,
    pub envelope: Envelope,
    pub width: usize,
    pub height: usize,
    pub time: Option<DateTime<Utc>>,
    pub elevation: Option<ElevationTarget>,
    pub reference_time: Option<DateTime<Utc>>,
}

impl ExtractRequest {
    pub fn new(parameter: impl Into<String>, envelope: Envelope, width: usize, height: usize) -> Self {
        Self {
            parameter: parameter.into(),
            envelope,
            width,
            height,
            time: None,
            elevation: None,
            reference_time: None,
        }
    }

    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    pub fn with_elevation(mut self, elevation: ElevationTarget) -> Self {
        self.elevation = Some(elevation);
        self
    }

    pub fn with_reference_time(mut self, reference_time: DateTime<Utc>) -> Self {
        self.reference_time = Some(reference_time);
        self
    }

    fn dimensions(&self) -> DimensionRequest {
        DimensionRequest {
            time: self.time,
            elevation: self.elevation.clone(),
            reference_time: self.reference_time,
        }
    }
}

/// Engine settings passed into every extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractOptions {
    #[serde(default)]
    pub axis_names: AxisNames,
    #[serde(default = "default_window_threshold")]
    pub window_threshold: u64,
    #[serde(default)]
    pub strategy: StrategyPreference,
    #[serde(default = "default_max_grid_cells")]
    pub max_grid_cells: usize,
}

fn default_window_threshold() -> u64 {
    FILE_WINDOW_THRESHOLD
}

fn default_max_grid_cells() -> usize {
    MAX_GRID_CELLS
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            axis_names: AxisNames::default(),
            window_threshold: default_window_threshold(),
            strategy: StrategyPreference::Auto,
            max_grid_cells: default_max_grid_cells(),
        }
    }
}

/// The filled output grid.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// height x width, row 0 is the northern edge
    pub values: Array2<f32>,
    pub envelope: Envelope,
    /// `None` when nothing was read
    pub strategy: Option<ReadStrategy>,
    pub filled_cells: usize,
}

impl Extraction {
    pub fn width(&self) -> usize {
        self.values.ncols()
    }

    pub fn height(&self) -> usize {
        self.values.nrows()
    }
}

/// Reject grids whose cell count overflows or exceeds `max_cells`.
fn check_grid_size(width: usize, height: usize, max_cells: usize) -> Result<()> {
    match width.checked_mul(height) {
        Some(cells) if cells <= max_cells => Ok(()),
        Some(cells) => Err(NcGridError::PayloadTooLarge {
            message: format!("output grid {}x{} is too large", width, height),
            requested: cells,
            max_allowed: max_cells,
        }),
        None => Err(NcGridError::PayloadTooLarge {
            message: format!("output grid {}x{} overflows the cell count", width, height),
            requested: usize::MAX,
            max_allowed: max_cells,
        }),
    }
}

/// Extract `request.parameter` from `source`.
pub fn extract(
    source: &dyn FileInspector,
    request: &ExtractRequest,
    options: &ExtractOptions,
) -> Result<Extraction> {
    let started = Instant::now();
    for (param, size) in [("width", request.width), ("height", request.height)] {
        if size == 0 {
            return Err(NcGridError::InvalidParameter {
                param: param.to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
    }
    check_grid_size(request.width, request.height, options.max_grid_cells)?;

    let mut grid = OutputGrid::new(&request.envelope, request.width, request.height);

    if request.parameter.trim().is_empty() {
        debug!(source = source.identifier(), "No parameter requested, returning empty grid");
        let (values, envelope) = grid.into_parts();
        return Ok(Extraction {
            values,
            envelope,
            strategy: None,
            filled_cells: 0,
        });
    }

    let variable = source
        .find_variable(&request.parameter)
        .ok_or_else(|| NcGridError::VariableNotFound {
            variable: request.parameter.clone(),
            source_id: source.identifier().to_string(),
        })?;
    let names = &options.axis_names;

    let selection = dimension::resolve(source, &variable, &request.dimensions(), names)?;
    let plan = ReadPlan::build(&variable, &names.locate(&variable), &selection)?;

    let lons = read_coordinates(source, names, AxisRole::Longitude)?;
    let lats = read_coordinates(source, names, AxisRole::Latitude)?;
    let lon_map = target_indexes(&lons, &grid.target().lons, true);
    let lat_map = target_indexes(&lats, &grid.target().lats, false);

    let strategy = strategy::select(&lon_map, &lat_map, options.window_threshold, options.strategy);
    info!(
        source = source.identifier(),
        parameter = %request.parameter,
        request_width = request.width,
        request_height = request.height,
        file_lon_count = lons.len(),
        file_lat_count = lats.len(),
        mapped_columns = lon_map.len(),
        mapped_rows = lat_map.len(),
        strategy = %strategy,
        "Reading grid"
    );

    let attributes = AxisAttributes::from_variable(&variable);
    let filled_cells = reader_for(strategy).fill(
        source,
        &plan,
        &attributes,
        &lon_map,
        &lat_map,
        &mut grid,
    )?;

    log_extraction_stats(
        source.identifier(),
        &request.parameter,
        &strategy.to_string(),
        request.width,
        request.height,
        filled_cells,
    );
    debug!(duration_us = started.elapsed().as_micros() as u64, "Extraction complete");

    let (values, envelope) = grid.into_parts();
    Ok(Extraction {
        values,
        envelope,
        strategy: Some(strategy),
        filled_cells,
    })
}

fn read_coordinates(
    source: &dyn FileInspector,
    names: &AxisNames,
    role: AxisRole,
) -> Result<Vec<f64>> {
    let variable = names
        .find_variable(source, role)
        .ok_or_else(|| NcGridError::AxisNotFound {
            axis: role.label().to_string(),
            message: format!(
                "none of {:?} found in {}",
                names.candidates(role),
                source.identifier()
            ),
        })?;
    source.read_axis(&variable.name)
}

/// Map each target coordinate to its nearest file index. Targets with no
/// acceptable neighbour are left out of the map.
///
/// For longitudes in a 0..360 file, negative targets are shifted by 360, and
/// a target just short of 360 wraps to index 0 when the file covers the
/// whole globe starting at 0.
pub fn target_indexes(coords: &[f64], targets: &[f64], is_longitude: bool) -> IndexMap {
    let shift = is_longitude && is_0_360(coords);
    let wraps = is_longitude && wraps_globe(coords);

    targets
        .iter()
        .enumerate()
        .filter_map(|(position, target)| {
            let desired = if shift && *target < 0.0 {
                target + 360.0
            } else {
                *target
            };
            match nearest_index(coords, desired) {
                Some(index) => Some((position, index)),
                None if wraps && desired > 359.5 && desired <= 360.0 => Some((position, 0)),
                None => None,
            }
        })
        .collect()
}

/// True when any longitude lies beyond 180.
pub fn is_0_360(lons: &[f64]) -> bool {
    lons.iter().any(|lon| *lon > 180.0)
}

/// True when the longitudes start at 0 and one more step reaches 360.
fn wraps_globe(lons: &[f64]) -> bool {
    let (Some(first), Some(last)) = (lons.first(), lons.last()) else {
        return false;
    };
    if lons.len() < 2 || *first != 0.0 {
        return false;
    }
    let step = (last - first) / (lons.len() - 1) as f64;
    (last + step - 360.0).abs() < WRAP_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{AttributeValue, Variable};
    use crate::source::MemorySource;
    use pretty_assertions::assert_eq;

    fn degrees(start: f64, step: f64, count: usize) -> Vec<f64> {
        (0..count).map(|i| start + step * i as f64).collect()
    }

    #[test]
    fn test_negative_targets_shift_into_0_360() {
        let lons = degrees(0.0, 1.0, 360);
        let map = target_indexes(&lons, &[-90.0, 10.2, -0.4], true);
        assert_eq!(map.get(&0), Some(&270));
        assert_eq!(map.get(&1), Some(&10));
        assert_eq!(map.get(&2), Some(&0));
    }

    #[test]
    fn test_wrap_needs_whole_globe_from_zero() {
        let lons = degrees(0.0, 1.0, 359);
        // 358 is the last value, so one more step does not reach 360
        let map = target_indexes(&lons, &[-0.6], true);
        assert!(map.is_empty());

        let coarse = degrees(0.0, 2.0, 180);
        let map = target_indexes(&coarse, &[-0.4], true);
        assert_eq!(map.get(&0), Some(&0));
    }

    #[test]
    fn test_latitudes_are_not_shifted() {
        let lats = degrees(-90.0, 1.0, 181);
        let map = target_indexes(&lats, &[-45.0, 95.0], false);
        assert_eq!(map.get(&0), Some(&45));
        assert_eq!(map.get(&1), None);
    }

    #[test]
    fn test_is_0_360() {
        assert!(is_0_360(&[0.0, 90.0, 270.0]));
        assert!(!is_0_360(&[-180.0, 0.0, 179.0]));
    }

    fn sample() -> MemorySource {
        MemorySource::new("memory://extract")
            .with_coordinate("lat", vec![0.0, 1.0])
            .with_coordinate("lon", vec![0.0, 1.0, 2.0])
            .with_variable(
                Variable::new("temp", &["lat", "lon"], &[2, 3])
                    .with_attribute("_FillValue", AttributeValue::Number(-9.0)),
                vec![1.0, 2.0, -9.0, 4.0, 5.0, 6.0],
            )
            .unwrap()
    }

    #[test]
    fn test_extract_small_grid() {
        let request = ExtractRequest::new("temp", Envelope::new(-0.5, -0.5, 2.5, 1.5), 3, 2);
        let extraction = extract(&sample(), &request, &ExtractOptions::default()).unwrap();

        assert_eq!(extraction.strategy, Some(ReadStrategy::Windowed));
        assert_eq!(extraction.filled_cells, 5);
        assert_eq!(extraction.values.row(0).to_vec(), vec![4.0, 5.0, 6.0]);
        assert_eq!(extraction.values[[1, 0]], 1.0);
        assert!(extraction.values[[1, 2]].is_nan());
    }

    #[test]
    fn test_empty_parameter_returns_empty_grid() {
        let request = ExtractRequest::new("", Envelope::world(), 4, 3);
        let extraction = extract(&sample(), &request, &ExtractOptions::default()).unwrap();
        assert_eq!(extraction.strategy, None);
        assert_eq!(extraction.values.dim(), (3, 4));
        assert!(extraction.values.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_zero_width_is_rejected() {
        let request = ExtractRequest::new("temp", Envelope::world(), 0, 3);
        assert!(matches!(
            extract(&sample(), &request, &ExtractOptions::default()),
            Err(NcGridError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_overflowing_grid_is_rejected() {
        let request = ExtractRequest::new("temp", Envelope::world(), 1 << 40, 1 << 40);
        match extract(&sample(), &request, &ExtractOptions::default()) {
            Err(NcGridError::PayloadTooLarge { requested, max_allowed, .. }) => {
                assert_eq!(requested, usize::MAX);
                assert_eq!(max_allowed, MAX_GRID_CELLS);
            }
            other => panic!("Expected PayloadTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_grid_over_limit_is_rejected() {
        let options = ExtractOptions {
            max_grid_cells: 6,
            ..ExtractOptions::default()
        };
        let over = ExtractRequest::new("temp", Envelope::new(-0.5, -0.5, 2.5, 1.5), 7, 1);
        match extract(&sample(), &over, &options) {
            Err(NcGridError::PayloadTooLarge { requested, max_allowed, .. }) => {
                assert_eq!(requested, 7);
                assert_eq!(max_allowed, 6);
            }
            other => panic!("Expected PayloadTooLarge, got {:?}", other),
        }

        let at_limit = ExtractRequest::new("temp", Envelope::new(-0.5, -0.5, 2.5, 1.5), 3, 2);
        assert!(extract(&sample(), &at_limit, &options).is_ok());
    }

    #[test]
    fn test_unknown_parameter() {
        let request = ExtractRequest::new("salt", Envelope::world(), 2, 2);
        match extract(&sample(), &request, &ExtractOptions::default()) {
            Err(NcGridError::VariableNotFound { variable, source_id }) => {
                assert_eq!(variable, "salt");
                assert_eq!(source_id, "memory://extract");
            }
            other => panic!("Expected VariableNotFound, got {:?}", other),
        }
    }
}
