//! Summary of what a source file covers: bounds, grid size, times,
//! elevations and reference times.

use serde::Serialize;
use tracing::{debug, warn};

use crate::axis::{time_units_of, AxisNames, AxisRole};
use crate::dimension::{file_reference_time, runtime_instants, special_elevations};
use crate::error::{NcGridError, Result};
use crate::extract::is_0_360;
use crate::grid::Envelope;
use crate::source::FileInspector;
use crate::time::{format_instant, TimeUnits};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageSummary {
    pub source: String,
    /// Padded by half a cell and expressed in -180..180; absent for an
    /// unsupported longitude layout
    pub bounds: Option<Envelope>,
    pub lon_count: usize,
    pub lat_count: usize,
    pub is_0_360: bool,
    /// Smaller of the longitude and latitude cell sizes
    pub resolution: Option<f64>,
    pub variables: Vec<String>,
    pub times: Vec<String>,
    pub min_time: Option<String>,
    pub max_time: Option<String>,
    pub elevations: Vec<String>,
    pub reference_times: Vec<String>,
}

/// Convert a longitude range to -180..180.
///
/// A range that starts below 0 and ends above 180 mixes both conventions
/// and is rejected. A range crossing 180 covers the whole world.
pub fn convert_bounds_to_neg180_180(min: f64, max: f64) -> Option<(f64, f64)> {
    if max > 180.0 {
        if min < 0.0 {
            return None;
        }
        if min < 180.0 {
            return Some((-180.0, 180.0));
        }
        return Some((min - 360.0, max - 360.0));
    }
    Some((min, max))
}

fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

fn cell_size(values: &[f64]) -> Option<f64> {
    let (min, max) = min_max(values)?;
    (values.len() > 1).then(|| (max - min) / (values.len() - 1) as f64)
}

/// Describe `source`.
pub fn describe(source: &dyn FileInspector, names: &AxisNames) -> Result<CoverageSummary> {
    let axis = |role: AxisRole| {
        names
            .find_variable(source, role)
            .ok_or_else(|| NcGridError::AxisNotFound {
                axis: role.label().to_string(),
                message: format!("no {} variable in {}", role.label(), source.identifier()),
            })
    };
    let lons = source.read_axis(&axis(AxisRole::Longitude)?.name)?;
    let lats = source.read_axis(&axis(AxisRole::Latitude)?.name)?;

    let bounds = match (min_max(&lons), min_max(&lats)) {
        (Some((lon_min, lon_max)), Some((lat_min, lat_max))) => {
            let converted = convert_bounds_to_neg180_180(lon_min, lon_max);
            if converted.is_none() {
                warn!(
                    source = source.identifier(),
                    lon_min, lon_max, "Longitudes mix 0..360 and -180..180"
                );
            }
            converted.map(|(west, east)| {
                let lon_pad = cell_size(&lons).unwrap_or(0.0) / 2.0;
                let lat_pad = cell_size(&lats).unwrap_or(0.0) / 2.0;
                Envelope::new(west - lon_pad, lat_min - lat_pad, east + lon_pad, lat_max + lat_pad)
                    .clamped()
            })
        }
        _ => None,
    };

    let resolution = match (cell_size(&lons), cell_size(&lats)) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };

    let times = list_times(source, names)?;
    let summary = CoverageSummary {
        source: source.identifier().to_string(),
        bounds,
        lon_count: lons.len(),
        lat_count: lats.len(),
        is_0_360: is_0_360(&lons),
        resolution,
        variables: source.variable_names(),
        min_time: times.first().cloned(),
        max_time: times.last().cloned(),
        times,
        elevations: list_elevations(source, names)?,
        reference_times: list_reference_times(source, names)?,
    };
    debug!(source = %summary.source, times = summary.times.len(), "Described coverage");
    Ok(summary)
}

/// Every distinct instant on the time axis, sorted.
pub fn list_times(source: &dyn FileInspector, names: &AxisNames) -> Result<Vec<String>> {
    let Some(variable) = names.find_variable(source, AxisRole::Time) else {
        return Ok(Vec::new());
    };
    let Some(units) = time_units_of(&variable) else {
        warn!(variable = %variable.name, "Time variable has no units, skipping time listing");
        return Ok(Vec::new());
    };
    let units = TimeUnits::parse(&units);
    let mut instants: Vec<_> = source
        .read_axis(&variable.name)?
        .into_iter()
        .filter(|v| !v.is_nan())
        .map(|v| units.instant_at(v))
        .collect();
    instants.sort();
    instants.dedup();
    Ok(instants.iter().map(format_instant).collect())
}

/// Elevation levels; a named surface alias replaces the numeric level.
pub fn list_elevations(source: &dyn FileInspector, names: &AxisNames) -> Result<Vec<String>> {
    let Some(variable) = names.find_variable(source, AxisRole::Elevation) else {
        return Ok(Vec::new());
    };
    let levels = source.read_axis(&variable.name)?;
    let special = special_elevations(&variable.name, &levels);
    if !special.is_empty() {
        return Ok(special);
    }
    Ok(levels.iter().map(|level| level.to_string()).collect())
}

/// Reference times from the runtime variable, else the tau or global
/// time-origin attribute.
pub fn list_reference_times(source: &dyn FileInspector, names: &AxisNames) -> Result<Vec<String>> {
    if let Some(runtime) = names.find_variable(source, AxisRole::RunTime) {
        return Ok(runtime_instants(source, &runtime)?
            .iter()
            .flatten()
            .map(format_instant)
            .collect());
    }
    Ok(file_reference_time(source, names)
        .iter()
        .map(format_instant)
        .collect())
}
