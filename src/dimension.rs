//! Resolution of the non-spatial axes of a request.
//!
//! Given a variable and the requested time, elevation and reference time,
//! work out which index to read along each of those axes. Every axis is
//! checked before anything is reported, so a request with several bad
//! values gets one error naming all of them.
//!
//! A file's reference time comes from, in order: a runtime variable, the
//! time-origin attribute of a tau variable, or a global time-origin
//! attribute.

use chrono::{DateTime, Utc};
use std::fmt;
use tracing::{debug, info, warn};

use crate::axis::{is_surface_capable, time_units_of, AxisNames, AxisRole, SURFACE_ALIAS};
use crate::error::{AxisMismatch, NcGridError, Result};
use crate::index::{find_exact, find_exact_in_rows, max_in_row};
use crate::metadata::Variable;
use crate::source::FileInspector;
use crate::time::{format_instant, parse_instant, parse_time_origin, TimeUnits};

/// Requested elevation level.
#[derive(Debug, Clone, PartialEq)]
pub enum ElevationTarget {
    Value(f64),
    Named(String),
}

impl ElevationTarget {
    /// Numbers become [`ElevationTarget::Value`], anything else a name.
    pub fn parse(text: &str) -> Self {
        match text.trim().parse::<f64>() {
            Ok(value) => ElevationTarget::Value(value),
            Err(_) => ElevationTarget::Named(text.trim().to_string()),
        }
    }
}

impl fmt::Display for ElevationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElevationTarget::Value(v) => write!(f, "{}", v),
            ElevationTarget::Named(name) => write!(f, "{}", name),
        }
    }
}

/// The requested position along the non-spatial axes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DimensionRequest {
    pub time: Option<DateTime<Utc>>,
    pub elevation: Option<ElevationTarget>,
    pub reference_time: Option<DateTime<Utc>>,
}

/// Outcome of resolving one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisSelection {
    /// The axis does not apply to this variable or request
    NotApplicable,
    Index(usize),
    NotFound,
}

impl AxisSelection {
    fn from_option(index: Option<usize>) -> Self {
        index.map_or(AxisSelection::NotFound, AxisSelection::Index)
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            AxisSelection::Index(i) => Some(*i),
            _ => None,
        }
    }
}

/// Resolved indices for elevation, time and reference time.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionSelection {
    pub elevation: AxisSelection,
    pub time: AxisSelection,
    pub reference_time: AxisSelection,
    /// The time actually searched for: the requested one or the default
    pub effective_time: Option<DateTime<Utc>>,
}

impl DimensionSelection {
    /// Every axis that was applicable but could not be matched.
    pub fn failures(&self, request: &DimensionRequest) -> Vec<AxisMismatch> {
        let mut failures = Vec::new();
        if self.elevation == AxisSelection::NotFound {
            let value = request
                .elevation
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "default".to_string());
            failures.push(AxisMismatch::new(AxisRole::Elevation.label(), value));
        }
        if self.reference_time == AxisSelection::NotFound {
            let value = request
                .reference_time
                .as_ref()
                .map(format_instant)
                .unwrap_or_else(|| "latest".to_string());
            failures.push(AxisMismatch::new(AxisRole::RunTime.label(), value));
        }
        if self.time == AxisSelection::NotFound {
            let value = self
                .effective_time
                .as_ref()
                .map(format_instant)
                .unwrap_or_else(|| "latest".to_string());
            failures.push(AxisMismatch::new(AxisRole::Time.label(), value));
        }
        failures
    }

    /// Fail with one aggregated error if any axis did not match.
    pub fn review(&self, variable: &str, request: &DimensionRequest) -> Result<()> {
        let failures = self.failures(request);
        if failures.is_empty() {
            Ok(())
        } else {
            Err(NcGridError::ValueNotMatched {
                variable: variable.to_string(),
                failures,
            })
        }
    }
}

/// Resolve all non-spatial axes for `variable` and review the result.
pub fn resolve(
    source: &dyn FileInspector,
    variable: &Variable,
    request: &DimensionRequest,
    names: &AxisNames,
) -> Result<DimensionSelection> {
    let elevation = resolve_elevation(source, variable, request.elevation.as_ref(), names)?;
    let (reference_time, time, effective_time) = resolve_times(source, variable, request, names)?;

    let selection = DimensionSelection {
        elevation,
        time,
        reference_time,
        effective_time,
    };
    debug!(
        variable = %variable.name,
        elevation = ?selection.elevation,
        time = ?selection.time,
        reference_time = ?selection.reference_time,
        "Resolved dimensions"
    );

    selection.review(&variable.name, request)?;
    Ok(selection)
}

/// Elevation index for `variable`.
pub fn resolve_elevation(
    source: &dyn FileInspector,
    variable: &Variable,
    target: Option<&ElevationTarget>,
    names: &AxisNames,
) -> Result<AxisSelection> {
    let Some(axis) = names.find_variable(source, AxisRole::Elevation) else {
        info!(source = source.identifier(), "No recognised elevation variable");
        return Ok(AxisSelection::NotApplicable);
    };
    if !variable.has_dimension(&axis.name) {
        return Ok(AxisSelection::NotApplicable);
    }

    let levels = source.read_axis(&axis.name)?;
    let selection = match (levels.len(), target) {
        (0, _) => {
            warn!(axis = %axis.name, "Elevation axis is empty");
            AxisSelection::NotApplicable
        }
        (1, None) => AxisSelection::Index(0),
        (1, Some(ElevationTarget::Value(v))) => {
            AxisSelection::from_option((levels[0] == *v).then_some(0))
        }
        (1, Some(ElevationTarget::Named(name))) => {
            let aliases = special_elevations(&axis.name, &levels);
            AxisSelection::from_option(
                aliases
                    .iter()
                    .any(|alias| is_alias_match(alias, name))
                    .then_some(0),
            )
        }
        (_, Some(ElevationTarget::Value(v))) => AxisSelection::from_option(find_exact(&levels, *v)),
        (_, other) => {
            warn!(
                axis = %axis.name,
                target = ?other,
                "Elevation axis has several levels but no numeric target, using the first level"
            );
            AxisSelection::Index(0)
        }
    };
    Ok(selection)
}

fn is_alias_match(alias: &str, requested: &str) -> bool {
    alias.eq_ignore_ascii_case(requested)
        || (alias == SURFACE_ALIAS && requested.eq_ignore_ascii_case("surface"))
}

/// Named levels standing in for the numeric ones: a single zero depth or
/// height is the surface.
pub fn special_elevations(axis_name: &str, levels: &[f64]) -> Vec<String> {
    if is_surface_capable(axis_name) && levels.len() == 1 && levels[0] == 0.0 {
        vec![SURFACE_ALIAS.to_string()]
    } else {
        Vec::new()
    }
}

/// The time axis of a file, with its parsed units and shape.
struct TimeAxis {
    values: Vec<f64>,
    units: TimeUnits,
    /// Columns per row when the axis is runtime x time
    columns: Option<usize>,
}

impl TimeAxis {
    fn load(source: &dyn FileInspector, names: &AxisNames) -> Result<Option<Self>> {
        let Some(variable) = names.find_variable(source, AxisRole::Time) else {
            info!(source = source.identifier(), "Time variable not found");
            return Ok(None);
        };
        let Some(units) = time_units_of(&variable) else {
            info!(variable = %variable.name, "Time variable has no units attribute");
            return Ok(None);
        };
        let columns = (variable.shape.len() == 2).then(|| variable.shape[1]);
        Ok(Some(Self {
            values: source.read_axis(&variable.name)?,
            units: TimeUnits::parse(&units),
            columns,
        }))
    }

    /// Latest instant on the axis, optionally limited to one runtime row.
    fn latest(&self, row: Option<usize>) -> Option<DateTime<Utc>> {
        let value = match (self.columns, row) {
            (Some(columns), Some(row)) => max_in_row(&self.values, columns, row),
            _ => self
                .values
                .iter()
                .copied()
                .filter(|v| !v.is_nan())
                .fold(None, |best: Option<f64>, v| Some(best.map_or(v, |b| b.max(v)))),
        };
        value.map(|v| self.units.instant_at(v))
    }

    /// Search for `instant`. Returns (runtime row, time index).
    fn find(&self, instant: &DateTime<Utc>, row: Option<usize>) -> (Option<usize>, Option<usize>) {
        let offset = self.units.offset_of(instant);
        match self.columns {
            Some(columns) => match find_exact_in_rows(&self.values, columns, offset, row) {
                Some((r, c)) => (Some(r), Some(c)),
                None => (row, None),
            },
            None => (row, find_exact(&self.values, offset)),
        }
    }
}

/// Index of `reference_time` along the runtime variable, if it has one.
pub fn find_runtime_index(
    source: &dyn FileInspector,
    runtime: &Variable,
    reference_time: &DateTime<Utc>,
) -> Result<Option<usize>> {
    let runs = runtime_instants(source, runtime)?;
    let index = runs
        .iter()
        .position(|run| run.as_ref() == Some(reference_time));
    if index.is_none() {
        info!(
            variable = %runtime.name,
            reference_time = %format_instant(reference_time),
            "No matching reference time in file"
        );
    }
    Ok(index)
}

/// Every run of a runtime variable as an instant; unreadable entries are `None`.
pub fn runtime_instants(
    source: &dyn FileInspector,
    runtime: &Variable,
) -> Result<Vec<Option<DateTime<Utc>>>> {
    if is_text(runtime) {
        return Ok(source
            .read_strings(&runtime.name)?
            .iter()
            .map(|text| parse_instant(text).ok())
            .collect());
    }

    let Some(units) = time_units_of(runtime) else {
        warn!(variable = %runtime.name, "Numeric runtime variable has no units");
        return Ok(Vec::new());
    };
    let units = TimeUnits::parse(&units);
    Ok(source
        .read_axis(&runtime.name)?
        .into_iter()
        .map(|v| Some(units.instant_at(v)))
        .collect())
}

fn is_text(variable: &Variable) -> bool {
    let dtype = variable.dtype.to_ascii_lowercase();
    dtype.contains("string") || dtype.contains("char")
}

/// Reference time of a file without a runtime variable: the tau variable's
/// time-origin attribute, else the global one.
pub fn file_reference_time(source: &dyn FileInspector, names: &AxisNames) -> Option<DateTime<Utc>> {
    let from_tau = names
        .find_variable(source, AxisRole::Tau)
        .and_then(|tau| {
            tau.attribute(names.tau_time_origin_attribute())
                .and_then(|value| value.as_text().map(str::to_string))
        })
        .and_then(|text| parse_time_origin(&text));
    if from_tau.is_some() {
        return from_tau;
    }

    source
        .global_attribute(names.global_time_origin_attribute())
        .and_then(|value| value.as_text().map(str::to_string))
        .and_then(|text| parse_time_origin(&text))
}

type TimeResolution = (AxisSelection, AxisSelection, Option<DateTime<Utc>>);

fn resolve_times(
    source: &dyn FileInspector,
    variable: &Variable,
    request: &DimensionRequest,
    names: &AxisNames,
) -> Result<TimeResolution> {
    let runtime = names.find_variable(source, AxisRole::RunTime);
    let carries_time = names.dimension_in(variable, AxisRole::Time).is_some();
    let carries_runtime = names.dimension_in(variable, AxisRole::RunTime).is_some();

    let Some(axis) = TimeAxis::load(source, names)? else {
        if carries_time {
            return Err(NcGridError::AxisNotFound {
                axis: AxisRole::Time.label().to_string(),
                message: format!(
                    "{} has a time dimension but {} has no usable time variable",
                    variable.name,
                    source.identifier()
                ),
            });
        }
        let time = match request.time {
            Some(_) => AxisSelection::NotFound,
            None => AxisSelection::NotApplicable,
        };
        let reference = match &request.reference_time {
            Some(requested) => reference_only(source, runtime.as_ref(), requested, names)?,
            None => AxisSelection::NotApplicable,
        };
        return Ok((reference, time, request.time));
    };

    if request.time.is_none() && !carries_time {
        let reference = match &request.reference_time {
            Some(requested) => reference_only(source, runtime.as_ref(), requested, names)?,
            None => AxisSelection::NotApplicable,
        };
        return Ok((reference, AxisSelection::NotApplicable, None));
    }

    match (&request.reference_time, runtime) {
        // No reference time requested: search every run.
        (None, runtime) => {
            let Some(time) = request.time.or_else(|| axis.latest(None)) else {
                return Ok((AxisSelection::NotApplicable, AxisSelection::NotFound, None));
            };
            let (row, column) = axis.find(&time, None);
            let reference = match (runtime, row) {
                (Some(_), Some(row)) if axis.columns.is_some() => AxisSelection::Index(row),
                _ => AxisSelection::NotApplicable,
            };
            if column.is_none() {
                info!(time = %format_instant(&time), "Time match not found");
            }
            Ok((reference, AxisSelection::from_option(column), Some(time)))
        }

        // Reference time requested and the file has runs: search that run only.
        (Some(requested), Some(runtime)) => {
            let Some(row) = find_runtime_index(source, &runtime, requested)? else {
                return Ok((AxisSelection::NotFound, AxisSelection::NotApplicable, request.time));
            };
            let default_row = carries_runtime.then_some(row);
            let Some(time) = request.time.or_else(|| axis.latest(default_row)) else {
                return Ok((AxisSelection::Index(row), AxisSelection::NotFound, None));
            };
            let (_, column) = match axis.columns {
                Some(_) => axis.find(&time, Some(row)),
                None => axis.find(&time, None),
            };
            Ok((
                AxisSelection::Index(row),
                AxisSelection::from_option(column),
                Some(time),
            ))
        }

        // Reference time requested, single-run file: the run must match first.
        (Some(requested), None) => {
            match file_reference_time(source, names) {
                Some(in_file) if in_file == *requested => {}
                other => {
                    info!(
                        requested = %format_instant(requested),
                        in_file = ?other.as_ref().map(format_instant),
                        "Reference time does not match file"
                    );
                    return Ok((AxisSelection::NotFound, AxisSelection::NotApplicable, request.time));
                }
            }
            let Some(time) = request.time.or_else(|| axis.latest(None)) else {
                return Ok((AxisSelection::NotApplicable, AxisSelection::NotFound, None));
            };
            let (_, column) = axis.find(&time, None);
            Ok((
                AxisSelection::NotApplicable,
                AxisSelection::from_option(column),
                Some(time),
            ))
        }
    }
}

/// Reference-time check when there is no usable time axis to search.
fn reference_only(
    source: &dyn FileInspector,
    runtime: Option<&Variable>,
    requested: &DateTime<Utc>,
    names: &AxisNames,
) -> Result<AxisSelection> {
    match runtime {
        Some(runtime) => Ok(AxisSelection::from_option(find_runtime_index(
            source, runtime, requested,
        )?)),
        None => Ok(match file_reference_time(source, names) {
            Some(in_file) if in_file == *requested => AxisSelection::NotApplicable,
            _ => AxisSelection::NotFound,
        }),
    }
}
