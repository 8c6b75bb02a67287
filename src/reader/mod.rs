//! Readers that pull samples from a source into an output grid.
//!
//! Both readers take the same inputs: a [`ReadPlan`] describing what to read
//! along every dimension of the variable, the variable's [`AxisAttributes`],
//! and the longitude/latitude index maps. They differ only in how they fetch
//! the samples, so for identical inputs they produce identical grids.

pub mod point;
pub mod windowed;

use std::collections::BTreeMap;
use std::fmt;

use crate::axis::{AxisRole, VariableAxes};
use crate::dimension::{AxisSelection, DimensionSelection};
use crate::error::{NcGridError, Result};
use crate::grid::OutputGrid;
use crate::metadata::Variable;
use crate::source::{AxisRange, FileInspector};
use crate::strategy::ReadStrategy;

pub use point::PointReader;
pub use windowed::WindowedReader;

/// Output-axis position to file-array index.
pub type IndexMap = BTreeMap<usize, usize>;

/// Tolerance used when comparing samples against sentinel values
pub const SENTINEL_TOLERANCE: f32 = 1e-7;

/// Scale, offset and no-data sentinels of a variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisAttributes {
    pub scale: f64,
    pub offset: f64,
    pub missing: f64,
    pub fill: f64,
}

impl Default for AxisAttributes {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: 0.0,
            missing: f64::NAN,
            fill: f64::NAN,
        }
    }
}

impl AxisAttributes {
    /// Read the attributes from the variable, defaulting any that are absent.
    pub fn from_variable(variable: &Variable) -> Self {
        let number = |name: &str| variable.attribute(name).and_then(|v| v.as_f64());
        let defaults = Self::default();
        Self {
            scale: number("scale_factor").unwrap_or(defaults.scale),
            offset: number("add_offset").unwrap_or(defaults.offset),
            missing: number("missing_value").unwrap_or(defaults.missing),
            fill: number("_FillValue").unwrap_or(defaults.fill),
        }
    }

    pub fn adjust(&self, raw: f32) -> f64 {
        raw as f64 * self.scale + self.offset
    }

    fn is_sentinel(&self, value: f64) -> bool {
        [self.missing, self.fill].iter().any(|sentinel| {
            !sentinel.is_nan() && (value as f32 - *sentinel as f32).abs() < SENTINEL_TOLERANCE
        })
    }

    /// The adjusted value, or `None` when the raw or adjusted sample is a
    /// missing/fill sentinel.
    pub fn accept(&self, raw: f32) -> Option<f32> {
        let adjusted = self.adjust(raw);
        if adjusted.is_nan() || self.is_sentinel(raw as f64) || self.is_sentinel(adjusted) {
            return None;
        }
        Some(adjusted as f32)
    }
}

/// What to read along one dimension of the variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisSlot {
    Longitude,
    Latitude,
    /// A resolved elevation, time or run-time index
    Fixed(usize),
    /// An axis with no resolved index; the whole axis of this length
    Unconstrained(usize),
}

/// Per-dimension read layout for one variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPlan {
    variable: String,
    slots: Vec<AxisSlot>,
}

impl ReadPlan {
    /// Lay out the read for `variable`. Every dimension must be one of the
    /// recognised axes, and both longitude and latitude must be present.
    pub fn build(
        variable: &Variable,
        axes: &VariableAxes,
        selection: &DimensionSelection,
    ) -> Result<Self> {
        for (role, position) in [
            (AxisRole::Longitude, axes.longitude),
            (AxisRole::Latitude, axes.latitude),
        ] {
            if position.is_none() {
                return Err(NcGridError::AxisNotFound {
                    axis: role.label().to_string(),
                    message: format!("{} has no {} dimension", variable.name, role.label()),
                });
            }
        }

        let slot_for = |selection: AxisSelection, len: usize| match selection.index() {
            Some(index) => AxisSlot::Fixed(index),
            None => AxisSlot::Unconstrained(len),
        };

        let slots = variable
            .dimensions
            .iter()
            .zip(&variable.shape)
            .enumerate()
            .map(|(position, (name, len))| match axes.role_at(position) {
                Some(AxisRole::Longitude) => Ok(AxisSlot::Longitude),
                Some(AxisRole::Latitude) => Ok(AxisSlot::Latitude),
                Some(AxisRole::Elevation) => Ok(slot_for(selection.elevation, *len)),
                Some(AxisRole::Time) => Ok(slot_for(selection.time, *len)),
                Some(AxisRole::RunTime) => Ok(slot_for(selection.reference_time, *len)),
                Some(AxisRole::Tau) | None => Err(NcGridError::UnsupportedAxisLayout {
                    variable: variable.name.clone(),
                    axis: name.clone(),
                }),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            variable: variable.name.clone(),
            slots,
        })
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn slots(&self) -> &[AxisSlot] {
        &self.slots
    }

    /// One range per dimension, with the given longitude and latitude ranges.
    pub fn ranges(&self, lon: AxisRange, lat: AxisRange) -> Vec<AxisRange> {
        self.slots
            .iter()
            .map(|slot| match slot {
                AxisSlot::Longitude => lon,
                AxisSlot::Latitude => lat,
                AxisSlot::Fixed(index) => AxisRange::new(*index, 1),
                AxisSlot::Unconstrained(len) => AxisRange::new(0, *len),
            })
            .collect()
    }

    /// Full file index of one sample. Unconstrained axes use their first entry.
    pub fn point_index(&self, lon: usize, lat: usize) -> Vec<usize> {
        self.slots
            .iter()
            .map(|slot| match slot {
                AxisSlot::Longitude => lon,
                AxisSlot::Latitude => lat,
                AxisSlot::Fixed(index) => *index,
                AxisSlot::Unconstrained(_) => 0,
            })
            .collect()
    }
}

/// Read parameter string, e.g. `temp(0,3,10:20,5:9)`.
pub struct RangeDisplay<'a>(pub &'a str, pub &'a [AxisRange]);

impl fmt::Display for RangeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.0)?;
        for (i, range) in self.1.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            if range.count == 1 {
                write!(f, "{}", range.start)?;
            } else {
                write!(f, "{}:{}", range.start, range.end().saturating_sub(1))?;
            }
        }
        write!(f, ")")
    }
}

/// Lowest and highest file index in a map.
pub(crate) fn index_bounds(map: &IndexMap) -> Option<(usize, usize)> {
    let min = map.values().min()?;
    let max = map.values().max()?;
    Some((*min, *max))
}

/// A strategy for filling an output grid from a source.
pub trait GridReader {
    fn strategy(&self) -> ReadStrategy;

    /// Fill `grid` and return the number of cells written.
    fn fill(
        &self,
        source: &dyn FileInspector,
        plan: &ReadPlan,
        attributes: &AxisAttributes,
        lon_map: &IndexMap,
        lat_map: &IndexMap,
        grid: &mut OutputGrid,
    ) -> Result<usize>;
}

/// The reader implementing `strategy`.
pub fn reader_for(strategy: ReadStrategy) -> Box<dyn GridReader> {
    match strategy {
        ReadStrategy::Windowed => Box::new(WindowedReader),
        ReadStrategy::PointWise => Box::new(PointReader),
    }
}
