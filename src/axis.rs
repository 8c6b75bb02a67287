//! Axis naming conventions.
//!
//! Files name their coordinate variables in many ways. Each axis role has a
//! list of conventional names; a request may also carry a preferred name for
//! any role, which is always tried first.

use serde::{Deserialize, Serialize};

use crate::metadata::Variable;
use crate::source::FileInspector;

pub const LONGITUDE_NAMES: &[&str] = &["lon", "longitude"];
pub const LATITUDE_NAMES: &[&str] = &["lat", "latitude"];
pub const ELEVATION_NAMES: &[&str] = &["depth", "height", "pressure", "sigma"];
pub const RUNTIME_NAMES: &[&str] = &["runtime"];
pub const TIME_NAMES: &[&str] = &["time"];
pub const TAU_NAMES: &[&str] = &["tau"];

/// Attributes that may hold a "<unit> since <origin>" string
pub const TIME_UNIT_ATTRIBUTES: &[&str] = &["units", "time_units"];

pub const DEFAULT_TIME_ORIGIN_ATTRIBUTE: &str = "time_origin";

/// Elevation axes whose single zero level denotes the surface
pub const SURFACE_AXIS_NAMES: &[&str] = &["depth", "height"];

/// Canonical name reported for the surface level
pub const SURFACE_ALIAS: &str = "SFC";

/// Role an axis plays for a gridded variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisRole {
    Longitude,
    Latitude,
    Elevation,
    Time,
    RunTime,
    Tau,
}

impl AxisRole {
    pub fn default_names(self) -> &'static [&'static str] {
        match self {
            AxisRole::Longitude => LONGITUDE_NAMES,
            AxisRole::Latitude => LATITUDE_NAMES,
            AxisRole::Elevation => ELEVATION_NAMES,
            AxisRole::Time => TIME_NAMES,
            AxisRole::RunTime => RUNTIME_NAMES,
            AxisRole::Tau => TAU_NAMES,
        }
    }

    /// Label used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            AxisRole::Longitude => "longitude",
            AxisRole::Latitude => "latitude",
            AxisRole::Elevation => "elevation",
            AxisRole::Time => "time",
            AxisRole::RunTime => "reference time",
            AxisRole::Tau => "tau",
        }
    }
}

/// Preferred file names for each axis role.
///
/// Passed explicitly with every extraction; nothing here is mutated while a
/// request is running.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisNames {
    #[serde(default)]
    pub longitude: Option<String>,
    #[serde(default)]
    pub latitude: Option<String>,
    #[serde(default)]
    pub elevation: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub runtime: Option<String>,
    #[serde(default)]
    pub tau: Option<String>,
    /// Attribute on the tau variable holding the run's reference time
    #[serde(default)]
    pub tau_time_origin_attribute: Option<String>,
    /// Global attribute holding the file's reference time
    #[serde(default)]
    pub global_time_origin_attribute: Option<String>,
}

impl AxisNames {
    fn preferred(&self, role: AxisRole) -> Option<&str> {
        let name = match role {
            AxisRole::Longitude => &self.longitude,
            AxisRole::Latitude => &self.latitude,
            AxisRole::Elevation => &self.elevation,
            AxisRole::Time => &self.time,
            AxisRole::RunTime => &self.runtime,
            AxisRole::Tau => &self.tau,
        };
        name.as_deref().filter(|n| !n.is_empty())
    }

    /// Names to try for `role`, preferred name first.
    pub fn candidates(&self, role: AxisRole) -> Vec<&str> {
        let mut names = Vec::with_capacity(role.default_names().len() + 1);
        if let Some(preferred) = self.preferred(role) {
            names.push(preferred);
        }
        for name in role.default_names() {
            if !names.contains(name) {
                names.push(name);
            }
        }
        names
    }

    /// The first variable in the file matching one of the candidate names.
    pub fn find_variable(&self, source: &dyn FileInspector, role: AxisRole) -> Option<Variable> {
        self.candidates(role)
            .into_iter()
            .find_map(|name| source.find_variable(name))
    }

    /// Position of the `role` axis among `variable`'s dimensions.
    pub fn dimension_in(&self, variable: &Variable, role: AxisRole) -> Option<usize> {
        self.candidates(role)
            .into_iter()
            .find_map(|name| variable.dimension_index(name))
    }

    /// Where each known axis sits within `variable`.
    pub fn locate(&self, variable: &Variable) -> VariableAxes {
        VariableAxes {
            longitude: self.dimension_in(variable, AxisRole::Longitude),
            latitude: self.dimension_in(variable, AxisRole::Latitude),
            elevation: self.dimension_in(variable, AxisRole::Elevation),
            time: self.dimension_in(variable, AxisRole::Time),
            runtime: self.dimension_in(variable, AxisRole::RunTime),
        }
    }

    pub fn tau_time_origin_attribute(&self) -> &str {
        self.tau_time_origin_attribute
            .as_deref()
            .unwrap_or(DEFAULT_TIME_ORIGIN_ATTRIBUTE)
    }

    pub fn global_time_origin_attribute(&self) -> &str {
        self.global_time_origin_attribute
            .as_deref()
            .unwrap_or(DEFAULT_TIME_ORIGIN_ATTRIBUTE)
    }
}

/// Dimension positions of the recognised axes within one variable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VariableAxes {
    pub longitude: Option<usize>,
    pub latitude: Option<usize>,
    pub elevation: Option<usize>,
    pub time: Option<usize>,
    pub runtime: Option<usize>,
}

impl VariableAxes {
    /// The role of the dimension at `position`, if it is a recognised axis.
    pub fn role_at(&self, position: usize) -> Option<AxisRole> {
        let slots = [
            (self.longitude, AxisRole::Longitude),
            (self.latitude, AxisRole::Latitude),
            (self.elevation, AxisRole::Elevation),
            (self.time, AxisRole::Time),
            (self.runtime, AxisRole::RunTime),
        ];
        slots
            .iter()
            .find(|(slot, _)| *slot == Some(position))
            .map(|(_, role)| *role)
    }
}

/// Units attribute of a time-like variable, under any of its accepted names.
pub fn time_units_of(variable: &Variable) -> Option<String> {
    TIME_UNIT_ATTRIBUTES
        .iter()
        .find_map(|name| variable.attribute(name))
        .and_then(|value| value.as_text())
        .map(str::to_string)
}

/// True for elevation axes whose single zero level is the surface.
pub fn is_surface_capable(axis_name: &str) -> bool {
    SURFACE_AXIS_NAMES
        .iter()
        .any(|name| name.eq_ignore_ascii_case(axis_name))
}
