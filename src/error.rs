//! Error types for ncgrid.
//!
//! Every failure an extraction can produce is a variant of [`NcGridError`].
//! Recoverable conditions (missing scale/offset attributes, a single output
//! cell with no nearest neighbour) never surface here.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// One requested axis value that could not be matched against the file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisMismatch {
    /// Axis label as reported to the caller ("elevation", "time", "reference time")
    pub axis: String,
    /// The value the caller asked for
    pub value: String,
}

impl AxisMismatch {
    pub fn new(axis: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            axis: axis.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for AxisMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Requested {} ({}) not available.", self.axis, self.value)
    }
}

fn join_mismatches(failures: &[AxisMismatch]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// The main error type for ncgrid operations.
#[derive(Error, Debug)]
pub enum NcGridError {
    /// The requested parameter is absent from the source
    #[error("Variable not found: {variable} in {source_id}")]
    VariableNotFound { variable: String, source_id: String },

    /// A coordinate, time, elevation or run-time axis is required but missing
    #[error("Axis not found: {axis} - {message}")]
    AxisNotFound { axis: String, message: String },

    /// One or more requested axis values have no matching index
    #[error("{variable}: {}", join_mismatches(.failures))]
    ValueNotMatched {
        variable: String,
        failures: Vec<AxisMismatch>,
    },

    /// The variable carries a dimension no read slot exists for
    #[error("Unsupported axis layout: variable {variable} has unexpected dimension {axis}")]
    UnsupportedAxisLayout { variable: String, axis: String },

    /// NetCDF file operation errors
    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Array shape errors
    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The requested output grid is larger than the configured limit
    #[error("Payload too large: {message} ({requested} cells requested, {max_allowed} allowed)")]
    PayloadTooLarge {
        message: String,
        requested: usize,
        max_allowed: usize,
    },

    /// Invalid parameter errors
    #[error("Invalid parameter: {param} - {message}")]
    InvalidParameter { param: String, message: String },

    /// Data conversion errors (Arrow encoding, attribute types)
    #[error("Conversion error: {message}")]
    Conversion { message: String },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server errors
    #[error("Server error: {message}")]
    Server { message: String },
}

impl NcGridError {
    /// Stable snake-case name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            NcGridError::VariableNotFound { .. } => "variable_not_found",
            NcGridError::AxisNotFound { .. } => "axis_not_found",
            NcGridError::ValueNotMatched { .. } => "value_not_matched",
            NcGridError::UnsupportedAxisLayout { .. } => "unsupported_axis_layout",
            #[cfg(feature = "netcdf")]
            NcGridError::NetCdf(_) => "io_failure",
            NcGridError::Io(_) => "io_failure",
            NcGridError::Shape(_) => "shape",
            NcGridError::Config { .. } => "config",
            NcGridError::PayloadTooLarge { .. } => "payload_too_large",
            NcGridError::InvalidParameter { .. } => "invalid_parameter",
            NcGridError::Conversion { .. } => "conversion",
            NcGridError::Json(_) => "json",
            NcGridError::Server { .. } => "server",
        }
    }

    /// HTTP status code used when the error reaches the API surface.
    pub fn status_code(&self) -> u16 {
        match self {
            NcGridError::VariableNotFound { .. } | NcGridError::AxisNotFound { .. } => 404,
            NcGridError::ValueNotMatched { .. } | NcGridError::InvalidParameter { .. } => 400,
            NcGridError::UnsupportedAxisLayout { .. } => 422,
            NcGridError::PayloadTooLarge { .. } => 413,
            _ => 500,
        }
    }
}

/// Convenience type alias for Results with NcGridError
pub type Result<T> = std::result::Result<T, NcGridError>;
