//! # ncgrid
//!
//! Extraction of regular rasters from gridded NetCDF data.
//!
//! A request names a parameter, a bounding box, an output size and
//! optionally a time, an elevation and a reference (model run) time. The
//! engine maps every output cell centre to the nearest file coordinate,
//! resolves the non-spatial axes, and reads the needed samples either as one
//! window or point by point, whichever touches less of the file.
//!
//! ## Layout
//!
//! - **Sources**: [`source::FileInspector`] over NetCDF files or in-memory arrays
//! - **Engine**: [`index`], [`dimension`], [`grid`], [`strategy`], [`reader`], [`extract`]
//! - **Surface**: an axum HTTP API in [`handlers`] and the `describe` tool

pub mod axis;
pub mod compose;
pub mod config;
pub mod coverage;
pub mod dimension;
pub mod error;
pub mod extract;
pub mod grid;
pub mod handlers;
pub mod index;
pub mod logging;
pub mod metadata;
pub mod reader;
pub mod source;
pub mod state;
pub mod strategy;
pub mod time;

pub use axis::AxisNames;
pub use config::Config;
pub use coverage::{describe, CoverageSummary};
pub use dimension::{AxisSelection, DimensionRequest, DimensionSelection, ElevationTarget};
pub use error::{AxisMismatch, NcGridError, Result};
pub use extract::{extract, ExtractOptions, ExtractRequest, Extraction, MAX_GRID_CELLS};
pub use grid::Envelope;
pub use logging::{
    create_http_trace_layer, generate_request_id, in_timed_span, init_tracing,
    log_dataset_validation, log_extraction_stats, log_request_error, log_source_error,
};
pub use metadata::{AttributeValue, Dimension, Metadata, Variable};
pub use source::{FileInspector, MemorySource};
#[cfg(feature = "netcdf")]
pub use source::NetCdfSource;
pub use state::{AppState, Dataset};
pub use strategy::{ReadStrategy, StrategyPreference};
