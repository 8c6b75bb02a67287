//! Application state shared by all handlers.
//!
//! The state holds configuration and a [`Dataset`], never an open file: each
//! request opens its own handle and releases it before returning.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::extract::ExtractOptions;
#[cfg(feature = "netcdf")]
use crate::logging::log_source_error;
use crate::source::{FileInspector, MemorySource};

#[cfg(feature = "netcdf")]
use crate::source::NetCdfSource;

/// Where extraction data comes from.
#[derive(Debug, Clone)]
pub enum Dataset {
    /// A NetCDF file opened once per request
    File(PathBuf),
    /// A source held in memory for the life of the server
    Memory(Arc<MemorySource>),
}

impl Dataset {
    pub fn identifier(&self) -> String {
        match self {
            Dataset::File(path) => path.display().to_string(),
            Dataset::Memory(source) => source.identifier().to_string(),
        }
    }

    /// Run `f` against an open source. A file is opened for the call and
    /// closed afterwards whether or not `f` succeeds.
    pub fn with_source<R>(&self, f: impl FnOnce(&dyn FileInspector) -> Result<R>) -> Result<R> {
        match self {
            #[cfg(feature = "netcdf")]
            Dataset::File(path) => {
                let source = NetCdfSource::open(path).map_err(|e| {
                    log_source_error(&path.display().to_string(), &e);
                    e
                })?;
                let result = f(&source);
                source.close();
                result
            }
            #[cfg(not(feature = "netcdf"))]
            Dataset::File(path) => Err(crate::error::NcGridError::Config {
                message: format!(
                    "Cannot open {}: built without the netcdf feature",
                    path.display()
                ),
            }),
            Dataset::Memory(source) => f(source.as_ref()),
        }
    }
}

/// The main application state shared across all handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Config,
    pub dataset: Dataset,
    /// Engine options derived from `config.data`
    pub options: ExtractOptions,
}

impl AppState {
    pub fn new(config: Config, dataset: Dataset) -> Result<Self> {
        let options = config.data.extract_options()?;
        Ok(Self {
            config,
            dataset,
            options,
        })
    }

    /// Open the dataset once and check it holds at least one variable.
    pub fn validate(&self) -> Result<usize> {
        self.dataset.with_source(|source| {
            let count = source.variable_names().len();
            if count == 0 {
                return Err(crate::error::NcGridError::Config {
                    message: format!("{} contains no variables", source.identifier()),
                });
            }
            Ok(count)
        })
    }
}
