//! Configuration management for ncgrid.
//!
//! Layered configuration with the following precedence:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables (`NCGRID_*`)
//! 3. JSON config file
//! 4. Default values (lowest priority)

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::axis::AxisNames;
use crate::error::{NcGridError, Result};
use crate::extract::{ExtractOptions, MAX_GRID_CELLS};
use crate::strategy::{StrategyPreference, FILE_WINDOW_THRESHOLD};

/// Command-line arguments for ncgrid
#[derive(Parser, Debug)]
#[command(name = "ncgrid")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the NetCDF file to serve
    pub netcdf_file: PathBuf,

    /// Host address to bind to
    #[arg(short = 'H', long, env = "NCGRID_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "NCGRID_PORT", default_value = "8000")]
    pub port: u16,

    /// Path to JSON configuration file
    #[arg(short, long, env = "NCGRID_CONFIG")]
    pub config: Option<PathBuf>,

    /// Read strategy (auto, windowed, pointwise)
    #[arg(short, long, env = "NCGRID_STRATEGY")]
    pub strategy: Option<String>,

    /// File window size above which point reads are used
    #[arg(long, env = "NCGRID_WINDOW_THRESHOLD")]
    pub window_threshold: Option<u64>,

    /// Largest output grid (width x height) a request may ask for
    #[arg(long, env = "NCGRID_MAX_GRID_CELLS")]
    pub max_grid_cells: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "NCGRID_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Extraction engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Preferred file names for each axis
    #[serde(default)]
    pub axis_names: AxisNames,

    /// File window size above which point reads are used
    #[serde(default = "default_window_threshold")]
    pub window_threshold: u64,

    /// Read strategy: auto, windowed or pointwise
    #[serde(default = "default_strategy")]
    pub strategy: String,

    /// Largest output grid, in cells, a single request may allocate
    #[serde(default = "default_max_grid_cells")]
    pub max_grid_cells: usize,

    /// Path to the NetCDF file
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

impl DataConfig {
    /// Engine options for one extraction.
    pub fn extract_options(&self) -> Result<ExtractOptions> {
        Ok(ExtractOptions {
            axis_names: self.axis_names.clone(),
            window_threshold: self.window_threshold,
            strategy: self.strategy.parse::<StrategyPreference>()?,
            max_grid_cells: self.max_grid_cells,
        })
    }
}

/// Complete configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub data: DataConfig,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with proper precedence
    pub fn load() -> Result<(Self, PathBuf)> {
        Self::from_args(Args::parse())
    }

    pub fn from_args(args: Args) -> Result<(Self, PathBuf)> {
        let mut config = Config::default();

        if let Some(config_path) = &args.config {
            let json_config = Self::load_from_file(config_path)?;
            config.merge(json_config);
        }

        config.server.host = args.host;
        config.server.port = args.port;
        if let Some(strategy) = args.strategy {
            config.data.strategy = strategy;
        }
        if let Some(threshold) = args.window_threshold {
            config.data.window_threshold = threshold;
        }
        if let Some(max_cells) = args.max_grid_cells {
            config.data.max_grid_cells = max_cells;
        }
        config.log_level = args.log_level;

        // NetCDF file path from command line takes precedence
        let netcdf_path = args.netcdf_file;
        config.data.file_path = Some(netcdf_path.clone());

        Ok((config, netcdf_path))
    }

    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        self.server = other.server;
        self.data = other.data;
        self.log_level = other.log_level;
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            return Err(NcGridError::Config {
                message: "Server host cannot be empty".to_string(),
            });
        }

        if self.server.port == 0 {
            return Err(NcGridError::Config {
                message: "Server port cannot be 0".to_string(),
            });
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(NcGridError::Config {
                    message: format!(
                        "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                        self.log_level
                    ),
                });
            }
        }

        if self.data.window_threshold == 0 {
            return Err(NcGridError::Config {
                message: "Window threshold must be greater than zero".to_string(),
            });
        }

        if self.data.max_grid_cells == 0 {
            return Err(NcGridError::Config {
                message: "Max grid cells must be greater than zero".to_string(),
            });
        }

        self.data
            .extract_options()
            .map_err(|e| NcGridError::Config {
                message: e.to_string(),
            })?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            data: DataConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            axis_names: AxisNames::default(),
            window_threshold: default_window_threshold(),
            strategy: default_strategy(),
            max_grid_cells: default_max_grid_cells(),
            file_path: None,
        }
    }
}

// Default value functions for serde
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_window_threshold() -> u64 {
    FILE_WINDOW_THRESHOLD
}

fn default_max_grid_cells() -> usize {
    MAX_GRID_CELLS
}

fn default_strategy() -> String {
    "auto".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}
