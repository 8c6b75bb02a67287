//! Data sources the extraction engine reads from.
//!
//! The engine only ever talks to a [`FileInspector`]: variable lookup,
//! coordinate arrays, attributes, hyperslab reads and single-point reads.
//! [`MemorySource`] keeps everything in ndarray arrays; [`NetCdfSource`]
//! reads from a NetCDF file on disk.

pub mod memory;
#[cfg(feature = "netcdf")]
pub mod netcdf;

use ndarray::ArrayD;

use crate::error::Result;
use crate::metadata::{AttributeValue, Metadata, Variable};

pub use memory::MemorySource;
#[cfg(feature = "netcdf")]
pub use self::netcdf::NetCdfSource;

/// A contiguous index range along one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRange {
    pub start: usize,
    pub count: usize,
}

impl AxisRange {
    pub fn new(start: usize, count: usize) -> Self {
        Self { start, count }
    }

    /// Inclusive `first..=last`.
    pub fn inclusive(first: usize, last: usize) -> Self {
        Self::new(first, last + 1 - first)
    }

    pub fn end(&self) -> usize {
        self.start + self.count
    }
}

/// Read-only access to one open source file.
pub trait FileInspector {
    /// Identifier used in logs and errors (usually the file path).
    fn identifier(&self) -> &str;

    /// Header of the whole file: dimensions, variables and attributes.
    fn metadata(&self) -> &Metadata;

    /// Names of all variables, sorted.
    fn variable_names(&self) -> Vec<String>;

    fn find_variable(&self, name: &str) -> Option<Variable>;

    /// File-level attribute, looked up case-insensitively.
    fn global_attribute(&self, name: &str) -> Option<AttributeValue>;

    /// All values of a numeric variable, flattened in row-major order.
    fn read_axis(&self, name: &str) -> Result<Vec<f64>>;

    /// All values of a text variable, one string per record.
    fn read_strings(&self, name: &str) -> Result<Vec<String>>;

    /// Hyperslab with one range per dimension of the variable.
    fn read_window(&self, name: &str, ranges: &[AxisRange]) -> Result<ArrayD<f32>>;

    /// One raw value at a full index.
    fn read_point(&self, name: &str, index: &[usize]) -> Result<f32>;
}
