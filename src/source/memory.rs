//! In-memory data source.
//!
//! Holds every variable as an ndarray. Used for the server's in-memory mode,
//! for tests and for benchmarks.

use ndarray::{Array1, ArrayD, ArrayViewD, IxDyn, Slice};
use std::collections::HashMap;

use super::{AxisRange, FileInspector};
use crate::error::{NcGridError, Result};
use crate::metadata::{find_attribute, AttributeValue, Dimension, Metadata, Variable};

/// A source whose variables live in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    identifier: String,
    metadata: Metadata,
    data: HashMap<String, ArrayD<f32>>,
    coordinates: HashMap<String, ArrayD<f64>>,
    strings: HashMap<String, Vec<String>>,
}

impl MemorySource {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Default::default()
        }
    }

    fn register(&mut self, variable: &Variable) {
        for (name, size) in variable.dimensions.iter().zip(&variable.shape) {
            self.metadata
                .dimensions
                .entry(name.clone())
                .or_insert_with(|| Dimension {
                    name: name.clone(),
                    size: *size,
                    is_unlimited: false,
                });
        }
        self.metadata
            .variables
            .insert(variable.name.clone(), variable.clone());
    }

    /// Add a one-dimensional coordinate variable named after its dimension.
    pub fn with_coordinate(mut self, name: &str, values: Vec<f64>) -> Self {
        let variable = Variable::new(name, &[name], &[values.len()]);
        self.register(&variable);
        self.coordinates
            .insert(name.to_string(), Array1::from(values).into_dyn());
        self
    }

    /// Add a numeric axis-like variable of any shape (e.g. a runtime x time
    /// table) stored in double precision.
    pub fn with_coordinate_variable(mut self, variable: Variable, values: Vec<f64>) -> Result<Self> {
        let array = ArrayD::from_shape_vec(IxDyn(&variable.shape), values)?;
        self.register(&variable);
        self.coordinates.insert(variable.name.clone(), array);
        Ok(self)
    }

    /// Add a gridded data variable.
    pub fn with_variable(mut self, variable: Variable, values: Vec<f32>) -> Result<Self> {
        let array = ArrayD::from_shape_vec(IxDyn(&variable.shape), values)?;
        self.register(&variable);
        self.data.insert(variable.name.clone(), array);
        Ok(self)
    }

    /// Add a text variable with one string per record.
    pub fn with_strings(mut self, mut variable: Variable, values: Vec<String>) -> Result<Self> {
        if variable.shape.first().copied().unwrap_or(0) != values.len() {
            return Err(NcGridError::InvalidParameter {
                param: variable.name.clone(),
                message: format!(
                    "expected {} strings, got {}",
                    variable.shape.first().copied().unwrap_or(0),
                    values.len()
                ),
            });
        }
        variable.dtype = "string".to_string();
        self.register(&variable);
        self.strings.insert(variable.name.clone(), values);
        Ok(self)
    }

    pub fn with_global_attribute(mut self, name: &str, value: AttributeValue) -> Self {
        self.metadata
            .global_attributes
            .insert(name.to_string(), value);
        self
    }

    fn missing(&self, name: &str) -> NcGridError {
        NcGridError::VariableNotFound {
            variable: name.to_string(),
            source_id: self.identifier.clone(),
        }
    }
}

fn slice_window(name: &str, array: ArrayViewD<'_, f32>, ranges: &[AxisRange]) -> Result<ArrayD<f32>> {
    if ranges.len() != array.ndim() {
        return Err(NcGridError::InvalidParameter {
            param: name.to_string(),
            message: format!(
                "{} ranges given for a {}-dimensional variable",
                ranges.len(),
                array.ndim()
            ),
        });
    }
    for (axis, (range, len)) in ranges.iter().zip(array.shape()).enumerate() {
        if range.end() > *len {
            return Err(NcGridError::InvalidParameter {
                param: name.to_string(),
                message: format!(
                    "range {}..{} exceeds dimension {} of length {}",
                    range.start,
                    range.end(),
                    axis,
                    len
                ),
            });
        }
    }

    let window = array.slice_each_axis(|description| {
        let range = ranges[description.axis.index()];
        Slice::from(range.start..range.end())
    });
    Ok(window.to_owned())
}

impl FileInspector for MemorySource {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn variable_names(&self) -> Vec<String> {
        self.metadata.variable_names()
    }

    fn find_variable(&self, name: &str) -> Option<Variable> {
        self.metadata.variables.get(name).cloned()
    }

    fn global_attribute(&self, name: &str) -> Option<AttributeValue> {
        find_attribute(&self.metadata.global_attributes, name).cloned()
    }

    fn read_axis(&self, name: &str) -> Result<Vec<f64>> {
        if let Some(array) = self.coordinates.get(name) {
            return Ok(array.iter().copied().collect());
        }
        self.data
            .get(name)
            .map(|array| array.iter().map(|v| *v as f64).collect())
            .ok_or_else(|| self.missing(name))
    }

    fn read_strings(&self, name: &str) -> Result<Vec<String>> {
        self.strings
            .get(name)
            .cloned()
            .ok_or_else(|| self.missing(name))
    }

    fn read_window(&self, name: &str, ranges: &[AxisRange]) -> Result<ArrayD<f32>> {
        if let Some(array) = self.data.get(name) {
            return slice_window(name, array.view(), ranges);
        }
        let converted = self
            .coordinates
            .get(name)
            .map(|array| array.mapv(|v| v as f32))
            .ok_or_else(|| self.missing(name))?;
        slice_window(name, converted.view(), ranges)
    }

    fn read_point(&self, name: &str, index: &[usize]) -> Result<f32> {
        let value = match self.data.get(name) {
            Some(array) => array.get(index).copied(),
            None => self
                .coordinates
                .get(name)
                .ok_or_else(|| self.missing(name))?
                .get(index)
                .map(|v| *v as f32),
        };
        value.ok_or_else(|| NcGridError::InvalidParameter {
            param: name.to_string(),
            message: format!("index {:?} is out of bounds", index),
        })
    }
}
