//! NetCDF file source.
//!
//! Opens a file once per request, converts its header into [`Metadata`] and
//! reads coordinate arrays, hyperslabs and single points on demand. Nothing
//! beyond the header is held in memory.

use ndarray::{ArrayD, IxDyn};
use netcdf::types::{BasicType, VariableType};
use netcdf::{Attribute, Extent};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

use super::{AxisRange, FileInspector};
use crate::error::{NcGridError, Result};
use crate::metadata::{find_attribute, AttributeValue, Dimension, Metadata, Variable};

/// An open NetCDF file.
pub struct NetCdfSource {
    identifier: String,
    file: netcdf::File,
    metadata: Metadata,
}

impl NetCdfSource {
    /// Open `path` and read its header.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(NcGridError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", path.display()),
            )));
        }

        let file = netcdf::open(path)?;
        let metadata = extract_metadata(&file)?;

        debug!(
            file = %path.display(),
            variables = metadata.variables.len(),
            dimensions = metadata.dimensions.len(),
            "Opened NetCDF file"
        );

        Ok(Self {
            identifier: path.display().to_string(),
            file,
            metadata,
        })
    }

    /// Release the file handle. A failure here is logged, never raised, so
    /// it cannot override the result of a read that already succeeded.
    pub fn close(self) {
        let identifier = self.identifier;
        match self.file.close() {
            Ok(()) => debug!(file = %identifier, "Closed NetCDF file"),
            Err(e) => warn!(file = %identifier, error = %e, "Failed to close NetCDF file"),
        }
    }

    fn variable(&self, name: &str) -> Result<netcdf::Variable<'_>> {
        self.file
            .variable(name)
            .ok_or_else(|| NcGridError::VariableNotFound {
                variable: name.to_string(),
                source_id: self.identifier.clone(),
            })
    }
}

/// Extract metadata from the NetCDF file
fn extract_metadata(file: &netcdf::File) -> Result<Metadata> {
    let mut global_attributes = HashMap::new();
    for attr in file.attributes() {
        let value = convert_attribute(&attr)?;
        global_attributes.insert(attr.name().to_string(), value);
    }

    let mut dimensions = HashMap::new();
    for dim in file.dimensions() {
        let dimension = Dimension {
            name: dim.name().to_string(),
            size: dim.len(),
            is_unlimited: dim.is_unlimited(),
        };
        dimensions.insert(dim.name().to_string(), dimension);
    }

    let mut variables = HashMap::new();
    for var in file.variables() {
        let var_dims: Vec<String> = var
            .dimensions()
            .iter()
            .map(|dim| dim.name().to_string())
            .collect();
        let var_shape: Vec<usize> = var.dimensions().iter().map(|dim| dim.len()).collect();

        let mut var_attrs = HashMap::new();
        for attr in var.attributes() {
            match convert_attribute(&attr) {
                Ok(value) => {
                    var_attrs.insert(attr.name().to_string(), value);
                }
                Err(e) => warn!(
                    variable = %var.name(),
                    attribute = %attr.name(),
                    error = %e,
                    "Skipping unreadable attribute"
                ),
            }
        }

        let dtype = match var.vartype() {
            VariableType::String => "string".to_string(),
            other => format!("{:?}", other),
        };

        variables.insert(
            var.name().to_string(),
            Variable {
                name: var.name().to_string(),
                dimensions: var_dims,
                shape: var_shape,
                attributes: var_attrs,
                dtype,
            },
        );
    }

    Ok(Metadata {
        global_attributes,
        dimensions,
        variables,
    })
}

/// Convert a NetCDF attribute to our AttributeValue enum
fn convert_attribute(attr: &Attribute) -> Result<AttributeValue> {
    use netcdf::AttributeValue as NcAttributeValue;

    let value = attr.value()?;

    let converted = match value {
        NcAttributeValue::Str(s) => AttributeValue::Text(s),
        NcAttributeValue::Strs(s) => AttributeValue::Text(s.join(" ")),

        NcAttributeValue::Uchar(v) => AttributeValue::Number(v as f64),
        NcAttributeValue::Schar(v) => AttributeValue::Number(v as f64),
        NcAttributeValue::Short(v) => AttributeValue::Number(v as f64),
        NcAttributeValue::Int(v) => AttributeValue::Number(v as f64),
        NcAttributeValue::Float(v) => AttributeValue::Number(v as f64),
        NcAttributeValue::Double(v) => AttributeValue::Number(v),

        NcAttributeValue::Shorts(v) => {
            AttributeValue::NumberArray(v.into_iter().map(|x| x as f64).collect())
        }
        NcAttributeValue::Ints(v) => {
            AttributeValue::NumberArray(v.into_iter().map(|x| x as f64).collect())
        }
        NcAttributeValue::Floats(v) => {
            AttributeValue::NumberArray(v.into_iter().map(|x| x as f64).collect())
        }
        NcAttributeValue::Doubles(v) => AttributeValue::NumberArray(v),

        other => AttributeValue::Text(format!("{:?}", other)),
    };
    Ok(converted)
}

fn is_numeric(var: &netcdf::Variable) -> bool {
    matches!(
        var.vartype(),
        VariableType::Basic(BasicType::Byte)
            | VariableType::Basic(BasicType::Ubyte)
            | VariableType::Basic(BasicType::Short)
            | VariableType::Basic(BasicType::Ushort)
            | VariableType::Basic(BasicType::Int)
            | VariableType::Basic(BasicType::Uint)
            | VariableType::Basic(BasicType::Int64)
            | VariableType::Basic(BasicType::Uint64)
            | VariableType::Basic(BasicType::Float)
            | VariableType::Basic(BasicType::Double)
    )
}

impl FileInspector for NetCdfSource {
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
        let var = self.variable(name)?;
        if !is_numeric(&var) {
            return Err(NcGridError::Conversion {
                message: format!("Variable {} is not numeric ({:?})", name, var.vartype()),
            });
        }
        Ok(var.get_values::<f64, _>(&[] as &[Extent])?)
    }

    fn read_strings(&self, name: &str) -> Result<Vec<String>> {
        let var = self.variable(name)?;
        match var.vartype() {
            VariableType::String => {
                let count = var.dimensions().first().map(|d| d.len()).unwrap_or(1);
                (0..count)
                    .map(|i| var.get_string(&[i][..]).map_err(NcGridError::from))
                    .collect()
            }
            VariableType::Basic(BasicType::Char) => {
                // char[record][length] holds one fixed-width string per record
                let width = var.dimensions().last().map(|d| d.len()).unwrap_or(1).max(1);
                let raw = var.get_raw_values(&[] as &[Extent])?;
                Ok(raw
                    .chunks(width)
                    .map(|chunk| {
                        String::from_utf8_lossy(chunk)
                            .trim_end_matches('\0')
                            .trim()
                            .to_string()
                    })
                    .collect())
            }
            other => Err(NcGridError::Conversion {
                message: format!("Variable {} does not hold text ({:?})", name, other),
            }),
        }
    }

    fn read_window(&self, name: &str, ranges: &[AxisRange]) -> Result<ArrayD<f32>> {
        let var = self.variable(name)?;
        let extents: Vec<Extent> = ranges
            .iter()
            .map(|range| Extent::from(range.start..range.end()))
            .collect();
        let shape: Vec<usize> = ranges.iter().map(|range| range.count).collect();

        let values = var.get_values::<f32, _>(extents.as_slice())?;
        info!(
            variable = name,
            values = values.len(),
            "Read window from NetCDF file"
        );
        Ok(ArrayD::from_shape_vec(IxDyn(&shape), values)?)
    }

    fn read_point(&self, name: &str, index: &[usize]) -> Result<f32> {
        let var = self.variable(name)?;
        Ok(var.get_value::<f32, _>(index)?)
    }
}
