//! File metadata shared by every data source.
//!
//! These types describe what a source file holds without holding the data
//! itself: dimensions, variables with their ordered dimension names, and
//! attributes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata about a dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dimension {
    /// Name of the dimension
    pub name: String,
    /// Size of the dimension
    pub size: usize,
    /// Whether this dimension is unlimited
    pub is_unlimited: bool,
}

/// Metadata about a variable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    /// Name of the variable
    pub name: String,
    /// Dimensions of the variable, in storage order
    pub dimensions: Vec<String>,
    /// Shape of the variable (dimension sizes)
    pub shape: Vec<usize>,
    /// Variable attributes
    pub attributes: HashMap<String, AttributeValue>,
    /// Data type as string
    pub dtype: String,
}

/// Possible attribute values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// String attribute
    Text(String),
    /// Numeric attribute (stored as f64 for simplicity)
    Number(f64),
    /// Array of numbers
    NumberArray(Vec<f64>),
}

impl AttributeValue {
    /// Numeric view of the attribute. Single-element arrays count as numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(v) => Some(*v),
            AttributeValue::NumberArray(values) if values.len() == 1 => Some(values[0]),
            AttributeValue::Text(text) => text.trim().parse().ok(),
            AttributeValue::NumberArray(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Look up an attribute by name, ignoring ASCII case.
pub fn find_attribute<'a>(
    attributes: &'a HashMap<String, AttributeValue>,
    name: &str,
) -> Option<&'a AttributeValue> {
    attributes.get(name).or_else(|| {
        attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })
}

impl Variable {
    /// Build a variable description with no attributes.
    pub fn new(name: impl Into<String>, dimensions: &[&str], shape: &[usize]) -> Self {
        Self {
            name: name.into(),
            dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
            shape: shape.to_vec(),
            attributes: HashMap::new(),
            dtype: "float".to_string(),
        }
    }

    /// Attach an attribute, builder style.
    pub fn with_attribute(mut self, name: &str, value: AttributeValue) -> Self {
        self.attributes.insert(name.to_string(), value);
        self
    }

    /// Position of `axis` among this variable's dimensions.
    pub fn dimension_index(&self, axis: &str) -> Option<usize> {
        self.dimensions.iter().position(|d| d == axis)
    }

    pub fn has_dimension(&self, axis: &str) -> bool {
        self.dimension_index(axis).is_some()
    }

    /// Case-insensitive attribute lookup.
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        find_attribute(&self.attributes, name)
    }

    /// Total number of values stored for this variable
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Complete metadata for a source file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    /// File-level attributes
    pub global_attributes: HashMap<String, AttributeValue>,
    /// Dimensions in the file
    pub dimensions: HashMap<String, Dimension>,
    /// Variables in the file
    pub variables: HashMap<String, Variable>,
}

impl Metadata {
    /// Variable names in stable (sorted) order
    pub fn variable_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.variables.keys().cloned().collect();
        names.sort();
        names
    }
}
