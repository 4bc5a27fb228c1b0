// Function Definition Model
//
// Static description of a function signature: what the host shows to users
// and what arguments/results are checked against.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::FuncError;
use super::value::ObjectValue;

/// Value types a parameter or result attribute can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
}

impl ValueType {
    pub fn matches(&self, value: &serde_json::Value) -> bool {
        match self {
            ValueType::String => value.is_string(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::String => "string",
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Function metadata (stable identifier)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
}

/// A declared parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
}

impl Parameter {
    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            value_type: ValueType::String,
        }
    }
}

/// Declared return shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReturnType {
    Object {
        attribute_types: BTreeMap<String, ValueType>,
    },
}

impl ReturnType {
    /// Shape a raw value into the declared object.
    ///
    /// Every declared attribute must be present with the declared type and no
    /// undeclared attribute may appear.
    pub fn build_object(&self, value: serde_json::Value) -> Result<ObjectValue, FuncError> {
        let ReturnType::Object { attribute_types } = self;

        let serde_json::Value::Object(map) = value else {
            return Err(FuncError::result_construction(
                "result value is not an object",
            ));
        };

        for (name, value_type) in attribute_types {
            match map.get(name) {
                Some(v) if value_type.matches(v) => {}
                Some(_) => {
                    return Err(FuncError::result_construction(format!(
                        "attribute \"{}\" must be of type {}",
                        name, value_type
                    )))
                }
                None => {
                    return Err(FuncError::result_construction(format!(
                        "missing attribute \"{}\"",
                        name
                    )))
                }
            }
        }

        if let Some(extra) = map.keys().find(|k| !attribute_types.contains_key(*k)) {
            return Err(FuncError::result_construction(format!(
                "undeclared attribute \"{}\"",
                extra
            )));
        }

        Ok(ObjectValue::new(map))
    }
}

/// Full function definition (signature + docs)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definition {
    pub summary: String,
    pub description: String,
    pub parameters: Vec<Parameter>,
    #[serde(rename = "return")]
    pub return_type: ReturnType,
}

/// Metadata and definition together, as returned by describe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    pub name: String,
    #[serde(flatten)]
    pub definition: Definition,
}
