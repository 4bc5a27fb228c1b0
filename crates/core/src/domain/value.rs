// Argument Bundle & Result Object (JSON serializable)

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::definition::Parameter;
use super::error::FuncError;

/// Named arguments for a function call, as sent by the host dispatcher
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArgumentBundle(Map<String, Value>);

impl ArgumentBundle {
    /// Wrap a raw JSON value; anything other than an object is rejected
    /// against the first argument position.
    pub fn from_value(value: Value) -> Result<Self, FuncError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(FuncError::argument(
                0,
                format!("arguments must be an object, got {}", json_kind(&other)),
            )),
        }
    }

    /// Convenience for a single named string argument
    pub fn with_string(name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut map = Map::new();
        map.insert(name.into(), Value::String(value.into()));
        Self(map)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reject arguments the signature does not declare, attributing the
    /// error to `position`
    pub fn check_names(&self, position: usize, parameters: &[Parameter]) -> Result<(), FuncError> {
        match self
            .0
            .keys()
            .find(|k| !parameters.iter().any(|p| &p.name == *k))
        {
            Some(unknown) => Err(FuncError::argument(
                position,
                format!("unexpected argument \"{}\"", unknown),
            )),
            None => Ok(()),
        }
    }

    /// Decode a required, non-null string argument
    pub fn get_string(&self, position: usize, parameter: &Parameter) -> Result<String, FuncError> {
        match self.0.get(&parameter.name) {
            None => Err(FuncError::argument(
                position,
                format!("missing required argument \"{}\"", parameter.name),
            )),
            Some(Value::Null) => Err(FuncError::argument(
                position,
                format!("argument \"{}\" must not be null", parameter.name),
            )),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(FuncError::argument(
                position,
                format!(
                    "argument \"{}\" must be a {}, got {}",
                    parameter.name,
                    parameter.value_type,
                    json_kind(other)
                ),
            )),
        }
    }
}

/// Typed object returned on success
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectValue(Map<String, Value>);

impl ObjectValue {
    pub(crate) fn new(attributes: Map<String, Value>) -> Self {
        Self(attributes)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(|v| v.as_str())
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
