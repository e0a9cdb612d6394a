//! Typed values bound to service parameters.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A coerced parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// A boolean.
    Bool(bool),
    /// A 64-bit signed integer.
    Integer(i64),
    /// A string.
    String(String),
    /// An ordered sequence of strings.
    Array(Vec<String>),
    /// A string-keyed mapping of arbitrary JSON values.
    Map(Map<String, Value>),
}

impl ParamValue {
    /// Converts the value into its JSON representation.
    pub fn to_json(&self) -> Value {
        match self {
            ParamValue::Bool(b) => Value::Bool(*b),
            ParamValue::Integer(i) => Value::from(*i),
            ParamValue::String(s) => Value::String(s.clone()),
            ParamValue::Array(items) => Value::Array(items.iter().cloned().map(Value::String).collect()),
            ParamValue::Map(map) => Value::Object(map.clone()),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}
