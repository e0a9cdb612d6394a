//! Coerces untyped request input into the types a service declares.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{DataType, Param, ParamValue, Service};

/// Errors raised while binding request input to declared parameters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoercionError {
    /// A declared parameter is absent from the input.
    #[error("Parameter {0} not found")]
    ParamNotFound(String),

    /// The input value cannot be coerced to the declared type.
    #[error("Parameter {name} is not a valid {data_type}: {reason}")]
    BadParam {
        /// Name of the offending parameter.
        name: String,
        /// The declared type.
        data_type: DataType,
        /// What was wrong with the value.
        reason: String,
    },
}

/// Raw input for one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestParams {
    /// Strings captured from path template segments.
    pub path: HashMap<String, String>,
    /// Query/body values keyed by parameter name.
    pub values: Map<String, Value>,
}

impl RequestParams {
    /// Builds input from query/body values only.
    pub fn from_values(values: Map<String, Value>) -> Self {
        Self { path: HashMap::new(), values }
    }
}

/// Binds `input` to the service's parameters and returns per-invocation
/// copies with values set. The service itself is left untouched.
///
/// Path template parameters take the captured string (empty when absent);
/// every other declared parameter must be present and coercible.
pub fn bind_params(service: &Service, input: &RequestParams) -> Result<Vec<Param>, CoercionError> {
    let path_params: Vec<&str> = service.path_params();
    let mut bound = Vec::with_capacity(path_params.len() + service.params.len());
    let mut seen = HashSet::new();

    for name in &path_params {
        let captured = input.path.get(*name).cloned().unwrap_or_default();
        let mut param = Param::new(*name, DataType::String);
        param.value = Some(ParamValue::String(captured));
        seen.insert(*name);
        bound.push(param);
    }

    for declared in &service.params {
        if seen.contains(declared.name.as_str()) {
            continue;
        }
        let raw = input
            .values
            .get(&declared.name)
            .ok_or_else(|| CoercionError::ParamNotFound(declared.name.clone()))?;
        let mut param = declared.clone();
        param.value = Some(coerce_value(&declared.name, declared.data_type, raw)?);
        bound.push(param);
    }

    Ok(bound)
}

/// Coerces one raw value to `data_type`.
pub fn coerce_value(name: &str, data_type: DataType, raw: &Value) -> Result<ParamValue, CoercionError> {
    let bad = |reason: String| CoercionError::BadParam { name: name.to_string(), data_type, reason };

    match data_type {
        DataType::String => Ok(ParamValue::String(to_plain_string(raw))),
        DataType::Integer => to_integer(raw).map(ParamValue::Integer).map_err(bad),
        DataType::Bool => to_bool(raw).map(ParamValue::Bool).map_err(bad),
        DataType::Map => to_map(raw).map(ParamValue::Map).map_err(bad),
        DataType::Array => to_string_list(raw).map(ParamValue::Array).map_err(bad),
    }
}

/// Renders a raw value the way STRING parameters receive it: strings as-is,
/// null as empty, collections as JSON text.
pub fn to_plain_string(raw: &Value) -> String {
    match raw {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => raw.to_string(),
    }
}

fn to_integer(raw: &Value) -> Result<i64, String> {
    match raw {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .ok_or_else(|| format!("{} is out of range", n)),
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::String(s) => {
            let text = s.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
                .ok_or_else(|| format!("'{}' is not numeric", s))
        }
        other => Err(format!("unsupported value {}", other)),
    }
}

fn to_bool(raw: &Value) -> Result<bool, String> {
    match raw {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "t" | "true" | "yes" | "on" => Ok(true),
            "0" | "f" | "false" | "no" | "off" => Ok(false),
            _ => Err(format!("'{}' is not a boolean", s)),
        },
        other => Err(format!("unsupported value {}", other)),
    }
}

fn to_map(raw: &Value) -> Result<Map<String, Value>, String> {
    match raw {
        Value::Object(map) => Ok(map.clone()),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(format!("'{}' is not a JSON object", s)),
        },
        other => Err(format!("expected a mapping, got {}", other)),
    }
}

fn to_string_list(raw: &Value) -> Result<Vec<String>, String> {
    match raw {
        Value::Array(items) => Ok(items.iter().map(to_plain_string).collect()),
        Value::String(s) => Ok(s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()),
        Value::Bool(_) | Value::Number(_) => Ok(vec![to_plain_string(raw)]),
        other => Err(format!("expected a sequence, got {}", other)),
    }
}
