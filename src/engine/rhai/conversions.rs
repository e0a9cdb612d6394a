//! Data conversion utilities for the Rhai scripting engine.
//!
//! Scripts see request parameters and capability results as Rhai values and
//! hand response data back the same way; this module maps between those
//! values, JSON and the typed `ParamValue`.

use rhai::{Array, Dynamic, Map};
use serde_json::Value;

use crate::models::ParamValue;

/// Converts a JSON value to a Rhai `Dynamic` value.
pub fn json_to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::Null => Dynamic::UNIT,
        Value::Bool(b) => (*b).into(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.into()
            } else if let Some(u) = n.as_u64() {
                // Too large for i64, keep the digits
                u.to_string().into()
            } else if let Some(f) = n.as_f64() {
                f.into()
            } else {
                n.to_string().into()
            }
        }
        Value::String(s) => s.clone().into(),
        Value::Array(arr) => {
            let rhai_array: Array = arr.iter().map(json_to_dynamic).collect();
            rhai_array.into()
        }
        Value::Object(obj) => {
            let mut rhai_map = Map::new();
            for (k, v) in obj {
                rhai_map.insert(k.as_str().into(), json_to_dynamic(v));
            }
            rhai_map.into()
        }
    }
}

/// Converts a Rhai `Dynamic` value to JSON.
pub fn dynamic_to_json(dynamic: &Dynamic) -> Value {
    if dynamic.is_unit() {
        return Value::Null;
    }

    if let Some(value) = try_convert_primitive(dynamic) {
        return value;
    }

    if let Some(value) = try_convert_array(dynamic) {
        return value;
    }

    if let Some(value) = try_convert_map(dynamic) {
        return value;
    }

    // Fallback: convert to string representation
    Value::String(dynamic.to_string())
}

/// Attempts to convert a Rhai Dynamic to a JSON primitive type.
fn try_convert_primitive(dynamic: &Dynamic) -> Option<Value> {
    if let Ok(b) = dynamic.as_bool() {
        Some(Value::Bool(b))
    } else if let Ok(i) = dynamic.as_int() {
        Some(Value::from(i))
    } else if let Ok(f) = dynamic.as_float() {
        Some(serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null))
    } else if let Ok(c) = dynamic.as_char() {
        Some(Value::String(c.to_string()))
    } else if dynamic.is_string() {
        Some(Value::String(dynamic.to_string()))
    } else {
        None
    }
}

/// Attempts to convert a Rhai Dynamic array to a JSON array.
fn try_convert_array(dynamic: &Dynamic) -> Option<Value> {
    dynamic.read_lock::<Array>().map(|arr| Value::Array(arr.iter().map(dynamic_to_json).collect()))
}

/// Attempts to convert a Rhai Dynamic map to a JSON object.
fn try_convert_map(dynamic: &Dynamic) -> Option<Value> {
    dynamic.read_lock::<Map>().map(|map| {
        let json_map: serde_json::Map<String, Value> =
            map.iter().map(|(key, value)| (key.to_string(), dynamic_to_json(value))).collect();
        Value::Object(json_map)
    })
}

/// Converts a bound parameter value into the Rhai value a handler sees.
pub fn param_value_to_dynamic(value: &ParamValue) -> Dynamic {
    match value {
        ParamValue::Bool(b) => (*b).into(),
        ParamValue::Integer(i) => (*i).into(),
        ParamValue::String(s) => s.clone().into(),
        ParamValue::Array(items) => {
            let rhai_array: Array = items.iter().map(|s| Dynamic::from(s.clone())).collect();
            rhai_array.into()
        }
        ParamValue::Map(map) => {
            let mut rhai_map = Map::new();
            for (k, v) in map {
                rhai_map.insert(k.as_str().into(), json_to_dynamic(v));
            }
            rhai_map.into()
        }
    }
}

/// Renders a script value as a plain string: strings as-is, unit as empty,
/// scalars formatted, collections as JSON text.
pub fn dynamic_to_plain_string(dynamic: &Dynamic) -> String {
    if dynamic.is_unit() {
        String::new()
    } else if dynamic.is_string() || dynamic.is_char() {
        dynamic.to_string()
    } else if dynamic.is_array() || dynamic.is_map() {
        dynamic_to_json(dynamic).to_string()
    } else {
        dynamic.to_string()
    }
}
