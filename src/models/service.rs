//! This module defines the `Service` structure, the routing and schema unit
//! produced by analyzing a service script.

use std::{collections::HashMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::value::ParamValue;

/// The method a service is exposed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// HTTP GET.
    Get,
    /// HTTP POST.
    Post,
    /// HTTP PUT.
    Put,
    /// HTTP DELETE.
    Delete,
    /// Not routed over HTTP; callable only from other scripts as a module.
    Local,
}

impl Method {
    /// The four HTTP verbs a service may be routed under.
    pub const HTTP: [Method; 4] = [Method::Get, Method::Post, Method::Put, Method::Delete];

    /// Returns the canonical uppercase name of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Local => "LOCAL",
        }
    }

    /// Returns true if the method is one of the HTTP verbs.
    pub fn is_http(&self) -> bool {
        !matches!(self, Method::Local)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown method or data type name.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown {kind}: {value}")]
pub struct ParseNameError {
    kind: &'static str,
    value: String,
}

impl FromStr for Method {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Method::Get, Method::Post, Method::Put, Method::Delete, Method::Local]
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseNameError { kind: "method", value: s.to_string() })
    }
}

/// The declared type of a service parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    /// A string value.
    String,
    /// A 64-bit signed integer.
    Integer,
    /// A boolean.
    Bool,
    /// A string-keyed mapping.
    Map,
    /// An ordered sequence of strings.
    Array,
}

impl DataType {
    /// Returns the canonical uppercase name of the data type.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::String => "STRING",
            DataType::Integer => "INTEGER",
            DataType::Bool => "BOOL",
            DataType::Map => "MAP",
            DataType::Array => "ARRAY",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [DataType::String, DataType::Integer, DataType::Bool, DataType::Map, DataType::Array]
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseNameError { kind: "data type", value: s.to_string() })
    }
}

/// One declared input of a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    /// Name the value is bound under in the handler script.
    pub name: String,

    /// Declared type the raw input is coerced to.
    #[serde(rename = "dataType")]
    pub data_type: DataType,

    /// Bound value. Only set on per-invocation copies, never on the schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ParamValue>,
}

impl Param {
    /// Creates an unbound parameter declaration.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self { name: name.into(), data_type, value: None }
    }
}

/// A script-defined service: routing metadata, parameter schema and source.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Service {
    /// Tenant scope the service is resolved in.
    #[serde(default)]
    pub namespace: String,

    /// Route path, possibly containing `{name}` template segments.
    #[serde(default)]
    pub path: String,

    /// The method the service is exposed under. `None` for scripts that do
    /// not export a service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<Method>,

    /// Display name assigned by whoever registers the service.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// The full script text.
    #[serde(default)]
    pub source: String,

    /// Declared parameters, in declaration order.
    #[serde(default)]
    pub params: Vec<Param>,
}

impl Service {
    /// Appends a parameter declaration.
    pub fn add_param(&mut self, name: impl Into<String>, data_type: DataType) {
        self.params.push(Param::new(name, data_type));
    }

    /// Returns true if the service can be routed over HTTP.
    pub fn is_routable(&self) -> bool {
        !self.path.is_empty() && self.method.is_some_and(|m| m.is_http())
    }

    /// Returns true if analysis found no exported service at all.
    pub fn is_empty(&self) -> bool {
        self.namespace.is_empty() && self.path.is_empty() && self.method.is_none()
    }

    /// Names of the `{name}` segments in the path template, in order.
    pub fn path_params(&self) -> Vec<&str> {
        self.path.split('/').filter_map(template_segment).collect()
    }

    /// Matches a concrete request path against the path template, returning
    /// the captured template segments.
    pub fn match_path(&self, actual: &str) -> Option<HashMap<String, String>> {
        let template: Vec<&str> = self.path.trim_matches('/').split('/').collect();
        let actual: Vec<&str> = actual.trim_matches('/').split('/').collect();
        if template.len() != actual.len() {
            return None;
        }

        let mut captures = HashMap::new();
        for (expected, segment) in template.iter().zip(actual) {
            match template_segment(expected) {
                Some(name) => {
                    if segment.is_empty() {
                        return None;
                    }
                    captures.insert(name.to_string(), segment.to_string());
                }
                None if *expected == segment => {}
                None => return None,
            }
        }
        Some(captures)
    }
}

fn template_segment(segment: &str) -> Option<&str> {
    segment
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .filter(|name| !name.is_empty())
}
