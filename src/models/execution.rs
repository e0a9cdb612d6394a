//! The per-invocation outcome of running a service handler.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status reported when the handler never sets one.
pub const DEFAULT_STATUS: u16 = 200;

/// Result of one handler invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Lines written by `println`/`perror`, in order.
    pub log: Vec<String>,

    /// HTTP-style status code.
    pub status: u16,

    /// Response headers set by the handler.
    #[serde(rename = "header")]
    pub headers: BTreeMap<String, String>,

    /// Response payload; `null` when the handler set none.
    pub data: Value,
}

impl Default for ExecutionResult {
    fn default() -> Self {
        Self { log: Vec::new(), status: DEFAULT_STATUS, headers: BTreeMap::new(), data: Value::Null }
    }
}
