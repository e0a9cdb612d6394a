//! Shapes exchanged with data-source capabilities.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Rows returned by a raw query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryRows {
    /// Column names, in select order.
    pub columns: Vec<String>,
    /// Row values, each aligned with `columns`.
    pub rows: Vec<Vec<Value>>,
}
