//! The host capabilities a handler script can reach: module resolution and
//! data-source access, scoped to the invoking service's namespace.

use std::sync::Arc;

use dashmap::DashMap;
#[cfg(test)]
use mockall::automock;
use rhai::{Array, Dynamic, Engine, EvalAltResult, ImmutableString};
use serde_json::{Map, Value};
use thiserror::Error;

use super::rhai::conversions::{dynamic_to_json, json_to_dynamic};
use crate::models::{Module, QueryRows};

/// Errors reported by a data source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DataAccessError {
    /// The statement failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// The argument could not be used by the data source.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Resolves LOCAL modules by namespace and path.
#[cfg_attr(test, automock)]
pub trait ModuleResolver: Send + Sync {
    /// Returns the module registered at `path` in `namespace`, if any.
    fn select(&self, namespace: &str, path: &str) -> Option<Module>;
}

/// Resolves named data sources by namespace.
#[cfg_attr(test, automock)]
pub trait DataSourceResolver: Send + Sync {
    /// Returns the data source registered as `name` in `namespace`, if any.
    fn select(&self, namespace: &str, name: &str) -> Option<Arc<dyn DataAccess>>;
}

/// Access to one data source. Arguments are JSON objects whose keys name the
/// statement's bind parameters.
pub trait DataAccess: Send + Sync {
    /// Runs `query` and returns the first row as a mapping, or an empty one.
    fn query_map(&self, query: &str, arg: &Value) -> Result<Map<String, Value>, DataAccessError>;

    /// Runs `query` and returns one page of rows. Pages are numbered from 1.
    fn query_map_list(
        &self,
        query: &str,
        arg: &Value,
        page_number: i64,
        page_size: i64,
    ) -> Result<Vec<Map<String, Value>>, DataAccessError>;

    /// Runs `query` and returns the raw rows.
    fn query(&self, query: &str, arg: &Value) -> Result<QueryRows, DataAccessError>;

    /// Runs a statement and returns the number of affected rows.
    fn exec(&self, query: &str, arg: &Value) -> Result<i64, DataAccessError>;

    /// Inserts one record, into `table` or the source's default table.
    fn save(&self, arg: &Value, table: Option<&str>) -> Result<i64, DataAccessError>;

    /// Inserts many records, into `table` or the source's default table.
    fn batch_save(&self, args: &[Value], table: Option<&str>) -> Result<i64, DataAccessError>;
}

/// A resolver that knows no modules and no data sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResolver;

impl ModuleResolver for NoResolver {
    fn select(&self, _namespace: &str, _path: &str) -> Option<Module> {
        None
    }
}

impl DataSourceResolver for NoResolver {
    fn select(&self, _namespace: &str, _name: &str) -> Option<Arc<dyn DataAccess>> {
        None
    }
}

/// In-memory registry of data sources keyed by namespace and name.
#[derive(Default)]
pub struct DataSourceRegistry {
    sources: DashMap<(String, String), Arc<dyn DataAccess>>,
}

impl DataSourceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `access` as `name` in `namespace`, replacing any previous one.
    pub fn register(&self, namespace: &str, name: &str, access: Arc<dyn DataAccess>) {
        tracing::debug!(namespace = %namespace, name = %name, "Registering data source.");
        self.sources.insert((namespace.to_string(), name.to_string()), access);
    }

    /// Removes a data source. Returns true if one was registered.
    pub fn remove(&self, namespace: &str, name: &str) -> bool {
        self.sources.remove(&(namespace.to_string(), name.to_string())).is_some()
    }
}

impl DataSourceResolver for DataSourceRegistry {
    fn select(&self, namespace: &str, name: &str) -> Option<Arc<dyn DataAccess>> {
        self.sources
            .get(&(namespace.to_string(), name.to_string()))
            .map(|entry| Arc::clone(entry.value()))
    }
}

/// The capability set handed to one invocation.
#[derive(Clone)]
pub struct Capabilities {
    /// Namespace modules and data sources are resolved in.
    pub namespace: String,
    /// Resolver behind `require`.
    pub modules: Arc<dyn ModuleResolver>,
    /// Resolver behind `db`.
    pub data_sources: Arc<dyn DataSourceResolver>,
}

impl Capabilities {
    /// Creates a capability set.
    pub fn new(
        namespace: impl Into<String>,
        modules: Arc<dyn ModuleResolver>,
        data_sources: Arc<dyn DataSourceResolver>,
    ) -> Self {
        Self { namespace: namespace.into(), modules, data_sources }
    }

    /// A capability set that resolves nothing.
    pub fn detached(namespace: impl Into<String>) -> Self {
        Self::new(namespace, Arc::new(NoResolver), Arc::new(NoResolver))
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities").field("namespace", &self.namespace).finish_non_exhaustive()
    }
}

/// Script-side handle returned by `db(name)`.
#[derive(Clone)]
pub struct DataSource {
    name: String,
    access: Arc<dyn DataAccess>,
}

impl DataSource {
    /// Wraps a resolved data source.
    pub fn new(name: impl Into<String>, access: Arc<dyn DataAccess>) -> Self {
        Self { name: name.into(), access }
    }
}

type ScriptResult<T> = Result<T, Box<EvalAltResult>>;

fn script_err(source: &DataSource, err: DataAccessError) -> Box<EvalAltResult> {
    format!("Data source {}: {}", source.name, err).into()
}

fn map_to_dynamic(map: Map<String, Value>) -> Dynamic {
    json_to_dynamic(&Value::Object(map))
}

fn rows_to_dynamic(rows: QueryRows) -> Dynamic {
    json_to_dynamic(&serde_json::json!({ "columns": rows.columns, "rows": rows.rows }))
}

fn batch_args(args: &Array) -> Vec<Value> {
    args.iter().map(dynamic_to_json).collect()
}

/// Registers the `DataSource` type and its script methods on `engine`.
pub fn register_data_source_type(engine: &mut Engine) {
    engine.register_type_with_name::<DataSource>("DataSource");
    engine.register_get("name", |ds: &mut DataSource| ImmutableString::from(ds.name.as_str()));

    engine.register_fn("queryMap", |ds: &mut DataSource, query: &str| -> ScriptResult<Dynamic> {
        ds.access.query_map(query, &Value::Null).map(map_to_dynamic).map_err(|e| script_err(ds, e))
    });
    engine.register_fn(
        "queryMap",
        |ds: &mut DataSource, query: &str, arg: Dynamic| -> ScriptResult<Dynamic> {
            ds.access
                .query_map(query, &dynamic_to_json(&arg))
                .map(map_to_dynamic)
                .map_err(|e| script_err(ds, e))
        },
    );

    engine.register_fn(
        "queryMapList",
        |ds: &mut DataSource,
         query: &str,
         arg: Dynamic,
         page_number: i64,
         page_size: i64|
         -> ScriptResult<Dynamic> {
            let rows = ds
                .access
                .query_map_list(query, &dynamic_to_json(&arg), page_number, page_size)
                .map_err(|e| script_err(ds, e))?;
            Ok(rows.into_iter().map(map_to_dynamic).collect::<Array>().into())
        },
    );

    engine.register_fn("query", |ds: &mut DataSource, query: &str| -> ScriptResult<Dynamic> {
        ds.access.query(query, &Value::Null).map(rows_to_dynamic).map_err(|e| script_err(ds, e))
    });
    engine.register_fn(
        "query",
        |ds: &mut DataSource, query: &str, arg: Dynamic| -> ScriptResult<Dynamic> {
            ds.access
                .query(query, &dynamic_to_json(&arg))
                .map(rows_to_dynamic)
                .map_err(|e| script_err(ds, e))
        },
    );

    engine.register_fn("exec", |ds: &mut DataSource, query: &str| -> ScriptResult<i64> {
        ds.access.exec(query, &Value::Null).map_err(|e| script_err(ds, e))
    });
    engine.register_fn(
        "exec",
        |ds: &mut DataSource, query: &str, arg: Dynamic| -> ScriptResult<i64> {
            ds.access.exec(query, &dynamic_to_json(&arg)).map_err(|e| script_err(ds, e))
        },
    );

    engine.register_fn("save", |ds: &mut DataSource, arg: Dynamic| -> ScriptResult<i64> {
        ds.access.save(&dynamic_to_json(&arg), None).map_err(|e| script_err(ds, e))
    });
    engine.register_fn(
        "save",
        |ds: &mut DataSource, arg: Dynamic, table: &str| -> ScriptResult<i64> {
            ds.access.save(&dynamic_to_json(&arg), Some(table)).map_err(|e| script_err(ds, e))
        },
    );

    engine.register_fn("batchSave", |ds: &mut DataSource, args: Array| -> ScriptResult<i64> {
        ds.access.batch_save(&batch_args(&args), None).map_err(|e| script_err(ds, e))
    });
    engine.register_fn(
        "batchSave",
        |ds: &mut DataSource, args: Array, table: &str| -> ScriptResult<i64> {
            ds.access.batch_save(&batch_args(&args), Some(table)).map_err(|e| script_err(ds, e))
        },
    );
}
