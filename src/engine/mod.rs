//! The scriptgate engine: splits service scripts, analyzes their
//! definitions and executes their handlers.

pub mod analyzer;
pub mod capabilities;
pub mod coercion;
pub mod collector;
pub mod context;
pub mod executor;
pub mod rhai;
pub mod splitter;

pub use analyzer::{AnalysisError, ServiceAnalyzer};
pub use capabilities::{
    Capabilities, DataAccess, DataAccessError, DataSourceRegistry, DataSourceResolver,
    ModuleResolver, NoResolver,
};
pub use coercion::{CoercionError, RequestParams, bind_params};
pub use collector::ResultCollector;
pub use context::{ContextBuilder, ExecutionContext};
pub use executor::{ExecutionError, ServiceExecutor};
pub use splitter::{SourceSegments, split_source};
