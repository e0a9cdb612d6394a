//! Data models shared by the analyzer, the execution engine and the HTTP
//! surface.

pub mod execution;
pub mod module;
pub mod query;
pub mod service;
pub mod value;

pub use execution::ExecutionResult;
pub use module::Module;
pub use query::QueryRows;
pub use service::{DataType, Method, Param, Service};
pub use value::ParamValue;
