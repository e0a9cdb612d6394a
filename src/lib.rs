#![warn(missing_docs)]
//! Scriptgate serves HTTP endpoints defined by Rhai scripts: it extracts each
//! script's routing metadata, coerces request input to the declared parameter
//! types and runs the handler in an isolated, capability-scoped engine.

pub mod config;
pub mod engine;
pub mod http_server;
pub mod initialization;
pub mod loader;
pub mod models;
pub mod persistence;
pub mod test_helpers;
