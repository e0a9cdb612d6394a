//! This module provides the Rhai engine used to analyze and run service
//! scripts.

pub mod conversions;
mod create_engine;
pub mod script_engine;

pub use create_engine::create_engine;
pub use script_engine::{HostFunction, MAX_HOST_ARGS, ScriptEngine, ScriptError};
