//! Configuration module for scriptgate.

mod app_config;
mod helpers;
mod rhai;
mod server;

pub use app_config::AppConfig;
pub use helpers::{deserialize_duration_from_ms, serialize_duration_to_ms};
pub use rhai::RhaiConfig;
pub use server::ServerConfig;
