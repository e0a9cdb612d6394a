//! A set of helpers for testing

mod data_access;
mod service;

pub use data_access::MemoryDataAccess;
pub use service::ServiceBuilder;
