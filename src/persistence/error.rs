//! Errors raised by service storage.

use thiserror::Error;

/// Errors raised by a `ServiceRepository`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// No service is stored under the key.
    #[error("Service {0} not found")]
    NotFound(String),

    /// The service cannot be stored as given.
    #[error("Invalid service: {0}")]
    InvalidInput(String),

    /// A service is already stored under the key.
    #[error("Service {0} already exists")]
    AlreadyExists(String),
}
