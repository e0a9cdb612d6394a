//! Defines the custom `ApiError` type for the HTTP server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::{
    engine::{AnalysisError, ExecutionError},
    persistence::PersistenceError,
};

/// A custom error type for the API that can be converted into an HTTP response.
#[derive(Debug)]
pub enum ApiError {
    /// Represents malformed input: bad scripts, parameters or methods.
    BadRequest(String),

    /// Represents a resource that could not be found.
    NotFound(String),

    /// Represents a conflict, e.g., a resource that already exists.
    Conflict(String),

    /// Represents a handler script that failed, with the log it wrote.
    ScriptFailed {
        /// The failure.
        message: String,
        /// Log lines written before the failure.
        log: Vec<String>,
    },

    /// Represents a handler that ran past its execution timeout.
    Timeout(String),

    /// Represents a generic internal server error.
    InternalServerError(String),
}

/// Converts a `PersistenceError` into an `ApiError`.
///
/// This allows for the convenient use of the `?` operator in handlers
/// on functions that return `Result<_, PersistenceError>`.
impl From<PersistenceError> for ApiError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound(_) => ApiError::NotFound(err.to_string()),
            PersistenceError::AlreadyExists(_) => ApiError::Conflict(err.to_string()),
            PersistenceError::InvalidInput(_) => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Timeout(_) => ApiError::Timeout(err.to_string()),
            AnalysisError::Join(_) => ApiError::InternalServerError(err.to_string()),
            _ => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<ExecutionError> for ApiError {
    fn from(err: ExecutionError) -> Self {
        match err {
            ExecutionError::Coercion(e) => ApiError::BadRequest(e.to_string()),
            ExecutionError::Script { source, log } =>
                ApiError::ScriptFailed { message: source.to_string(), log },
            ExecutionError::Timeout(_) => ApiError::Timeout(err.to_string()),
            ExecutionError::Join(_) => ApiError::InternalServerError(err.to_string()),
        }
    }
}

/// Implements the conversion from `ApiError` into an `axum` response.
///
/// This is the central point for mapping internal application errors to
/// user-facing HTTP responses.
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            ApiError::InternalServerError(err) => {
                tracing::error!("Internal server error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "An internal server error occurred" }),
                )
            }
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, json!({ "error": message })),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, json!({ "error": message })),
            ApiError::ScriptFailed { message, log } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": message,
                    "log": log,
                }),
            ),
            ApiError::Timeout(message) => (StatusCode::GATEWAY_TIMEOUT, json!({ "error": message })),
        };

        (status, Json(body)).into_response()
    }
}
