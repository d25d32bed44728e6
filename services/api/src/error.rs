//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service, plus the
//! mapping from port errors to HTTP responses used by the handlers.

use axum::http::StatusCode;
use tracing::error;

use crate::config::ConfigError;
use lingua_core::ports::PortError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// Translates a `PortError` into the `(status, message)` pair the handlers
/// return. Unexpected errors are logged here and surfaced as an opaque 500 so
/// internals never leak to clients.
pub fn port_error_response(e: PortError) -> (StatusCode, String) {
    match e {
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        PortError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        PortError::Unexpected(msg) => {
            error!("Unexpected port error: {}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred".to_string(),
            )
        }
    }
}
