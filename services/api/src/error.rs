//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service, and the mapping
//! from port failures to HTTP statuses used by the handlers.

use crate::config::ConfigError;
use axum::http::StatusCode;
use kayak_rental_core::ports::PortError;

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

    /// Represents an error while applying schema migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// The `(StatusCode, String)` rejection every handler returns.
pub type Rejection = (StatusCode, String);

/// Maps a port failure to a client-facing rejection. Unexpected failures
/// hide their detail behind `fallback`.
pub fn port_rejection(e: PortError, fallback: &str) -> Rejection {
    match e {
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        PortError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        PortError::Unexpected(_) => (StatusCode::INTERNAL_SERVER_ERROR, fallback.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_rejection_statuses() {
        let (status, msg) = port_rejection(PortError::NotFound("Rental x not found".into()), "x");
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(msg, "Rental x not found");

        let (status, _) = port_rejection(PortError::Conflict("dup".into()), "x");
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, msg) =
            port_rejection(PortError::Unexpected("pool timed out".into()), "Failed to load rentals");
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(msg, "Failed to load rentals");
    }
}
