//! Error types for report-core

use thiserror::Error;

/// Result type alias for report-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type shared by every layer that talks to the report backend
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed job request; no job is created
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Missing or rejected API token
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The backend answered with a non-success status
    #[error("{message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Best-effort human message extracted from the response body
        message: String,
    },

    /// The request never produced a response (connection refused, reset, ...)
    #[error("Transport error: {0}")]
    Transport(String),

    /// A bounded call did not finish in time
    #[error("{operation} timed out after {bound:?}")]
    Timeout {
        /// Logical operation that timed out
        operation: String,
        /// Bound that was exceeded
        bound: std::time::Duration,
    },

    /// Response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error message
    #[error("{0}")]
    Generic(String),
}

impl Error {
    /// Create a timeout error for a named operation
    pub fn timeout(operation: impl Into<String>, bound: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            bound,
        }
    }

    /// Whether the error was raised before the request reached the backend
    /// because of the request itself or the credentials.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Auth(_))
    }

    /// Whether the error came from the transport layer rather than the backend
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout { .. })
    }
}
