//! Error types for Ponder Core.

use thiserror::Error;

/// Result type alias for Ponder operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Errors surfaced by a generation backend.
///
/// Any of these aborts the in-progress algorithm run; the core performs
/// no retry.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Transport-level failure (connection refused, timeout, broken pipe).
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status from the backend.
    #[error("backend returned status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as far as it could be read.
        message: String,
    },

    /// Response arrived but did not match the expected shape.
    #[error("malformed backend response: {0}")]
    Protocol(String),

    /// JSON serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
