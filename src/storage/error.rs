//! Storage-specific error types.
//!
//! All storage operations return [`StorageError`] on failure. The
//! persistence sink logs and swallows these; they never reach a round.

use thiserror::Error;

/// Errors that can occur in the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database operation failed (sqlx error).
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid data or identifier (e.g., bad collection name).
    #[error("invalid data: {0}")]
    InvalidData(String),
}
