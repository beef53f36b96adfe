//! Error types for the entitlement store.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(rusqlite::Error),

    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Row not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A stored value could not be decoded.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A thread panicked while holding the connection.
    #[error("store connection poisoned")]
    Poisoned,
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        if err.sqlite_error_code() == Some(rusqlite::ErrorCode::ConstraintViolation) {
            return Self::Conflict(err.to_string());
        }
        Self::Database(err)
    }
}
