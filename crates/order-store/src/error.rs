//! Store error types.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The commit flushing staged writes failed; nothing staged was applied.
    #[error("Commit failed: {0}")]
    CommitFailed(String),

    /// A staged update referenced a record that does not exist.
    #[error("{kind} not found: {id}")]
    MissingRecord { kind: &'static str, id: String },

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value could not be decoded into its domain type.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;
