use thiserror::Error;

use crate::{RecordId, SubjectId};

/// Errors that can occur when interacting with the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The canonical subject record does not exist.
    #[error("Subject not found: {0}")]
    SubjectNotFound(SubjectId),

    /// A batched write targeted an owned record that does not exist.
    #[error("Owned record not found: {0}")]
    RecordNotFound(RecordId),

    /// A batch exceeded the store's atomic write limit.
    #[error("Batch of {size} writes exceeds the atomic batch limit of {limit}")]
    BatchTooLarge { size: usize, limit: usize },

    /// The store could not serve the request.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for document store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
