//! Reputation error types.

use std::time::Duration;

use common::SubjectId;
use doc_store::StoreError;
use thiserror::Error;

/// Errors that can occur while recomputing or propagating a reputation.
#[derive(Debug, Error)]
pub enum ReputationError {
    /// An incoming change event was malformed.
    #[error("Invalid review change: {0}")]
    Validation(String),

    /// The subject's canonical record does not exist.
    #[error("Subject not found: {0}")]
    NotFound(SubjectId),

    /// The document store failed.
    #[error("Store error: {0}")]
    Store(StoreError),

    /// The operation did not finish within its time budget.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

impl From<StoreError> for ReputationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SubjectNotFound(id) => ReputationError::NotFound(id),
            other => ReputationError::Store(other),
        }
    }
}

/// Result type for reputation operations.
pub type Result<T> = std::result::Result<T, ReputationError>;
