use release_types::ReleaseError;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage-layer errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("record not found: {0}")]
    NotFound(String),

    /// Optimistic version check failed or a unique key is taken
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl From<StorageError> for ReleaseError {
    /// Storage failures never carry a business meaning; the engine resolves
    /// missing records itself and surfaces everything else as retryable.
    fn from(err: StorageError) -> Self {
        ReleaseError::Unavailable(err.to_string())
    }
}
