//! Domain error types for authorization operations.

use rsperm_storage::{ResourceId, StorageError};
use thiserror::Error;

/// Domain-specific errors for authorization operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Malformed input (empty action, self-loop edge). Detected before
    /// any mutation; no partial effect.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Adding the edge would make a resource its own ancestor.
    #[error("inheritance cycle: {child} is already an ancestor of {parent}")]
    CycleDetected { parent: ResourceId, child: ResourceId },

    /// Traversal visited more nodes than the configured bound. Indicates
    /// store-level corruption, since the acyclicity invariant normally
    /// keeps closures finite.
    #[error("traversal visit limit exceeded (max: {limit})")]
    VisitLimitExceeded { limit: usize },

    /// Record store failure, propagated unchanged.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl DomainError {
    /// Convenience constructor for invalid-argument errors.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
