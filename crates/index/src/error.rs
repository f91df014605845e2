//! Index rebuild error types.

use depot_content::ContentError;
use thiserror::Error;

/// Index rebuild operation errors.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The pass was cancelled cooperatively. An explicit outcome, not an
    /// unexpected failure: already-persisted documents stay intact.
    #[error("rebuild cancelled")]
    Cancelled,

    #[error("content store error: {0}")]
    Store(#[from] ContentError),

    #[error("content access error: {0}")]
    Content(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for index rebuild operations.
pub type IndexResult<T> = std::result::Result<T, IndexError>;
