//! Content store error types.

use thiserror::Error;

/// Content store operation errors.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid continuation token: {0}")]
    InvalidContinuationToken(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for content store operations.
pub type ContentResult<T> = std::result::Result<T, ContentError>;
