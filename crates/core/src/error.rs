//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("invalid version: {0}")]
    InvalidVersion(String),

    #[error("unknown checksum algorithm: {0}")]
    UnknownChecksumAlgo(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
