//! Search composition error types.

use thiserror::Error;

/// Search predicate composition errors.
#[derive(Debug, Error)]
pub enum SearchError {
    /// A contribution rejected one filter's value. The error names the
    /// offending property so callers can re-compose without that filter.
    #[error("invalid filter '{property}': {reason}")]
    InvalidFilter { property: String, reason: String },
}

impl SearchError {
    pub fn invalid_filter(property: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFilter {
            property: property.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for search composition.
pub type SearchResult<T> = std::result::Result<T, SearchError>;
