//! Opaque continuation tokens for paged browse operations.

use crate::error::{ContentError, ContentResult};

/// Maximum size of an encoded continuation token.
pub const MAX_TOKEN_SIZE: usize = 256;

/// An opaque continuation token for resuming a browse operation.
///
/// The encoding is backend-specific and must not be parsed or modified by
/// callers; pass a page's `next_token` back unchanged to fetch the next page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    /// Wrap an externally supplied token, rejecting oversized input before
    /// any decoding happens.
    pub fn new(encoded: impl Into<String>) -> ContentResult<Self> {
        let encoded = encoded.into();
        if encoded.len() > MAX_TOKEN_SIZE {
            return Err(ContentError::InvalidContinuationToken(format!(
                "token too large: {} bytes (max: {MAX_TOKEN_SIZE})",
                encoded.len()
            )));
        }
        Ok(Self(encoded))
    }

    /// The encoded token, for handing to clients.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Token positioned after the given internal row id.
    pub(crate) fn after_id(id: i64) -> Self {
        use base64::{Engine as _, engine::general_purpose};
        Self(general_purpose::STANDARD.encode(id.to_string()))
    }

    /// Decode the row id this token points past.
    pub(crate) fn decode_id(&self) -> ContentResult<i64> {
        use base64::{Engine as _, engine::general_purpose};
        let bytes = general_purpose::STANDARD.decode(&self.0).map_err(|e| {
            ContentError::InvalidContinuationToken(format!("invalid base64: {e}"))
        })?;
        let text = String::from_utf8(bytes)
            .map_err(|e| ContentError::InvalidContinuationToken(format!("invalid utf-8: {e}")))?;
        text.parse()
            .map_err(|e| ContentError::InvalidContinuationToken(format!("invalid id: {e}")))
    }
}

/// A single page of browse results plus the token for the next page.
///
/// `next_token` is `None` on the last page.
#[derive(Clone, Debug)]
pub struct Continuation<T> {
    pub items: Vec<T>,
    pub next_token: Option<ContinuationToken>,
}

impl<T> Continuation<T> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> IntoIterator for Continuation<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
