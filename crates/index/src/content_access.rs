//! Byte-level content access for index documents.

use crate::error::IndexResult;
use async_trait::async_trait;
use bytes::Bytes;

/// External collaborator persisting index documents and their checksum
/// side-files. The orchestrator only needs byte-level get/put/delete; blob
/// storage, caching and replication stay behind this seam.
#[async_trait]
pub trait ContentAccess: Send + Sync {
    /// Read the payload at a path, absent when nothing is stored there.
    async fn get(&self, path: &str) -> IndexResult<Option<Bytes>>;

    /// Write the payload at a path, replacing any previous content.
    async fn put(&self, path: &str, payload: Bytes) -> IndexResult<()>;

    /// Delete the payload at a path together with its known checksum
    /// side-files. Returns the paths actually deleted.
    async fn delete_with_checksums(&self, path: &str) -> IndexResult<Vec<String>>;
}
