//! Content store abstraction and SQLite implementation for depot.
//!
//! This crate provides the data-plane model of the repository manager:
//! - Assets and components with attribute bags and checksum sets
//! - Paged browsing with opaque continuation tokens
//! - The incremental change cursor over asset last-updated times
//! - Bounded-batch delete and purge loops

pub mod continuation;
pub mod error;
pub mod models;
pub mod repos;
pub mod store;
pub mod stream;

pub use continuation::{Continuation, ContinuationToken};
pub use error::{ContentError, ContentResult};
pub use models::{AssetData, AssetRow, ComponentData, ComponentRow};
pub use repos::{AssetRepo, ComponentFilter, ComponentRepo, TIE_GROUP_LIMIT};
pub use store::{ContentStore, SqliteStore};
pub use stream::{stream_assets, stream_components};

use depot_core::ContentConfig;
use std::sync::Arc;

/// Create a content store from configuration.
pub async fn from_config(config: &ContentConfig) -> ContentResult<Arc<dyn ContentStore>> {
    let store = SqliteStore::new(config).await?;
    Ok(Arc::new(store) as Arc<dyn ContentStore>)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn from_config_creates_database() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("content.db");
        let config = ContentConfig::new(&db_path);

        let store = from_config(&config).await.unwrap();
        store.health_check().await.unwrap();
        assert!(db_path.exists());
    }
}
