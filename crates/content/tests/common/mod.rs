// Shared fixtures for content store integration tests.
#![allow(dead_code)]

use depot_content::{AssetData, ComponentData, SqliteStore};
use depot_core::{Attributes, Checksums, ContentConfig};
use tempfile::TempDir;
use time::OffsetDateTime;

pub struct TestStore {
    pub store: SqliteStore,
    // Held so the database file outlives the store.
    _temp: TempDir,
}

/// Open a fresh SQLite store in a temp directory, with a small delete batch
/// so batching loops actually loop in tests.
pub async fn test_store() -> TestStore {
    let temp = tempfile::tempdir().unwrap();
    let mut config = ContentConfig::new(temp.path().join("content.db"));
    config.delete_batch_size = 3;
    let store = SqliteStore::new(&config).await.unwrap();
    TestStore { store, _temp: temp }
}

pub fn asset(repository_id: i64, path: &str, last_updated: OffsetDateTime) -> AssetData {
    AssetData {
        repository_id,
        path: path.to_string(),
        kind: "artifact".to_string(),
        content_type: Some("application/octet-stream".to_string()),
        checksums: Checksums::default(),
        attributes: Attributes::new(),
        component_id: None,
        blob_ref: None,
        created_at: last_updated,
        last_updated,
    }
}

pub fn component(
    repository_id: i64,
    namespace: &str,
    name: &str,
    version: &str,
    created_at: OffsetDateTime,
) -> ComponentData {
    ComponentData {
        repository_id,
        namespace: namespace.to_string(),
        name: name.to_string(),
        version: version.to_string(),
        base_version: None,
        kind: "library".to_string(),
        attributes: Attributes::new(),
        created_at,
    }
}
