// Shared fixtures for index rebuild integration tests: an instrumented
// in-memory content access mock and content store helpers.
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use depot_content::{AssetData, AssetRepo, ComponentData, ComponentRepo, SqliteStore};
use depot_core::{Attributes, ChecksumAlgo, Checksums, ContentConfig, checksum_path};
use depot_index::{CancelToken, ContentAccess, IndexDocument, IndexError, IndexResult};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use time::macros::datetime;

pub const REPO: i64 = 1;

pub struct TestStore {
    pub store: SqliteStore,
    _temp: TempDir,
}

pub async fn test_store() -> TestStore {
    let temp = tempfile::tempdir().unwrap();
    let config = ContentConfig::new(temp.path().join("content.db"));
    let store = SqliteStore::new(&config).await.unwrap();
    TestStore { store, _temp: temp }
}

/// In-memory content access with failure injection and a put counter, so
/// tests can observe exactly which documents a pass wrote.
#[derive(Default)]
pub struct MemoryContent {
    objects: Mutex<BTreeMap<String, Bytes>>,
    put_count: AtomicUsize,
    fail_puts_matching: Mutex<Option<String>>,
    cancel_after_puts: Mutex<Option<(usize, CancelToken)>>,
}

impl MemoryContent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every put whose path contains `needle` fail.
    pub fn fail_puts_matching(&self, needle: &str) {
        *self.fail_puts_matching.lock().unwrap() = Some(needle.to_string());
    }

    /// Cancel `token` once `count` puts have succeeded.
    pub fn cancel_after_puts(&self, count: usize, token: CancelToken) {
        *self.cancel_after_puts.lock().unwrap() = Some((count, token));
    }

    pub fn put_count(&self) -> usize {
        self.put_count.load(Ordering::SeqCst)
    }

    pub fn paths(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects.lock().unwrap().contains_key(path)
    }

    pub fn insert(&self, path: &str, payload: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(path.to_string(), Bytes::copy_from_slice(payload));
    }

    pub fn document(&self, path: &str) -> IndexDocument {
        let objects = self.objects.lock().unwrap();
        let payload = objects.get(path).unwrap_or_else(|| panic!("no document at {path}"));
        IndexDocument::from_bytes(payload).unwrap()
    }

    pub fn text(&self, path: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .get(path)
            .map(|payload| String::from_utf8_lossy(payload).to_string())
    }
}

#[async_trait]
impl ContentAccess for MemoryContent {
    async fn get(&self, path: &str) -> IndexResult<Option<Bytes>> {
        Ok(self.objects.lock().unwrap().get(path).cloned())
    }

    async fn put(&self, path: &str, payload: Bytes) -> IndexResult<()> {
        if let Some(needle) = self.fail_puts_matching.lock().unwrap().as_deref()
            && path.contains(needle)
        {
            return Err(IndexError::Content(format!("injected failure for {path}")));
        }

        self.objects
            .lock()
            .unwrap()
            .insert(path.to_string(), payload);
        let count = self.put_count.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some((after, token)) = self.cancel_after_puts.lock().unwrap().as_ref()
            && count >= *after
        {
            token.cancel();
        }
        Ok(())
    }

    async fn delete_with_checksums(&self, path: &str) -> IndexResult<Vec<String>> {
        let mut objects = self.objects.lock().unwrap();
        let mut deleted = Vec::new();
        let mut candidates = vec![path.to_string()];
        candidates.extend(ChecksumAlgo::ALL.map(|algo| checksum_path(path, algo)));
        for candidate in candidates {
            if objects.remove(&candidate).is_some() {
                deleted.push(candidate);
            }
        }
        Ok(deleted)
    }
}

const CREATED: time::OffsetDateTime = datetime!(2024-03-15 10:00:00 UTC);

/// Create a component plus one primary jar asset, returning the component id.
pub async fn seed_component(
    store: &SqliteStore,
    namespace: &str,
    name: &str,
    version: &str,
    base_version: Option<&str>,
) -> i64 {
    seed_component_with_attributes(store, namespace, name, version, base_version, Attributes::new())
        .await
}

pub async fn seed_component_with_attributes(
    store: &SqliteStore,
    namespace: &str,
    name: &str,
    version: &str,
    base_version: Option<&str>,
    attributes: Attributes,
) -> i64 {
    let component_id = store
        .create_component(&ComponentData {
            repository_id: REPO,
            namespace: namespace.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            base_version: base_version.map(str::to_string),
            kind: "library".to_string(),
            attributes,
            created_at: CREATED,
        })
        .await
        .unwrap();

    let path = format!(
        "/{}/{name}/{version}/{name}-{version}.jar",
        namespace.replace('.', "/")
    );
    seed_asset(store, &path, Some(component_id), Checksums::compute(version.as_bytes())).await;
    component_id
}

pub async fn seed_asset(
    store: &SqliteStore,
    path: &str,
    component_id: Option<i64>,
    checksums: Checksums,
) -> i64 {
    store
        .create_asset(&AssetData {
            repository_id: REPO,
            path: path.to_string(),
            kind: "artifact".to_string(),
            content_type: None,
            checksums,
            attributes: Attributes::new(),
            component_id,
            blob_ref: None,
            created_at: CREATED,
            last_updated: CREATED,
        })
        .await
        .unwrap()
}

/// Register a persisted index document asset carrying the force-rebuild flag.
pub async fn seed_flagged_metadata(store: &SqliteStore, path: &str) {
    let mut attributes = Attributes::new();
    attributes.set(depot_core::FORCE_REBUILD_ATTRIBUTE, true);
    store
        .create_asset(&AssetData {
            repository_id: REPO,
            path: path.to_string(),
            kind: "metadata".to_string(),
            content_type: Some("application/json".to_string()),
            checksums: Checksums::default(),
            attributes,
            component_id: None,
            blob_ref: None,
            created_at: CREATED,
            last_updated: CREATED,
        })
        .await
        .unwrap();
}
