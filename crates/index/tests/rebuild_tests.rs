// Full rebuild tests: document aggregation, checksum shortcut, cancellation
// and failure accumulation.

mod common;

use common::{
    MemoryContent, REPO, seed_asset, seed_component, seed_component_with_attributes, test_store,
};
use depot_content::{ComponentData, ComponentRepo};
use depot_core::{Attributes, ChecksumAlgo, Checksums, Coordinate, RebuildConfig, checksum_path};
use depot_index::{CancelToken, IndexError, IndexRebuilder, RebuildRequest};
use time::macros::datetime;

fn rebuilder() -> IndexRebuilder {
    IndexRebuilder::new(RebuildConfig::default())
}

#[tokio::test]
async fn rebuild_writes_version_and_artifact_documents() {
    let fixture = test_store().await;
    let store = &fixture.store;
    let content = MemoryContent::new();

    seed_component(store, "org.example", "demo", "1.0", None).await;
    seed_component(store, "org.example", "demo", "1.1", None).await;

    let outcome = rebuilder()
        .rebuild(store, &content, &RebuildRequest::repository(REPO), &CancelToken::new())
        .await
        .unwrap();

    assert!(outcome.rebuilt);
    assert!(outcome.failures.is_empty());

    let version_doc = content.document("/org/example/demo/1.0/index.json");
    assert_eq!(version_doc.base_version.as_deref(), Some("1.0"));
    assert_eq!(version_doc.versions, vec!["1.0"]);

    let artifact_doc = content.document("/org/example/demo/index.json");
    assert_eq!(artifact_doc.base_version, None);
    assert_eq!(artifact_doc.versions, vec!["1.0", "1.1"]);
    assert_eq!(artifact_doc.latest.as_deref(), Some("1.1"));
    assert_eq!(artifact_doc.release.as_deref(), Some("1.1"));
}

#[tokio::test]
async fn documents_get_checksum_side_files() {
    let fixture = test_store().await;
    let store = &fixture.store;
    let content = MemoryContent::new();

    seed_component(store, "org.example", "demo", "1.0", None).await;

    rebuilder()
        .rebuild(store, &content, &RebuildRequest::repository(REPO), &CancelToken::new())
        .await
        .unwrap();

    let path = "/org/example/demo/1.0/index.json";
    let payload = content.text(path).unwrap();
    for algo in ChecksumAlgo::ALL {
        let digest = content.text(&checksum_path(path, algo)).unwrap();
        assert_eq!(digest, algo.digest(payload.as_bytes()));
    }
}

#[tokio::test]
async fn scoped_rebuild_only_touches_the_requested_artifact() {
    let fixture = test_store().await;
    let store = &fixture.store;
    let content = MemoryContent::new();

    seed_component(store, "org.example", "demo", "1.0", None).await;
    seed_component(store, "org.example", "other", "2.0", None).await;

    let request = RebuildRequest {
        repository_id: REPO,
        namespace: Some("org.example".to_string()),
        name: Some("demo".to_string()),
        ..RebuildRequest::default()
    };
    rebuilder()
        .rebuild(store, &content, &request, &CancelToken::new())
        .await
        .unwrap();

    assert!(content.contains("/org/example/demo/index.json"));
    assert!(!content.contains("/org/example/other/index.json"));
}

#[tokio::test]
async fn subordinate_assets_are_excluded_from_aggregation() {
    let fixture = test_store().await;
    let store = &fixture.store;
    let content = MemoryContent::new();

    seed_component(store, "org.example", "demo", "1.0", None).await;

    // A component whose only asset is a checksum side-file: nothing primary
    // to aggregate, so its base version must not surface in the parent.
    let component_id = store
        .create_component(&ComponentData {
            repository_id: REPO,
            namespace: "org.example".to_string(),
            name: "demo".to_string(),
            version: "2.0".to_string(),
            base_version: None,
            kind: "library".to_string(),
            attributes: Attributes::new(),
            created_at: datetime!(2024-03-15 10:00:00 UTC),
        })
        .await
        .unwrap();
    seed_asset(
        store,
        "/org/example/demo/2.0/demo-2.0.jar.sha256",
        Some(component_id),
        Checksums::default(),
    )
    .await;

    rebuilder()
        .rebuild(store, &content, &RebuildRequest::repository(REPO), &CancelToken::new())
        .await
        .unwrap();

    let artifact_doc = content.document("/org/example/demo/index.json");
    assert_eq!(artifact_doc.versions, vec!["1.0"]);

    // The coordinate's own document is still written, just empty.
    let version_doc = content.document("/org/example/demo/2.0/index.json");
    assert!(version_doc.versions.is_empty());
}

#[tokio::test]
async fn plugin_components_surface_plugin_descriptors() {
    let fixture = test_store().await;
    let store = &fixture.store;
    let content = MemoryContent::new();

    let mut attributes = Attributes::new();
    attributes.set(depot_core::PACKAGING_ATTRIBUTE, "plugin");
    attributes.set("display_name", "Demo Plugin");
    seed_component_with_attributes(store, "org.example", "demo-plugin", "1.0", None, attributes)
        .await;

    rebuilder()
        .rebuild(store, &content, &RebuildRequest::repository(REPO), &CancelToken::new())
        .await
        .unwrap();

    let artifact_doc = content.document("/org/example/demo-plugin/index.json");
    assert_eq!(artifact_doc.plugins.len(), 1);
    assert_eq!(artifact_doc.plugins[0].prefix, "demo");
    assert_eq!(artifact_doc.plugins[0].artifact_id, "demo-plugin");
    assert_eq!(artifact_doc.plugins[0].name.as_deref(), Some("Demo Plugin"));
}

#[tokio::test]
async fn unchanged_primary_checksum_skips_secondary_algorithms() {
    let fixture = test_store().await;
    let store = &fixture.store;
    let content = MemoryContent::new();

    seed_component(store, "org.example", "demo", "1.0", None).await;
    let jar = "/org/example/demo/1.0/demo-1.0.jar";

    // The stored side-file already matches the recorded primary digest.
    let recorded = Checksums::compute(b"1.0");
    content.insert(
        &checksum_path(jar, ChecksumAlgo::PRIMARY),
        recorded.get(ChecksumAlgo::PRIMARY).unwrap().as_bytes(),
    );

    let request = RebuildRequest {
        repository_id: REPO,
        rebuild_checksums: true,
        ..RebuildRequest::default()
    };
    rebuilder()
        .rebuild(store, &content, &request, &CancelToken::new())
        .await
        .unwrap();

    // Primary unchanged, so the more expensive algorithms were never touched.
    assert!(!content.contains(&checksum_path(jar, ChecksumAlgo::Sha512)));
}

#[tokio::test]
async fn changed_primary_checksum_triggers_secondary_algorithms() {
    let fixture = test_store().await;
    let store = &fixture.store;
    let content = MemoryContent::new();

    seed_component(store, "org.example", "demo", "1.0", None).await;
    let jar = "/org/example/demo/1.0/demo-1.0.jar";
    content.insert(&checksum_path(jar, ChecksumAlgo::PRIMARY), b"stale-digest");

    let request = RebuildRequest {
        repository_id: REPO,
        rebuild_checksums: true,
        ..RebuildRequest::default()
    };
    rebuilder()
        .rebuild(store, &content, &request, &CancelToken::new())
        .await
        .unwrap();

    let recorded = Checksums::compute(b"1.0");
    for algo in ChecksumAlgo::ALL {
        let side = content.text(&checksum_path(jar, algo)).unwrap();
        assert_eq!(side, recorded.get(algo).unwrap());
    }
}

#[tokio::test]
async fn precancelled_pass_writes_nothing() {
    let fixture = test_store().await;
    let store = &fixture.store;
    let content = MemoryContent::new();

    seed_component(store, "org.example", "demo", "1.0", None).await;

    let cancel = CancelToken::new();
    cancel.cancel();

    let result = rebuilder()
        .rebuild(store, &content, &RebuildRequest::repository(REPO), &cancel)
        .await;
    assert!(matches!(result, Err(IndexError::Cancelled)));
    assert_eq!(content.put_count(), 0);
}

#[tokio::test]
async fn cancellation_mid_pass_keeps_committed_documents() {
    let fixture = test_store().await;
    let store = &fixture.store;
    let content = MemoryContent::new();

    seed_component(store, "org.example", "demo", "1.0", None).await;
    seed_component(store, "org.example", "demo", "1.1", None).await;

    // Cancel as soon as the first document write lands; the in-flight
    // coordinate finishes its write, everything after it is abandoned.
    let cancel = CancelToken::new();
    content.cancel_after_puts(1, cancel.clone());

    let result = rebuilder()
        .rebuild(store, &content, &RebuildRequest::repository(REPO), &cancel)
        .await;
    assert!(matches!(result, Err(IndexError::Cancelled)));

    assert!(content.contains("/org/example/demo/1.0/index.json"));
    assert!(!content.contains("/org/example/demo/1.1/index.json"));
    assert!(!content.contains("/org/example/demo/index.json"));
}

#[tokio::test]
async fn write_failures_are_collected_not_fatal() {
    let fixture = test_store().await;
    let store = &fixture.store;
    let content = MemoryContent::new();

    seed_component(store, "org.example", "demo", "1.0", None).await;
    seed_component(store, "org.example", "demo", "1.1", None).await;
    content.fail_puts_matching("/demo/1.0/");

    let outcome = rebuilder()
        .rebuild(store, &content, &RebuildRequest::repository(REPO), &CancelToken::new())
        .await
        .unwrap();

    // The traversal completed and rebuilt the healthy levels.
    assert!(outcome.rebuilt);
    assert_eq!(outcome.failures.len(), 1);
    let failure = outcome.failures.iter().next().unwrap();
    assert_eq!(failure.path, "/org/example/demo/1.0/index.json");

    assert!(content.contains("/org/example/demo/1.1/index.json"));
    assert!(content.contains("/org/example/demo/index.json"));
}

#[tokio::test]
async fn delete_index_documents_removes_checksum_siblings() {
    let content = MemoryContent::new();

    let coordinate = Coordinate::new("org.example", "demo", Some("1.0".to_string())).unwrap();
    let path = coordinate.index_path();
    content.insert(&path, b"{}");
    content.insert(&checksum_path(&path, ChecksumAlgo::Sha256), b"digest");
    content.insert("/unrelated.json", b"{}");

    let deleted = rebuilder()
        .delete_index_documents(&content, &[coordinate])
        .await
        .unwrap();

    assert_eq!(deleted.len(), 2);
    assert!(!content.contains(&path));
    assert!(content.contains("/unrelated.json"));
}
