// Component store tests: coordinate discovery and filtered browsing.

mod common;

use common::{asset, component, test_store};
use depot_content::{AssetRepo, ComponentFilter, ComponentRepo, ContentError, stream_components};
use futures::TryStreamExt;
use time::macros::datetime;

const REPO: i64 = 1;

#[tokio::test]
async fn duplicate_coordinate_is_a_conflict() {
    let fixture = test_store().await;
    let store = &fixture.store;
    let time = datetime!(2024-03-15 10:00:00 UTC);

    store
        .create_component(&component(REPO, "org.example", "demo", "1.0", time))
        .await
        .unwrap();
    let result = store
        .create_component(&component(REPO, "org.example", "demo", "1.0", time))
        .await;
    assert!(matches!(result, Err(ContentError::AlreadyExists(_))));
}

#[tokio::test]
async fn scope_discovery_walks_namespaces_names_and_base_versions() {
    let fixture = test_store().await;
    let store = &fixture.store;
    let time = datetime!(2024-03-15 10:00:00 UTC);

    store
        .create_component(&component(REPO, "org.junit", "junit", "4.13", time))
        .await
        .unwrap();
    store
        .create_component(&component(REPO, "org.junit", "junit", "4.12", time))
        .await
        .unwrap();
    store
        .create_component(&component(REPO, "org.mockito", "mockito-core", "3.2.0", time))
        .await
        .unwrap();

    // A timestamped snapshot with an explicit base version.
    let mut snapshot = component(REPO, "org.junit", "junit", "5.0-20240301.120000-1", time);
    snapshot.base_version = Some("5.0-SNAPSHOT".to_string());
    store.create_component(&snapshot).await.unwrap();

    assert_eq!(
        store.namespaces(REPO).await.unwrap(),
        vec!["org.junit", "org.mockito"]
    );
    assert_eq!(store.names(REPO, "org.junit").await.unwrap(), vec!["junit"]);

    let base_versions = store.base_versions(REPO, "org.junit", "junit").await.unwrap();
    assert_eq!(base_versions, vec!["4.12", "4.13", "5.0-SNAPSHOT"]);
}

#[tokio::test]
async fn browse_components_matches_base_version_or_raw_version() {
    let fixture = test_store().await;
    let store = &fixture.store;
    let time = datetime!(2024-03-15 10:00:00 UTC);

    let mut snapshot = component(REPO, "org.junit", "junit", "5.0-20240301.120000-1", time);
    snapshot.base_version = Some("5.0-SNAPSHOT".to_string());
    store.create_component(&snapshot).await.unwrap();
    store
        .create_component(&component(REPO, "org.junit", "junit", "4.13", time))
        .await
        .unwrap();

    let filter = ComponentFilter::coordinate("org.junit", "junit", "5.0-SNAPSHOT");
    let page = store.browse_components(REPO, &filter, None, 10).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].version, "5.0-20240301.120000-1");

    // A release coordinate matches on the raw version column.
    let filter = ComponentFilter::coordinate("org.junit", "junit", "4.13");
    let page = store.browse_components(REPO, &filter, None, 10).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].version, "4.13");
}

#[tokio::test]
async fn browse_component_assets_returns_owned_assets() {
    let fixture = test_store().await;
    let store = &fixture.store;
    let time = datetime!(2024-03-15 10:00:00 UTC);

    let component_id = store
        .create_component(&component(REPO, "org.example", "demo", "1.0", time))
        .await
        .unwrap();

    let mut owned = asset(REPO, "/org/example/demo/1.0/demo-1.0.jar", time);
    owned.component_id = Some(component_id);
    store.create_asset(&owned).await.unwrap();
    store.create_asset(&asset(REPO, "/loose.jar", time)).await.unwrap();

    let assets = store.browse_component_assets(component_id).await.unwrap();
    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0].path, "/org/example/demo/1.0/demo-1.0.jar");
}

#[tokio::test]
async fn streaming_flattens_pages() {
    let fixture = test_store().await;
    let store = &fixture.store;
    let time = datetime!(2024-03-15 10:00:00 UTC);

    for i in 0..7 {
        store
            .create_component(&component(REPO, "org.example", "demo", &format!("1.{i}"), time))
            .await
            .unwrap();
    }

    let components: Vec<_> = stream_components(store, REPO, ComponentFilter::default(), 2)
        .try_collect()
        .await
        .unwrap();
    assert_eq!(components.len(), 7);
}
