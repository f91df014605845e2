//! Component repository.

use crate::continuation::{Continuation, ContinuationToken};
use crate::error::ContentResult;
use crate::models::{AssetRow, ComponentData, ComponentRow};
use async_trait::async_trait;

/// Coordinate filter for component browsing. Absent fields widen the scope
/// to all known values at that level.
#[derive(Clone, Debug, Default)]
pub struct ComponentFilter {
    pub namespace: Option<String>,
    pub name: Option<String>,
    /// Matches components whose explicit base version equals this value, or
    /// whose raw version does where no base version is recorded.
    pub base_version: Option<String>,
}

impl ComponentFilter {
    pub fn coordinate(namespace: &str, name: &str, base_version: &str) -> Self {
        Self {
            namespace: Some(namespace.to_string()),
            name: Some(name.to_string()),
            base_version: Some(base_version.to_string()),
        }
    }
}

/// Repository for component operations.
#[async_trait]
pub trait ComponentRepo: Send + Sync {
    /// Create a component. Fails with `AlreadyExists` for a duplicate
    /// (repository, namespace, name, version).
    async fn create_component(&self, component: &ComponentData) -> ContentResult<i64>;

    /// Get a component by coordinate.
    async fn find_component(
        &self,
        repository_id: i64,
        namespace: &str,
        name: &str,
        version: &str,
    ) -> ContentResult<Option<ComponentRow>>;

    /// All distinct namespaces in a repository.
    async fn namespaces(&self, repository_id: i64) -> ContentResult<Vec<String>>;

    /// All distinct names within a namespace.
    async fn names(&self, repository_id: i64, namespace: &str) -> ContentResult<Vec<String>>;

    /// All distinct base versions within a namespace and name, falling back
    /// to the raw version for components without an explicit base version.
    async fn base_versions(
        &self,
        repository_id: i64,
        namespace: &str,
        name: &str,
    ) -> ContentResult<Vec<String>>;

    /// Browse components matching a filter, ordered by internal id.
    async fn browse_components(
        &self,
        repository_id: i64,
        filter: &ComponentFilter,
        continuation: Option<&ContinuationToken>,
        limit: u32,
    ) -> ContentResult<Continuation<ComponentRow>>;

    /// All assets owned by a component.
    async fn browse_component_assets(&self, component_id: i64) -> ContentResult<Vec<AssetRow>>;
}
