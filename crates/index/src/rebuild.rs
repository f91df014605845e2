//! Index rebuild orchestration.
//!
//! Walks the (namespace, name, base-version) coordinate tree depth-first,
//! aggregates each level's document through the [`IndexBuilder`], and
//! persists results through [`ContentAccess`]. Two modes: `rebuild`
//! recomputes every document in scope, `refresh` rewrites only coordinates
//! that were requested, flagged for forced rebuild, or whose children were
//! rebuilt in this pass.

use crate::builder::{IndexBuilder, plugin_prefix};
use crate::cancel::CancelToken;
use crate::content_access::ContentAccess;
use crate::document::{IndexDocument, PluginDescriptor};
use crate::error::IndexResult;
use crate::failures::MultipleFailures;
use bytes::Bytes;
use depot_content::{AssetRow, ComponentFilter, ComponentRow, ContentStore, stream_components};
use depot_core::{
    ChecksumAlgo, Coordinate, FORCE_REBUILD_ATTRIBUTE, PACKAGING_ATTRIBUTE, RebuildConfig,
    checksum_path, is_subordinate,
};
use futures::TryStreamExt;
use std::collections::HashMap;
use time::OffsetDateTime;

/// Packaging value marking a component as a plugin.
const PLUGIN_PACKAGING: &str = "plugin";

/// Attribute carrying a plugin's human-readable name.
const DISPLAY_NAME_ATTRIBUTE: &str = "display_name";

/// Scope of one rebuild invocation. Absent fields widen the scope to all
/// known values at that level.
#[derive(Clone, Debug, Default)]
pub struct RebuildRequest {
    pub repository_id: i64,
    /// Refresh checksum side-files of processed assets.
    pub rebuild_checksums: bool,
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub base_version: Option<String>,
}

impl RebuildRequest {
    pub fn repository(repository_id: i64) -> Self {
        Self {
            repository_id,
            ..Self::default()
        }
    }
}

/// Result of a rebuild pass: whether at least one document level was
/// rewritten, plus every document write that failed along the way. The
/// caller decides whether any failure is fatal.
#[derive(Debug)]
pub struct RebuildOutcome {
    pub rebuilt: bool,
    pub failures: MultipleFailures,
}

/// Orchestrates index document rebuilds against a content store.
pub struct IndexRebuilder {
    config: RebuildConfig,
}

impl IndexRebuilder {
    pub fn new(config: RebuildConfig) -> Self {
        Self { config }
    }

    /// Recompute and persist every document in scope.
    pub async fn rebuild(
        &self,
        store: &dyn ContentStore,
        content: &dyn ContentAccess,
        request: &RebuildRequest,
        cancel: &CancelToken,
    ) -> IndexResult<RebuildOutcome> {
        Worker::new(store, content, request, &self.config, cancel)
            .run(Mode::Rebuild)
            .await
    }

    /// Recompute documents in scope, persisting only where stale or
    /// requested (see module docs).
    pub async fn refresh(
        &self,
        store: &dyn ContentStore,
        content: &dyn ContentAccess,
        request: &RebuildRequest,
        cancel: &CancelToken,
    ) -> IndexResult<RebuildOutcome> {
        Worker::new(store, content, request, &self.config, cancel)
            .run(Mode::Refresh)
            .await
    }

    /// Delete the index documents of the given coordinates together with
    /// their checksum side-files. Returns the paths actually deleted.
    pub async fn delete_index_documents(
        &self,
        content: &dyn ContentAccess,
        coordinates: &[Coordinate],
    ) -> IndexResult<Vec<String>> {
        let mut deleted = Vec::new();
        for coordinate in coordinates {
            deleted.extend(
                content
                    .delete_with_checksums(&coordinate.index_path())
                    .await?,
            );
        }
        Ok(deleted)
    }
}

#[derive(Clone, Copy)]
enum Mode {
    Rebuild,
    Refresh,
}

/// One rebuild pass. The builder, checksum cache and failure set live for
/// exactly one traversal and are discarded with the worker.
struct Worker<'a> {
    store: &'a dyn ContentStore,
    content: &'a dyn ContentAccess,
    request: &'a RebuildRequest,
    buffer_size: u32,
    cancel: &'a CancelToken,
    builder: IndexBuilder,
    checksum_cache: HashMap<(String, ChecksumAlgo), String>,
    failures: MultipleFailures,
    rebuilt: bool,
}

impl<'a> Worker<'a> {
    fn new(
        store: &'a dyn ContentStore,
        content: &'a dyn ContentAccess,
        request: &'a RebuildRequest,
        config: &RebuildConfig,
        cancel: &'a CancelToken,
    ) -> Self {
        Self {
            store,
            content,
            request,
            buffer_size: config.buffer_size.max(1),
            cancel,
            builder: IndexBuilder::new(),
            checksum_cache: HashMap::new(),
            failures: MultipleFailures::new(),
            rebuilt: false,
        }
    }

    async fn run(mut self, mode: Mode) -> IndexResult<RebuildOutcome> {
        for (namespace, name, base_versions) in self.browse_coordinates().await? {
            self.cancel.check()?;
            match mode {
                Mode::Rebuild => {
                    self.rebuild_artifact(&namespace, &name, &base_versions)
                        .await?
                }
                Mode::Refresh => {
                    self.refresh_artifact(&namespace, &name, &base_versions)
                        .await?;
                }
            }
        }
        Ok(RebuildOutcome {
            rebuilt: self.rebuilt,
            failures: self.failures,
        })
    }

    /// Discover the coordinate tree in scope: explicit request filters pin a
    /// level, absent ones widen it to every known value.
    async fn browse_coordinates(&self) -> IndexResult<Vec<(String, String, Vec<String>)>> {
        let repository_id = self.request.repository_id;

        let namespaces = match &self.request.namespace {
            Some(namespace) => vec![namespace.clone()],
            None => self.store.namespaces(repository_id).await?,
        };
        tracing::debug!(count = namespaces.len(), "searching coordinates in namespaces");

        let mut coordinates = Vec::new();
        for namespace in namespaces {
            let names = match (&self.request.namespace, &self.request.name) {
                (Some(_), Some(name)) => vec![name.clone()],
                _ => self.store.names(repository_id, &namespace).await?,
            };
            for name in names {
                let base_versions = match &self.request.base_version {
                    Some(base_version) => vec![base_version.clone()],
                    None => {
                        self.store
                            .base_versions(repository_id, &namespace, &name)
                            .await?
                    }
                };
                coordinates.push((namespace.clone(), name, base_versions));
            }
        }
        Ok(coordinates)
    }

    async fn rebuild_artifact(
        &mut self,
        namespace: &str,
        name: &str,
        base_versions: &[String],
    ) -> IndexResult<()> {
        self.builder.enter_artifact(namespace, name)?;

        for base_version in base_versions {
            self.cancel.check()?;
            self.builder.enter_base_version(base_version)?;
            self.process_assets(namespace, name, base_version).await?;
            let document = self.builder.exit_base_version(OffsetDateTime::now_utc())?;
            self.process_metadata(
                &Coordinate {
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                    base_version: Some(base_version.clone()),
                },
                &document,
            )
            .await;
        }

        let document = self.builder.exit_artifact(OffsetDateTime::now_utc())?;
        self.process_metadata(
            &Coordinate {
                namespace: namespace.to_string(),
                name: name.to_string(),
                base_version: None,
            },
            &document,
        )
        .await;
        Ok(())
    }

    async fn refresh_artifact(
        &mut self,
        namespace: &str,
        name: &str,
        base_versions: &[String],
    ) -> IndexResult<bool> {
        self.builder.enter_artifact(namespace, name)?;

        let mut rebuilt_version = false;
        for base_version in base_versions {
            self.cancel.check()?;
            rebuilt_version |= self.refresh_version(namespace, name, base_version).await?;
        }

        let document = self.builder.exit_artifact(OffsetDateTime::now_utc())?;
        let coordinate = Coordinate {
            namespace: namespace.to_string(),
            name: name.to_string(),
            base_version: None,
        };

        let is_requested = self.request.namespace.as_deref() == Some(namespace)
            && self.request.name.as_deref() == Some(name)
            && self.request.base_version.is_none();

        // A child's force-rebuild flag propagates upward: a rebuilt base
        // version justifies rewriting the parent even when the parent itself
        // carries no flag and was not requested.
        if is_requested
            || rebuilt_version
            || self.requires_rebuild(&coordinate.index_path()).await?
        {
            self.process_metadata(&coordinate, &document).await;
            Ok(true)
        } else {
            tracing::debug!(namespace, name, "skipping artifact index rebuild");
            Ok(false)
        }
    }

    async fn refresh_version(
        &mut self,
        namespace: &str,
        name: &str,
        base_version: &str,
    ) -> IndexResult<bool> {
        self.builder.enter_base_version(base_version)?;
        self.process_assets(namespace, name, base_version).await?;
        let document = self.builder.exit_base_version(OffsetDateTime::now_utc())?;

        let coordinate = Coordinate {
            namespace: namespace.to_string(),
            name: name.to_string(),
            base_version: Some(base_version.to_string()),
        };

        // The rebuild flag on the requested coordinate may have been cleared
        // before we were invoked, so the originally requested coordinate is
        // always rewritten.
        let is_requested = self.request.namespace.as_deref() == Some(namespace)
            && self.request.name.as_deref() == Some(name)
            && self.request.base_version.as_deref() == Some(base_version);

        if is_requested || self.requires_rebuild(&coordinate.index_path()).await? {
            self.process_metadata(&coordinate, &document).await;
            Ok(true)
        } else {
            tracing::debug!(namespace, name, base_version, "skipping version index rebuild");
            Ok(false)
        }
    }

    /// Stream every component of the coordinate and feed its primary assets
    /// into the in-progress aggregation.
    async fn process_assets(
        &mut self,
        namespace: &str,
        name: &str,
        base_version: &str,
    ) -> IndexResult<()> {
        if namespace.is_empty() || name.is_empty() || base_version.is_empty() {
            tracing::debug!(namespace, name, base_version, "skipping assets for blank coordinate");
            return Ok(());
        }

        let filter = ComponentFilter::coordinate(namespace, name, base_version);
        let mut components = stream_components(
            self.store,
            self.request.repository_id,
            filter,
            self.buffer_size,
        );

        while let Some(component) = components.try_next().await? {
            let assets = self
                .store
                .browse_component_assets(component.component_id)
                .await?;
            for asset in assets {
                if is_subordinate(&asset.path) {
                    continue;
                }
                self.process_asset(&component, &asset).await?;
            }
        }
        Ok(())
    }

    async fn process_asset(
        &mut self,
        component: &ComponentRow,
        asset: &AssetRow,
    ) -> IndexResult<()> {
        self.cancel.check()?;
        self.builder.add_version(&component.version)?;

        if self.request.rebuild_checksums {
            // Refreshing checksums is expensive, so the remaining algorithms
            // are only touched when the primary digest actually changed.
            let primary_changed = self
                .may_update_checksum(asset, ChecksumAlgo::PRIMARY)
                .await?;
            if primary_changed {
                for algo in ChecksumAlgo::secondary() {
                    self.may_update_checksum(asset, algo).await?;
                }
            }
        }

        let attributes = component.attributes();
        if attributes.get_str(PACKAGING_ATTRIBUTE) == Some(PLUGIN_PACKAGING) {
            self.builder.add_plugin(PluginDescriptor {
                prefix: plugin_prefix(&component.name),
                artifact_id: component.name.clone(),
                name: attributes
                    .get_str(DISPLAY_NAME_ATTRIBUTE)
                    .map(str::to_string),
            })?;
        }
        Ok(())
    }

    /// Bring the asset's checksum side-file for `algo` in line with the
    /// digest recorded on the asset. Returns whether the side-file changed.
    async fn may_update_checksum(
        &mut self,
        asset: &AssetRow,
        algo: ChecksumAlgo,
    ) -> IndexResult<bool> {
        let Some(recorded) = asset.checksums().get(algo).map(str::to_string) else {
            return Ok(false);
        };

        let side_path = checksum_path(&asset.path, algo);
        let cache_key = (asset.path.clone(), algo);
        let observed = match self.checksum_cache.get(&cache_key) {
            Some(digest) => Some(digest.clone()),
            None => self
                .content
                .get(&side_path)
                .await?
                .map(|payload| String::from_utf8_lossy(&payload).trim().to_string()),
        };

        if observed.as_deref() == Some(recorded.as_str()) {
            self.checksum_cache.insert(cache_key, recorded);
            return Ok(false);
        }

        self.content
            .put(&side_path, Bytes::from(recorded.clone()))
            .await?;
        self.checksum_cache.insert(cache_key, recorded);
        Ok(true)
    }

    /// Whether the persisted document at `path` carries the force-rebuild
    /// flag attribute.
    async fn requires_rebuild(&self, path: &str) -> IndexResult<bool> {
        let existing = self
            .store
            .read_path(self.request.repository_id, path)
            .await?;
        Ok(existing
            .map(|asset| asset.attributes().get_bool(FORCE_REBUILD_ATTRIBUTE).unwrap_or(false))
            .unwrap_or(false))
    }

    /// Persist one finished document plus its checksum side-files. Write
    /// failures are collected, not propagated: the traversal finishes and
    /// surfaces them together.
    async fn process_metadata(&mut self, coordinate: &Coordinate, document: &IndexDocument) {
        let path = coordinate.index_path();
        match self.write_document(&path, document).await {
            Ok(()) => {
                self.rebuilt = true;
            }
            Err(error) => {
                tracing::warn!(%coordinate, %error, "failed to write index document");
                self.failures.add(path, error);
            }
        }
    }

    async fn write_document(&self, path: &str, document: &IndexDocument) -> IndexResult<()> {
        let payload = document.to_bytes()?;
        for algo in ChecksumAlgo::ALL {
            let digest = algo.digest(&payload);
            self.content
                .put(&checksum_path(path, algo), Bytes::from(digest))
                .await?;
        }
        self.content.put(path, payload).await?;
        Ok(())
    }
}
