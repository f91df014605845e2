//! Depth-first index aggregation with enter/exit semantics.

use crate::document::{IndexDocument, PluginDescriptor};
use crate::error::{IndexError, IndexResult};
use depot_core::{compare_versions, is_snapshot};
use time::OffsetDateTime;

/// One in-progress accumulator, either for the artifact level or for one
/// base version below it.
#[derive(Debug)]
struct Accumulator {
    namespace: String,
    name: String,
    base_version: Option<String>,
    versions: Vec<String>,
    plugins: Vec<PluginDescriptor>,
}

impl Accumulator {
    fn finish(self, updated: OffsetDateTime) -> IndexDocument {
        let mut versions = self.versions;
        versions.sort_by(|a, b| compare_versions(a, b));
        versions.dedup();

        let latest = versions.last().cloned();
        let release = versions
            .iter()
            .rev()
            .find(|version| !is_snapshot(version))
            .cloned();
        let snapshot = self
            .base_version
            .as_deref()
            .map(is_snapshot)
            .unwrap_or(false);

        let mut plugins = self.plugins;
        plugins.sort_by(|a, b| a.prefix.cmp(&b.prefix));
        plugins.dedup();

        IndexDocument {
            namespace: self.namespace,
            name: self.name,
            base_version: self.base_version,
            versions,
            latest,
            release,
            snapshot,
            plugins,
            updated,
        }
    }
}

/// Builds index documents while the rebuild traversal walks the coordinate
/// tree.
///
/// Modeled as an explicit stack of accumulators: entering a level pushes a
/// fresh accumulator, exiting pops and finalizes it into a document,
/// restoring the parent for continued aggregation. Exiting a base version
/// registers it in the parent's version list — but only when the level
/// actually collected at least one version, so coordinates whose assets were
/// all subordinate side-files do not surface in the parent document.
#[derive(Debug, Default)]
pub struct IndexBuilder {
    stack: Vec<Accumulator>,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start aggregating an artifact. Must be the outermost level.
    pub fn enter_artifact(&mut self, namespace: &str, name: &str) -> IndexResult<()> {
        if !self.stack.is_empty() {
            return Err(IndexError::Internal(
                "enter_artifact while another level is in progress".to_string(),
            ));
        }
        self.stack.push(Accumulator {
            namespace: namespace.to_string(),
            name: name.to_string(),
            base_version: None,
            versions: Vec::new(),
            plugins: Vec::new(),
        });
        Ok(())
    }

    /// Start aggregating one base version of the current artifact.
    pub fn enter_base_version(&mut self, base_version: &str) -> IndexResult<()> {
        let parent = self.current("enter_base_version")?;
        if parent.base_version.is_some() {
            return Err(IndexError::Internal(
                "enter_base_version below another base version".to_string(),
            ));
        }
        let (namespace, name) = (parent.namespace.clone(), parent.name.clone());
        self.stack.push(Accumulator {
            namespace,
            name,
            base_version: Some(base_version.to_string()),
            versions: Vec::new(),
            plugins: Vec::new(),
        });
        Ok(())
    }

    /// Record a concrete version on the current level.
    pub fn add_version(&mut self, version: &str) -> IndexResult<()> {
        let current = self.current("add_version")?;
        current.versions.push(version.to_string());
        Ok(())
    }

    /// Record a plugin descriptor on the artifact level.
    pub fn add_plugin(&mut self, plugin: PluginDescriptor) -> IndexResult<()> {
        let artifact = self.stack.first_mut().ok_or_else(|| {
            IndexError::Internal("add_plugin outside an artifact".to_string())
        })?;
        artifact.plugins.push(plugin);
        Ok(())
    }

    /// Finish the current base version, returning its document and restoring
    /// the artifact accumulator.
    pub fn exit_base_version(&mut self, updated: OffsetDateTime) -> IndexResult<IndexDocument> {
        let top = self.pop("exit_base_version")?;
        let Some(base_version) = top.base_version.clone() else {
            self.stack.push(top);
            return Err(IndexError::Internal(
                "exit_base_version at the artifact level".to_string(),
            ));
        };
        if !top.versions.is_empty() {
            let parent = self.current("exit_base_version")?;
            parent.versions.push(base_version);
        }
        Ok(top.finish(updated))
    }

    /// Finish the artifact, returning its document.
    pub fn exit_artifact(&mut self, updated: OffsetDateTime) -> IndexResult<IndexDocument> {
        let top = self.pop("exit_artifact")?;
        if top.base_version.is_some() {
            self.stack.push(top);
            return Err(IndexError::Internal(
                "exit_artifact while a base version is in progress".to_string(),
            ));
        }
        Ok(top.finish(updated))
    }

    fn current(&mut self, operation: &str) -> IndexResult<&mut Accumulator> {
        self.stack
            .last_mut()
            .ok_or_else(|| IndexError::Internal(format!("{operation} outside an artifact")))
    }

    fn pop(&mut self, operation: &str) -> IndexResult<Accumulator> {
        self.stack
            .pop()
            .ok_or_else(|| IndexError::Internal(format!("{operation} outside an artifact")))
    }
}

/// Derive a plugin's invocation prefix from its artifact name:
/// `demo-plugin` and `plugin-demo` both yield `demo`, anything else is used
/// as-is.
pub fn plugin_prefix(artifact_id: &str) -> String {
    let stripped = artifact_id
        .strip_suffix("-plugin")
        .or_else(|| artifact_id.strip_prefix("plugin-"))
        .unwrap_or(artifact_id);
    if stripped.is_empty() {
        artifact_id.to_string()
    } else {
        stripped.to_string()
    }
}
