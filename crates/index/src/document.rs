//! Derived index documents.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Descriptor of a plugin component, accumulated into the artifact-level
/// document when a component's packaging marks it as a plugin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Short invocation prefix derived from the artifact name.
    pub prefix: String,
    pub artifact_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Aggregation result for one coordinate.
///
/// At the base-version level `base_version` is set, `versions` holds the
/// concrete versions seen, and `snapshot` marks snapshot coordinates. At the
/// artifact level `versions` holds the known base versions and `plugins` the
/// accumulated plugin descriptors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub namespace: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_version: Option<String>,
    /// Known versions, ordered ascending by version precedence.
    pub versions: Vec<String>,
    /// Highest known version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<String>,
    /// Highest known non-snapshot version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub snapshot: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<PluginDescriptor>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated: OffsetDateTime,
}

impl IndexDocument {
    /// Serialize to the persisted payload.
    pub fn to_bytes(&self) -> serde_json::Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec_pretty(self)?))
    }

    /// Parse a persisted payload.
    pub fn from_bytes(payload: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(payload)
    }
}
