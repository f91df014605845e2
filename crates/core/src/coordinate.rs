//! Coordinates and index document paths.

use crate::checksum::ChecksumAlgo;
use crate::{Error, INDEX_DOCUMENT_NAME, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Grouping key scoping one derived index document.
///
/// With a base version the coordinate addresses a version-level document,
/// without one the artifact-level (parent) document.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub namespace: String,
    pub name: String,
    pub base_version: Option<String>,
}

impl Coordinate {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        base_version: Option<String>,
    ) -> Result<Self> {
        let namespace = namespace.into();
        let name = name.into();
        if namespace.is_empty() || name.is_empty() {
            return Err(Error::InvalidCoordinate(format!(
                "namespace and name must be non-empty, got '{namespace}':'{name}'"
            )));
        }
        Ok(Self {
            namespace,
            name,
            base_version,
        })
    }

    /// The artifact-level coordinate for this coordinate's namespace and name.
    pub fn parent(&self) -> Self {
        Self {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            base_version: None,
        }
    }

    /// Repository path of this coordinate's index document.
    ///
    /// Namespace dots become path separators: `org.junit:junit:4.13` maps to
    /// `/org/junit/junit/4.13/index.json`, the artifact level drops the
    /// version directory.
    pub fn index_path(&self) -> String {
        let namespace = self.namespace.replace('.', "/");
        match &self.base_version {
            Some(version) => format!("/{namespace}/{}/{version}/{INDEX_DOCUMENT_NAME}", self.name),
            None => format!("/{namespace}/{}/{INDEX_DOCUMENT_NAME}", self.name),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.base_version {
            Some(version) => write!(f, "{}:{}:{}", self.namespace, self.name, version),
            None => write!(f, "{}:{}", self.namespace, self.name),
        }
    }
}

/// Path of a checksum side-file next to `path`.
pub fn checksum_path(path: &str, algo: ChecksumAlgo) -> String {
    format!("{path}.{}", algo.extension())
}

/// Whether a path is a derived side-file (checksum or signature) that must
/// not be treated as a primary record during aggregation.
pub fn is_subordinate(path: &str) -> bool {
    let Some((_, extension)) = path.rsplit_once('.') else {
        return false;
    };
    matches!(extension, "sha256" | "sha512" | "asc" | "sig")
}
