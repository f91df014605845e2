//! Core domain types and shared logic for the depot data layer.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Coordinates (namespace, name, base-version) and index document paths
//! - Version ordering and base-version derivation
//! - Checksum algorithms and digests
//! - Attribute bags and change sets
//! - Configuration types

pub mod attributes;
pub mod checksum;
pub mod config;
pub mod coordinate;
pub mod error;
pub mod version;

pub use attributes::{AttributeChange, AttributeChangeSet, Attributes};
pub use checksum::{ChecksumAlgo, Checksums};
pub use config::{ContentConfig, RebuildConfig};
pub use coordinate::{Coordinate, checksum_path, is_subordinate};
pub use error::{Error, Result};
pub use version::{base_version, compare_versions, is_snapshot};

/// File name of a derived per-coordinate index document.
pub const INDEX_DOCUMENT_NAME: &str = "index.json";

/// Attribute key marking a persisted index document for forced rebuild.
pub const FORCE_REBUILD_ATTRIBUTE: &str = "index.force_rebuild";

/// Attribute key carrying a component's packaging kind.
pub const PACKAGING_ATTRIBUTE: &str = "packaging";

/// Attribute key carrying a component's explicit base version.
pub const BASE_VERSION_ATTRIBUTE: &str = "base_version";
