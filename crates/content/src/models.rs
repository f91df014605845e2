//! Database models mapping to the content schema.
//!
//! Timestamps are stored as unix-epoch milliseconds (INTEGER columns) so that
//! ordering and range queries compare exactly at the engine's millisecond
//! resolution. The row structs expose them as [`OffsetDateTime`].

use depot_core::{Attributes, Checksums, base_version};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use time::OffsetDateTime;

/// Asset record: one file inside a repository.
#[derive(Debug, Clone)]
pub struct AssetRow {
    pub asset_id: i64,
    pub repository_id: i64,
    pub path: String,
    pub kind: String,
    pub content_type: Option<String>,
    /// JSON object keyed by checksum algorithm.
    pub checksums: String,
    /// JSON attribute bag.
    pub attributes: String,
    pub component_id: Option<i64>,
    pub blob_ref: Option<String>,
    pub created_at: OffsetDateTime,
    pub last_updated: OffsetDateTime,
    pub last_downloaded: Option<OffsetDateTime>,
}

impl AssetRow {
    /// Parsed attribute bag; malformed stored JSON yields an empty bag.
    pub fn attributes(&self) -> Attributes {
        serde_json::from_str(&self.attributes).unwrap_or_default()
    }

    /// Parsed checksum set; malformed stored JSON yields an empty set.
    pub fn checksums(&self) -> Checksums {
        serde_json::from_str(&self.checksums).unwrap_or_default()
    }
}

/// Component record: one logical package version owning assets.
#[derive(Debug, Clone)]
pub struct ComponentRow {
    pub component_id: i64,
    pub repository_id: i64,
    pub namespace: String,
    pub name: String,
    pub version: String,
    /// Explicit base version, when the format records one.
    pub base_version: Option<String>,
    pub kind: String,
    /// JSON attribute bag.
    pub attributes: String,
    pub created_at: OffsetDateTime,
}

impl ComponentRow {
    pub fn attributes(&self) -> Attributes {
        serde_json::from_str(&self.attributes).unwrap_or_default()
    }

    /// The explicit base version, or one derived from the raw version.
    pub fn effective_base_version(&self) -> String {
        match &self.base_version {
            Some(base) => base.clone(),
            None => base_version(&self.version),
        }
    }
}

/// Input record for asset creation. Timestamps are supplied by the caller.
#[derive(Debug, Clone)]
pub struct AssetData {
    pub repository_id: i64,
    pub path: String,
    pub kind: String,
    pub content_type: Option<String>,
    pub checksums: Checksums,
    pub attributes: Attributes,
    pub component_id: Option<i64>,
    pub blob_ref: Option<String>,
    pub created_at: OffsetDateTime,
    pub last_updated: OffsetDateTime,
}

/// Input record for component creation.
#[derive(Debug, Clone)]
pub struct ComponentData {
    pub repository_id: i64,
    pub namespace: String,
    pub name: String,
    pub version: String,
    pub base_version: Option<String>,
    pub kind: String,
    pub attributes: Attributes,
    pub created_at: OffsetDateTime,
}

/// Convert a timestamp to stored unix-epoch milliseconds.
pub(crate) fn to_millis(timestamp: OffsetDateTime) -> i64 {
    (timestamp.unix_timestamp_nanos() / 1_000_000) as i64
}

/// Convert stored unix-epoch milliseconds back to a UTC timestamp.
pub(crate) fn from_millis(millis: i64) -> Result<OffsetDateTime, sqlx::Error> {
    OffsetDateTime::from_unix_timestamp_nanos(millis as i128 * 1_000_000).map_err(|e| {
        sqlx::Error::ColumnDecode {
            index: "timestamp".to_string(),
            source: Box::new(e),
        }
    })
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for AssetRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            asset_id: row.try_get("asset_id")?,
            repository_id: row.try_get("repository_id")?,
            path: row.try_get("path")?,
            kind: row.try_get("kind")?,
            content_type: row.try_get("content_type")?,
            checksums: row.try_get("checksums")?,
            attributes: row.try_get("attributes")?,
            component_id: row.try_get("component_id")?,
            blob_ref: row.try_get("blob_ref")?,
            created_at: from_millis(row.try_get("created_at")?)?,
            last_updated: from_millis(row.try_get("last_updated")?)?,
            last_downloaded: row
                .try_get::<Option<i64>, _>("last_downloaded")?
                .map(from_millis)
                .transpose()?,
        })
    }
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for ComponentRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            component_id: row.try_get("component_id")?,
            repository_id: row.try_get("repository_id")?,
            namespace: row.try_get("namespace")?,
            name: row.try_get("name")?,
            version: row.try_get("version")?,
            base_version: row.try_get("base_version")?,
            kind: row.try_get("kind")?,
            attributes: row.try_get("attributes")?,
            created_at: from_millis(row.try_get("created_at")?)?,
        })
    }
}
