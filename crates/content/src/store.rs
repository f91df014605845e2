//! Content store trait and SQLite implementation.

use crate::error::{ContentError, ContentResult};
use crate::repos::{AssetRepo, ComponentRepo};
use async_trait::async_trait;
use depot_core::ContentConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined content store trait.
#[async_trait]
pub trait ContentStore: AssetRepo + ComponentRepo + Send + Sync {
    /// Create or update the database schema.
    async fn migrate(&self) -> ContentResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> ContentResult<()>;
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS components (
    component_id INTEGER PRIMARY KEY AUTOINCREMENT,
    repository_id INTEGER NOT NULL,
    namespace TEXT NOT NULL,
    name TEXT NOT NULL,
    version TEXT NOT NULL,
    base_version TEXT,
    kind TEXT NOT NULL DEFAULT '',
    attributes TEXT NOT NULL DEFAULT '{}',
    created_at INTEGER NOT NULL,
    UNIQUE (repository_id, namespace, name, version)
);

CREATE TABLE IF NOT EXISTS assets (
    asset_id INTEGER PRIMARY KEY AUTOINCREMENT,
    repository_id INTEGER NOT NULL,
    path TEXT NOT NULL,
    kind TEXT NOT NULL DEFAULT '',
    content_type TEXT,
    checksums TEXT NOT NULL DEFAULT '{}',
    attributes TEXT NOT NULL DEFAULT '{}',
    component_id INTEGER REFERENCES components(component_id) ON DELETE SET NULL,
    blob_ref TEXT,
    created_at INTEGER NOT NULL,
    last_updated INTEGER NOT NULL,
    last_downloaded INTEGER,
    UNIQUE (repository_id, path)
);

CREATE INDEX IF NOT EXISTS idx_assets_last_updated ON assets (repository_id, last_updated);
CREATE INDEX IF NOT EXISTS idx_assets_component ON assets (component_id);
CREATE INDEX IF NOT EXISTS idx_components_coordinate ON components (repository_id, namespace, name);
"#;

/// SQLite-based content store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    delete_batch_size: u32,
}

impl SqliteStore {
    /// Open (or create) a SQLite content store.
    pub async fn new(config: &ContentConfig) -> ContentResult<Self> {
        let path: &Path = &config.path;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ContentError::Config(format!("creating {}: {e}", parent.display())))?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(config.busy_timeout_secs));

        let pool = SqlitePoolOptions::new()
            // SQLite permits limited write concurrency; a single connection
            // avoids persistent "database is locked" failures.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self {
            pool,
            delete_batch_size: config.delete_batch_size.max(1),
        };
        store.migrate().await?;
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl ContentStore for SqliteStore {
    async fn migrate(&self) -> ContentResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> ContentResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.message().contains("UNIQUE constraint"))
}

fn encode_json<T: serde::Serialize>(value: &T) -> ContentResult<String> {
    serde_json::to_string(value).map_err(|e| ContentError::Internal(format!("encoding json: {e}")))
}

/// Appended filter over path LIKE expressions, OR-combined.
fn path_expression_clause(count: usize) -> String {
    if count == 0 {
        return String::new();
    }
    let likes = vec![r"path LIKE ? ESCAPE '\'"; count];
    format!(" AND ({})", likes.join(" OR "))
}

mod sqlite_impl {
    use super::*;
    use crate::continuation::{Continuation, ContinuationToken};
    use crate::models::{AssetData, AssetRow, ComponentData, ComponentRow, to_millis};
    use crate::repos::components::ComponentFilter;
    use depot_core::AttributeChangeSet;
    use time::{Duration, OffsetDateTime};

    #[async_trait]
    impl AssetRepo for SqliteStore {
        async fn create_asset(&self, asset: &AssetData) -> ContentResult<i64> {
            let result = sqlx::query(
                r#"
                INSERT INTO assets (
                    repository_id, path, kind, content_type, checksums,
                    attributes, component_id, blob_ref, created_at,
                    last_updated, last_downloaded
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL)
                "#,
            )
            .bind(asset.repository_id)
            .bind(&asset.path)
            .bind(&asset.kind)
            .bind(&asset.content_type)
            .bind(encode_json(&asset.checksums)?)
            .bind(encode_json(&asset.attributes)?)
            .bind(asset.component_id)
            .bind(&asset.blob_ref)
            .bind(to_millis(asset.created_at))
            .bind(to_millis(asset.last_updated))
            .execute(&self.pool)
            .await;

            match result {
                Ok(done) => Ok(done.last_insert_rowid()),
                Err(e) if is_unique_violation(&e) => Err(ContentError::AlreadyExists(format!(
                    "asset '{}' in repository {}",
                    asset.path, asset.repository_id
                ))),
                Err(e) => Err(e.into()),
            }
        }

        async fn read_path(
            &self,
            repository_id: i64,
            path: &str,
        ) -> ContentResult<Option<AssetRow>> {
            let row = sqlx::query_as::<_, AssetRow>(
                "SELECT * FROM assets WHERE repository_id = ? AND path = ?",
            )
            .bind(repository_id)
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn browse_assets(
            &self,
            repository_id: i64,
            continuation: Option<&ContinuationToken>,
            kind: Option<&str>,
            limit: u32,
        ) -> ContentResult<Continuation<AssetRow>> {
            let after_id = match continuation {
                Some(token) => token.decode_id()?,
                None => 0,
            };

            let mut sql = String::from(
                "SELECT * FROM assets WHERE repository_id = ? AND asset_id > ?",
            );
            if kind.is_some() {
                sql.push_str(" AND kind = ?");
            }
            sql.push_str(" ORDER BY asset_id LIMIT ?");

            let mut query = sqlx::query_as::<_, AssetRow>(&sql)
                .bind(repository_id)
                .bind(after_id);
            if let Some(kind) = kind {
                query = query.bind(kind);
            }
            let items = query.bind(limit).fetch_all(&self.pool).await?;

            let next_token = if items.len() as u32 == limit {
                items.last().map(|asset| ContinuationToken::after_id(asset.asset_id))
            } else {
                None
            };
            Ok(Continuation { items, next_token })
        }

        async fn browse_assets_in_repositories(
            &self,
            repository_ids: &[i64],
            continuation: Option<&ContinuationToken>,
            kind: Option<&str>,
            limit: u32,
        ) -> ContentResult<Continuation<AssetRow>> {
            if repository_ids.is_empty() {
                return Ok(Continuation {
                    items: Vec::new(),
                    next_token: None,
                });
            }

            let after_id = match continuation {
                Some(token) => token.decode_id()?,
                None => 0,
            };

            let placeholders = vec!["?"; repository_ids.len()].join(", ");
            let mut sql = format!(
                "SELECT * FROM assets WHERE repository_id IN ({placeholders}) AND asset_id > ?",
            );
            if kind.is_some() {
                sql.push_str(" AND kind = ?");
            }
            sql.push_str(" ORDER BY asset_id LIMIT ?");

            let mut query = sqlx::query_as::<_, AssetRow>(&sql);
            for repository_id in repository_ids {
                query = query.bind(repository_id);
            }
            query = query.bind(after_id);
            if let Some(kind) = kind {
                query = query.bind(kind);
            }
            let items = query.bind(limit).fetch_all(&self.pool).await?;

            let next_token = if items.len() as u32 == limit {
                items.last().map(|asset| ContinuationToken::after_id(asset.asset_id))
            } else {
                None
            };
            Ok(Continuation { items, next_token })
        }

        async fn count_assets(
            &self,
            repository_id: i64,
            kind: Option<&str>,
        ) -> ContentResult<u64> {
            let count: i64 = match kind {
                Some(kind) => {
                    sqlx::query_scalar(
                        "SELECT COUNT(*) FROM assets WHERE repository_id = ? AND kind = ?",
                    )
                    .bind(repository_id)
                    .bind(kind)
                    .fetch_one(&self.pool)
                    .await?
                }
                None => {
                    sqlx::query_scalar("SELECT COUNT(*) FROM assets WHERE repository_id = ?")
                        .bind(repository_id)
                        .fetch_one(&self.pool)
                        .await?
                }
            };
            Ok(count as u64)
        }

        async fn update_asset_attributes(
            &self,
            repository_id: i64,
            path: &str,
            changes: &AttributeChangeSet,
            updated_at: OffsetDateTime,
        ) -> ContentResult<bool> {
            // Reload latest attributes, apply the change set, then write back
            // only when something actually changed.
            let mut tx = self.pool.begin().await?;

            let stored: Option<String> = sqlx::query_scalar(
                "SELECT attributes FROM assets WHERE repository_id = ? AND path = ?",
            )
            .bind(repository_id)
            .bind(path)
            .fetch_optional(&mut *tx)
            .await?;

            let Some(stored) = stored else {
                return Ok(false);
            };

            let mut attributes = serde_json::from_str(&stored).unwrap_or_default();
            if !changes.apply(&mut attributes) {
                return Ok(false);
            }

            sqlx::query(
                "UPDATE assets SET attributes = ?, last_updated = ? WHERE repository_id = ? AND path = ?",
            )
            .bind(encode_json(&attributes)?)
            .bind(to_millis(updated_at))
            .bind(repository_id)
            .bind(path)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(true)
        }

        async fn update_asset_kind(
            &self,
            repository_id: i64,
            path: &str,
            kind: &str,
            updated_at: OffsetDateTime,
        ) -> ContentResult<bool> {
            let result = sqlx::query(
                "UPDATE assets SET kind = ?, last_updated = ? \
                 WHERE repository_id = ? AND path = ? AND kind <> ?",
            )
            .bind(kind)
            .bind(to_millis(updated_at))
            .bind(repository_id)
            .bind(path)
            .bind(kind)
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected() > 0)
        }

        async fn update_asset_blob_link(
            &self,
            repository_id: i64,
            path: &str,
            blob_ref: Option<&str>,
            checksums_json: &str,
            updated_at: OffsetDateTime,
        ) -> ContentResult<bool> {
            let result = sqlx::query(
                "UPDATE assets SET blob_ref = ?, checksums = ?, last_updated = ? \
                 WHERE repository_id = ? AND path = ? \
                   AND (blob_ref IS NOT ? OR checksums <> ?)",
            )
            .bind(blob_ref)
            .bind(checksums_json)
            .bind(to_millis(updated_at))
            .bind(repository_id)
            .bind(path)
            .bind(blob_ref)
            .bind(checksums_json)
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected() > 0)
        }

        async fn mark_downloaded(
            &self,
            repository_id: i64,
            path: &str,
            downloaded_at: OffsetDateTime,
        ) -> ContentResult<()> {
            sqlx::query(
                "UPDATE assets SET last_downloaded = ?, last_updated = ? \
                 WHERE repository_id = ? AND path = ?",
            )
            .bind(to_millis(downloaded_at))
            .bind(to_millis(downloaded_at))
            .bind(repository_id)
            .bind(path)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn delete_path(&self, repository_id: i64, path: &str) -> ContentResult<bool> {
            let result = sqlx::query("DELETE FROM assets WHERE repository_id = ? AND path = ?")
                .bind(repository_id)
                .bind(path)
                .execute(&self.pool)
                .await?;
            Ok(result.rows_affected() > 0)
        }

        async fn delete_assets(&self, repository_id: i64) -> ContentResult<bool> {
            tracing::debug!(repository_id, "deleting all assets in repository");
            let mut deleted = false;
            // Bounded batches, each in its own transaction, so a large
            // repository never holds a long-lived write lock.
            loop {
                let result = sqlx::query(
                    "DELETE FROM assets WHERE asset_id IN (
                        SELECT asset_id FROM assets WHERE repository_id = ? LIMIT ?
                    )",
                )
                .bind(repository_id)
                .bind(self.delete_batch_size)
                .execute(&self.pool)
                .await?;

                if result.rows_affected() == 0 {
                    break;
                }
                deleted = true;
            }
            Ok(deleted)
        }

        async fn purge_not_recently_downloaded(
            &self,
            repository_id: i64,
            days_ago: i64,
            as_of: OffsetDateTime,
        ) -> ContentResult<u64> {
            let cutoff = to_millis(as_of - Duration::days(days_ago));
            let mut purged = 0u64;
            loop {
                let result = sqlx::query(
                    "DELETE FROM assets WHERE asset_id IN (
                        SELECT asset_id FROM assets
                        WHERE repository_id = ?
                          AND component_id IS NULL
                          AND COALESCE(last_downloaded, created_at) < ?
                        LIMIT ?
                    )",
                )
                .bind(repository_id)
                .bind(cutoff)
                .bind(self.delete_batch_size)
                .execute(&self.pool)
                .await?;

                if result.rows_affected() == 0 {
                    break;
                }
                purged += result.rows_affected();
            }
            Ok(purged)
        }

        async fn find_greater_equal_last_updated(
            &self,
            repository_id: i64,
            last_updated: Option<OffsetDateTime>,
            path_expressions: &[String],
            limit: u32,
        ) -> ContentResult<Vec<AssetRow>> {
            let mut sql = String::from("SELECT * FROM assets WHERE repository_id = ?");
            if last_updated.is_some() {
                sql.push_str(" AND last_updated >= ?");
            }
            sql.push_str(&path_expression_clause(path_expressions.len()));
            sql.push_str(" ORDER BY last_updated, asset_id LIMIT ?");

            let mut query = sqlx::query_as::<_, AssetRow>(&sql).bind(repository_id);
            if let Some(bound) = last_updated {
                query = query.bind(to_millis(bound));
            }
            for expression in path_expressions {
                query = query.bind(expression);
            }
            let rows = query.bind(limit).fetch_all(&self.pool).await?;
            Ok(rows)
        }

        async fn find_last_updated_within_range(
            &self,
            repository_id: i64,
            start: OffsetDateTime,
            end: OffsetDateTime,
            path_expressions: &[String],
            limit: u32,
        ) -> ContentResult<Vec<AssetRow>> {
            let mut sql = String::from(
                "SELECT * FROM assets WHERE repository_id = ? AND last_updated >= ? AND last_updated < ?",
            );
            sql.push_str(&path_expression_clause(path_expressions.len()));
            sql.push_str(" ORDER BY last_updated, asset_id LIMIT ?");

            let mut query = sqlx::query_as::<_, AssetRow>(&sql)
                .bind(repository_id)
                .bind(to_millis(start))
                .bind(to_millis(end));
            for expression in path_expressions {
                query = query.bind(expression);
            }
            let rows = query.bind(limit).fetch_all(&self.pool).await?;
            Ok(rows)
        }
    }

    #[async_trait]
    impl ComponentRepo for SqliteStore {
        async fn create_component(&self, component: &ComponentData) -> ContentResult<i64> {
            let result = sqlx::query(
                r#"
                INSERT INTO components (
                    repository_id, namespace, name, version, base_version,
                    kind, attributes, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(component.repository_id)
            .bind(&component.namespace)
            .bind(&component.name)
            .bind(&component.version)
            .bind(&component.base_version)
            .bind(&component.kind)
            .bind(encode_json(&component.attributes)?)
            .bind(to_millis(component.created_at))
            .execute(&self.pool)
            .await;

            match result {
                Ok(done) => Ok(done.last_insert_rowid()),
                Err(e) if is_unique_violation(&e) => Err(ContentError::AlreadyExists(format!(
                    "component {}:{}:{} in repository {}",
                    component.namespace,
                    component.name,
                    component.version,
                    component.repository_id
                ))),
                Err(e) => Err(e.into()),
            }
        }

        async fn find_component(
            &self,
            repository_id: i64,
            namespace: &str,
            name: &str,
            version: &str,
        ) -> ContentResult<Option<ComponentRow>> {
            let row = sqlx::query_as::<_, ComponentRow>(
                "SELECT * FROM components \
                 WHERE repository_id = ? AND namespace = ? AND name = ? AND version = ?",
            )
            .bind(repository_id)
            .bind(namespace)
            .bind(name)
            .bind(version)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn namespaces(&self, repository_id: i64) -> ContentResult<Vec<String>> {
            let rows: Vec<String> = sqlx::query_scalar(
                "SELECT DISTINCT namespace FROM components WHERE repository_id = ? ORDER BY namespace",
            )
            .bind(repository_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn names(&self, repository_id: i64, namespace: &str) -> ContentResult<Vec<String>> {
            let rows: Vec<String> = sqlx::query_scalar(
                "SELECT DISTINCT name FROM components \
                 WHERE repository_id = ? AND namespace = ? ORDER BY name",
            )
            .bind(repository_id)
            .bind(namespace)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn base_versions(
            &self,
            repository_id: i64,
            namespace: &str,
            name: &str,
        ) -> ContentResult<Vec<String>> {
            let rows: Vec<String> = sqlx::query_scalar(
                "SELECT DISTINCT COALESCE(base_version, version) FROM components \
                 WHERE repository_id = ? AND namespace = ? AND name = ? ORDER BY 1",
            )
            .bind(repository_id)
            .bind(namespace)
            .bind(name)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn browse_components(
            &self,
            repository_id: i64,
            filter: &ComponentFilter,
            continuation: Option<&ContinuationToken>,
            limit: u32,
        ) -> ContentResult<Continuation<ComponentRow>> {
            let after_id = match continuation {
                Some(token) => token.decode_id()?,
                None => 0,
            };

            let mut sql = String::from(
                "SELECT * FROM components WHERE repository_id = ? AND component_id > ?",
            );
            if filter.namespace.is_some() {
                sql.push_str(" AND namespace = ?");
            }
            if filter.name.is_some() {
                sql.push_str(" AND name = ?");
            }
            if filter.base_version.is_some() {
                sql.push_str(" AND (base_version = ? OR version = ?)");
            }
            sql.push_str(" ORDER BY component_id LIMIT ?");

            let mut query = sqlx::query_as::<_, ComponentRow>(&sql)
                .bind(repository_id)
                .bind(after_id);
            if let Some(namespace) = &filter.namespace {
                query = query.bind(namespace);
            }
            if let Some(name) = &filter.name {
                query = query.bind(name);
            }
            if let Some(base_version) = &filter.base_version {
                query = query.bind(base_version).bind(base_version);
            }
            let items = query.bind(limit).fetch_all(&self.pool).await?;

            let next_token = if items.len() as u32 == limit {
                items
                    .last()
                    .map(|component| ContinuationToken::after_id(component.component_id))
            } else {
                None
            };
            Ok(Continuation { items, next_token })
        }

        async fn browse_component_assets(
            &self,
            component_id: i64,
        ) -> ContentResult<Vec<AssetRow>> {
            let rows = sqlx::query_as::<_, AssetRow>(
                "SELECT * FROM assets WHERE component_id = ? ORDER BY asset_id",
            )
            .bind(component_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }
    }
}
