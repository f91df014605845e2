//! Asset repository and the incremental change cursor.

use crate::continuation::{Continuation, ContinuationToken};
use crate::error::ContentResult;
use crate::models::{AssetData, AssetRow};
use async_trait::async_trait;
use depot_core::AttributeChangeSet;
use std::collections::HashSet;
use time::{Duration, OffsetDateTime};

/// Safety ceiling for the supplementary tie-group query. Pages with more than
/// this many identical last-updated values can lose records past the ceiling;
/// a known limitation, reported via a warning rather than an error.
pub const TIE_GROUP_LIMIT: u32 = 1000;

/// Repository for asset operations.
#[async_trait]
pub trait AssetRepo: Send + Sync {
    /// Create an asset. Fails with `AlreadyExists` when the repository
    /// already holds an asset at the same path.
    async fn create_asset(&self, asset: &AssetData) -> ContentResult<i64>;

    /// Get the asset at a path.
    async fn read_path(&self, repository_id: i64, path: &str) -> ContentResult<Option<AssetRow>>;

    /// Browse assets ordered by internal id.
    async fn browse_assets(
        &self,
        repository_id: i64,
        continuation: Option<&ContinuationToken>,
        kind: Option<&str>,
        limit: u32,
    ) -> ContentResult<Continuation<AssetRow>>;

    /// Browse assets across a set of repositories, sorted by asset id
    /// ascending.
    async fn browse_assets_in_repositories(
        &self,
        repository_ids: &[i64],
        continuation: Option<&ContinuationToken>,
        kind: Option<&str>,
        limit: u32,
    ) -> ContentResult<Continuation<AssetRow>>;

    /// Count assets, optionally restricted to one kind.
    async fn count_assets(&self, repository_id: i64, kind: Option<&str>) -> ContentResult<u64>;

    /// Apply an attribute change set to the asset at a path.
    ///
    /// The stored bag is reloaded, the changes applied, and the row written
    /// back only when something actually changed; a no-op change set leaves
    /// `last_updated` untouched. Returns whether the asset changed.
    async fn update_asset_attributes(
        &self,
        repository_id: i64,
        path: &str,
        changes: &AttributeChangeSet,
        updated_at: OffsetDateTime,
    ) -> ContentResult<bool>;

    /// Update the asset's kind; setting the current kind again is a no-op
    /// that does not advance `last_updated`. Returns whether it changed.
    async fn update_asset_kind(
        &self,
        repository_id: i64,
        path: &str,
        kind: &str,
        updated_at: OffsetDateTime,
    ) -> ContentResult<bool>;

    /// Update the asset's blob link and recorded checksums; a link identical
    /// to the current one is a no-op. Returns whether it changed.
    async fn update_asset_blob_link(
        &self,
        repository_id: i64,
        path: &str,
        blob_ref: Option<&str>,
        checksums_json: &str,
        updated_at: OffsetDateTime,
    ) -> ContentResult<bool>;

    /// Record a download of the asset at a path.
    async fn mark_downloaded(
        &self,
        repository_id: i64,
        path: &str,
        downloaded_at: OffsetDateTime,
    ) -> ContentResult<()>;

    /// Delete the asset at a path. Returns whether anything was deleted.
    async fn delete_path(&self, repository_id: i64, path: &str) -> ContentResult<bool>;

    /// Delete all assets in a repository in bounded batches, committing
    /// between batches to keep transactions short.
    async fn delete_assets(&self, repository_id: i64) -> ContentResult<bool>;

    /// Purge component-less assets not downloaded for the given number of
    /// days, in bounded batches. Returns the number purged.
    async fn purge_not_recently_downloaded(
        &self,
        repository_id: i64,
        days_ago: i64,
        as_of: OffsetDateTime,
    ) -> ContentResult<u64>;

    /// Low-level cursor query: assets with `last_updated >=` the bound (no
    /// bound means from the beginning), matched against the given LIKE
    /// expressions, ordered by `last_updated` ascending.
    async fn find_greater_equal_last_updated(
        &self,
        repository_id: i64,
        last_updated: Option<OffsetDateTime>,
        path_expressions: &[String],
        limit: u32,
    ) -> ContentResult<Vec<AssetRow>>;

    /// Low-level cursor query: assets with `last_updated` in `[start, end)`.
    async fn find_last_updated_within_range(
        &self,
        repository_id: i64,
        start: OffsetDateTime,
        end: OffsetDateTime,
        path_expressions: &[String],
        limit: u32,
    ) -> ContentResult<Vec<AssetRow>>;

    /// Find updated assets. Paging works differently from [`browse_assets`]
    /// because results are sorted by `last_updated` instead of id: page
    /// through by passing the `last_updated` of the last record of the
    /// previous call. May return more than `batch_size` assets when several
    /// share the last record's `last_updated` value, so that a tie group is
    /// never split across a page boundary.
    async fn find_updated_assets(
        &self,
        repository_id: i64,
        last_updated: Option<OffsetDateTime>,
        wildcard_expressions: &[String],
        batch_size: u32,
    ) -> ContentResult<Vec<AssetRow>> {
        let batch_size = batch_size.max(1);
        let path_expressions: Vec<String> = wildcard_expressions
            .iter()
            .map(|expression| convert_wildcard_to_like(expression))
            .collect();

        // Dates are considered the same when they match at the millisecond.
        // Normalizing the bound and using a >= query has the effect of a >
        // query as if the stored data were truncated to the millisecond.
        let normalized = last_updated
            .map(|bound| truncate_to_millis(bound + Duration::milliseconds(1)));

        // Fetch one extra record to check whether more results share the last
        // record's last_updated value. Most of the time they won't, and the
        // supplementary query is skipped.
        let mut assets = self
            .find_greater_equal_last_updated(
                repository_id,
                normalized,
                &path_expressions,
                batch_size + 1,
            )
            .await?;

        if assets.len() as u32 == batch_size + 1 {
            if has_trailing_tie(&assets) {
                let last = &assets[assets.len() - 1];
                let start = truncate_to_millis(last.last_updated);
                let end = start + Duration::milliseconds(1);

                // Pull every record matching the last record's (truncated)
                // timestamp so paging can continue with a greater-than query.
                let matching = self
                    .find_last_updated_within_range(
                        repository_id,
                        start,
                        end,
                        &path_expressions,
                        TIE_GROUP_LIMIT,
                    )
                    .await?;

                if matching.len() as u32 == TIE_GROUP_LIMIT {
                    tracing::warn!(
                        limit = TIE_GROUP_LIMIT,
                        last_updated = %last.last_updated,
                        "tie group hit the safety ceiling, assets beyond it may be skipped"
                    );
                }

                let known_paths: HashSet<String> =
                    assets.iter().map(|asset| asset.path.clone()).collect();
                assets.extend(
                    matching
                        .into_iter()
                        .filter(|asset| !known_paths.contains(&asset.path)),
                );
            } else {
                // Not safe to keep the extra record: more assets may share
                // its last_updated value.
                assets.pop();
            }
        }

        Ok(assets)
    }
}

fn has_trailing_tie(assets: &[AssetRow]) -> bool {
    let last = &assets[assets.len() - 1];
    let second_to_last = &assets[assets.len() - 2];
    truncate_to_millis(last.last_updated) == truncate_to_millis(second_to_last.last_updated)
}

/// Translate a `*`/`?` wildcard expression into a LIKE pattern matching
/// anywhere in the path. Characters significant to LIKE (`\`, `%`, `_`) are
/// escaped first so literal occurrences in paths keep matching literally.
pub fn convert_wildcard_to_like(expression: &str) -> String {
    let escaped = expression
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    let translated = escaped.replace('*', "%").replace('?', "_");
    format!("%{translated}%")
}

/// Truncate a timestamp to millisecond resolution.
pub(crate) fn truncate_to_millis(timestamp: OffsetDateTime) -> OffsetDateTime {
    let excess = timestamp.nanosecond() % 1_000_000;
    timestamp - Duration::nanoseconds(excess as i64)
}
