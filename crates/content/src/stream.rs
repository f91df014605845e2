//! Flattening browse pages into record streams.
//!
//! Browse operations return bounded pages so each store round-trip stays
//! short; these helpers hide the continuation loop behind a `Stream` for
//! callers that just want every matching record.

use crate::continuation::ContinuationToken;
use crate::error::ContentResult;
use crate::models::{AssetRow, ComponentRow};
use crate::repos::components::ComponentFilter;
use crate::store::ContentStore;
use futures::Stream;
use std::pin::Pin;

/// Stream every component matching `filter`, fetching `page_size` records
/// per store round-trip. The stream borrows the store.
pub fn stream_components<'a>(
    store: &'a dyn ContentStore,
    repository_id: i64,
    filter: ComponentFilter,
    page_size: u32,
) -> Pin<Box<dyn Stream<Item = ContentResult<ComponentRow>> + Send + 'a>> {
    Box::pin(async_stream::try_stream! {
        let mut token: Option<ContinuationToken> = None;
        loop {
            let page = store
                .browse_components(repository_id, &filter, token.as_ref(), page_size)
                .await?;
            for component in page.items {
                yield component;
            }
            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }
    })
}

/// Stream every asset in a repository, fetching `page_size` records per
/// store round-trip.
pub fn stream_assets<'a>(
    store: &'a dyn ContentStore,
    repository_id: i64,
    kind: Option<String>,
    page_size: u32,
) -> Pin<Box<dyn Stream<Item = ContentResult<AssetRow>> + Send + 'a>> {
    Box::pin(async_stream::try_stream! {
        let mut token: Option<ContinuationToken> = None;
        loop {
            let page = store
                .browse_assets(repository_id, token.as_ref(), kind.as_deref(), page_size)
                .await?;
            for asset in page.items {
                yield asset;
            }
            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }
    })
}
