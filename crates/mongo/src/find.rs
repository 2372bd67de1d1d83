//! Find and count.

use rested_resource::RequestContext;
use rested_resource::error::StorageResult;
use rested_resource::item::{Item, ItemList};
use rested_resource::query::{Query, Window};

use crate::client::{DocumentCollection, FindSpec, map_store_error};
use crate::document::to_item;
use crate::query::{translate_filter, translate_sort, translate_window};

/// Infers the total number of matches from a single page.
///
/// A page shorter than its limit is the last one, so the total is known
/// unless the page is empty past a non-zero offset.
pub fn infer_total(window: Option<&Window>, returned: u64) -> Option<u64> {
    let (offset, limit) = match window {
        Some(window) => (window.offset, Some(window.limit)),
        None => (0, None),
    };
    if limit.is_some_and(|limit| returned >= limit) {
        return None;
    }
    match (offset, returned) {
        (0, n) => Some(n),
        (_, 0) => None,
        (offset, n) => Some(offset.saturating_add(n)),
    }
}

pub(crate) async fn find(
    ctx: &RequestContext,
    collection: &dyn DocumentCollection,
    query: &Query,
) -> StorageResult<ItemList> {
    let filter = translate_filter(query)?;
    let limit = query.window.map(|window| window.limit);

    // A zero limit asks for the total only.
    if limit == Some(0) {
        let total = ctx
            .run(async { collection.count_documents(filter).await.map_err(map_store_error) })
            .await?;
        return Ok(ItemList::new(Some(total), limit));
    }

    let mut spec = FindSpec {
        filter,
        sort: Some(translate_sort(query)?),
        ..Default::default()
    };
    if let Some(window) = &query.window {
        let (skip, limit) = translate_window(window);
        spec.skip = Some(skip);
        spec.limit = Some(limit);
    }

    let documents = ctx
        .run(async { collection.find(spec).await.map_err(map_store_error) })
        .await?;
    let items = documents
        .into_iter()
        .map(to_item)
        .collect::<StorageResult<Vec<Item>>>()?;

    let mut list = ItemList::new(infer_total(query.window.as_ref(), items.len() as u64), limit);
    list.items = items;
    Ok(list)
}

pub(crate) async fn count(
    ctx: &RequestContext,
    collection: &dyn DocumentCollection,
    query: &Query,
) -> StorageResult<u64> {
    let filter = translate_filter(query)?;
    ctx.run(async { collection.count_documents(filter).await.map_err(map_store_error) })
        .await
}
