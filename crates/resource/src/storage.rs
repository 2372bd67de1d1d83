//! Storage handler contract.
//!
//! This module defines the [`Storer`] trait, which every storage handler
//! implements to persist and query resource items. All operations take a
//! [`RequestContext`] and must stop as soon as it is cancelled.

use async_trait::async_trait;

use crate::context::RequestContext;
use crate::error::{ClearError, StorageResult};
use crate::item::{Item, ItemList};
use crate::query::Query;

/// Core storage trait for resource items.
///
/// # Versioning
///
/// Items carry an ETag. `update` and `delete` only succeed if the stored item
/// still carries the ETag of the item the caller holds, otherwise they fail
/// with a conflict (item modified) or not-found (item gone).
///
/// # Example
///
/// ```ignore
/// use rested_resource::{Item, Query, RequestContext, Storer};
///
/// async fn rename<S: Storer>(storage: &S, original: &Item) -> StorageResult<()> {
///     let ctx = RequestContext::new();
///     let mut item = original.clone();
///     item.etag = "new-etag".to_string();
///     item.payload.insert("name".into(), serde_json::json!("renamed"));
///     storage.update(&ctx, &item, original).await
/// }
/// ```
#[async_trait]
pub trait Storer: Send + Sync {
    /// Stores new items.
    ///
    /// # Errors
    ///
    /// * `StorageError::Concurrency(DuplicateId)` - If an identifier is already stored
    /// * `StorageError::Cancelled` - If the context ended
    async fn insert(&self, ctx: &RequestContext, items: &[Item]) -> StorageResult<()>;

    /// Replaces `original` with `item`.
    ///
    /// `original` supplies the identifier and the ETag the stored item must
    /// still carry.
    ///
    /// # Errors
    ///
    /// * `StorageError::Resource(NotFound)` - If the item doesn't exist
    /// * `StorageError::Concurrency(VersionConflict)` - If the item was modified
    /// * `StorageError::Cancelled` - If the context ended
    async fn update(&self, ctx: &RequestContext, item: &Item, original: &Item)
    -> StorageResult<()>;

    /// Deletes an item, provided its stored ETag still matches.
    ///
    /// # Errors
    ///
    /// * `StorageError::Resource(NotFound)` - If the item doesn't exist
    /// * `StorageError::Concurrency(VersionConflict)` - If the item was modified
    /// * `StorageError::Cancelled` - If the context ended
    async fn delete(&self, ctx: &RequestContext, item: &Item) -> StorageResult<()>;

    /// Deletes every item matching the query, honoring its window.
    ///
    /// Returns the number of deleted items. On failure the error still carries
    /// how many items were removed before it happened.
    async fn clear(&self, ctx: &RequestContext, query: &Query) -> Result<u64, ClearError>;

    /// Finds items matching the query.
    async fn find(&self, ctx: &RequestContext, query: &Query) -> StorageResult<ItemList>;

    /// Counts items matching the query's predicates.
    async fn count(&self, ctx: &RequestContext, query: &Query) -> StorageResult<u64>;
}
