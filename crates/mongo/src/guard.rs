//! Optimistic concurrency for conditional writes.
//!
//! A conditional write embeds the expected version in its filter. When the
//! store reports that nothing matched, a read by identifier alone tells a
//! missing item apart from a stale version.

use mongodb::bson::{Bson, Document, doc};

use rested_resource::RequestContext;
use rested_resource::error::{ConcurrencyError, ResourceError, StorageError, StorageResult};

use crate::client::{DocumentCollection, map_store_error};
use crate::document::ID_KEY;
use crate::etag::{VersionTag, id_text};

/// Issues version-checked writes against one collection.
pub(crate) struct ConcurrencyGuard<'a> {
    ctx: &'a RequestContext,
    collection: &'a dyn DocumentCollection,
}

impl<'a> ConcurrencyGuard<'a> {
    pub(crate) fn new(ctx: &'a RequestContext, collection: &'a dyn DocumentCollection) -> Self {
        Self { ctx, collection }
    }

    /// Replaces document `id` with `replacement` if it still carries `etag`.
    pub(crate) async fn replace(
        &self,
        id: Bson,
        etag: &str,
        replacement: Document,
    ) -> StorageResult<()> {
        let selector = VersionTag::parse(etag).selector(id.clone());
        let matched = self
            .ctx
            .run(async {
                self.collection
                    .replace_one(selector, replacement)
                    .await
                    .map_err(map_store_error)
            })
            .await?;
        if matched > 0 {
            return Ok(());
        }
        Err(self.explain_miss(id, etag).await)
    }

    /// Deletes document `id` if it still carries `etag`.
    pub(crate) async fn delete(&self, id: Bson, etag: &str) -> StorageResult<()> {
        let selector = VersionTag::parse(etag).selector(id.clone());
        let deleted = self
            .ctx
            .run(async {
                self.collection
                    .delete_one(selector)
                    .await
                    .map_err(map_store_error)
            })
            .await?;
        if deleted > 0 {
            return Ok(());
        }
        Err(self.explain_miss(id, etag).await)
    }

    /// Works out why a conditional write matched nothing.
    async fn explain_miss(&self, id: Bson, etag: &str) -> StorageError {
        let id_text = id_text(&id);
        let existing = self
            .ctx
            .run(async {
                self.collection
                    .find_one(doc! { ID_KEY: id })
                    .await
                    .map_err(map_store_error)
            })
            .await;

        match existing {
            Ok(None) => {
                tracing::debug!(id = %id_text, "conditional write missed: item not found");
                StorageError::Resource(ResourceError::NotFound { id: id_text })
            }
            Ok(Some(_)) => {
                tracing::debug!(
                    id = %id_text,
                    expected_etag = %etag,
                    correlation_id = ?self.ctx.correlation_id(),
                    "conditional write missed: version conflict"
                );
                StorageError::Concurrency(ConcurrencyError::VersionConflict {
                    id: id_text,
                    expected_etag: etag.to_string(),
                })
            }
            Err(err) => err,
        }
    }
}
