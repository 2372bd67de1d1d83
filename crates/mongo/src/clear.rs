//! Bulk deletion.
//!
//! MongoDB cannot delete a sorted, windowed slice of a collection directly.
//! A windowed clear therefore resolves the identifiers in the window first and
//! deletes exactly that set. An unwindowed clear deletes by filter.

use mongodb::bson::{Bson, Document, doc};

use rested_resource::RequestContext;
use rested_resource::error::{ClearError, StorageResult};
use rested_resource::query::Query;

use crate::client::{DocumentCollection, FindSpec, PartialDelete, map_store_error};
use crate::document::ID_KEY;
use crate::query::{translate_filter, translate_sort, translate_window};

/// How a clear selects the documents it removes.
#[derive(Debug, Clone, PartialEq)]
pub enum ClearStrategy {
    /// The window is empty; nothing is removed.
    Nothing,
    /// Remove every document matching the filter.
    ByFilter(Document),
    /// Read the identifiers in the window, then remove that set.
    ///
    /// The `$in` filter is bound by the server's maximum document size, which
    /// limits how large a window can be cleared at once.
    ByIds(FindSpec),
}

impl ClearStrategy {
    /// Picks the strategy for `query`.
    pub fn for_query(query: &Query) -> StorageResult<Self> {
        let filter = translate_filter(query)?;
        let Some(window) = &query.window else {
            return Ok(ClearStrategy::ByFilter(filter));
        };
        if window.limit == 0 {
            return Ok(ClearStrategy::Nothing);
        }

        let (skip, limit) = translate_window(window);
        Ok(ClearStrategy::ByIds(FindSpec {
            filter,
            sort: Some(translate_sort(query)?),
            skip: Some(skip),
            limit: Some(limit),
            projection: Some(doc! { ID_KEY: 1 }),
        }))
    }

    /// Runs the clear and returns the number of removed documents.
    pub(crate) async fn execute(
        self,
        ctx: &RequestContext,
        collection: &dyn DocumentCollection,
    ) -> Result<u64, ClearError> {
        let filter = match self {
            ClearStrategy::Nothing => {
                ctx.check()?;
                return Ok(0);
            }
            ClearStrategy::ByFilter(filter) => filter,
            ClearStrategy::ByIds(spec) => {
                let documents = ctx
                    .run(async { collection.find(spec).await.map_err(map_store_error) })
                    .await?;
                let ids: Vec<Bson> = documents
                    .into_iter()
                    .filter_map(|mut document| document.remove(ID_KEY))
                    .collect();
                tracing::debug!(resolved = ids.len(), "clearing resolved identifiers");
                if ids.is_empty() {
                    return Ok(0);
                }
                doc! { ID_KEY: { "$in": ids } }
            }
        };

        ctx.check()?;
        // The delete runs to completion so its count is never lost.
        match collection.delete_many(filter).await {
            Ok(deleted) => match ctx.err() {
                Some(reason) => {
                    tracing::warn!(
                        deleted,
                        correlation_id = ?ctx.correlation_id(),
                        "clear finished after the request was cancelled"
                    );
                    Err(ClearError::new(deleted, reason))
                }
                None => Ok(deleted),
            },
            Err(PartialDelete { deleted, error }) => {
                tracing::warn!(
                    deleted,
                    error = %error,
                    correlation_id = ?ctx.correlation_id(),
                    "clear failed part way"
                );
                Err(ClearError::new(deleted, map_store_error(error)))
            }
        }
    }
}
