//! [`Storer`] implementation for MongoDB.

use std::sync::Arc;

use async_trait::async_trait;
use mongodb::Client;
use mongodb::options::ClientOptions;

use rested_resource::error::{ClearError, StorageResult};
use rested_resource::item::{ID_FIELD, Item, ItemList};
use rested_resource::query::Query;
use rested_resource::{RequestContext, Storer};

use crate::clear::ClearStrategy;
use crate::client::{CollectionResolver, DocumentCollection, MongoResolver, map_store_error};
use crate::config::MongoConfig;
use crate::document::{ID_KEY, to_bson, to_document};
use crate::etag::id_text;
use crate::find;
use crate::guard::ConcurrencyGuard;

/// Stores resource items in a MongoDB collection.
///
/// The handler keeps no state besides its resolver; it can be shared freely
/// between tasks.
#[derive(Clone)]
pub struct MongoHandler {
    resolver: Arc<dyn CollectionResolver>,
}

impl std::fmt::Debug for MongoHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoHandler").finish_non_exhaustive()
    }
}

impl MongoHandler {
    /// Creates a handler resolving its collection through `resolver`.
    pub fn new(resolver: Arc<dyn CollectionResolver>) -> Self {
        Self { resolver }
    }

    /// Creates a handler bound to a single collection.
    pub fn with_collection<C>(collection: Arc<C>) -> Self
    where
        C: DocumentCollection + 'static,
    {
        Self::new(Arc::new(collection))
    }

    /// Creates a handler for `database.collection` on an existing client.
    pub fn from_client(
        client: Client,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self::new(Arc::new(MongoResolver::new(client, database, collection)))
    }

    /// Connects to MongoDB using `config`.
    pub async fn connect(config: &MongoConfig) -> StorageResult<Self> {
        config.validate()?;

        let mut options = ClientOptions::parse(config.uri.as_str())
            .await
            .map_err(|e| map_store_error(e.into()))?;
        if let Some(app_name) = &config.app_name {
            options.app_name = Some(app_name.clone());
        }
        options.connect_timeout = Some(config.connect_timeout);
        options.server_selection_timeout = Some(config.server_selection_timeout);

        let client = Client::with_options(options).map_err(|e| map_store_error(e.into()))?;
        tracing::debug!(
            database = %config.database,
            collection = %config.collection,
            "MongoDB handler configured"
        );
        Ok(Self::from_client(
            client,
            config.database.clone(),
            config.collection.clone(),
        ))
    }

    async fn collection(&self, ctx: &RequestContext) -> StorageResult<Arc<dyn DocumentCollection>> {
        ctx.check()?;
        self.resolver.resolve(ctx).await
    }
}

#[async_trait]
impl Storer for MongoHandler {
    async fn insert(&self, ctx: &RequestContext, items: &[Item]) -> StorageResult<()> {
        if items.is_empty() {
            return Ok(());
        }
        let documents = items
            .iter()
            .map(to_document)
            .collect::<StorageResult<Vec<_>>>()?;

        let collection = self.collection(ctx).await?;
        ctx.run(async {
            collection
                .insert_many(documents)
                .await
                .map_err(map_store_error)
        })
        .await
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        item: &Item,
        original: &Item,
    ) -> StorageResult<()> {
        let id = to_bson(ID_FIELD, &original.id)?;
        let mut replacement = to_document(item)?;
        if replacement.get(ID_KEY) != Some(&id) {
            // The stored identifier is immutable; the original's wins.
            tracing::debug!(
                id = %id_text(&id),
                "update carries a different identifier, keeping the original"
            );
            replacement.insert(ID_KEY, id.clone());
        }

        let collection = self.collection(ctx).await?;
        ConcurrencyGuard::new(ctx, collection.as_ref())
            .replace(id, &original.etag, replacement)
            .await
    }

    async fn delete(&self, ctx: &RequestContext, item: &Item) -> StorageResult<()> {
        let id = to_bson(ID_FIELD, &item.id)?;
        let collection = self.collection(ctx).await?;
        ConcurrencyGuard::new(ctx, collection.as_ref())
            .delete(id, &item.etag)
            .await
    }

    async fn clear(&self, ctx: &RequestContext, query: &Query) -> Result<u64, ClearError> {
        let strategy = ClearStrategy::for_query(query)?;
        tracing::debug!(?strategy, "clearing items");
        let collection = self.collection(ctx).await?;
        strategy.execute(ctx, collection.as_ref()).await
    }

    async fn find(&self, ctx: &RequestContext, query: &Query) -> StorageResult<ItemList> {
        let collection = self.collection(ctx).await?;
        find::find(ctx, collection.as_ref(), query).await
    }

    async fn count(&self, ctx: &RequestContext, query: &Query) -> StorageResult<u64> {
        let collection = self.collection(ctx).await?;
        find::count(ctx, collection.as_ref(), query).await
    }
}
