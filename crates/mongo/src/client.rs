//! Store-facing collection API.
//!
//! [`DocumentCollection`] is the narrow set of collection operations the
//! handler issues. [`MongoCollection`] implements it on top of the `mongodb`
//! driver; tests substitute an in-memory collection. A [`CollectionResolver`]
//! hands out a ready-to-use collection for each request.

use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::Document;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::FindOptions;
use mongodb::{Client, Collection};
use thiserror::Error;

use rested_resource::RequestContext;
use rested_resource::error::{BackendError, ConcurrencyError, StorageError, StorageResult};

use crate::BACKEND_NAME;

/// MongoDB error code for duplicate key violations.
const DUPLICATE_KEY: i32 = 11000;

/// A find request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindSpec {
    /// Filter document.
    pub filter: Document,
    /// Sort document.
    pub sort: Option<Document>,
    /// Number of documents to skip.
    pub skip: Option<u64>,
    /// Maximum number of documents to return. Zero means unlimited.
    pub limit: Option<i64>,
    /// Projection document.
    pub projection: Option<Document>,
}

/// Failures reported by a collection.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A write reused an existing unique key.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// The server could not be reached or selected.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A document could not be encoded or decoded.
    #[error("document serialization failed: {0}")]
    Serialization(String),

    /// The server rejected the request.
    #[error("invalid request: {0}")]
    InvalidInput(String),

    /// Any other failure.
    #[error("{message}")]
    Internal {
        /// Failure description.
        message: String,
        /// Underlying driver error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// A bulk delete that failed, possibly after removing some documents.
#[derive(Debug, Error)]
#[error("{error} after deleting {deleted} documents")]
pub struct PartialDelete {
    /// Documents removed before the failure.
    pub deleted: u64,
    /// The failure.
    #[source]
    pub error: StoreError,
}

/// Collection operations used by the handler.
///
/// Write methods return the number of documents matched by their filter, so
/// the caller can tell "nothing matched" from success.
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    /// Inserts documents in order.
    async fn insert_many(&self, documents: Vec<Document>) -> Result<(), StoreError>;

    /// Replaces the first document matching `filter`. Returns the matched count.
    async fn replace_one(&self, filter: Document, replacement: Document)
    -> Result<u64, StoreError>;

    /// Deletes the first document matching `filter`. Returns the deleted count.
    async fn delete_one(&self, filter: Document) -> Result<u64, StoreError>;

    /// Deletes every document matching `filter`. Returns the deleted count.
    async fn delete_many(&self, filter: Document) -> Result<u64, PartialDelete>;

    /// Runs a find and collects every returned document.
    async fn find(&self, spec: FindSpec) -> Result<Vec<Document>, StoreError>;

    /// Returns the first document matching `filter`.
    async fn find_one(&self, filter: Document) -> Result<Option<Document>, StoreError>;

    /// Counts documents matching `filter`.
    async fn count_documents(&self, filter: Document) -> Result<u64, StoreError>;
}

/// [`DocumentCollection`] backed by the `mongodb` driver.
#[derive(Debug, Clone)]
pub struct MongoCollection {
    inner: Collection<Document>,
}

impl MongoCollection {
    /// Wraps a driver collection.
    pub fn new(inner: Collection<Document>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl DocumentCollection for MongoCollection {
    async fn insert_many(&self, documents: Vec<Document>) -> Result<(), StoreError> {
        self.inner.insert_many(documents).await?;
        Ok(())
    }

    async fn replace_one(
        &self,
        filter: Document,
        replacement: Document,
    ) -> Result<u64, StoreError> {
        let result = self.inner.replace_one(filter, replacement).await?;
        Ok(result.matched_count)
    }

    async fn delete_one(&self, filter: Document) -> Result<u64, StoreError> {
        let result = self.inner.delete_one(filter).await?;
        Ok(result.deleted_count)
    }

    async fn delete_many(&self, filter: Document) -> Result<u64, PartialDelete> {
        // The driver reports no count alongside a failed delete.
        match self.inner.delete_many(filter).await {
            Ok(result) => Ok(result.deleted_count),
            Err(err) => Err(PartialDelete {
                deleted: 0,
                error: err.into(),
            }),
        }
    }

    async fn find(&self, spec: FindSpec) -> Result<Vec<Document>, StoreError> {
        let mut options = FindOptions::default();
        options.sort = spec.sort;
        options.skip = spec.skip;
        options.limit = spec.limit;
        options.projection = spec.projection;

        let mut cursor = self.inner.find(spec.filter).with_options(options).await?;
        let mut documents = Vec::new();
        while cursor.advance().await? {
            documents.push(cursor.deserialize_current()?);
        }
        Ok(documents)
    }

    async fn find_one(&self, filter: Document) -> Result<Option<Document>, StoreError> {
        Ok(self.inner.find_one(filter).await?)
    }

    async fn count_documents(&self, filter: Document) -> Result<u64, StoreError> {
        Ok(self.inner.count_documents(filter).await?)
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        if is_duplicate_key(&err) {
            return StoreError::DuplicateKey(err.to_string());
        }
        let classified = match err.kind.as_ref() {
            ErrorKind::ServerSelection { .. }
            | ErrorKind::Io(_)
            | ErrorKind::ConnectionPoolCleared { .. } => {
                Some(StoreError::Unavailable(err.to_string()))
            }
            ErrorKind::BsonDeserialization(_) | ErrorKind::BsonSerialization(_) => {
                Some(StoreError::Serialization(err.to_string()))
            }
            ErrorKind::InvalidArgument { .. } => Some(StoreError::InvalidInput(err.to_string())),
            _ => None,
        };
        classified.unwrap_or_else(|| StoreError::Internal {
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}

/// Converts a collection failure into the storage error reported to callers.
pub(crate) fn map_store_error(err: StoreError) -> StorageError {
    match err {
        StoreError::DuplicateKey(message) => {
            StorageError::Concurrency(ConcurrencyError::DuplicateId { message })
        }
        StoreError::Unavailable(message) => StorageError::Backend(BackendError::Unavailable {
            backend_name: BACKEND_NAME.to_string(),
            message,
        }),
        StoreError::Serialization(message) => {
            StorageError::Backend(BackendError::SerializationError { message })
        }
        StoreError::InvalidInput(message) => {
            StorageError::Backend(BackendError::QueryError { message })
        }
        StoreError::Internal { message, source } => StorageError::Backend(BackendError::Internal {
            backend_name: BACKEND_NAME.to_string(),
            message,
            source,
        }),
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY
        }
        ErrorKind::InsertMany(failure) => failure
            .write_errors
            .as_ref()
            .is_some_and(|errors| errors.iter().any(|e| e.code == DUPLICATE_KEY)),
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY,
        _ => false,
    }
}

/// Resolves the collection a request runs against.
///
/// Resolution happens on every operation; implementations decide whether
/// that is a fresh handle or a shared one.
#[async_trait]
pub trait CollectionResolver: Send + Sync {
    /// Returns a ready-to-use collection.
    async fn resolve(&self, ctx: &RequestContext) -> StorageResult<Arc<dyn DocumentCollection>>;
}

/// Resolves `database.collection` on a driver client.
#[derive(Debug, Clone)]
pub struct MongoResolver {
    client: Client,
    database: String,
    collection: String,
}

impl MongoResolver {
    /// Creates a resolver for `database.collection`.
    pub fn new(client: Client, database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            client,
            database: database.into(),
            collection: collection.into(),
        }
    }

    /// Returns the database name.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Returns the collection name.
    pub fn collection(&self) -> &str {
        &self.collection
    }
}

#[async_trait]
impl CollectionResolver for MongoResolver {
    async fn resolve(&self, _ctx: &RequestContext) -> StorageResult<Arc<dyn DocumentCollection>> {
        let collection = self
            .client
            .database(&self.database)
            .collection::<Document>(&self.collection);
        Ok(Arc::new(MongoCollection::new(collection)))
    }
}

#[async_trait]
impl<C> CollectionResolver for Arc<C>
where
    C: DocumentCollection + 'static,
{
    async fn resolve(&self, _ctx: &RequestContext) -> StorageResult<Arc<dyn DocumentCollection>> {
        Ok(self.clone())
    }
}
