//! Error types for storage handlers.
//!
//! This module defines the error taxonomy every storage handler reports through,
//! separating resource state errors, concurrency errors, request cancellation,
//! query translation errors and opaque backend failures.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all storage operations.
///
/// Callers branch on the category: a missing item, a stale version tag, a
/// cancelled request, an untranslatable query, or a failure of the store
/// itself are always reported through different variants.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Resource state errors
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Concurrency and versioning errors
    #[error(transparent)]
    Concurrency(#[from] ConcurrencyError),

    /// The caller's request context ended before the operation completed
    #[error(transparent)]
    Cancelled(#[from] CancellationError),

    /// Query translation errors
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors related to resource state.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// No item with the given identifier exists.
    #[error("item not found: {id}")]
    NotFound { id: String },
}

/// Errors related to concurrency control.
#[derive(Error, Debug)]
pub enum ConcurrencyError {
    /// The item exists but its stored version does not match the expected tag.
    #[error("version conflict on {id}: item was modified since {expected_etag}")]
    VersionConflict { id: String, expected_etag: String },

    /// An inserted item reuses an identifier that is already stored.
    #[error("duplicate item identifier: {message}")]
    DuplicateId { message: String },
}

/// Why a request context stopped accepting work.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationError {
    /// The context was cancelled explicitly.
    #[error("request cancelled")]
    Cancelled,

    /// The context deadline passed.
    #[error("request deadline exceeded")]
    DeadlineExceeded,
}

/// Errors raised while rendering a query for a backend.
#[derive(Error, Debug)]
pub enum QueryError {
    /// A predicate cannot be expressed (for example an empty `$or`).
    #[error("invalid predicate: {message}")]
    InvalidPredicate { message: String },

    /// A predicate value cannot be converted to the backend's value model.
    #[error("invalid value for field '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// A field name is empty or otherwise unusable.
    #[error("invalid field name: '{field}'")]
    InvalidField { field: String },
}

/// Errors originating from the database backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend could not be reached.
    #[error("backend unavailable: {backend_name}: {message}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Query execution error.
    #[error("query execution failed: {message}")]
    QueryError { message: String },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },

    /// Invalid handler configuration.
    #[error("invalid configuration for {backend_name}: {message}")]
    Configuration {
        backend_name: String,
        message: String,
    },
}

impl StorageError {
    /// Returns `true` if no item with the requested identifier exists.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::Resource(ResourceError::NotFound { .. }))
    }

    /// Returns `true` for version mismatches and duplicate identifiers.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StorageError::Concurrency(_))
    }

    /// Returns `true` if the request context was cancelled or expired.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StorageError::Cancelled(_))
    }
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Failure of a bulk clear.
///
/// A clear may fail after the store has already removed some items. The
/// number of items actually removed travels with the error, so an error
/// never implies that nothing was deleted.
#[derive(Error, Debug)]
#[error("{error} ({deleted} items deleted before failure)")]
pub struct ClearError {
    /// Items removed before the failure was observed.
    pub deleted: u64,
    /// The failure.
    #[source]
    pub error: StorageError,
}

impl ClearError {
    /// Creates a clear error carrying the number of items already removed.
    pub fn new(deleted: u64, error: impl Into<StorageError>) -> Self {
        Self {
            deleted,
            error: error.into(),
        }
    }
}

impl From<StorageError> for ClearError {
    fn from(error: StorageError) -> Self {
        Self { deleted: 0, error }
    }
}
