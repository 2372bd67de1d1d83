//! Resource items and item lists.
//!
//! An [`Item`] is the storage-neutral shape of a resource: an opaque
//! identifier, a version tag (ETag), a last-modified timestamp and a payload of
//! named fields. Storage handlers persist items and hand them back in the same
//! shape, whatever their native document model is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the payload field that mirrors the item identifier.
pub const ID_FIELD: &str = "id";

/// A resource item with persistence metadata.
///
/// ```
/// use rested_resource::Item;
/// use serde_json::json;
///
/// let item = Item::new(json!("u1"), "e1")
///     .with_field("name", json!("John"));
///
/// assert_eq!(item.payload["id"], json!("u1"));
/// assert_eq!(item.payload["name"], json!("John"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// The item identifier. Assigned upstream before insertion.
    pub id: Value,

    /// The version tag used for optimistic concurrency.
    pub etag: String,

    /// When the item was last modified.
    pub updated: DateTime<Utc>,

    /// The item fields, including `id`.
    pub payload: Map<String, Value>,
}

impl Item {
    /// Creates an item whose payload holds only its identifier.
    pub fn new(id: Value, etag: impl Into<String>) -> Self {
        let mut payload = Map::new();
        payload.insert(ID_FIELD.to_string(), id.clone());
        Self {
            id,
            etag: etag.into(),
            updated: Utc::now(),
            payload,
        }
    }

    /// Creates an item from an existing payload.
    ///
    /// The `id` payload field is overwritten with `id`.
    pub fn from_payload(
        id: Value,
        etag: impl Into<String>,
        updated: DateTime<Utc>,
        mut payload: Map<String, Value>,
    ) -> Self {
        payload.insert(ID_FIELD.to_string(), id.clone());
        Self {
            id,
            etag: etag.into(),
            updated,
            payload,
        }
    }

    /// Sets a payload field.
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.payload.insert(name.into(), value);
        self
    }

    /// Sets the last-modified timestamp.
    pub fn with_updated(mut self, updated: DateTime<Utc>) -> Self {
        self.updated = updated;
        self
    }

    /// Returns a payload field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }
}

/// A page of items returned by a find.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemList {
    /// Total number of items matching the query, when known.
    ///
    /// `None` means the total was not computed; callers needing an exact
    /// figure must issue a count.
    pub total: Option<u64>,

    /// The limit applied to this page, or `None` when unbounded.
    pub limit: Option<u64>,

    /// The items of this page, in query order.
    pub items: Vec<Item>,
}

impl ItemList {
    /// Creates an empty list.
    pub fn new(total: Option<u64>, limit: Option<u64>) -> Self {
        Self {
            total,
            limit,
            items: Vec::new(),
        }
    }

    /// Returns the number of items in this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if this page holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
