//! Item <-> document translation.
//!
//! Items are stored with their metadata lifted into dedicated fields and their
//! payload inlined at the top level:
//!
//! ```text
//! { "_id": <id>, "_etag": "<tag>", "_updated": <datetime>, ...payload without "id" }
//! ```
//!
//! `_etag` is omitted for items carrying an empty or synthetic tag, so the
//! field is only ever present with a real version. Payload fields named after
//! a metadata field are rejected.

use chrono::{DateTime, Utc};
use mongodb::bson::{self, Bson, Document};
use serde_json::{Map, Value};

use rested_resource::error::{BackendError, QueryError, StorageError, StorageResult};
use rested_resource::item::{ID_FIELD, Item};

use crate::etag::VersionTag;

/// Document field holding the item identifier.
pub const ID_KEY: &str = "_id";

/// Document field holding the version tag.
pub const ETAG_KEY: &str = "_etag";

/// Document field holding the last-modified timestamp.
pub const UPDATED_KEY: &str = "_updated";

/// Converts a resource-layer value to BSON, reading MongoDB extended JSON.
pub(crate) fn to_bson(field: &str, value: &Value) -> StorageResult<Bson> {
    Bson::try_from(value.clone()).map_err(|e| {
        StorageError::Query(QueryError::InvalidValue {
            field: field.to_string(),
            message: e.to_string(),
        })
    })
}

/// Converts a BSON value to the resource layer as relaxed extended JSON.
pub(crate) fn to_json(value: Bson) -> Value {
    value.into_relaxed_extjson()
}

/// Converts an item into the document stored for it.
pub fn to_document(item: &Item) -> StorageResult<Document> {
    let mut document = Document::new();
    document.insert(ID_KEY, to_bson(ID_FIELD, &item.id)?);
    if let Some(tag) = VersionTag::parse(&item.etag).stored() {
        document.insert(ETAG_KEY, tag);
    }
    document.insert(
        UPDATED_KEY,
        bson::DateTime::from_millis(item.updated.timestamp_millis()),
    );

    // The id lives in `_id` only.
    for (name, value) in &item.payload {
        if name == ID_FIELD {
            continue;
        }
        if is_reserved(name) {
            return Err(StorageError::Query(QueryError::InvalidField {
                field: name.clone(),
            }));
        }
        document.insert(name.clone(), to_bson(name, value)?);
    }
    Ok(document)
}

/// Converts a fetched document back into an item.
pub fn to_item(mut document: Document) -> StorageResult<Item> {
    let id = document.remove(ID_KEY).ok_or_else(|| {
        StorageError::Backend(BackendError::SerializationError {
            message: "document has no _id field".to_string(),
        })
    })?;

    let stored_tag = match document.remove(ETAG_KEY) {
        Some(Bson::String(tag)) => Some(tag),
        None | Some(Bson::Null) => None,
        Some(other) => {
            return Err(StorageError::Backend(BackendError::SerializationError {
                message: format!("_etag must be a string, found {:?}", other.element_type()),
            }));
        }
    };
    let etag = VersionTag::of_document(stored_tag, &id).render();

    let updated = match document.remove(UPDATED_KEY) {
        Some(Bson::DateTime(dt)) => {
            DateTime::<Utc>::from_timestamp_millis(dt.timestamp_millis()).unwrap_or_default()
        }
        _ => DateTime::<Utc>::default(),
    };

    let payload: Map<String, Value> = document
        .into_iter()
        .map(|(name, value)| (name, to_json(value)))
        .collect();

    Ok(Item::from_payload(to_json(id), etag, updated, payload))
}

fn is_reserved(name: &str) -> bool {
    matches!(name, ID_KEY | ETAG_KEY | UPDATED_KEY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mongodb::bson::doc;
    use mongodb::bson::oid::ObjectId;
    use serde_json::json;

    fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 17, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_to_document_lifts_metadata_and_drops_payload_id() {
        let item = Item::new(json!("u1"), "e1")
            .with_updated(timestamp())
            .with_field("name", json!("John"))
            .with_field("age", json!(42));

        let document = to_document(&item).unwrap();
        assert_eq!(document.get_str("_id").unwrap(), "u1");
        assert_eq!(document.get_str("_etag").unwrap(), "e1");
        assert_eq!(
            document.get_datetime("_updated").unwrap().timestamp_millis(),
            timestamp().timestamp_millis()
        );
        assert_eq!(document.get_str("name").unwrap(), "John");
        assert!(matches!(
            document.get("age"),
            Some(Bson::Int32(42)) | Some(Bson::Int64(42))
        ));
        assert!(!document.contains_key("id"));
    }

    #[test]
    fn test_round_trip_preserves_item() {
        let item = Item::new(json!("u1"), "e1")
            .with_updated(timestamp())
            .with_field("name", json!("John"))
            .with_field("tags", json!(["a", "b"]))
            .with_field("meta", json!({"title": "t", "score": 1.5}));

        let back = to_item(to_document(&item).unwrap()).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn test_empty_etag_is_not_persisted_and_reads_back_synthetic() {
        let item = Item::new(json!("u1"), "").with_updated(timestamp());
        let document = to_document(&item).unwrap();
        assert!(!document.contains_key("_etag"));

        let back = to_item(document).unwrap();
        assert_eq!(back.etag, "p-u1");
    }

    #[test]
    fn test_synthetic_etag_is_not_persisted() {
        let item = Item::new(json!(7), "p-7").with_updated(timestamp());
        let document = to_document(&item).unwrap();
        assert!(!document.contains_key("_etag"));
        assert_eq!(to_item(document).unwrap().etag, "p-7");
    }

    #[test]
    fn test_bare_document_gets_payload_and_synthetic_etag() {
        let oid = ObjectId::parse_str("5f1d7a3b2c4e5f6a7b8c9d0e").unwrap();
        let item = to_item(doc! { "_id": oid }).unwrap();

        assert_eq!(item.id, json!({"$oid": "5f1d7a3b2c4e5f6a7b8c9d0e"}));
        assert_eq!(item.etag, "p-5f1d7a3b2c4e5f6a7b8c9d0e");
        assert_eq!(item.payload.len(), 1);
        assert_eq!(item.payload["id"], item.id);
    }

    #[test]
    fn test_object_id_round_trips_through_extended_json() {
        let id = json!({"$oid": "5f1d7a3b2c4e5f6a7b8c9d0e"});
        let item = Item::new(id.clone(), "e1").with_updated(timestamp());
        let document = to_document(&item).unwrap();
        assert!(matches!(document.get("_id"), Some(Bson::ObjectId(_))));
        assert_eq!(to_item(document).unwrap().id, id);
    }

    #[test]
    fn test_payload_cannot_shadow_metadata() {
        for reserved in ["_id", "_etag", "_updated"] {
            let item = Item::new(json!("u1"), "e1")
                .with_updated(timestamp())
                .with_field(reserved, json!("forged"));
            let err = to_document(&item).unwrap_err();
            assert!(matches!(
                err,
                StorageError::Query(QueryError::InvalidField { ref field }) if field == reserved
            ));
        }
    }

    #[test]
    fn test_document_without_id_is_rejected() {
        let err = to_item(doc! { "name": "x" }).unwrap_err();
        assert!(matches!(
            err,
            StorageError::Backend(BackendError::SerializationError { .. })
        ));
    }

    #[test]
    fn test_non_string_etag_is_rejected() {
        let err = to_item(doc! { "_id": "a", "_etag": 3 }).unwrap_err();
        assert!(matches!(err, StorageError::Backend(_)));
    }
}
