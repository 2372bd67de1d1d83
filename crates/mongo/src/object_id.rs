//! ObjectId helpers for resource schemas.
//!
//! Resources keyed by MongoDB ObjectIds can use [`new_object_id`] to assign an
//! identifier on creation and [`ObjectIdValidator`] to check identifiers sent
//! by clients.

use mongodb::bson::oid::ObjectId;
use serde_json::{Value, json};
use thiserror::Error;

/// Pattern of an ObjectId rendered as hexadecimal text.
pub const OBJECT_ID_PATTERN: &str = "^[0-9a-fA-F]{24}$";

/// A value that is not an ObjectId.
#[derive(Debug, Error)]
#[error("invalid object id: {0}")]
pub struct InvalidObjectId(pub String);

/// Returns `value`, or a freshly generated ObjectId hex string if it is absent or null.
pub fn new_object_id(value: Option<Value>) -> Value {
    match value {
        Some(value) if !value.is_null() => value,
        _ => Value::String(ObjectId::new().to_hex()),
    }
}

/// Renders an ObjectId the way stored identifiers appear on items.
pub fn object_id_value(oid: &ObjectId) -> Value {
    json!({ "$oid": oid.to_hex() })
}

/// Validates ObjectId fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectIdValidator;

impl ObjectIdValidator {
    /// Parses `value` as an ObjectId.
    ///
    /// Accepts a 24 character hex string or the extended JSON form `{"$oid": "<hex>"}`.
    pub fn validate(&self, value: &Value) -> Result<ObjectId, InvalidObjectId> {
        let hex = match value {
            Value::String(hex) => hex.as_str(),
            Value::Object(map) if map.len() == 1 => match map.get("$oid") {
                Some(Value::String(hex)) => hex.as_str(),
                _ => return Err(InvalidObjectId(value.to_string())),
            },
            _ => return Err(InvalidObjectId(value.to_string())),
        };
        ObjectId::parse_str(hex).map_err(|_| InvalidObjectId(hex.to_string()))
    }

    /// Returns the JSON schema of an ObjectId field.
    pub fn json_schema(&self) -> Value {
        json!({
            "type": "string",
            "pattern": OBJECT_ID_PATTERN,
        })
    }
}
