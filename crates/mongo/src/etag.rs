//! Version tags as stored in MongoDB.
//!
//! Items written before version tagging existed have no `_etag` field. Such
//! items are exposed with a synthetic tag, `p-` followed by the identifier
//! rendered as text. A synthetic tag never matches a stored `_etag` value: it
//! matches the *absence* of the field. Every other tag, the empty one
//! included, is matched by equality.

use mongodb::bson::{Bson, Document, doc};

use crate::document::{ETAG_KEY, ID_KEY};

/// Reserved prefix of synthetic version tags.
pub const SYNTHETIC_PREFIX: &str = "p-";

/// A version tag, either stored with the document or derived from its identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionTag {
    /// A tag stored in the document's `_etag` field.
    Stored(String),
    /// A tag synthesized from the identifier text, for documents without `_etag`.
    Derived(String),
}

impl VersionTag {
    /// Decodes a tag received from the resource layer.
    pub fn parse(etag: &str) -> Self {
        match etag.strip_prefix(SYNTHETIC_PREFIX) {
            Some(id_text) => VersionTag::Derived(id_text.to_string()),
            None => VersionTag::Stored(etag.to_string()),
        }
    }

    /// Synthesizes the tag of a document that has no stored `_etag`.
    pub fn derive(id: &Bson) -> Self {
        VersionTag::Derived(id_text(id))
    }

    /// Picks the tag of a fetched document: its `_etag` if present and
    /// non-empty, otherwise a tag derived from `id`.
    pub fn of_document(stored: Option<String>, id: &Bson) -> Self {
        match stored {
            Some(tag) if !tag.is_empty() => VersionTag::Stored(tag),
            _ => Self::derive(id),
        }
    }

    /// Returns the tag to persist in `_etag`, or `None` if the field must be absent.
    pub fn stored(&self) -> Option<&str> {
        match self {
            VersionTag::Stored(tag) if !tag.is_empty() => Some(tag),
            _ => None,
        }
    }

    /// Renders the tag for the resource layer.
    pub fn render(&self) -> String {
        match self {
            VersionTag::Stored(tag) => tag.clone(),
            VersionTag::Derived(id_text) => format!("{SYNTHETIC_PREFIX}{id_text}"),
        }
    }

    /// Builds the selector matching document `id` at this version.
    pub fn selector(&self, id: Bson) -> Document {
        match self {
            VersionTag::Stored(tag) => doc! { ID_KEY: id, ETAG_KEY: tag.as_str() },
            VersionTag::Derived(_) => doc! { ID_KEY: id, ETAG_KEY: { "$exists": false } },
        }
    }
}

/// Renders an identifier as text, the way synthetic tags embed it.
pub(crate) fn id_text(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        Bson::Int32(n) => n.to_string(),
        Bson::Int64(n) => n.to_string(),
        Bson::Double(n) => n.to_string(),
        other => other.clone().into_relaxed_extjson().to_string(),
    }
}
