//! MongoDB storage handler for rested
//!
//! [`MongoHandler`] implements the [`Storer`](rested_resource::Storer) contract on top
//! of a MongoDB collection, with optimistic concurrency on update and delete.
//!
//! # Document layout
//!
//! Each item is stored as one document. The identifier lives in `_id`, the
//! version tag in `_etag` and the last-modified time in `_updated`; payload
//! fields are inlined next to them. Documents without `_etag` (written by
//! other tools, or before versioning) are exposed with a synthetic tag
//! `p-<id>` and can still be updated and deleted under concurrency control.
//!
//! # Architecture
//!
//! - [`storage`] - The [`MongoHandler`] itself
//! - [`client`] - The collection API the handler issues, and the `mongodb` driver binding
//! - [`document`] - Item to document translation
//! - [`query`] - Query to filter/sort translation
//! - [`etag`] - Stored and synthetic version tags
//! - [`clear`] - Bulk delete strategies
//! - [`find`] - Find and count, with total inference
//! - [`object_id`] - ObjectId helpers for resource schemas
//! - [`config`] - Connection configuration
//!
//! # Quick Start
//!
//! ```no_run
//! use rested_mongo::{MongoConfig, MongoHandler};
//! use rested_resource::{Item, RequestContext, Storer};
//! use serde_json::json;
//!
//! # async fn run() -> rested_resource::StorageResult<()> {
//! let config = MongoConfig::new("app", "users");
//! let handler = MongoHandler::connect(&config).await?;
//!
//! let ctx = RequestContext::new();
//! let item = Item::new(json!("u1"), "etag-1").with_field("name", json!("John"));
//! handler.insert(&ctx, &[item]).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod clear;
pub mod client;
pub mod config;
pub mod document;
pub mod etag;
pub mod find;
mod guard;
pub mod object_id;
pub mod query;
pub mod storage;


pub use client::{CollectionResolver, DocumentCollection, MongoCollection, MongoResolver};
pub use config::MongoConfig;
pub use object_id::{ObjectIdValidator, new_object_id};
pub use storage::MongoHandler;

/// Backend name reported in errors.
pub const BACKEND_NAME: &str = "mongodb";
