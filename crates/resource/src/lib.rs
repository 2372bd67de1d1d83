//! Rested resource layer
//!
//! This crate defines the storage-neutral side of rested: the resource
//! [`Item`] and [`ItemList`] shapes, the [`Query`] model, the cancellable
//! [`RequestContext`] and the [`Storer`] trait storage handlers implement.
//!
//! # Architecture
//!
//! - [`context`] - Request cancellation, deadlines and correlation IDs
//! - [`item`] - Items and item lists
//! - [`query`] - Predicates, sort directives and pagination windows
//! - [`storage`] - The [`Storer`] contract
//! - [`error`] - Error types for all operations
//!
//! # Quick Start
//!
//! ```
//! use rested_resource::{Item, Query, RequestContext};
//! use rested_resource::query::{Predicate, SortField, Window};
//! use serde_json::json;
//!
//! let ctx = RequestContext::new().with_correlation_id("req-42");
//!
//! let item = Item::new(json!("u1"), "etag-1")
//!     .with_field("name", json!("John"));
//!
//! let query = Query::new()
//!     .with_predicate(Predicate::eq("name", json!("John")))
//!     .with_sort(SortField::parse("-updated"))
//!     .with_window(Window::first(20));
//!
//! assert_eq!(ctx.correlation_id(), Some("req-42"));
//! assert_eq!(item.payload["id"], json!("u1"));
//! assert!(query.window.is_some());
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod context;
pub mod error;
pub mod item;
pub mod query;
pub mod storage;

pub use context::RequestContext;
pub use error::{ClearError, StorageError, StorageResult};
pub use item::{Item, ItemList};
pub use query::Query;
pub use storage::Storer;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
