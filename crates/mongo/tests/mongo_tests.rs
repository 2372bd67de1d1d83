//! MongoDB handler integration tests.
//!
//! These tests run the handler against a real MongoDB started with
//! testcontainers, so they need Docker.
//!
//! Run with: `cargo test -p rested-mongo --features integration`

#![cfg(feature = "integration")]

use chrono::{TimeZone, Utc};
use mongodb::Client;
use mongodb::bson::{Document, doc};
use rested_mongo::{MongoConfig, MongoHandler, ObjectIdValidator, new_object_id};
use rested_resource::error::{ConcurrencyError, StorageError};
use rested_resource::query::{Predicate, SortField, Window};
use rested_resource::{Item, Query, RequestContext, Storer};
use serde_json::json;
use testcontainers::ImageExt;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::mongo::Mongo;
use tokio::sync::OnceCell;
use uuid::Uuid;

/// Shared MongoDB container reused across all tests in this binary.
struct SharedMongo {
    uri: String,
    /// Kept alive for the duration of the test binary; dropped at process exit.
    _container: testcontainers::ContainerAsync<Mongo>,
}

static SHARED_MONGO: OnceCell<SharedMongo> = OnceCell::const_new();

async fn shared_mongo() -> &'static SharedMongo {
    SHARED_MONGO
        .get_or_init(|| async {
            let run_id = std::env::var("GITHUB_RUN_ID").unwrap_or_default();
            let container = Mongo::default()
                .with_label("github.run_id", &run_id)
                .start()
                .await
                .expect("Failed to start MongoDB container");

            let port = container
                .get_host_port_ipv4(27017)
                .await
                .expect("Failed to get host port");
            let host = container
                .get_host()
                .await
                .expect("Failed to get host")
                .to_string();

            SharedMongo {
                uri: format!("mongodb://{host}:{port}"),
                _container: container,
            }
        })
        .await
}

/// A handler on a fresh collection, plus a raw client to inspect it.
struct Harness {
    handler: MongoHandler,
    client: Client,
    collection: String,
}

impl Harness {
    async fn new() -> Self {
        let shared = shared_mongo().await;
        let collection = format!("items_{}", Uuid::new_v4().simple());
        let config = MongoConfig::new("rested_test", &collection).with_uri(&shared.uri);
        let handler = MongoHandler::connect(&config)
            .await
            .expect("Failed to connect handler");
        let client = Client::with_uri_str(shared.uri.as_str())
            .await
            .expect("Failed to connect client");
        Self {
            handler,
            client,
            collection,
        }
    }

    fn raw(&self) -> mongodb::Collection<Document> {
        self.client
            .database("rested_test")
            .collection(&self.collection)
    }
}

fn item(id: &str, etag: &str) -> Item {
    Item::new(json!(id), etag).with_updated(Utc.with_ymd_and_hms(2024, 5, 17, 9, 30, 0).unwrap())
}

async fn seed(harness: &Harness, count: usize) {
    let items: Vec<Item> = (0..count)
        .map(|i| item(&format!("u{i:02}"), "e1").with_field("rank", json!(i)))
        .collect();
    harness
        .handler
        .insert(&RequestContext::new(), &items)
        .await
        .unwrap();
}

fn ids(items: &[Item]) -> Vec<&str> {
    items.iter().filter_map(|i| i.id.as_str()).collect()
}

#[tokio::test]
async fn test_insert_find_round_trip() {
    let harness = Harness::new().await;
    let ctx = RequestContext::new();

    let john = item("u1", "e1")
        .with_field("name", json!("John"))
        .with_field("meta", json!({"score": 1.5, "tags": ["a", "b"]}));
    harness.handler.insert(&ctx, &[john.clone()]).await.unwrap();

    let list = harness.handler.find(&ctx, &Query::new()).await.unwrap();
    assert_eq!(list.items, vec![john]);
}

#[tokio::test]
async fn test_duplicate_insert_is_conflict() {
    let harness = Harness::new().await;
    seed(&harness, 1).await;

    let err = harness
        .handler
        .insert(&RequestContext::new(), &[item("u00", "e2")])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::Concurrency(ConcurrencyError::DuplicateId { .. })
    ));
}

#[tokio::test]
async fn test_update_and_delete_are_version_checked() {
    let harness = Harness::new().await;
    seed(&harness, 1).await;
    let ctx = RequestContext::new();
    let original = item("u00", "e1");

    let updated = item("u00", "e2").with_field("name", json!("renamed"));
    harness
        .handler
        .update(&ctx, &updated, &original)
        .await
        .unwrap();

    let err = harness
        .handler
        .update(&ctx, &item("u00", "e3"), &original)
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    let err = harness.handler.delete(&ctx, &original).await.unwrap_err();
    assert!(err.is_conflict());

    harness.handler.delete(&ctx, &updated).await.unwrap();
    let err = harness.handler.delete(&ctx, &updated).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_legacy_document_without_etag() {
    let harness = Harness::new().await;
    let ctx = RequestContext::new();
    let oid = ObjectIdValidator
        .validate(&new_object_id(None))
        .expect("generated id is valid");
    harness
        .raw()
        .insert_one(doc! { "_id": oid, "name": "legacy" })
        .await
        .unwrap();

    let list = harness.handler.find(&ctx, &Query::new()).await.unwrap();
    let original = list.items[0].clone();
    assert_eq!(original.etag, format!("p-{}", oid.to_hex()));
    assert_eq!(original.id, json!({"$oid": oid.to_hex()}));

    let mut updated = original.clone();
    updated.etag = "e1".to_string();
    harness
        .handler
        .update(&ctx, &updated, &original)
        .await
        .unwrap();

    let stored = harness
        .raw()
        .find_one(doc! { "_id": oid })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.get_str("_etag").unwrap(), "e1");
    assert_eq!(stored.get_str("name").unwrap(), "legacy");
}

#[tokio::test]
async fn test_clear_window_deletes_exact_positions() {
    let harness = Harness::new().await;
    seed(&harness, 10).await;
    let ctx = RequestContext::new();

    let query = Query::new()
        .with_sort(SortField::asc("rank"))
        .with_window(Window::new(2, 3));
    assert_eq!(harness.handler.clear(&ctx, &query).await.unwrap(), 3);

    let remaining = harness.handler.find(&ctx, &Query::new()).await.unwrap();
    assert_eq!(
        ids(&remaining.items),
        vec!["u00", "u01", "u05", "u06", "u07", "u08", "u09"]
    );
}

#[tokio::test]
async fn test_clear_by_filter() {
    let harness = Harness::new().await;
    seed(&harness, 10).await;
    let ctx = RequestContext::new();

    let query = Query::new().with_predicate(Predicate::lt("rank", json!(4)));
    assert_eq!(harness.handler.clear(&ctx, &query).await.unwrap(), 4);
    assert_eq!(harness.handler.count(&ctx, &Query::new()).await.unwrap(), 6);
}

#[tokio::test]
async fn test_find_totals_and_count() {
    let harness = Harness::new().await;
    seed(&harness, 12).await;
    let ctx = RequestContext::new();

    let first = Query::new().with_window(Window::first(5));
    let list = harness.handler.find(&ctx, &first).await.unwrap();
    assert_eq!(list.len(), 5);
    assert_eq!(list.total, None);

    let last = Query::new().with_window(Window::new(10, 5));
    let list = harness.handler.find(&ctx, &last).await.unwrap();
    assert_eq!(ids(&list.items), vec!["u10", "u11"]);
    assert_eq!(list.total, Some(12));

    let totals = Query::new().with_window(Window::first(0));
    let list = harness.handler.find(&ctx, &totals).await.unwrap();
    assert!(list.is_empty());
    assert_eq!(list.total, Some(12));

    let none = Query::new().with_predicate(Predicate::eq("rank", json!(99)));
    assert_eq!(harness.handler.count(&ctx, &none).await.unwrap(), 0);
}

#[tokio::test]
async fn test_cancelled_context_is_reported() {
    let harness = Harness::new().await;
    seed(&harness, 1).await;
    let ctx = RequestContext::new();
    ctx.cancel();

    let err = harness
        .handler
        .delete(&ctx, &item("u00", "e1"))
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(
        harness
            .handler
            .count(&RequestContext::new(), &Query::new())
            .await
            .unwrap(),
        1
    );
}
