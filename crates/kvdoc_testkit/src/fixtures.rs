//! Test fixtures and store helpers.
//!
//! Provides ready-made schemas, record builders and stores over the
//! in-memory backend.

use kvdoc_backend::InMemoryBackend;
use kvdoc_codec::{record_from_json, Record};
use kvdoc_core::{AttributeSchema, CollectionStore, Criteria, StoreConfig};
use serde_json::json;
use std::sync::Arc;

/// Key prefix used by test stores.
pub const TEST_PREFIX: &str = "test";

/// Installs a `tracing` subscriber honouring `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Builds an attribute schema from its JSON definition.
pub fn schema(definition: serde_json::Value) -> AttributeSchema {
    serde_json::from_value(definition).expect("Invalid schema definition")
}

/// Builds a record from a JSON object.
pub fn record(json: serde_json::Value) -> Record {
    record_from_json(json).expect("Record must be a JSON object")
}

/// Parses criteria from JSON.
pub fn criteria(json: serde_json::Value) -> Criteria {
    Criteria::from_json(&json).expect("Invalid criteria")
}

/// `id` integer primary key and a `name`.
pub fn numeric_schema() -> AttributeSchema {
    schema(json!({
        "id": {"type": "integer", "primaryKey": true},
        "name": {"type": "string"}
    }))
}

/// `email` string primary key without auto-increment.
pub fn string_key_schema() -> AttributeSchema {
    schema(json!({
        "email": {"type": "string", "primaryKey": true},
        "name": {"type": "string"}
    }))
}

/// `id` primary key plus a unique `email`.
pub fn unique_schema() -> AttributeSchema {
    schema(json!({
        "id": {"type": "integer", "primaryKey": true},
        "email": {"type": "string", "unique": true}
    }))
}

/// Three auto-increment attributes, one of them the primary key.
pub fn auto_schema() -> AttributeSchema {
    schema(json!({
        "id": {"type": "integer", "primaryKey": true, "autoIncrement": true},
        "age": {"type": "integer", "autoIncrement": true},
        "number": {"type": "integer", "autoIncrement": true}
    }))
}

/// Auto-increment `gId` with `name` and `age`.
pub fn finders_schema() -> AttributeSchema {
    schema(json!({
        "gId": {"type": "integer", "primaryKey": true, "autoIncrement": true},
        "name": {"type": "string"},
        "age": {"type": "integer"}
    }))
}

/// Auto-increment `id`, unique `email`, plain `name`, `age`, `type` and a
/// `born` datetime.
pub fn users_schema() -> AttributeSchema {
    schema(json!({
        "id": {"type": "integer", "primaryKey": true, "autoIncrement": true},
        "email": {"type": "string", "unique": true},
        "name": {"type": "string"},
        "age": {"type": "integer"},
        "type": {"type": "string"},
        "born": {"type": "datetime"}
    }))
}

/// A collection store over a fresh in-memory backend.
#[derive(Debug)]
pub struct TestStore {
    /// The store.
    pub store: CollectionStore,
    /// The backend, for inspecting raw keys.
    pub backend: Arc<InMemoryBackend>,
}

impl TestStore {
    /// Creates an empty store with the [`TEST_PREFIX`] prefix.
    pub fn new() -> Self {
        Self::with_prefix(TEST_PREFIX)
    }

    /// Creates an empty store with the given prefix.
    pub fn with_prefix(prefix: &str) -> Self {
        let backend = Arc::new(InMemoryBackend::new());
        let store = CollectionStore::new(backend.clone(), StoreConfig::new().prefix(prefix));
        Self { store, backend }
    }

    /// Creates a store with one defined collection.
    pub async fn with_collection(name: &str, schema: AttributeSchema) -> Self {
        let test_store = Self::new();
        test_store
            .store
            .define(name, &schema)
            .await
            .expect("Failed to define collection");
        test_store
    }

    /// Creates every record, in order, and returns them as stored.
    pub async fn seed(&self, collection: &str, records: Vec<serde_json::Value>) -> Vec<Record> {
        let mut created = Vec::with_capacity(records.len());
        for data in records {
            created.push(
                self.store
                    .create(collection, record(data))
                    .await
                    .expect("Failed to create record"),
            );
        }
        created
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestStore {
    type Target = CollectionStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// A `finders` collection holding Steve Holt (19) and five Annyongs
    /// aged 19, 16, 15, 20 and 18, with `gId` 1 to 6 in that order.
    pub async fn finders() -> TestStore {
        let store = TestStore::with_collection("finders", finders_schema()).await;
        store
            .seed(
                "finders",
                vec![
                    json!({"name": "Steve Holt", "age": 19}),
                    json!({"name": "Annyong", "age": 19}),
                    json!({"name": "Annyong", "age": 16}),
                    json!({"name": "Annyong", "age": 15}),
                    json!({"name": "Annyong", "age": 20}),
                    json!({"name": "Annyong", "age": 18}),
                ],
            )
            .await;
        store
    }

    /// A `users` collection with three users of two types.
    pub async fn users() -> TestStore {
        let store = TestStore::with_collection("users", users_schema()).await;
        store
            .seed(
                "users",
                vec![
                    json!({"email": "gob@bluth.com", "name": "Gob", "age": 40, "type": "magician"}),
                    json!({"email": "buster@bluth.com", "name": "Buster", "age": 32, "type": "son"}),
                    json!({"email": "michael@bluth.com", "name": "Michael", "age": 38, "type": "son"}),
                ],
            )
            .await;
        store
    }
}
