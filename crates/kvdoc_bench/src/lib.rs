//! Benchmark utilities.

use kvdoc_backend::InMemoryBackend;
use kvdoc_codec::{record_from_json, Record};
use kvdoc_core::{AttributeSchema, CollectionStore, StoreConfig};
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::json;
use std::sync::Arc;

const NAMES: &[&str] = &["Gob", "Buster", "Michael", "Lindsay", "Tobias", "Maeby"];
const TYPES: &[&str] = &["magician", "son", "daughter", "analyst"];

/// Schema of the `users` collection used by every benchmark.
pub fn users_schema() -> AttributeSchema {
    serde_json::from_value(json!({
        "id": {"type": "integer", "primaryKey": true, "autoIncrement": true},
        "email": {"type": "string", "unique": true},
        "name": {"type": "string"},
        "age": {"type": "integer"},
        "type": {"type": "string"}
    }))
    .expect("Invalid benchmark schema")
}

/// A random user whose email is unique for distinct `n`.
pub fn random_user(n: usize) -> Record {
    let mut rng = rand::thread_rng();
    record_from_json(json!({
        "email": format!("user{n}@bench.io"),
        "name": NAMES.choose(&mut rng).copied().unwrap_or("Gob"),
        "age": rng.gen_range(10..90),
        "type": TYPES.choose(&mut rng).copied().unwrap_or("son"),
    }))
    .expect("Invalid benchmark record")
}

/// A fresh store with the `users` collection defined.
pub async fn empty_store() -> CollectionStore {
    let store = CollectionStore::new(
        Arc::new(InMemoryBackend::new()),
        StoreConfig::new().prefix("bench"),
    );
    store
        .define("users", &users_schema())
        .await
        .expect("Failed to define users");
    store
}

/// A store holding `count` random users with ids `1..=count`.
pub async fn populated_store(count: usize) -> CollectionStore {
    let store = empty_store().await;
    for n in 0..count {
        store
            .create("users", random_user(n))
            .await
            .expect("Failed to create user");
    }
    store
}
