//! Integration tests for `destroy`.

use kvdoc_backend::KvBackend;
use kvdoc_codec::Value;
use kvdoc_core::{CollectionStore, CoreError, Criteria, StoreConfig};
use kvdoc_testkit::prelude::*;
use std::sync::Arc;

#[tokio::test]
async fn destroyed_record_is_gone_and_its_unique_values_are_free() {
    init_tracing();
    let store = scenarios::users().await;

    let destroyed = store
        .destroy("users", &criteria(json!({"id": 1})))
        .await
        .unwrap();
    assert_eq!(destroyed.len(), 1);
    assert_eq!(destroyed[0]["name"], Value::from("Gob"));

    let found = store
        .find("users", &criteria(json!({"where": {"id": 1}})))
        .await
        .unwrap()
        .into_records();
    assert!(found.is_empty());
    assert_eq!(store.keys("users").await.unwrap(), vec!["2", "3"]);
    assert!(!store.backend.exists("test:{users}:id:1").await.unwrap());

    let reborn = store
        .create("users", record(json!({"email": "gob@bluth.com", "name": "Gob"})))
        .await
        .unwrap();
    assert_eq!(reborn["id"], Value::Integer(4));
    audit_collection(&store, "users").await;
}

#[tokio::test]
async fn destroys_every_match() {
    let store = scenarios::finders().await;

    let destroyed = store
        .destroy("finders", &criteria(json!({"name": "Annyong"})))
        .await
        .unwrap();
    assert_eq!(destroyed.len(), 5);
    assert_eq!(store.keys("finders").await.unwrap(), vec!["1"]);
    assert_eq!(store.backend.len(), 3);
}

#[tokio::test]
async fn empty_criteria_destroys_everything() {
    let store = scenarios::users().await;

    let destroyed = store.destroy("users", &Criteria::new()).await.unwrap();
    assert_eq!(destroyed.len(), 3);

    let snap = audit_collection(&store, "users").await;
    assert!(snap.index_members.is_empty());
    assert!(snap.unique_members["email"].is_empty());
}

#[tokio::test]
async fn no_match_destroys_nothing() {
    let store = scenarios::users().await;
    let destroyed = store
        .destroy("users", &criteria(json!({"name": "Tobias"})))
        .await
        .unwrap();
    assert!(destroyed.is_empty());
    assert_eq!(store.keys("users").await.unwrap().len(), 3);
}

#[tokio::test]
async fn failed_index_batch_keeps_the_blobs() {
    let faulty = Arc::new(FaultyBackend::new());
    let store = CollectionStore::new(faulty.clone(), StoreConfig::new().prefix(TEST_PREFIX));
    store.define("users", &users_schema()).await.unwrap();
    store
        .create("users", record(json!({"email": "gob@bluth.com", "name": "Gob"})))
        .await
        .unwrap();

    faulty.fail_on("srem");
    let err = store
        .destroy("users", &criteria(json!({"id": 1})))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::IndexWriteFailure { .. }));
    assert!(faulty.inner().exists("test:{users}:id:1").await.unwrap());

    faulty.heal_all();
    let destroyed = store
        .destroy("users", &criteria(json!({"id": 1})))
        .await
        .unwrap();
    assert_eq!(destroyed.len(), 1);
    assert!(!faulty.inner().exists("test:{users}:id:1").await.unwrap());
}
