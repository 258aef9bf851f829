//! Index consistency audits.
//!
//! These helpers read a collection's raw keys from the backend and assert
//! the invariants the store maintains between record blobs, the primary
//! index and unique indices.

use kvdoc_backend::KvBackend;
use kvdoc_codec::{decode_record, Record, Value};
use kvdoc_core::keys::unique_member;
use kvdoc_core::CollectionStore;
use std::collections::{BTreeMap, BTreeSet};

/// A raw view of one collection.
#[derive(Debug, Clone, Default)]
pub struct CollectionSnapshot {
    /// Members of the primary index set.
    pub index_members: BTreeSet<String>,
    /// Record blobs by record key, for every key the primary index names.
    pub records: BTreeMap<String, Record>,
    /// Members of each unique index set.
    pub unique_members: BTreeMap<String, BTreeSet<String>>,
}

/// Reads the primary index, the blobs it names and the unique indices.
pub async fn snapshot(store: &CollectionStore, collection: &str) -> CollectionSnapshot {
    let schema = store
        .registry()
        .collection(collection)
        .expect("Collection must be registered");
    let pk = schema.primary_key().expect("Collection must have a primary key");
    let backend = store.native();

    let index_key = store.registry().index_key(collection, pk);
    let index_members: BTreeSet<String> = backend
        .smembers(&index_key)
        .await
        .expect("Failed to read primary index")
        .into_iter()
        .collect();

    let mut records = BTreeMap::new();
    for key in &index_members {
        if let Some(blob) = backend.get(key).await.expect("Failed to read record") {
            records.insert(
                key.clone(),
                decode_record(&blob).expect("Record blob must decode"),
            );
        }
    }

    let mut unique_members = BTreeMap::new();
    for (attr, index) in schema.unique_indices() {
        let members = backend
            .smembers(index.key())
            .await
            .expect("Failed to read unique index");
        unique_members.insert(attr.clone(), members.into_iter().collect());
    }

    CollectionSnapshot {
        index_members,
        records,
        unique_members,
    }
}

/// Asserts that every primary index member has a blob, that every blob is
/// stored under the key its primary key value maps to, and that unique
/// values are distinct and registered.
pub async fn audit_collection(store: &CollectionStore, collection: &str) -> CollectionSnapshot {
    let snap = snapshot(store, collection).await;
    let pk = store
        .registry()
        .primary_key(collection)
        .expect("Collection must have a primary key");

    for member in &snap.index_members {
        let record = snap
            .records
            .get(member)
            .unwrap_or_else(|| panic!("index member {member} has no record"));
        let value = record.get(&pk).cloned().unwrap_or(Value::Null);
        assert_eq!(
            &store.registry().record_key(collection, &pk, &value),
            member,
            "record stored under the wrong key"
        );
    }

    for (attr, members) in &snap.unique_members {
        let values: Vec<String> = snap
            .records
            .values()
            .filter_map(|r| r.get(attr))
            .filter(|v| !v.is_null())
            .map(unique_member)
            .collect();
        let distinct: BTreeSet<&String> = values.iter().collect();
        assert_eq!(distinct.len(), values.len(), "duplicate values for {attr}");
        for value in &values {
            assert!(members.contains(value), "{attr} value {value} is not indexed");
        }
    }

    snap
}
