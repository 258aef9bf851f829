//! Schema registry.
//!
//! Holds the attribute schema of every registered collection together with
//! the index and sequence handles derived from it.
//!
//! # Invariants
//!
//! - Collection names are canonicalised to lowercase
//! - A non-empty schema has exactly one primary-key attribute
//! - The registry lock is never held across an `.await`

use super::attribute::AttributeSchema;
use super::sequence::Sequence;
use super::unique::UniqueIndex;
use crate::error::{CoreError, CoreResult};
use crate::keys::KeyBuilder;
use futures::future::try_join_all;
use kvdoc_backend::KvBackend;
use kvdoc_codec::{parse_datetime, Record, Value};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Snapshot of one registered collection.
#[derive(Debug, Clone)]
pub struct CollectionSchema {
    name: String,
    attributes: AttributeSchema,
    primary_key: Option<String>,
    unique: BTreeMap<String, UniqueIndex>,
    sequences: BTreeMap<String, Sequence>,
    defined: bool,
}

impl CollectionSchema {
    fn build(
        backend: &Arc<dyn KvBackend>,
        keys: &KeyBuilder,
        name: &str,
        attributes: AttributeSchema,
        defined: bool,
    ) -> CoreResult<Self> {
        let primaries: Vec<&String> = attributes
            .iter()
            .filter(|(_, attr)| attr.primary_key)
            .map(|(name, _)| name)
            .collect();
        if !attributes.is_empty() && primaries.len() != 1 {
            return Err(CoreError::invalid_schema(
                name,
                format!(
                    "expected exactly one primary key attribute, found {}",
                    primaries.len()
                ),
            ));
        }
        let primary_key = primaries.first().map(|s| (*s).clone());

        let mut unique = BTreeMap::new();
        let mut sequences = BTreeMap::new();
        for (attr_name, attr) in &attributes {
            if attr.unique {
                unique.insert(
                    attr_name.clone(),
                    UniqueIndex::new(backend.clone(), keys, name, attr_name),
                );
            }
            if attr.auto_increment {
                sequences.insert(
                    attr_name.clone(),
                    Sequence::new(backend.clone(), keys, name, attr_name),
                );
            }
        }

        Ok(Self {
            name: name.to_string(),
            attributes,
            primary_key,
            unique,
            sequences,
            defined,
        })
    }

    /// Canonical (lowercase) collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The registered attributes.
    pub fn attributes(&self) -> &AttributeSchema {
        &self.attributes
    }

    /// The primary-key attribute, if the schema is not empty.
    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    /// Unique indices by attribute.
    pub fn unique_indices(&self) -> &BTreeMap<String, UniqueIndex> {
        &self.unique
    }

    /// The unique index of one attribute.
    pub fn unique_index(&self, attribute: &str) -> Option<&UniqueIndex> {
        self.unique.get(attribute)
    }

    /// Sequences by attribute.
    pub fn sequences(&self) -> &BTreeMap<String, Sequence> {
        &self.sequences
    }

    /// The sequence of one attribute.
    pub fn sequence(&self, attribute: &str) -> Option<&Sequence> {
        self.sequences.get(attribute)
    }

    /// Returns true if the schema was supplied through `define`.
    pub fn is_defined(&self) -> bool {
        self.defined
    }
}

/// Registry of collection schemas sharing one backend and key prefix.
#[derive(Debug)]
pub struct SchemaRegistry {
    backend: Arc<dyn KvBackend>,
    keys: KeyBuilder,
    collections: RwLock<HashMap<String, Arc<CollectionSchema>>>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    pub fn new(backend: Arc<dyn KvBackend>, keys: KeyBuilder) -> Self {
        Self {
            backend,
            keys,
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// The key builder used for every collection.
    pub fn keys(&self) -> &KeyBuilder {
        &self.keys
    }

    /// Registers a collection, replacing any previous state for the name.
    ///
    /// Existing data is not touched.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchema` if a non-empty schema does not have exactly
    /// one primary-key attribute.
    pub fn register_collection(&self, name: &str, schema: &AttributeSchema) -> CoreResult<()> {
        self.insert(name, schema, false)
    }

    /// Registers a collection and marks its schema as explicitly defined.
    pub fn define(&self, name: &str, schema: &AttributeSchema) -> CoreResult<()> {
        self.insert(name, schema, true)
    }

    fn insert(&self, name: &str, schema: &AttributeSchema, defined: bool) -> CoreResult<()> {
        let name = name.to_lowercase();
        let collection =
            CollectionSchema::build(&self.backend, &self.keys, &name, schema.clone(), defined)?;
        debug!(
            collection = %name,
            attributes = collection.attributes.len(),
            unique = collection.unique.len(),
            sequences = collection.sequences.len(),
            "registered collection"
        );
        self.collections.write().insert(name, Arc::new(collection));
        Ok(())
    }

    /// Initialises every sequence of every collection.
    ///
    /// # Errors
    ///
    /// Fails if any single initialisation fails.
    pub async fn sync(&self) -> CoreResult<()> {
        let sequences: Vec<Sequence> = self
            .collections
            .read()
            .values()
            .flat_map(|c| c.sequences.values().cloned())
            .collect();
        debug!(sequences = sequences.len(), "syncing sequences");
        try_join_all(sequences.iter().map(Sequence::initialize)).await?;
        Ok(())
    }

    /// Returns a copy of the registered schema, `None` if never registered.
    pub fn retrieve(&self, name: &str) -> Option<AttributeSchema> {
        self.collections
            .read()
            .get(&name.to_lowercase())
            .map(|c| c.attributes.clone())
    }

    /// Describes a collection.
    ///
    /// Returns `Ok(None)` when the collection has no attributes or its schema
    /// only came from connection-time configuration.
    ///
    /// # Errors
    ///
    /// Returns `CollectionNotRegistered` if the name was never registered.
    pub fn describe(&self, name: &str) -> CoreResult<Option<AttributeSchema>> {
        let name = name.to_lowercase();
        let guard = self.collections.read();
        let collection = guard
            .get(&name)
            .ok_or_else(|| CoreError::collection_not_registered(&name))?;
        if collection.attributes.is_empty() || !collection.defined {
            return Ok(None);
        }
        Ok(Some(collection.attributes.clone()))
    }

    /// Key of the primary index set of a collection.
    pub fn index_key(&self, name: &str, primary_key: &str) -> String {
        self.keys.index_key(name, primary_key)
    }

    /// Key of one record blob.
    pub fn record_key(&self, name: &str, primary_key: &str, value: &Value) -> String {
        self.keys.record_key(name, primary_key, value)
    }

    /// Re-types temporal attributes of a record read from the backend.
    ///
    /// Values that do not parse as dates are left unchanged, as is every
    /// record of an unregistered collection.
    pub fn parse(&self, name: &str, mut record: Record) -> Record {
        let Some(collection) = self.collections.read().get(&name.to_lowercase()).cloned() else {
            return record;
        };
        for (attr_name, attr) in &collection.attributes {
            if !attr.kind.is_temporal() {
                continue;
            }
            if let Some(value) = record.get_mut(attr_name) {
                if matches!(value, Value::Text(_) | Value::Integer(_)) {
                    if let Some(dt) = parse_datetime(value) {
                        *value = Value::DateTime(dt);
                    }
                }
            }
        }
        record
    }

    /// Returns a shared snapshot of a collection.
    ///
    /// # Errors
    ///
    /// Returns `CollectionNotRegistered` if the collection is unknown or has
    /// no primary key.
    pub fn collection(&self, name: &str) -> CoreResult<Arc<CollectionSchema>> {
        let name = name.to_lowercase();
        self.collections
            .read()
            .get(&name)
            .filter(|c| c.primary_key.is_some())
            .cloned()
            .ok_or_else(|| CoreError::collection_not_registered(name))
    }

    /// The primary-key attribute of a collection.
    pub fn primary_key(&self, name: &str) -> Option<String> {
        self.collections
            .read()
            .get(&name.to_lowercase())
            .and_then(|c| c.primary_key.clone())
    }

    /// Replaces a collection with an empty schema.
    pub fn reset(&self, name: &str) {
        let name = name.to_lowercase();
        let empty = CollectionSchema {
            name: name.clone(),
            attributes: AttributeSchema::new(),
            primary_key: None,
            unique: BTreeMap::new(),
            sequences: BTreeMap::new(),
            defined: false,
        };
        self.collections.write().insert(name, Arc::new(empty));
    }

    /// Names of all registered collections.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }
}
