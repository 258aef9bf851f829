//! Collection store.
//!
//! The store maps document collections onto key-value primitives:
//!
//! - each record is a JSON blob at its record key
//! - the primary index set holds every record key of a collection
//! - unique attributes keep their in-use values in a [`UniqueIndex`] set
//! - auto-increment attributes draw from a [`Sequence`](crate::schema::Sequence)
//!
//! # Consistency
//!
//! Single-key operations and [`Batch`] executions are atomic; nothing else
//! is. In particular the uniqueness check in `create` and `update` is a
//! check-then-act: two writers racing on the same value can both pass the
//! membership test. The loser's `SADD` reports the value as already present
//! and is logged, not rejected.

use crate::aggregate::{AggregateProcessor, Aggregated};
use crate::config::StoreConfig;
use crate::criteria::{Criteria, CriteriaEvaluator, PredicateEvaluator, SortDirection};
use crate::error::{CoreError, CoreResult};
use crate::join::{JoinRunner, JoinSource};
use crate::keys::{key_fragment, unique_member, KeyBuilder};
use crate::schema::{AttributeSchema, CollectionSchema, SchemaRegistry, UniqueIndex};
use async_trait::async_trait;
use futures::future::try_join_all;
use kvdoc_backend::{BackendResult, Batch, KvBackend, Reply};
use kvdoc_codec::{decode_record, encode_record, Record, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Document collections over one key-value backend.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use kvdoc_backend::InMemoryBackend;
/// use kvdoc_codec::{Record, Value};
/// use kvdoc_core::schema::{Attribute, AttributeSchema, AttributeType};
/// use kvdoc_core::{CollectionStore, Criteria, StoreConfig};
///
/// # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// # rt.block_on(async {
/// let store = CollectionStore::new(Arc::new(InMemoryBackend::new()), StoreConfig::new());
///
/// let mut schema = AttributeSchema::new();
/// schema.insert(
///     "id".into(),
///     Attribute::new(AttributeType::Integer).primary_key().auto_increment(),
/// );
/// schema.insert("name".into(), Attribute::new(AttributeType::String));
/// store.define("users", &schema).await.unwrap();
///
/// let mut user = Record::new();
/// user.insert("name".into(), Value::from("Steve Holt"));
/// let created = store.create("users", user).await.unwrap();
/// assert_eq!(created["id"], Value::Integer(1));
///
/// let found = store.find("users", &Criteria::where_eq("name", "steve holt")).await.unwrap();
/// assert_eq!(found.records().len(), 1);
/// # });
/// ```
#[derive(Debug)]
pub struct CollectionStore {
    backend: Arc<dyn KvBackend>,
    registry: SchemaRegistry,
    evaluator: Arc<dyn CriteriaEvaluator>,
    aggregator: AggregateProcessor,
    join_runner: Option<Arc<dyn JoinRunner>>,
}

impl CollectionStore {
    /// Creates a store with the default evaluator and no join runner.
    pub fn new(backend: Arc<dyn KvBackend>, config: StoreConfig) -> Self {
        let registry = SchemaRegistry::new(backend.clone(), KeyBuilder::new(config.prefix));
        Self {
            backend,
            registry,
            evaluator: Arc::new(PredicateEvaluator::new()),
            aggregator: AggregateProcessor::new(),
            join_runner: None,
        }
    }

    /// Replaces the criteria evaluator.
    #[must_use]
    pub fn with_evaluator(mut self, evaluator: Arc<dyn CriteriaEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Sets the join runner.
    #[must_use]
    pub fn with_join_runner(mut self, runner: Arc<dyn JoinRunner>) -> Self {
        self.join_runner = Some(runner);
        self
    }

    /// The schema registry.
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// The raw backend handle.
    pub fn native(&self) -> Arc<dyn KvBackend> {
        self.backend.clone()
    }

    /// Registers a collection from connection-time configuration.
    pub fn configure(&self, name: &str, schema: &AttributeSchema) -> CoreResult<()> {
        self.registry.register_collection(name, schema)
    }

    /// Defines a collection and initialises its sequences.
    pub async fn define(&self, name: &str, schema: &AttributeSchema) -> CoreResult<()> {
        self.registry.define(name, schema)?;
        self.registry.sync().await
    }

    /// Describes a collection. See [`SchemaRegistry::describe`].
    pub fn describe(&self, name: &str) -> CoreResult<Option<AttributeSchema>> {
        self.registry.describe(name)
    }

    /// Initialises the sequences of every registered collection.
    pub async fn sync(&self) -> CoreResult<()> {
        self.registry.sync().await
    }

    /// Inserts a record and returns it as stored.
    ///
    /// Unique values are checked and registered before anything else is
    /// written. Auto-increment attributes without a value draw the next
    /// number from their sequence; an explicit value resets the sequence to
    /// it. Temporal attributes are normalised to dates before the write. A
    /// record with the same primary key is overwritten.
    ///
    /// # Errors
    ///
    /// - `PrimaryKeyMissing` if the primary key is absent and not generated
    /// - `NotUnique` if a unique value is already in use
    /// - `InvalidAutoIncrement` if an explicit sequence value is not an integer
    pub async fn create(&self, name: &str, mut data: Record) -> CoreResult<Record> {
        let schema = self.registry.collection(name)?;
        let pk = primary(&schema)?;

        let pk_missing = data.get(pk).map_or(true, Value::is_null);
        if pk_missing && schema.sequence(pk).is_none() {
            return Err(CoreError::PrimaryKeyMissing {
                collection: schema.name().to_string(),
                attribute: pk.to_string(),
            });
        }
        for attr in schema.sequences().keys() {
            if let Some(value) = data.get(attr).filter(|v| !v.is_null()) {
                sequence_value(attr, value)?;
            }
        }

        self.unique_constraint(name, &data).await?;

        let assigned = try_join_all(schema.sequences().iter().map(|(attr, sequence)| {
            let explicit = data.get(attr).filter(|v| !v.is_null()).cloned();
            async move {
                match explicit {
                    Some(value) => {
                        sequence.set(sequence_value(attr, &value)?).await?;
                        Ok::<_, CoreError>((attr.clone(), value, false))
                    }
                    None => {
                        let next = sequence.increment().await?;
                        Ok((attr.clone(), Value::Integer(next), true))
                    }
                }
            }
        }))
        .await?;

        let mut generated_pk = false;
        for (attr, value, generated) in assigned {
            generated_pk |= generated && attr == pk;
            data.insert(attr, value);
        }

        let data = self.registry.parse(name, data);
        let pk_value = data.get(pk).cloned().unwrap_or(Value::Null);
        let record_key = self.registry.record_key(name, pk, &pk_value);
        self.backend
            .set(&record_key, &encode_record(&data)?)
            .await?;

        if generated_pk {
            if let Some(index) = schema.unique_index(pk) {
                index.index(&pk_value).await?;
            }
        }

        let index_key = self.registry.index_key(name, pk);
        self.backend.sadd(&index_key, &record_key).await?;

        self.load(name, &record_key).await?.ok_or_else(|| {
            CoreError::data_integrity(format!("record {record_key} vanished after write"))
        })
    }

    /// Checks that no unique value in `data` is in use, then registers them.
    ///
    /// The membership tests run as one atomic batch. Null values are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns `NotUnique` naming the first conflicting attribute; nothing is
    /// registered in that case.
    pub async fn unique_constraint(&self, name: &str, data: &Record) -> CoreResult<()> {
        let schema = self.registry.collection(name)?;
        let candidates: Vec<(&UniqueIndex, &Value)> = schema
            .unique_indices()
            .iter()
            .filter_map(|(attr, index)| {
                data.get(attr)
                    .filter(|v| !v.is_null())
                    .map(|v| (index, v))
            })
            .collect();
        if candidates.is_empty() {
            return Ok(());
        }

        let batch = candidates
            .iter()
            .fold(Batch::new(), |batch, (index, value)| {
                batch.sismember(index.key(), unique_member(value))
            });
        let replies = self.backend.exec(batch).await?;
        for ((index, _), reply) in candidates.iter().zip(replies) {
            if reply?.is_truthy() {
                return Err(CoreError::NotUnique {
                    attribute: index.attribute().to_string(),
                });
            }
        }

        try_join_all(candidates.iter().map(|(index, value)| index.index(value))).await?;
        Ok(())
    }

    /// Finds records matching `criteria`, then applies aggregate directives.
    ///
    /// A where clause that is exactly one equality on the primary key reads
    /// that single record; anything else scans the primary index. Results
    /// are sorted by primary key unless the criteria sort otherwise.
    pub async fn find(&self, name: &str, criteria: &Criteria) -> CoreResult<Aggregated> {
        let schema = self.registry.collection(name)?;
        let records = self.find_records(&schema, criteria).await?;
        match self.aggregator.process(records, &criteria.aggregate)? {
            Aggregated::Plain(records) if !criteria.select.is_empty() => {
                let pk = primary(&schema)?;
                let mut fields = criteria.select.clone();
                fields.push(pk.to_string());
                Ok(Aggregated::Plain(
                    records
                        .into_iter()
                        .map(|r| project(r, &fields))
                        .collect(),
                ))
            }
            other => Ok(other),
        }
    }

    /// Fetches one record by primary key.
    ///
    /// When `fields` is not empty only those attributes are returned.
    ///
    /// # Errors
    ///
    /// Returns `DataIntegrityViolation` if several records carry the key.
    pub async fn get(
        &self,
        name: &str,
        primary_key: &Value,
        fields: &[String],
    ) -> CoreResult<Option<Record>> {
        let schema = self.registry.collection(name)?;
        let pk = primary(&schema)?;
        let records = self
            .find_records(&schema, &Criteria::where_eq(pk, primary_key.clone()))
            .await?;

        let wanted = key_fragment(primary_key);
        let mut hits: Vec<Record> = records
            .into_iter()
            .filter(|r| r.get(pk).map(key_fragment).as_deref() == Some(wanted.as_str()))
            .collect();
        match hits.len() {
            0 => Ok(None),
            1 => Ok(hits.pop().map(|r| project(r, fields))),
            n => Err(CoreError::data_integrity(format!(
                "{n} records of {} share primary key {wanted}",
                schema.name()
            ))),
        }
    }

    /// Lists the primary-key fragments of every record, sorted.
    pub async fn keys(&self, name: &str) -> CoreResult<Vec<String>> {
        let schema = self.registry.collection(name)?;
        let index_key = self.registry.index_key(schema.name(), primary(&schema)?);
        let prefix = format!("{index_key}:");
        let mut keys: Vec<String> = self
            .backend
            .smembers(&index_key)
            .await?
            .into_iter()
            .map(|member| {
                member
                    .strip_prefix(&prefix)
                    .map(str::to_string)
                    .unwrap_or(member)
            })
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// Tests whether a record with the given primary key exists.
    pub async fn has_key(&self, name: &str, primary_key: &Value) -> CoreResult<bool> {
        let schema = self.registry.collection(name)?;
        let pk = primary(&schema)?;
        let index_key = self.registry.index_key(schema.name(), pk);
        let record_key = self.registry.record_key(schema.name(), pk, primary_key);
        Ok(self.backend.sismember(&index_key, &record_key).await?)
    }

    /// Merges `values` into every record matching `criteria`.
    ///
    /// Returns the updated records.
    ///
    /// # Errors
    ///
    /// - `PrimaryKeyUpdate` if `values` changes the primary key
    /// - `InvalidAutoIncrement` if `values` sets a sequence attribute
    /// - `AmbiguousUniqueUpdate` if a unique attribute is set on several records
    /// - `NotUnique` if a new unique value is in use
    /// - `IndexWriteFailure` if the index batch partially fails
    pub async fn update(
        &self,
        name: &str,
        criteria: &Criteria,
        mut values: Record,
    ) -> CoreResult<Vec<Record>> {
        let schema = self.registry.collection(name)?;
        let pk = primary(&schema)?;

        if let Some(new_pk) = values.remove(pk) {
            let pinned = criteria.filter.pinned(pk).map(key_fragment);
            if pinned != Some(key_fragment(&new_pk)) {
                return Err(CoreError::PrimaryKeyUpdate {
                    attribute: pk.to_string(),
                });
            }
        }
        if let Some(attr) = values.keys().find(|a| schema.sequence(a).is_some()) {
            return Err(CoreError::InvalidAutoIncrement {
                attribute: attr.clone(),
            });
        }

        let values = self.registry.parse(name, values);
        let records = self.find_records(&schema, criteria).await?;
        if records.is_empty() || values.is_empty() {
            return Ok(records);
        }

        let touched: Vec<&UniqueIndex> = schema
            .unique_indices()
            .iter()
            .filter(|(attr, _)| values.contains_key(*attr))
            .map(|(_, index)| index)
            .collect();
        if let Some(first) = touched.first() {
            if records.len() > 1 {
                return Err(CoreError::AmbiguousUniqueUpdate {
                    attribute: first.attribute().to_string(),
                    matched: records.len(),
                });
            }
            self.reindex_unique(name, &touched, &records[0], &values)
                .await?;
        }

        let mut seen = HashSet::new();
        let mut updated = Vec::with_capacity(records.len());
        for mut record in records {
            let key = self
                .registry
                .record_key(name, pk, record.get(pk).unwrap_or(&Value::Null));
            if !seen.insert(key.clone()) {
                continue;
            }
            record.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
            updated.push((key, record));
        }

        let blobs = updated
            .iter()
            .map(|(key, record)| Ok((key, encode_record(record)?)))
            .collect::<CoreResult<Vec<_>>>()?;
        try_join_all(blobs.iter().map(|(key, blob)| self.backend.set(key, blob))).await?;

        Ok(updated
            .into_iter()
            .map(|(_, record)| self.registry.parse(name, record))
            .collect())
    }

    /// Moves one record's unique values from their current to their new
    /// values.
    async fn reindex_unique(
        &self,
        name: &str,
        touched: &[&UniqueIndex],
        record: &Record,
        values: &Record,
    ) -> CoreResult<()> {
        let mut changed = Vec::new();
        for index in touched {
            let old = record.get(index.attribute()).unwrap_or(&Value::Null);
            let new = values.get(index.attribute()).unwrap_or(&Value::Null);
            let same = match (old.is_null(), new.is_null()) {
                (true, true) => true,
                (false, false) => unique_member(old) == unique_member(new),
                _ => false,
            };
            if !same {
                changed.push((*index, old, new));
            }
        }
        if changed.is_empty() {
            return Ok(());
        }

        let check: Record = changed
            .iter()
            .map(|(index, _, new)| (index.attribute().to_string(), (*new).clone()))
            .collect();
        self.unique_constraint(name, &check).await?;

        let mut batch = Batch::new();
        for (index, old, new) in &changed {
            if !old.is_null() {
                batch = batch.srem(index.key(), unique_member(old));
            }
            if !new.is_null() {
                batch = batch.sadd(index.key(), unique_member(new));
            }
        }
        debug!(collection = name, commands = batch.len(), "moving unique values");
        ensure_applied(self.backend.exec(batch).await?)
    }

    /// Removes attributes from every record matching `criteria`.
    ///
    /// Unique values of the removed attributes are released in the same
    /// atomic batch that rewrites the records. Returns the records as they
    /// were before the removal.
    pub async fn delete_keys(
        &self,
        name: &str,
        criteria: &Criteria,
        attributes: &[String],
    ) -> CoreResult<Vec<Record>> {
        let schema = self.registry.collection(name)?;
        let pk = primary(&schema)?;

        if attributes.iter().any(|a| a == pk) {
            return Err(CoreError::PrimaryKeyUpdate {
                attribute: pk.to_string(),
            });
        }
        if let Some(attr) = attributes.iter().find(|a| schema.sequence(a).is_some()) {
            return Err(CoreError::InvalidAutoIncrement {
                attribute: attr.clone(),
            });
        }

        let records = self.find_records(&schema, criteria).await?;
        if records.is_empty() {
            return Ok(records);
        }

        let mut batch = Batch::new();
        for record in &records {
            for attr in attributes {
                if let (Some(index), Some(value)) = (schema.unique_index(attr), record.get(attr)) {
                    if !value.is_null() {
                        batch = batch.srem(index.key(), unique_member(value));
                    }
                }
            }
            let mut stripped = record.clone();
            for attr in attributes {
                stripped.remove(attr);
            }
            let key = self
                .registry
                .record_key(name, pk, record.get(pk).unwrap_or(&Value::Null));
            batch = batch.set(key, encode_record(&stripped)?);
        }

        debug!(collection = name, commands = batch.len(), "removing attributes");
        ensure_applied(self.backend.exec(batch).await?)?;
        Ok(records)
    }

    /// Deletes every record matching `criteria` and returns them.
    ///
    /// Index entries are removed in one atomic batch before the record blobs
    /// are deleted.
    pub async fn destroy(&self, name: &str, criteria: &Criteria) -> CoreResult<Vec<Record>> {
        let schema = self.registry.collection(name)?;
        let pk = primary(&schema)?;

        let records = self.find_records(&schema, criteria).await?;
        if records.is_empty() {
            return Ok(records);
        }

        let index_key = self.registry.index_key(name, pk);
        let mut batch = Batch::new();
        let mut record_keys = Vec::with_capacity(records.len());
        for record in &records {
            let key = self
                .registry
                .record_key(name, pk, record.get(pk).unwrap_or(&Value::Null));
            batch = batch.srem(&index_key, key.clone());
            for (attr, index) in schema.unique_indices() {
                if let Some(value) = record.get(attr).filter(|v| !v.is_null()) {
                    batch = batch.srem(index.key(), unique_member(value));
                }
            }
            record_keys.push(key);
        }

        debug!(collection = name, commands = batch.len(), "destroying records");
        ensure_applied(self.backend.exec(batch).await?)?;
        try_join_all(record_keys.iter().map(|key| self.backend.del(key))).await?;
        Ok(records)
    }

    /// Deletes every key of a collection and resets its schema to empty.
    ///
    /// Later operations on the collection fail with `CollectionNotRegistered`
    /// until it is defined again.
    pub async fn drop(&self, name: &str) -> CoreResult<()> {
        let schema = self.registry.collection(name)?;
        let index_key = self.registry.index_key(name, primary(&schema)?);
        let members = self.backend.smembers(&index_key).await?;

        let mut doomed: Vec<String> = schema
            .sequences()
            .values()
            .map(|s| s.key().to_string())
            .collect();
        doomed.extend(schema.unique_indices().values().map(|i| i.key().to_string()));
        doomed.push(index_key);
        doomed.extend(members);

        debug!(collection = schema.name(), keys = doomed.len(), "dropping collection");
        try_join_all(doomed.iter().map(|key| self.backend.del(key))).await?;
        self.registry.reset(name);
        Ok(())
    }

    /// Runs a join through the configured [`JoinRunner`].
    ///
    /// The projection is left to the runner and removed from the criteria.
    pub async fn join(&self, name: &str, criteria: &Criteria) -> CoreResult<Vec<Record>> {
        let runner = self
            .join_runner
            .clone()
            .ok_or_else(|| CoreError::JoinUnavailable {
                collection: name.to_lowercase(),
            })?;
        let mut criteria = criteria.clone();
        criteria.select.clear();
        runner.run(&name.to_lowercase(), &criteria, self).await
    }

    async fn find_records(
        &self,
        schema: &CollectionSchema,
        criteria: &Criteria,
    ) -> CoreResult<Vec<Record>> {
        let name = schema.name();
        let pk = primary(schema)?;

        let candidates = match criteria.filter.single_eq(pk) {
            Some(value) => {
                let key = self.registry.record_key(name, pk, value);
                debug!(collection = name, key = %key, "primary key lookup");
                self.load(name, &key).await?.into_iter().collect()
            }
            None => self.scan(schema, pk).await?,
        };

        let matched = self
            .evaluator
            .evaluate(candidates, &criteria.where_only())?;
        let mut paging = criteria.without_where();
        if paging.sort.is_empty() {
            paging = paging.sort_by(pk, SortDirection::Asc);
        }
        self.evaluator.evaluate(matched, &paging)
    }

    async fn scan(&self, schema: &CollectionSchema, pk: &str) -> CoreResult<Vec<Record>> {
        let name = schema.name();
        let index_key = self.registry.index_key(name, pk);
        let members = self.backend.smembers(&index_key).await?;
        let blobs = try_join_all(members.iter().map(|key| self.backend.get(key))).await?;

        let mut records = Vec::with_capacity(blobs.len());
        for (key, blob) in members.iter().zip(blobs) {
            match blob {
                Some(blob) => records.push(self.registry.parse(name, decode_record(&blob)?)),
                None => warn!(collection = name, key = %key, "index member has no record"),
            }
        }
        Ok(records)
    }

    async fn load(&self, name: &str, record_key: &str) -> CoreResult<Option<Record>> {
        match self.backend.get(record_key).await? {
            Some(blob) => Ok(Some(self.registry.parse(name, decode_record(&blob)?))),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl JoinSource for CollectionStore {
    async fn fetch(&self, collection: &str, criteria: &Criteria) -> CoreResult<Vec<Record>> {
        Ok(self.find(collection, criteria).await?.into_records())
    }

    async fn primary_key(&self, collection: &str) -> Option<String> {
        self.registry.primary_key(collection)
    }
}

fn primary(schema: &CollectionSchema) -> CoreResult<&str> {
    schema
        .primary_key()
        .ok_or_else(|| CoreError::collection_not_registered(schema.name()))
}

fn sequence_value(attribute: &str, value: &Value) -> CoreResult<i64> {
    let invalid = || CoreError::InvalidAutoIncrement {
        attribute: attribute.to_string(),
    };
    match value {
        Value::Integer(n) => Ok(*n),
        #[allow(clippy::cast_possible_truncation)]
        Value::Float(f) if f.is_finite() && f.fract() == 0.0 => Ok(*f as i64),
        Value::Text(s) => s.trim().parse().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

fn ensure_applied(replies: Vec<BackendResult<Reply>>) -> CoreResult<()> {
    match replies.into_iter().find_map(Result::err) {
        Some(err) => Err(CoreError::index_write_failure(err.to_string())),
        None => Ok(()),
    }
}

fn project(record: Record, fields: &[String]) -> Record {
    if fields.is_empty() {
        return record;
    }
    record
        .into_iter()
        .filter(|(k, _)| fields.contains(k))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, AttributeType};
    use kvdoc_backend::InMemoryBackend;
    use serde_json::json;

    fn record(json: serde_json::Value) -> Record {
        kvdoc_codec::record_from_json(json).unwrap()
    }

    async fn store() -> (Arc<InMemoryBackend>, CollectionStore) {
        let backend = Arc::new(InMemoryBackend::new());
        let store = CollectionStore::new(backend.clone(), StoreConfig::new().prefix("t"));
        let mut schema = AttributeSchema::new();
        schema.insert(
            "id".into(),
            Attribute::new(AttributeType::Integer)
                .primary_key()
                .auto_increment(),
        );
        schema.insert(
            "email".into(),
            Attribute::new(AttributeType::String).unique(),
        );
        schema.insert("name".into(), Attribute::new(AttributeType::String));
        store.define("users", &schema).await.unwrap();
        (backend, store)
    }

    #[tokio::test]
    async fn create_writes_blob_and_indices() {
        let (backend, store) = store().await;
        let created = store
            .create("users", record(json!({"name": "Gob", "email": "gob@bluth.com"})))
            .await
            .unwrap();

        assert_eq!(created["id"], Value::Integer(1));
        assert!(backend.exists("t:{users}:id:1").await.unwrap());
        assert!(backend
            .sismember("t:{users}:id", "t:{users}:id:1")
            .await
            .unwrap());
        assert!(backend
            .sismember("t:{users}:_indices:email", "gob@bluth.com")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn fast_path_and_scan_agree() {
        let (_backend, store) = store().await;
        for name in ["a", "b", "c"] {
            store
                .create("users", record(json!({"name": name})))
                .await
                .unwrap();
        }

        let by_key = store
            .find("users", &Criteria::where_eq("id", 2))
            .await
            .unwrap()
            .into_records();
        let by_name = store
            .find("users", &Criteria::where_eq("name", "b"))
            .await
            .unwrap()
            .into_records();
        assert_eq!(by_key, by_name);
        assert_eq!(by_key.len(), 1);
    }

    #[tokio::test]
    async fn find_projects_selected_attributes() {
        let (_backend, store) = store().await;
        store
            .create("users", record(json!({"name": "a", "email": "a@x"})))
            .await
            .unwrap();

        let found = store
            .find("users", &Criteria::new().select(["name"]))
            .await
            .unwrap()
            .into_records();
        assert_eq!(found[0], record(json!({"id": 1, "name": "a"})));
    }

    #[tokio::test]
    async fn scan_skips_stale_index_members() {
        let (backend, store) = store().await;
        store
            .create("users", record(json!({"name": "a"})))
            .await
            .unwrap();
        backend.sadd("t:{users}:id", "t:{users}:id:99").await.unwrap();

        let found = store.find("users", &Criteria::new()).await.unwrap();
        assert_eq!(found.records().len(), 1);
    }

    #[tokio::test]
    async fn join_without_runner_fails() {
        let (_backend, store) = store().await;
        let err = store.join("users", &Criteria::new()).await.unwrap_err();
        assert!(matches!(err, CoreError::JoinUnavailable { .. }));
    }

    #[test]
    fn sequence_values() {
        assert_eq!(sequence_value("id", &Value::Integer(4)).unwrap(), 4);
        assert_eq!(sequence_value("id", &Value::Float(4.0)).unwrap(), 4);
        assert_eq!(sequence_value("id", &Value::from("12")).unwrap(), 12);
        assert!(matches!(
            sequence_value("id", &Value::from("x")),
            Err(CoreError::InvalidAutoIncrement { .. })
        ));
    }

    #[test]
    fn ensure_applied_reports_first_failure() {
        let replies = vec![
            Ok(Reply::Integer(1)),
            Err(kvdoc_backend::BackendError::injected("srem")),
        ];
        assert!(matches!(
            ensure_applied(replies),
            Err(CoreError::IndexWriteFailure { .. })
        ));
        assert!(ensure_applied(vec![Ok(Reply::Ok)]).is_ok());
    }
}
