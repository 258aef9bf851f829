//! Named connections.
//!
//! A [`ConnectionRegistry`] owns one [`CollectionStore`] per registered
//! connection and dispatches every collection operation to the store of the
//! named connection.

use crate::aggregate::Aggregated;
use crate::config::ConnectionConfig;
use crate::criteria::Criteria;
use crate::error::{CoreError, CoreResult};
use crate::join::JoinRunner;
use crate::schema::AttributeSchema;
use crate::store::CollectionStore;
use kvdoc_backend::KvBackend;
use kvdoc_codec::{Record, Value};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Collection definitions supplied at connection registration.
pub type CollectionDefinitions = BTreeMap<String, AttributeSchema>;

/// A registered connection.
#[derive(Debug)]
pub struct Connection {
    config: ConnectionConfig,
    store: Arc<CollectionStore>,
}

impl Connection {
    /// The configuration the connection was registered with.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// The connection's store.
    pub fn store(&self) -> &Arc<CollectionStore> {
        &self.store
    }
}

/// Registry of named connections.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<String, Arc<Connection>>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection and every collection it declares, then
    /// initialises their sequences.
    ///
    /// # Errors
    ///
    /// - `InvalidConnection` if the identity is empty
    /// - `ConnectionAlreadyRegistered` if the identity is taken
    /// - `InvalidSchema` if a collection definition is rejected
    pub async fn register_connection(
        &self,
        config: ConnectionConfig,
        backend: Arc<dyn KvBackend>,
        collections: &CollectionDefinitions,
    ) -> CoreResult<()> {
        self.register(config, backend, collections, None).await
    }

    /// Like [`register_connection`](Self::register_connection), with a join
    /// runner for the connection's store.
    pub async fn register_connection_with_join(
        &self,
        config: ConnectionConfig,
        backend: Arc<dyn KvBackend>,
        collections: &CollectionDefinitions,
        runner: Arc<dyn JoinRunner>,
    ) -> CoreResult<()> {
        self.register(config, backend, collections, Some(runner))
            .await
    }

    async fn register(
        &self,
        config: ConnectionConfig,
        backend: Arc<dyn KvBackend>,
        collections: &CollectionDefinitions,
        runner: Option<Arc<dyn JoinRunner>>,
    ) -> CoreResult<()> {
        if config.identity.trim().is_empty() {
            return Err(CoreError::invalid_connection("connection is missing an identity"));
        }
        if self.connections.read().contains_key(&config.identity) {
            return Err(CoreError::ConnectionAlreadyRegistered {
                name: config.identity,
            });
        }

        let mut store = CollectionStore::new(backend, config.store_config());
        if let Some(runner) = runner {
            store = store.with_join_runner(runner);
        }
        for (name, schema) in collections {
            store.configure(name, schema)?;
        }
        store.sync().await?;

        let mut connections = self.connections.write();
        if connections.contains_key(&config.identity) {
            return Err(CoreError::ConnectionAlreadyRegistered {
                name: config.identity,
            });
        }
        debug!(
            connection = %config.identity,
            collections = collections.len(),
            "registered connection"
        );
        connections.insert(
            config.identity.clone(),
            Arc::new(Connection {
                config,
                store: Arc::new(store),
            }),
        );
        Ok(())
    }

    /// Closes a connection's backend and forgets the connection.
    ///
    /// Unknown identities are ignored.
    pub async fn teardown(&self, identity: &str) -> CoreResult<()> {
        let removed = self.connections.write().remove(identity);
        if let Some(connection) = removed {
            debug!(connection = identity, "tearing down connection");
            connection.store.native().close().await?;
        }
        Ok(())
    }

    /// Looks up a connection.
    pub fn connection(&self, identity: &str) -> CoreResult<Arc<Connection>> {
        self.connections
            .read()
            .get(identity)
            .cloned()
            .ok_or_else(|| CoreError::ConnectionNotRegistered {
                name: identity.to_string(),
            })
    }

    /// Identities of all registered connections, sorted.
    pub fn identities(&self) -> Vec<String> {
        let mut names: Vec<String> = self.connections.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn store(&self, identity: &str) -> CoreResult<Arc<CollectionStore>> {
        Ok(self.connection(identity)?.store.clone())
    }

    /// See [`CollectionStore::describe`].
    pub fn describe(&self, identity: &str, collection: &str) -> CoreResult<Option<AttributeSchema>> {
        self.store(identity)?.describe(collection)
    }

    /// See [`CollectionStore::define`].
    pub async fn define(
        &self,
        identity: &str,
        collection: &str,
        schema: &AttributeSchema,
    ) -> CoreResult<()> {
        self.store(identity)?.define(collection, schema).await
    }

    /// See [`CollectionStore::drop`].
    pub async fn drop(&self, identity: &str, collection: &str) -> CoreResult<()> {
        let store = self.store(identity)?;
        CollectionStore::drop(&store, collection).await
    }

    /// See [`CollectionStore::create`].
    pub async fn create(&self, identity: &str, collection: &str, data: Record) -> CoreResult<Record> {
        self.store(identity)?.create(collection, data).await
    }

    /// See [`CollectionStore::find`].
    pub async fn find(
        &self,
        identity: &str,
        collection: &str,
        criteria: &Criteria,
    ) -> CoreResult<Aggregated> {
        self.store(identity)?.find(collection, criteria).await
    }

    /// See [`CollectionStore::get`].
    pub async fn get(
        &self,
        identity: &str,
        collection: &str,
        primary_key: &Value,
        fields: &[String],
    ) -> CoreResult<Option<Record>> {
        self.store(identity)?
            .get(collection, primary_key, fields)
            .await
    }

    /// See [`CollectionStore::keys`].
    pub async fn keys(&self, identity: &str, collection: &str) -> CoreResult<Vec<String>> {
        self.store(identity)?.keys(collection).await
    }

    /// See [`CollectionStore::has_key`].
    pub async fn has_key(
        &self,
        identity: &str,
        collection: &str,
        primary_key: &Value,
    ) -> CoreResult<bool> {
        self.store(identity)?.has_key(collection, primary_key).await
    }

    /// See [`CollectionStore::delete_keys`].
    pub async fn delete_keys(
        &self,
        identity: &str,
        collection: &str,
        criteria: &Criteria,
        attributes: &[String],
    ) -> CoreResult<Vec<Record>> {
        self.store(identity)?
            .delete_keys(collection, criteria, attributes)
            .await
    }

    /// See [`CollectionStore::update`].
    pub async fn update(
        &self,
        identity: &str,
        collection: &str,
        criteria: &Criteria,
        values: Record,
    ) -> CoreResult<Vec<Record>> {
        self.store(identity)?
            .update(collection, criteria, values)
            .await
    }

    /// See [`CollectionStore::destroy`].
    pub async fn destroy(
        &self,
        identity: &str,
        collection: &str,
        criteria: &Criteria,
    ) -> CoreResult<Vec<Record>> {
        self.store(identity)?.destroy(collection, criteria).await
    }

    /// See [`CollectionStore::join`].
    pub async fn join(
        &self,
        identity: &str,
        collection: &str,
        criteria: &Criteria,
    ) -> CoreResult<Vec<Record>> {
        self.store(identity)?.join(collection, criteria).await
    }

    /// The raw backend of a connection.
    pub fn native(&self, identity: &str) -> CoreResult<Arc<dyn KvBackend>> {
        Ok(self.store(identity)?.native())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvdoc_backend::InMemoryBackend;

    #[tokio::test]
    async fn rejects_empty_and_duplicate_identities() {
        let registry = ConnectionRegistry::new();
        let backend: Arc<dyn KvBackend> = Arc::new(InMemoryBackend::new());
        let none = CollectionDefinitions::new();

        let err = registry
            .register_connection(ConnectionConfig::new(""), backend.clone(), &none)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidConnection { .. }));

        registry
            .register_connection(ConnectionConfig::new("main"), backend.clone(), &none)
            .await
            .unwrap();
        let err = registry
            .register_connection(ConnectionConfig::new("main"), backend, &none)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ConnectionAlreadyRegistered { .. }));
    }

    #[tokio::test]
    async fn unknown_connection() {
        let registry = ConnectionRegistry::new();
        assert!(matches!(
            registry.keys("nope", "users").await,
            Err(CoreError::ConnectionNotRegistered { .. })
        ));
    }

    #[tokio::test]
    async fn drop_dispatches_to_the_store() {
        let registry = ConnectionRegistry::new();
        let backend = Arc::new(InMemoryBackend::new());
        let mut collections = CollectionDefinitions::new();
        collections.insert(
            "users".to_string(),
            AttributeSchema::from([(
                "id".to_string(),
                crate::schema::Attribute::new(crate::schema::AttributeType::Integer)
                    .primary_key()
                    .auto_increment(),
            )]),
        );
        registry
            .register_connection(ConnectionConfig::new("main"), backend.clone(), &collections)
            .await
            .unwrap();
        registry
            .create("main", "users", Record::new())
            .await
            .unwrap();
        assert!(!backend.is_empty());

        registry.drop("main", "users").await.unwrap();
        assert!(backend.is_empty());
        assert!(matches!(
            registry.keys("main", "users").await,
            Err(CoreError::CollectionNotRegistered { .. })
        ));
    }

    #[tokio::test]
    async fn teardown_closes_backend() {
        let registry = ConnectionRegistry::new();
        let backend = Arc::new(InMemoryBackend::new());
        registry
            .register_connection(
                ConnectionConfig::new("main"),
                backend.clone(),
                &CollectionDefinitions::new(),
            )
            .await
            .unwrap();

        registry.teardown("main").await.unwrap();
        assert!(backend.is_closed());
        assert!(registry.identities().is_empty());
        registry.teardown("main").await.unwrap();
    }
}
