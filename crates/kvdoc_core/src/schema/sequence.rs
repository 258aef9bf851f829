//! Auto-increment counters.

use crate::error::CoreResult;
use crate::keys::KeyBuilder;
use kvdoc_backend::KvBackend;
use std::sync::Arc;

/// An integer counter backing one auto-increment attribute.
///
/// Stored as a decimal string at `{prefix}:{{collection}}:_sequences:{attr}`
/// and advanced with the backend's atomic `INCR`.
#[derive(Debug, Clone)]
pub struct Sequence {
    backend: Arc<dyn KvBackend>,
    attribute: String,
    key: String,
}

impl Sequence {
    /// Creates a handle for the counter of `collection.attribute`.
    pub fn new(
        backend: Arc<dyn KvBackend>,
        keys: &KeyBuilder,
        collection: &str,
        attribute: &str,
    ) -> Self {
        Self {
            backend,
            attribute: attribute.to_string(),
            key: keys.sequence_key(collection, attribute),
        }
    }

    /// The attribute this sequence feeds.
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// The backend key of the counter.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Creates the counter at `0` unless it already exists.
    pub async fn initialize(&self) -> CoreResult<()> {
        if !self.backend.exists(&self.key).await? {
            self.backend.set(&self.key, "0").await?;
        }
        Ok(())
    }

    /// Returns the current value, or `None` if the counter does not exist.
    pub async fn get(&self) -> CoreResult<Option<i64>> {
        let raw = self.backend.get(&self.key).await?;
        Ok(raw.and_then(|s| s.trim().parse().ok()))
    }

    /// Atomically advances the counter and returns the new value.
    pub async fn increment(&self) -> CoreResult<i64> {
        Ok(self.backend.incr(&self.key).await?)
    }

    /// Sets the counter to an explicit value.
    pub async fn set(&self, value: i64) -> CoreResult<()> {
        self.backend.set(&self.key, &value.to_string()).await?;
        Ok(())
    }
}
