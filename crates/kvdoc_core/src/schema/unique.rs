//! Unique-value index sets.

use crate::error::CoreResult;
use crate::keys::{unique_member, KeyBuilder};
use kvdoc_backend::KvBackend;
use kvdoc_codec::Value;
use std::sync::Arc;
use tracing::warn;

/// The set of in-use values of one unique attribute.
///
/// Values are stored verbatim (see [`unique_member`]). Null values are
/// never indexed.
#[derive(Debug, Clone)]
pub struct UniqueIndex {
    backend: Arc<dyn KvBackend>,
    attribute: String,
    key: String,
}

impl UniqueIndex {
    /// Creates a handle for the index of `collection.attribute`.
    pub fn new(
        backend: Arc<dyn KvBackend>,
        keys: &KeyBuilder,
        collection: &str,
        attribute: &str,
    ) -> Self {
        Self {
            backend,
            attribute: attribute.to_string(),
            key: keys.unique_index_key(collection, attribute),
        }
    }

    /// The indexed attribute.
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// The backend key of the set.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Tests whether a value is in use.
    pub async fn contains(&self, value: &Value) -> CoreResult<bool> {
        if value.is_null() {
            return Ok(false);
        }
        Ok(self.backend.sismember(&self.key, &unique_member(value)).await?)
    }

    /// Registers a value. Returns whether it was newly added.
    ///
    /// A `false` result means another writer registered the same value
    /// after the caller's membership check.
    pub async fn index(&self, value: &Value) -> CoreResult<bool> {
        if value.is_null() {
            return Ok(false);
        }
        let member = unique_member(value);
        let added = self.backend.sadd(&self.key, &member).await?;
        if !added {
            warn!(
                attribute = %self.attribute,
                value = %member,
                "unique value was registered concurrently"
            );
        }
        Ok(added)
    }

    /// Releases a value.
    pub async fn remove(&self, value: &Value) -> CoreResult<bool> {
        if value.is_null() {
            return Ok(false);
        }
        Ok(self.backend.srem(&self.key, &unique_member(value)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvdoc_backend::InMemoryBackend;

    fn index() -> UniqueIndex {
        let backend = Arc::new(InMemoryBackend::new());
        UniqueIndex::new(backend, &KeyBuilder::new("test"), "users", "email")
    }

    #[tokio::test]
    async fn index_contains_remove() {
        let idx = index();
        let email = Value::from("a@b.c");

        assert!(!idx.contains(&email).await.unwrap());
        assert!(idx.index(&email).await.unwrap());
        assert!(idx.contains(&email).await.unwrap());
        assert!(!idx.index(&email).await.unwrap());

        assert!(idx.remove(&email).await.unwrap());
        assert!(!idx.contains(&email).await.unwrap());
    }

    #[tokio::test]
    async fn null_is_never_indexed() {
        let idx = index();
        assert!(!idx.index(&Value::Null).await.unwrap());
        assert!(!idx.contains(&Value::Null).await.unwrap());
    }

    #[tokio::test]
    async fn whitespace_is_significant() {
        let idx = index();
        idx.index(&Value::from("a b")).await.unwrap();
        assert!(idx.contains(&Value::from("a b")).await.unwrap());
        assert!(!idx.contains(&Value::from("a_b")).await.unwrap());
        assert!(idx.index(&Value::from("a_b")).await.unwrap());
    }
}
