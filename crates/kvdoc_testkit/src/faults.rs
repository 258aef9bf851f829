//! Fault injection.
//!
//! [`FaultyBackend`] wraps an [`InMemoryBackend`] and fails chosen commands
//! with [`BackendError::Injected`]. Failures apply both to direct calls and
//! to commands inside a batch; in a batch the failing commands are skipped
//! and the others still run, so callers see partial batch failures.

use async_trait::async_trait;
use kvdoc_backend::{BackendError, BackendResult, Batch, Command, InMemoryBackend, KvBackend, Reply};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;

/// Operation name that fails whole batch submissions.
pub const EXEC: &str = "exec";

/// A backend that fails selected operations on demand.
#[derive(Debug, Default)]
pub struct FaultyBackend {
    inner: Arc<InMemoryBackend>,
    failing: RwLock<HashSet<String>>,
}

impl FaultyBackend {
    /// Wraps a fresh in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing in-memory backend.
    pub fn wrap(inner: Arc<InMemoryBackend>) -> Self {
        Self {
            inner,
            failing: RwLock::new(HashSet::new()),
        }
    }

    /// The wrapped backend.
    pub fn inner(&self) -> &Arc<InMemoryBackend> {
        &self.inner
    }

    /// Makes every later `operation` fail (`"srem"`, `"set"`, [`EXEC`], ...).
    pub fn fail_on(&self, operation: &str) {
        self.failing.write().insert(operation.to_string());
    }

    /// Stops failing `operation`.
    pub fn heal(&self, operation: &str) {
        self.failing.write().remove(operation);
    }

    /// Stops failing anything.
    pub fn heal_all(&self) {
        self.failing.write().clear();
    }

    fn check(&self, operation: &str) -> BackendResult<()> {
        if self.failing.read().contains(operation) {
            return Err(BackendError::injected(operation));
        }
        Ok(())
    }
}

#[async_trait]
impl KvBackend for FaultyBackend {
    async fn get(&self, key: &str) -> BackendResult<Option<String>> {
        self.check("get")?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> BackendResult<()> {
        self.check("set")?;
        self.inner.set(key, value).await
    }

    async fn del(&self, key: &str) -> BackendResult<bool> {
        self.check("del")?;
        self.inner.del(key).await
    }

    async fn exists(&self, key: &str) -> BackendResult<bool> {
        self.check("exists")?;
        self.inner.exists(key).await
    }

    async fn incr(&self, key: &str) -> BackendResult<i64> {
        self.check("incr")?;
        self.inner.incr(key).await
    }

    async fn sadd(&self, set: &str, member: &str) -> BackendResult<bool> {
        self.check("sadd")?;
        self.inner.sadd(set, member).await
    }

    async fn srem(&self, set: &str, member: &str) -> BackendResult<bool> {
        self.check("srem")?;
        self.inner.srem(set, member).await
    }

    async fn smembers(&self, set: &str) -> BackendResult<Vec<String>> {
        self.check("smembers")?;
        self.inner.smembers(set).await
    }

    async fn sismember(&self, set: &str, member: &str) -> BackendResult<bool> {
        self.check("sismember")?;
        self.inner.sismember(set, member).await
    }

    async fn exec(&self, batch: Batch) -> BackendResult<Vec<BackendResult<Reply>>> {
        self.check(EXEC)?;

        let commands = batch.into_commands();
        let failed: Vec<bool> = {
            let failing = self.failing.read();
            commands.iter().map(|c| failing.contains(c.name())).collect()
        };

        let mut passing = Batch::new();
        for (command, fail) in commands.iter().zip(&failed) {
            if !fail {
                passing.push(command.clone());
            }
        }
        let mut replies = self.inner.exec(passing).await?.into_iter();

        Ok(commands
            .iter()
            .zip(failed)
            .map(|(command, fail): (&Command, bool)| {
                if fail {
                    Err(BackendError::injected(command.name()))
                } else {
                    replies
                        .next()
                        .unwrap_or_else(|| Err(BackendError::Other("missing reply".into())))
                }
            })
            .collect())
    }

    async fn close(&self) -> BackendResult<()> {
        self.inner.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failing_operation_errors_until_healed() {
        let backend = FaultyBackend::new();
        backend.fail_on("set");
        assert_eq!(
            backend.set("k", "v").await,
            Err(BackendError::injected("set"))
        );

        backend.heal("set");
        backend.set("k", "v").await.unwrap();
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn batch_failures_are_partial() {
        let backend = FaultyBackend::new();
        backend.fail_on("srem");

        let replies = backend
            .exec(Batch::new().sadd("s", "a").srem("s", "a").sadd("s", "b"))
            .await
            .unwrap();
        assert_eq!(replies[0], Ok(Reply::Integer(1)));
        assert_eq!(replies[1], Err(BackendError::injected("srem")));
        assert_eq!(replies[2], Ok(Reply::Integer(1)));
        assert_eq!(
            backend.smembers("s").await.unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[tokio::test]
    async fn whole_batch_failure() {
        let backend = FaultyBackend::new();
        backend.fail_on(EXEC);
        assert!(backend.exec(Batch::new().incr("n")).await.is_err());
        backend.heal_all();
        assert!(backend.exec(Batch::new().incr("n")).await.is_ok());
    }
}
