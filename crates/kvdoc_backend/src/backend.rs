//! Key-value backend trait definition.

use crate::batch::{Batch, Reply};
use crate::error::BackendResult;
use async_trait::async_trait;
use std::fmt::Debug;

/// A key-value backend for kvdoc.
///
/// Backends expose the handful of Redis-style primitives the document layer
/// is built from. Keys and values are strings; sets hold string members;
/// counters are strings holding decimal integers.
///
/// # Invariants
///
/// - Each single-key primitive is atomic
/// - [`exec`](Self::exec) applies all commands of a batch atomically, in
///   order, and returns exactly one result per command
/// - A failing command inside a batch does not abort the remaining commands
/// - Backends must be `Send + Sync`; one handle is shared across collections
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For embedding and tests
#[async_trait]
pub trait KvBackend: Debug + Send + Sync {
    /// Reads a string value. Returns `None` for a missing key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key holds a set.
    async fn get(&self, key: &str) -> BackendResult<Option<String>>;

    /// Writes a string value, replacing whatever the key held.
    async fn set(&self, key: &str, value: &str) -> BackendResult<()>;

    /// Deletes a key of any kind. Returns whether it existed.
    async fn del(&self, key: &str) -> BackendResult<bool>;

    /// Returns whether a key of any kind exists.
    async fn exists(&self, key: &str) -> BackendResult<bool>;

    /// Atomically increments a counter, creating it at 0 first if missing.
    ///
    /// Returns the value after the increment.
    ///
    /// # Errors
    ///
    /// Returns an error if the key holds a set or a non-integer string.
    async fn incr(&self, key: &str) -> BackendResult<i64>;

    /// Adds a member to a set. Returns whether it was newly added.
    async fn sadd(&self, set: &str, member: &str) -> BackendResult<bool>;

    /// Removes a member from a set. Returns whether it was present.
    async fn srem(&self, set: &str, member: &str) -> BackendResult<bool>;

    /// Returns every member of a set (empty for a missing key).
    async fn smembers(&self, set: &str) -> BackendResult<Vec<String>>;

    /// Tests set membership.
    async fn sismember(&self, set: &str, member: &str) -> BackendResult<bool>;

    /// Executes a batch atomically.
    ///
    /// The outer error reports a failure to submit the batch at all; the
    /// inner results report each command's outcome.
    async fn exec(&self, batch: Batch) -> BackendResult<Vec<BackendResult<Reply>>>;

    /// Closes the connection. Later calls may fail with
    /// [`BackendError::Closed`](crate::BackendError::Closed).
    async fn close(&self) -> BackendResult<()> {
        Ok(())
    }
}
