//! In-memory key-value backend.

use crate::backend::KvBackend;
use crate::batch::{Batch, Command, Reply};
use crate::error::{BackendError, BackendResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

/// A value held under one key.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    Str(String),
    Set(BTreeSet<String>),
}

/// An in-memory key-value backend with Redis semantics.
///
/// This backend stores all data in memory and is suitable for:
/// - Unit and integration tests
/// - Embedded use where nothing needs to survive the process
///
/// Commands against a key of the wrong kind fail with
/// [`BackendError::WrongType`]; sets that lose their last member are removed,
/// like Redis does.
///
/// # Thread Safety
///
/// All state sits behind one lock, so [`KvBackend::exec`] is atomic with
/// respect to every other command.
///
/// # Example
///
/// ```rust
/// use kvdoc_backend::{InMemoryBackend, KvBackend};
///
/// # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// # rt.block_on(async {
/// let backend = InMemoryBackend::new();
/// assert_eq!(backend.incr("counter").await.unwrap(), 1);
/// assert_eq!(backend.get("counter").await.unwrap().as_deref(), Some("1"));
/// # });
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    data: RwLock<HashMap<String, Entry>>,
    closed: AtomicBool,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of keys currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns true if no keys are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Returns every key, sorted. Useful for testing and debugging.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.data.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Removes all keys.
    pub fn clear(&self) {
        self.data.write().clear();
    }

    /// Returns whether [`KvBackend::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> BackendResult<()> {
        if self.is_closed() {
            return Err(BackendError::Closed);
        }
        Ok(())
    }

    fn run(&self, command: Command) -> BackendResult<Reply> {
        self.ensure_open()?;
        match command {
            Command::Get { .. }
            | Command::Exists { .. }
            | Command::SMembers { .. }
            | Command::SIsMember { .. } => apply_read(&self.data.read(), &command),
            _ => apply(&mut self.data.write(), command),
        }
    }
}

fn apply_read(data: &HashMap<String, Entry>, command: &Command) -> BackendResult<Reply> {
    match command {
        Command::Get { key } => match data.get(key) {
            None => Ok(Reply::Nil),
            Some(Entry::Str(value)) => Ok(Reply::Bulk(value.clone())),
            Some(Entry::Set(_)) => Err(BackendError::wrong_type(key)),
        },
        Command::Exists { key } => Ok(Reply::Integer(i64::from(data.contains_key(key)))),
        Command::SMembers { set } => match data.get(set) {
            None => Ok(Reply::Members(Vec::new())),
            Some(Entry::Set(members)) => Ok(Reply::Members(members.iter().cloned().collect())),
            Some(Entry::Str(_)) => Err(BackendError::wrong_type(set)),
        },
        Command::SIsMember { set, member } => match data.get(set) {
            None => Ok(Reply::Integer(0)),
            Some(Entry::Set(members)) => Ok(Reply::Integer(i64::from(members.contains(member)))),
            Some(Entry::Str(_)) => Err(BackendError::wrong_type(set)),
        },
        other => Err(BackendError::Other(format!(
            "{} is not a read command",
            other.name()
        ))),
    }
}

fn apply(data: &mut HashMap<String, Entry>, command: Command) -> BackendResult<Reply> {
    match command {
        Command::Set { key, value } => {
            data.insert(key, Entry::Str(value));
            Ok(Reply::Ok)
        }
        Command::Del { key } => Ok(Reply::Integer(i64::from(data.remove(&key).is_some()))),
        Command::Incr { key } => {
            let current = match data.get(&key) {
                None => 0,
                Some(Entry::Str(value)) => value
                    .parse::<i64>()
                    .map_err(|_| BackendError::not_an_integer(&key))?,
                Some(Entry::Set(_)) => return Err(BackendError::wrong_type(&key)),
            };
            let next = current
                .checked_add(1)
                .ok_or_else(|| BackendError::not_an_integer(&key))?;
            data.insert(key, Entry::Str(next.to_string()));
            Ok(Reply::Integer(next))
        }
        Command::SAdd { set, member } => {
            let entry = data
                .entry(set.clone())
                .or_insert_with(|| Entry::Set(BTreeSet::new()));
            match entry {
                Entry::Set(members) => Ok(Reply::Integer(i64::from(members.insert(member)))),
                Entry::Str(_) => Err(BackendError::wrong_type(set)),
            }
        }
        Command::SRem { set, member } => {
            let (removed, now_empty) = match data.get_mut(&set) {
                None => return Ok(Reply::Integer(0)),
                Some(Entry::Set(members)) => (members.remove(&member), members.is_empty()),
                Some(Entry::Str(_)) => return Err(BackendError::wrong_type(set)),
            };
            if now_empty {
                data.remove(&set);
            }
            Ok(Reply::Integer(i64::from(removed)))
        }
        read => apply_read(data, &read),
    }
}

fn expect_integer(reply: Reply) -> BackendResult<i64> {
    match reply {
        Reply::Integer(n) => Ok(n),
        other => Err(BackendError::Other(format!(
            "expected integer reply, got {other:?}"
        ))),
    }
}

#[async_trait]
impl KvBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> BackendResult<Option<String>> {
        match self.run(Command::Get { key: key.into() })? {
            Reply::Bulk(value) => Ok(Some(value)),
            _ => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> BackendResult<()> {
        self.run(Command::Set {
            key: key.into(),
            value: value.into(),
        })?;
        Ok(())
    }

    async fn del(&self, key: &str) -> BackendResult<bool> {
        Ok(expect_integer(self.run(Command::Del { key: key.into() })?)? == 1)
    }

    async fn exists(&self, key: &str) -> BackendResult<bool> {
        Ok(expect_integer(self.run(Command::Exists { key: key.into() })?)? == 1)
    }

    async fn incr(&self, key: &str) -> BackendResult<i64> {
        expect_integer(self.run(Command::Incr { key: key.into() })?)
    }

    async fn sadd(&self, set: &str, member: &str) -> BackendResult<bool> {
        let reply = self.run(Command::SAdd {
            set: set.into(),
            member: member.into(),
        })?;
        Ok(expect_integer(reply)? == 1)
    }

    async fn srem(&self, set: &str, member: &str) -> BackendResult<bool> {
        let reply = self.run(Command::SRem {
            set: set.into(),
            member: member.into(),
        })?;
        Ok(expect_integer(reply)? == 1)
    }

    async fn smembers(&self, set: &str) -> BackendResult<Vec<String>> {
        match self.run(Command::SMembers { set: set.into() })? {
            Reply::Members(members) => Ok(members),
            _ => Ok(Vec::new()),
        }
    }

    async fn sismember(&self, set: &str, member: &str) -> BackendResult<bool> {
        let reply = self.run(Command::SIsMember {
            set: set.into(),
            member: member.into(),
        })?;
        Ok(expect_integer(reply)? == 1)
    }

    async fn exec(&self, batch: Batch) -> BackendResult<Vec<BackendResult<Reply>>> {
        self.ensure_open()?;
        let mut data = self.data.write();
        Ok(batch
            .into_commands()
            .into_iter()
            .map(|command| apply(&mut data, command))
            .collect())
    }

    async fn close(&self) -> BackendResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_new_is_empty() {
        let backend = InMemoryBackend::new();
        assert!(backend.is_empty());
        assert_eq!(backend.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_set_get_del() {
        let backend = InMemoryBackend::new();
        backend.set("k", "v").await.unwrap();
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("v"));
        assert!(backend.exists("k").await.unwrap());

        assert!(backend.del("k").await.unwrap());
        assert!(!backend.del("k").await.unwrap());
        assert!(!backend.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn memory_incr_starts_from_zero() {
        let backend = InMemoryBackend::new();
        assert_eq!(backend.incr("seq").await.unwrap(), 1);
        assert_eq!(backend.incr("seq").await.unwrap(), 2);

        backend.set("seq", "10").await.unwrap();
        assert_eq!(backend.incr("seq").await.unwrap(), 11);
    }

    #[tokio::test]
    async fn memory_incr_non_integer_fails() {
        let backend = InMemoryBackend::new();
        backend.set("seq", "abc").await.unwrap();
        let result = backend.incr("seq").await;
        assert!(matches!(result, Err(BackendError::NotAnInteger { .. })));
    }

    #[tokio::test]
    async fn memory_set_membership() {
        let backend = InMemoryBackend::new();
        assert!(backend.sadd("s", "a").await.unwrap());
        assert!(!backend.sadd("s", "a").await.unwrap());
        assert!(backend.sadd("s", "b").await.unwrap());

        assert!(backend.sismember("s", "a").await.unwrap());
        assert_eq!(backend.smembers("s").await.unwrap(), vec!["a", "b"]);

        assert!(backend.srem("s", "a").await.unwrap());
        assert!(!backend.srem("s", "a").await.unwrap());
        assert!(!backend.sismember("s", "a").await.unwrap());
    }

    #[tokio::test]
    async fn memory_empty_set_is_removed() {
        let backend = InMemoryBackend::new();
        backend.sadd("s", "only").await.unwrap();
        backend.srem("s", "only").await.unwrap();
        assert!(!backend.exists("s").await.unwrap());
        assert!(backend.smembers("s").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn memory_wrong_type() {
        let backend = InMemoryBackend::new();
        backend.set("k", "v").await.unwrap();
        assert!(matches!(
            backend.sadd("k", "m").await,
            Err(BackendError::WrongType { .. })
        ));

        backend.sadd("s", "m").await.unwrap();
        assert!(matches!(
            backend.get("s").await,
            Err(BackendError::WrongType { .. })
        ));
    }

    #[tokio::test]
    async fn memory_exec_reports_each_command() {
        let backend = InMemoryBackend::new();
        backend.set("str", "v").await.unwrap();

        let batch = Batch::new()
            .sadd("s", "a")
            .sismember("s", "a")
            .sadd("str", "boom")
            .incr("n");
        let replies = backend.exec(batch).await.unwrap();

        assert_eq!(replies.len(), 4);
        assert_eq!(replies[0], Ok(Reply::Integer(1)));
        assert_eq!(replies[1], Ok(Reply::Integer(1)));
        assert!(replies[2].is_err());
        assert_eq!(replies[3], Ok(Reply::Integer(1)));
    }

    #[tokio::test]
    async fn memory_close_rejects_commands() {
        let backend = InMemoryBackend::new();
        backend.close().await.unwrap();
        assert!(backend.is_closed());
        assert_eq!(backend.get("k").await, Err(BackendError::Closed));
        assert!(backend.exec(Batch::new()).await.is_err());
    }

    #[tokio::test]
    async fn memory_keys_sorted() {
        let backend = InMemoryBackend::new();
        backend.set("b", "1").await.unwrap();
        backend.sadd("a", "x").await.unwrap();
        assert_eq!(backend.keys(), vec!["a", "b"]);

        backend.clear();
        assert_eq!(backend.len(), 0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::BTreeSet;

        proptest! {
            #[test]
            fn set_commands_match_a_model(ops in prop::collection::vec((any::<bool>(), 0u8..8), 0..64)) {
                let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
                rt.block_on(async {
                    let backend = InMemoryBackend::new();
                    let mut model = BTreeSet::new();
                    for (add, member) in ops {
                        let member = member.to_string();
                        if add {
                            let added = backend.sadd("s", &member).await.unwrap();
                            assert_eq!(added, model.insert(member));
                        } else {
                            let removed = backend.srem("s", &member).await.unwrap();
                            assert_eq!(removed, model.remove(&member));
                        }
                    }

                    let mut members = backend.smembers("s").await.unwrap();
                    members.sort();
                    assert_eq!(members, model.iter().cloned().collect::<Vec<_>>());
                    assert_eq!(backend.exists("s").await.unwrap(), !model.is_empty());
                });
            }
        }
    }
}
