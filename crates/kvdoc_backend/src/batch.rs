//! Atomic command batches.

/// A single backend command, queued in a [`Batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `GET key`
    Get {
        /// Key to read.
        key: String,
    },
    /// `SET key value`
    Set {
        /// Key to write.
        key: String,
        /// Value to store.
        value: String,
    },
    /// `DEL key`
    Del {
        /// Key to delete.
        key: String,
    },
    /// `EXISTS key`
    Exists {
        /// Key to test.
        key: String,
    },
    /// `INCR key`
    Incr {
        /// Counter key.
        key: String,
    },
    /// `SADD set member`
    SAdd {
        /// Set key.
        set: String,
        /// Member to add.
        member: String,
    },
    /// `SREM set member`
    SRem {
        /// Set key.
        set: String,
        /// Member to remove.
        member: String,
    },
    /// `SMEMBERS set`
    SMembers {
        /// Set key.
        set: String,
    },
    /// `SISMEMBER set member`
    SIsMember {
        /// Set key.
        set: String,
        /// Member to test.
        member: String,
    },
}

impl Command {
    /// Returns the command name, as used in logs and injected failures.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Command::Get { .. } => "get",
            Command::Set { .. } => "set",
            Command::Del { .. } => "del",
            Command::Exists { .. } => "exists",
            Command::Incr { .. } => "incr",
            Command::SAdd { .. } => "sadd",
            Command::SRem { .. } => "srem",
            Command::SMembers { .. } => "smembers",
            Command::SIsMember { .. } => "sismember",
        }
    }
}

/// The reply to one command of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// No value (missing key).
    Nil,
    /// Simple acknowledgement (`SET`).
    Ok,
    /// Integer reply (counts, booleans, counters).
    Integer(i64),
    /// String reply.
    Bulk(String),
    /// Multi-string reply (`SMEMBERS`).
    Members(Vec<String>),
}

impl Reply {
    /// Interprets an integer reply as a boolean (`0` is false).
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Reply::Integer(n) => *n != 0,
            Reply::Ok => true,
            Reply::Bulk(_) | Reply::Members(_) => true,
            Reply::Nil => false,
        }
    }
}

/// An ordered list of commands executed atomically by
/// [`KvBackend::exec`](crate::KvBackend::exec).
///
/// # Example
///
/// ```rust
/// use kvdoc_backend::Batch;
///
/// let batch = Batch::new()
///     .srem("users:_indices:email", "old@example.com")
///     .sadd("users:_indices:email", "new@example.com");
/// assert_eq!(batch.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    commands: Vec<Command>,
}

impl Batch {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an arbitrary command.
    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Queues `GET`.
    #[must_use]
    pub fn get(mut self, key: impl Into<String>) -> Self {
        self.push(Command::Get { key: key.into() });
        self
    }

    /// Queues `SET`.
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(Command::Set {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Queues `DEL`.
    #[must_use]
    pub fn del(mut self, key: impl Into<String>) -> Self {
        self.push(Command::Del { key: key.into() });
        self
    }

    /// Queues `INCR`.
    #[must_use]
    pub fn incr(mut self, key: impl Into<String>) -> Self {
        self.push(Command::Incr { key: key.into() });
        self
    }

    /// Queues `SADD`.
    #[must_use]
    pub fn sadd(mut self, set: impl Into<String>, member: impl Into<String>) -> Self {
        self.push(Command::SAdd {
            set: set.into(),
            member: member.into(),
        });
        self
    }

    /// Queues `SREM`.
    #[must_use]
    pub fn srem(mut self, set: impl Into<String>, member: impl Into<String>) -> Self {
        self.push(Command::SRem {
            set: set.into(),
            member: member.into(),
        });
        self
    }

    /// Queues `SISMEMBER`.
    #[must_use]
    pub fn sismember(mut self, set: impl Into<String>, member: impl Into<String>) -> Self {
        self.push(Command::SIsMember {
            set: set.into(),
            member: member.into(),
        });
        self
    }

    /// Returns the queued commands.
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Consumes the batch, returning its commands.
    #[must_use]
    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }

    /// Returns the number of queued commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_preserves_order() {
        let batch = Batch::new().srem("s", "a").sadd("s", "b").del("k");
        let names: Vec<_> = batch.commands().iter().map(Command::name).collect();
        assert_eq!(names, vec!["srem", "sadd", "del"]);
    }

    #[test]
    fn empty_batch() {
        let batch = Batch::new();
        assert!(batch.is_empty());
        assert_eq!(batch.len(), 0);
    }

    #[test]
    fn reply_truthiness() {
        assert!(Reply::Integer(1).is_truthy());
        assert!(!Reply::Integer(0).is_truthy());
        assert!(!Reply::Nil.is_truthy());
        assert!(Reply::Ok.is_truthy());
    }
}
