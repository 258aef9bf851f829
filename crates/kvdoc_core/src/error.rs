//! Error types for kvdoc core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in kvdoc core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Backend error.
    #[error("backend error: {0}")]
    Backend(#[from] kvdoc_backend::BackendError),

    /// Record blob codec error.
    #[error("codec error: {0}")]
    Codec(#[from] kvdoc_codec::CodecError),

    /// No usable schema is registered for the collection.
    #[error("collection is not registered: {name}")]
    CollectionNotRegistered {
        /// Name of the collection.
        name: String,
    },

    /// The primary key is absent and cannot be generated.
    #[error("primary key {attribute} is missing in collection {collection}")]
    PrimaryKeyMissing {
        /// The collection written to.
        collection: String,
        /// The primary-key attribute.
        attribute: String,
    },

    /// An update tried to change a primary key.
    #[error("primary key {attribute} cannot be updated")]
    PrimaryKeyUpdate {
        /// The primary-key attribute.
        attribute: String,
    },

    /// A write tried to set an auto-increment attribute directly.
    #[error("auto-increment attribute {attribute} cannot be written directly")]
    InvalidAutoIncrement {
        /// The auto-increment attribute.
        attribute: String,
    },

    /// A unique attribute value is already in use.
    #[error("value of unique attribute {attribute} is already in use")]
    NotUnique {
        /// The first unique attribute found in conflict.
        attribute: String,
    },

    /// An atomic index batch reported a failed sub-operation.
    #[error("error writing index: {message}")]
    IndexWriteFailure {
        /// Description of the failure.
        message: String,
    },

    /// The criteria could not be understood.
    #[error("invalid query syntax: {message}")]
    InvalidQuerySyntax {
        /// Description of the syntax problem.
        message: String,
    },

    /// A unique attribute update matched more than one record.
    #[error("attempting to update unique attribute {attribute} on {matched} records")]
    AmbiguousUniqueUpdate {
        /// The unique attribute being updated.
        attribute: String,
        /// Number of matched records.
        matched: usize,
    },

    /// Stored data violates an engine invariant.
    #[error("data integrity violation: {message}")]
    DataIntegrityViolation {
        /// Description of the violation.
        message: String,
    },

    /// The attribute schema is not acceptable.
    #[error("invalid schema for collection {collection}: {message}")]
    InvalidSchema {
        /// The collection being registered.
        collection: String,
        /// Description of the problem.
        message: String,
    },

    /// Aggregate directives are inconsistent.
    #[error("invalid aggregate: {message}")]
    InvalidAggregate {
        /// Description of the problem.
        message: String,
    },

    /// A join was requested but no join runner is configured.
    #[error("no join runner configured for collection {collection}")]
    JoinUnavailable {
        /// The parent collection of the join.
        collection: String,
    },

    /// Connection configuration is not acceptable.
    #[error("invalid connection: {message}")]
    InvalidConnection {
        /// Description of the problem.
        message: String,
    },

    /// A connection with this identity already exists.
    #[error("connection is already registered: {name}")]
    ConnectionAlreadyRegistered {
        /// Connection identity.
        name: String,
    },

    /// No connection with this identity exists.
    #[error("connection is not registered: {name}")]
    ConnectionNotRegistered {
        /// Connection identity.
        name: String,
    },
}

impl CoreError {
    /// Creates a collection-not-registered error.
    pub fn collection_not_registered(name: impl Into<String>) -> Self {
        Self::CollectionNotRegistered { name: name.into() }
    }

    /// Creates an index write failure.
    pub fn index_write_failure(message: impl Into<String>) -> Self {
        Self::IndexWriteFailure {
            message: message.into(),
        }
    }

    /// Creates an invalid query syntax error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuerySyntax {
            message: message.into(),
        }
    }

    /// Creates a data integrity violation.
    pub fn data_integrity(message: impl Into<String>) -> Self {
        Self::DataIntegrityViolation {
            message: message.into(),
        }
    }

    /// Creates an invalid schema error.
    pub fn invalid_schema(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            collection: collection.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid aggregate error.
    pub fn invalid_aggregate(message: impl Into<String>) -> Self {
        Self::InvalidAggregate {
            message: message.into(),
        }
    }

    /// Creates an invalid connection error.
    pub fn invalid_connection(message: impl Into<String>) -> Self {
        Self::InvalidConnection {
            message: message.into(),
        }
    }
}
