//! # kvdoc Core
//!
//! Schema-aware document collections over a key-value backend.
//!
//! This crate provides:
//! - Deterministic key naming for records, indices and sequences
//! - A schema registry with unique indices and auto-increment sequences
//! - Criteria parsing and evaluation with sort, skip and limit
//! - Aggregate post-processing (`groupBy`, `sum`, `average`, `min`, `max`)
//! - The collection store with create, find, update, delete and drop
//! - Join delegation and named connections
//!
//! Records are stored as JSON blobs. A collection keeps a primary index set
//! of record keys, and every key it owns carries the collection name as a
//! `{hash tag}` so cluster backends keep them in one slot.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod aggregate;
pub mod config;
pub mod connection;
pub mod criteria;
mod error;
pub mod join;
pub mod keys;
pub mod schema;
mod store;

pub use aggregate::{AggregateProcessor, Aggregated};
pub use config::{ConnectionConfig, StoreConfig, DEFAULT_PREFIX};
pub use connection::{CollectionDefinitions, Connection, ConnectionRegistry};
pub use criteria::{Criteria, CriteriaEvaluator, Filter, Predicate, PredicateEvaluator};
pub use error::{CoreError, CoreResult};
pub use join::{JoinRunner, JoinSource};
pub use keys::KeyBuilder;
pub use schema::{Attribute, AttributeSchema, AttributeType, SchemaRegistry};
pub use store::CollectionStore;
