//! # kvdoc Backend
//!
//! Key-value backend trait and implementations for kvdoc.
//!
//! This crate provides the lowest-level abstraction the document layer is
//! built on. Backends are **plain key-value stores** with three kinds of
//! values: strings, sets of strings and integer counters stored as strings.
//! They know nothing about collections, records or indices.
//!
//! ## Design Principles
//!
//! - Every primitive is atomic on its own key
//! - [`KvBackend::exec`] runs a [`Batch`] atomically and reports one result
//!   per command
//! - Must be `Send + Sync`; one handle is shared by every collection of a
//!   connection
//! - kvdoc owns all key naming and value interpretation
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For embedding and tests, with Redis semantics
//!
//! ## Example
//!
//! ```rust
//! use kvdoc_backend::{Batch, InMemoryBackend, KvBackend, Reply};
//!
//! # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! # rt.block_on(async {
//! let backend = InMemoryBackend::new();
//! backend.sadd("colors", "red").await.unwrap();
//!
//! let replies = backend
//!     .exec(Batch::new().sismember("colors", "red").incr("hits"))
//!     .await
//!     .unwrap();
//! assert_eq!(replies[0].as_ref().unwrap(), &Reply::Integer(1));
//! # });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod batch;
mod error;
mod memory;

pub use backend::KvBackend;
pub use batch::{Batch, Command, Reply};
pub use error::{BackendError, BackendResult};
pub use memory::InMemoryBackend;
