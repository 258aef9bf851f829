//! # kvdoc Testkit
//!
//! Test utilities for kvdoc.
//!
//! This crate provides:
//! - Test fixtures: in-memory stores, collection schemas, tracing setup
//! - Property-based test generators using proptest
//! - A fault-injecting backend
//! - Index consistency audits
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kvdoc_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn creates_a_record() {
//!     let store = TestStore::with_collection("users", users_schema()).await;
//!     let created = store.create("users", record(json!({"name": "Gob"}))).await.unwrap();
//!     audit_collection(&store, "users").await;
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod audit;
pub mod faults;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::audit::*;
    pub use crate::faults::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use serde_json::json;
}

pub use audit::*;
pub use faults::*;
pub use fixtures::*;
pub use generators::*;
