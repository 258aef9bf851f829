//! Join delegation.
//!
//! Joining is performed by an external [`JoinRunner`]. The store hands it a
//! [`JoinSource`] to fetch child records through.

use crate::criteria::Criteria;
use crate::error::CoreResult;
use async_trait::async_trait;
use kvdoc_codec::Record;
use std::fmt::Debug;

/// Record access offered to a join runner.
#[async_trait]
pub trait JoinSource: Send + Sync {
    /// Runs a find against one collection.
    async fn fetch(&self, collection: &str, criteria: &Criteria) -> CoreResult<Vec<Record>>;

    /// The primary-key attribute of a collection, if it is registered.
    async fn primary_key(&self, collection: &str) -> Option<String>;
}

/// Executes join instructions.
#[async_trait]
pub trait JoinRunner: Debug + Send + Sync {
    /// Joins `parent` records matched by `criteria` with the collections its
    /// join instructions name.
    async fn run(
        &self,
        parent: &str,
        criteria: &Criteria,
        source: &dyn JoinSource,
    ) -> CoreResult<Vec<Record>>;
}
