//! Document store collaborator.
//!
//! The data-access layer only speaks to storage through [`DocumentStore`]. Filters, updates and
//! pipelines are plain BSON documents in the Mongo query language, so any driver exposing
//! match/unwind/group/sort/skip/limit/project/facet/count and an atomic find-and-update can
//! back it. [`MemoryStore`] is the in-process implementation.

mod eval;
mod memory;
mod pipeline;
mod update;

pub use eval::{compare_bson, matches};
pub(crate) use eval::as_i64;
pub use memory::MemoryStore;
pub use pipeline::run_pipeline;
pub use update::apply_update;

use crate::errors::DbError;
use crate::scope::CallContext;
use bson::Document;

/// Store-native find options, compiled from [`crate::filter::FindOptions`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindSpec {
    pub projection: Option<Document>,
    pub sort: Option<Document>,
    pub skip: u64,
    pub limit: Option<u64>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpdateReport {
    pub matched: u64,
    pub modified: u64,
}

pub trait DocumentStore: Send + Sync {
    /// Names of every collection currently known to the store.
    ///
    /// # Errors
    /// Fails when the context is cancelled or the store is unreachable.
    fn list_collection_names(&self, ctx: &CallContext) -> Result<Vec<String>, DbError>;

    /// # Errors
    /// Fails on malformed filters, cancellation or store failure.
    fn find(
        &self,
        ctx: &CallContext,
        collection: &str,
        filter: &Document,
        spec: &FindSpec,
    ) -> Result<Vec<Document>, DbError>;

    /// First document matching `filter`, `None` when nothing matches.
    ///
    /// # Errors
    /// Fails on malformed filters, cancellation or store failure.
    fn find_one(
        &self,
        ctx: &CallContext,
        collection: &str,
        filter: &Document,
    ) -> Result<Option<Document>, DbError>;

    /// # Errors
    /// Fails on malformed filters, cancellation or store failure.
    fn count(
        &self,
        ctx: &CallContext,
        collection: &str,
        filter: &Document,
        limit: Option<u64>,
    ) -> Result<u64, DbError>;

    /// # Errors
    /// Fails on malformed pipelines, cancellation or store failure.
    fn aggregate(
        &self,
        ctx: &CallContext,
        collection: &str,
        pipeline: &[Document],
    ) -> Result<Vec<Document>, DbError>;

    /// # Errors
    /// `DbError::DuplicateKey` when the `_id` already exists.
    fn insert_one(&self, ctx: &CallContext, collection: &str, doc: Document)
    -> Result<(), DbError>;

    /// Ordered multi-insert in a single store call; stops at the first failing document.
    ///
    /// # Errors
    /// `DbError::DuplicateKey` when an `_id` already exists.
    fn insert_many(
        &self,
        ctx: &CallContext,
        collection: &str,
        docs: Vec<Document>,
    ) -> Result<u64, DbError>;

    /// # Errors
    /// Fails on malformed filters/updates, cancellation or store failure.
    fn update_one(
        &self,
        ctx: &CallContext,
        collection: &str,
        filter: &Document,
        update: &Document,
    ) -> Result<UpdateReport, DbError>;

    /// Atomically updates the first match and returns it as it is after the update.
    ///
    /// # Errors
    /// Fails on malformed filters/updates, cancellation or store failure.
    fn find_one_and_update(
        &self,
        ctx: &CallContext,
        collection: &str,
        filter: &Document,
        update: &Document,
    ) -> Result<Option<Document>, DbError>;

    /// # Errors
    /// Fails on malformed filters, cancellation or store failure.
    fn delete_one(&self, ctx: &CallContext, collection: &str, filter: &Document)
    -> Result<u64, DbError>;

    /// # Errors
    /// Fails on malformed filters, cancellation or store failure.
    fn delete_many(
        &self,
        ctx: &CallContext,
        collection: &str,
        filter: &Document,
    ) -> Result<u64, DbError>;

    /// Declares an index over `keys`; unique indexes reject writes that would collide.
    ///
    /// # Errors
    /// `DbError::DuplicateKey` when existing documents already violate a unique index.
    fn create_index(
        &self,
        ctx: &CallContext,
        collection: &str,
        keys: &[&str],
        unique: bool,
    ) -> Result<(), DbError>;
}
