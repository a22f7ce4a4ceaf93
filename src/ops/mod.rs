//! Tenant-scoped data access over a [`DocumentStore`].
//!
//! Every operation takes a scope carrying the collection (and for tenant operations the
//! tenant) plus the call context that is forwarded to each store call. Operations are split
//! by concern:
//! - `find`: finds, paginated finds and point lookups
//! - `write`: inserts, updates and array mutation
//! - `delete`: single and bulk deletes plus tenant-wide deletion
//! - `search`: list requests and unique values
//! - `commands`: update document helpers

mod commands;
mod delete;
mod find;
mod search;
mod write;

pub use commands::{add_to_set_command, pull_from_set_command, set_command};

use crate::aggregation::{AggregationRunner, TemplateRegistry};
use crate::config::StoreConfig;
use crate::errors::DbError;
use crate::store::DocumentStore;
use bson::Document;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Generic CRUD, search and tenant deletion over one store.
#[derive(Clone)]
pub struct DataAccess {
    store: Arc<dyn DocumentStore>,
    max_limit: usize,
}

impl DataAccess {
    pub fn new(store: Arc<dyn DocumentStore>, max_limit: usize) -> Self {
        Self { store, max_limit }
    }

    pub fn from_config(store: Arc<dyn DocumentStore>, config: &StoreConfig) -> Self {
        Self::new(store, config.max_aggregation_limit)
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Cap applied to page sizes and aggregation limits.
    pub fn max_limit(&self) -> usize {
        self.max_limit
    }

    /// Template runner sharing this store and limit.
    pub fn aggregation_runner(&self, templates: TemplateRegistry) -> AggregationRunner {
        AggregationRunner::new(Arc::clone(&self.store), templates, self.max_limit)
    }
}

fn logged<T>(op: &str, res: Result<T, DbError>) -> Result<T, DbError> {
    res.inspect_err(|e| log::error!("{op}: {e}"))
}

fn decode<T: DeserializeOwned>(doc: Document) -> Result<T, DbError> {
    Ok(bson::from_document(doc)?)
}

fn decode_all<T: DeserializeOwned>(docs: Vec<Document>) -> Result<Vec<T>, DbError> {
    docs.into_iter().map(decode).collect()
}
