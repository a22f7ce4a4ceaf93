//! Multi-tenant document data-access layer.
//!
//! Tenant-scoped CRUD, list-request compilation to aggregation pipelines, distinct-value
//! queries over array fields, template-driven aggregations and concurrent tenant-wide
//! deletion, all on top of a pluggable [`store::DocumentStore`].

pub mod aggregation;
pub mod config;
pub mod consts;
pub mod errors;
pub mod filter;
pub mod logger;
pub mod ops;
pub mod query;
pub mod scope;
pub mod store;
pub mod types;

pub use aggregation::{AggregationRunner, TemplateArgs, TemplateRegistry};
pub use config::StoreConfig;
pub use errors::{CompoundError, DbError};
pub use filter::{FilterBuilder, FindOptions};
pub use ops::DataAccess;
pub use scope::{CallContext, CollectionScope, TenantScope};
pub use store::{DocumentStore, MemoryStore};
