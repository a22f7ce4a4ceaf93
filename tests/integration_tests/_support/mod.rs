// Shared fixtures for the integration suites.
#![allow(dead_code)]

use bson::{Bson, Document};
use configdb::errors::DbError;
use configdb::scope::CallContext;
use configdb::store::{DocumentStore, FindSpec, MemoryStore, UpdateReport};
use configdb::types::DocContent;
use configdb::{DataAccess, TenantScope};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

pub const TENANT: &str = "tenant-1";
pub const OTHER_TENANT: &str = "tenant-2";
pub const CACHE: &str = "cache";

/// Loosely typed payload, handy for exercising the field-operator language.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    #[serde(default)]
    pub guid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Bson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Document>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<String>,
}

impl CacheEntry {
    pub fn new(guid: &str, name: &str) -> Self {
        Self { guid: guid.into(), name: name.into(), ..Self::default() }
    }

    pub fn data(mut self, data: impl Into<Bson>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn data_type(mut self, dt: &str) -> Self {
        self.data_type = Some(dt.into());
        self
    }

    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.tags = Some(tags.iter().map(|t| (*t).to_string()).collect());
        self
    }
}

impl DocContent for CacheEntry {
    fn guid(&self) -> &str {
        &self.guid
    }
    fn set_guid(&mut self, guid: String) {
        self.guid = guid;
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn set_name(&mut self, name: String) {
        self.name = name;
    }
    fn attributes(&self) -> Option<&Document> {
        self.attributes.as_ref()
    }
    fn set_attributes(&mut self, attributes: Document) {
        self.attributes = Some(attributes);
    }
    fn creation_time(&self) -> Option<&str> {
        self.creation_time.as_deref()
    }
    fn set_creation_time(&mut self, time: String) {
        self.creation_time = Some(time);
    }
}

pub fn memory_access() -> (DataAccess, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (DataAccess::new(store.clone(), 10_000), store)
}

pub fn scope(collection: &str, tenant: &str) -> TenantScope {
    TenantScope::new(collection, tenant, CallContext::new()).unwrap()
}

/// The five cache entries used by the search suites, in name order.
pub fn cache_docs() -> Vec<CacheEntry> {
    vec![
        CacheEntry::new("test-guid-1", "test-name-1").data(1.0).data_type("test-data-type-1"),
        CacheEntry::new("test-guid-2", "test-name-2").data("data-value-string").data_type("test-data-type-2"),
        CacheEntry::new("test-guid-3", "test-name-3")
            .data(Bson::Array(vec!["test-value-3".into(), "test-value-4".into()])),
        CacheEntry::new("test-guid-4", "test-name-4").data(5.0).data_type("test-data-type-1"),
        CacheEntry::new("test-guid-5", "test-name-5").data("role,bind,clusterrole").data_type("test-data-type-5"),
    ]
}

/// Memory store that fails `delete_many` on selected collections.
pub struct FailingStore {
    pub inner: MemoryStore,
    pub fail_deletes: HashSet<String>,
}

impl FailingStore {
    pub fn new(fail_on: &[&str]) -> Self {
        Self { inner: MemoryStore::new(), fail_deletes: fail_on.iter().map(|c| (*c).to_string()).collect() }
    }
}

impl DocumentStore for FailingStore {
    fn list_collection_names(&self, ctx: &CallContext) -> Result<Vec<String>, DbError> {
        self.inner.list_collection_names(ctx)
    }
    fn find(&self, ctx: &CallContext, c: &str, f: &Document, s: &FindSpec) -> Result<Vec<Document>, DbError> {
        self.inner.find(ctx, c, f, s)
    }
    fn find_one(&self, ctx: &CallContext, c: &str, f: &Document) -> Result<Option<Document>, DbError> {
        self.inner.find_one(ctx, c, f)
    }
    fn count(&self, ctx: &CallContext, c: &str, f: &Document, l: Option<u64>) -> Result<u64, DbError> {
        self.inner.count(ctx, c, f, l)
    }
    fn aggregate(&self, ctx: &CallContext, c: &str, p: &[Document]) -> Result<Vec<Document>, DbError> {
        self.inner.aggregate(ctx, c, p)
    }
    fn insert_one(&self, ctx: &CallContext, c: &str, d: Document) -> Result<(), DbError> {
        self.inner.insert_one(ctx, c, d)
    }
    fn insert_many(&self, ctx: &CallContext, c: &str, d: Vec<Document>) -> Result<u64, DbError> {
        self.inner.insert_many(ctx, c, d)
    }
    fn update_one(&self, ctx: &CallContext, c: &str, f: &Document, u: &Document) -> Result<UpdateReport, DbError> {
        self.inner.update_one(ctx, c, f, u)
    }
    fn find_one_and_update(
        &self,
        ctx: &CallContext,
        c: &str,
        f: &Document,
        u: &Document,
    ) -> Result<Option<Document>, DbError> {
        self.inner.find_one_and_update(ctx, c, f, u)
    }
    fn delete_one(&self, ctx: &CallContext, c: &str, f: &Document) -> Result<u64, DbError> {
        self.inner.delete_one(ctx, c, f)
    }
    fn delete_many(&self, ctx: &CallContext, c: &str, f: &Document) -> Result<u64, DbError> {
        if self.fail_deletes.contains(c) {
            return Err(DbError::Store(format!("delete refused for {c}")));
        }
        self.inner.delete_many(ctx, c, f)
    }
    fn create_index(&self, ctx: &CallContext, c: &str, keys: &[&str], unique: bool) -> Result<(), DbError> {
        self.inner.create_index(ctx, c, keys, unique)
    }
}
