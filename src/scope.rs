//! Request-scoped identifiers threaded explicitly through every data-access call.
//!
//! The route layer resolves the collection and tenant for a request and builds one of the
//! scope types below. Construction is the only place a missing identifier can surface, so
//! operations taking a scope never need to re-check it.

use crate::errors::DbError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Cancellation handle and optional deadline forwarded into every store call.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Cancels this context and every clone of it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// # Errors
    /// `Cancelled` once `cancel` was called, `DeadlineExceeded` once the deadline passed.
    pub fn check(&self) -> Result<(), DbError> {
        if self.is_cancelled() {
            return Err(DbError::Cancelled);
        }
        if let Some(dl) = self.deadline
            && Instant::now() > dl
        {
            return Err(DbError::DeadlineExceeded);
        }
        Ok(())
    }
}

/// Scope for operations that address a collection without tenant filtering.
#[derive(Debug, Clone)]
pub struct CollectionScope {
    collection: String,
    ctx: CallContext,
}

impl CollectionScope {
    /// # Errors
    /// Returns `DbError::Config` when the collection name is empty.
    pub fn new(collection: impl Into<String>, ctx: CallContext) -> Result<Self, DbError> {
        let collection = collection.into();
        if collection.is_empty() {
            return Err(DbError::Config(MISSING_COLLECTION.into()));
        }
        Ok(Self { collection, ctx })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn ctx(&self) -> &CallContext {
        &self.ctx
    }
}

/// Scope carrying both the collection and the tenant on whose behalf the call runs.
#[derive(Debug, Clone)]
pub struct TenantScope {
    collection: String,
    tenant: String,
    ctx: CallContext,
}

const MISSING_COLLECTION: &str = "collection is not in scope";
const MISSING_TENANT: &str = "tenant is not in scope";

impl TenantScope {
    /// # Errors
    /// Returns `DbError::Config` naming every identifier that is empty.
    pub fn new(
        collection: impl Into<String>,
        tenant: impl Into<String>,
        ctx: CallContext,
    ) -> Result<Self, DbError> {
        let collection = collection.into();
        let tenant = tenant.into();
        Self::from_parts(Some(&collection), Some(&tenant), ctx)
    }

    /// Builds a scope from loosely typed request values, reporting all missing parts at once.
    ///
    /// # Errors
    /// Returns `DbError::Config` when the collection, the tenant, or both are absent or empty.
    pub fn from_parts(
        collection: Option<&str>,
        tenant: Option<&str>,
        ctx: CallContext,
    ) -> Result<Self, DbError> {
        let collection = collection.unwrap_or_default();
        let tenant = tenant.unwrap_or_default();
        let mut missing = Vec::new();
        if collection.is_empty() {
            missing.push(MISSING_COLLECTION);
        }
        if tenant.is_empty() {
            missing.push(MISSING_TENANT);
        }
        if !missing.is_empty() {
            return Err(DbError::Config(missing.join("; ")));
        }
        Ok(Self { collection: collection.to_string(), tenant: tenant.to_string(), ctx })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn ctx(&self) -> &CallContext {
        &self.ctx
    }

    /// Same tenant and context, different collection.
    ///
    /// # Errors
    /// Returns `DbError::Config` when the collection name is empty.
    pub fn for_collection(&self, collection: impl Into<String>) -> Result<Self, DbError> {
        let collection = collection.into();
        Self::from_parts(Some(&collection), Some(&self.tenant), self.ctx.clone())
    }

    /// Drops the tenant, keeping the collection and context.
    pub fn collection_scope(&self) -> CollectionScope {
        CollectionScope { collection: self.collection.clone(), ctx: self.ctx.clone() }
    }
}
