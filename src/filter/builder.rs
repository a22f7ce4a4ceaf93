use crate::consts::{CUSTOMERS_FIELD, DELETED_FIELD, GLOBAL_TENANT, ID_FIELD, NAME_FIELD};
use bson::{Bson, Document, doc};
use std::collections::HashSet;

/// Logical predicate a clause stands for. Adding a clause of a kind that is already present
/// replaces the earlier value in place.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ClauseKind {
    TenantScope,
    Id,
    Ids,
    Name,
    Tenants,
    In(String),
    Value(String),
    Raw,
}

/// Incrementally built filter whose clauses are AND'd together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterBuilder {
    clauses: Vec<(ClauseKind, Document)>,
}

impl FilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn put(&mut self, kind: ClauseKind, clause: Document) -> &mut Self {
        if kind == ClauseKind::Raw {
            if !self.clauses.iter().any(|(k, c)| *k == ClauseKind::Raw && *c == clause) {
                self.clauses.push((kind, clause));
            }
            return self;
        }
        match self.clauses.iter_mut().find(|(k, _)| *k == kind) {
            Some(slot) => slot.1 = clause,
            None => self.clauses.push((kind, clause)),
        }
        self
    }

    /// Owned by `tenant` and not soft-deleted.
    pub fn with_not_deleted_for_tenant(&mut self, tenant: &str) -> &mut Self {
        self.put(
            ClauseKind::TenantScope,
            doc! { CUSTOMERS_FIELD: tenant, DELETED_FIELD: { "$ne": true } },
        )
    }

    /// Owned by `tenant` or global, and not soft-deleted.
    pub fn with_not_deleted_for_tenant_and_global(&mut self, tenant: &str) -> &mut Self {
        self.put(
            ClauseKind::TenantScope,
            doc! { CUSTOMERS_FIELD: { "$in": [tenant, GLOBAL_TENANT] }, DELETED_FIELD: { "$ne": true } },
        )
    }

    pub fn with_id(&mut self, id: &str) -> &mut Self {
        self.put(ClauseKind::Id, doc! { ID_FIELD: id })
    }

    pub fn with_ids<S: AsRef<str>>(&mut self, ids: &[S]) -> &mut Self {
        let ids: Vec<&str> = ids.iter().map(AsRef::as_ref).collect();
        self.put(ClauseKind::Ids, doc! { ID_FIELD: { "$in": ids } })
    }

    pub fn with_name(&mut self, name: &str) -> &mut Self {
        self.put(ClauseKind::Name, doc! { NAME_FIELD: name })
    }

    /// Owned by any of `tenants`, soft-deleted or not.
    pub fn with_tenants<S: AsRef<str>>(&mut self, tenants: &[S]) -> &mut Self {
        let tenants: Vec<&str> = tenants.iter().map(AsRef::as_ref).collect();
        self.put(ClauseKind::Tenants, doc! { CUSTOMERS_FIELD: { "$in": tenants } })
    }

    pub fn with_in<V: Into<Bson> + Clone>(&mut self, field: &str, values: &[V]) -> &mut Self {
        let values: Vec<Bson> = values.iter().cloned().map(Into::into).collect();
        let mut clause = Document::new();
        clause.insert(field, doc! { "$in": values });
        self.put(ClauseKind::In(field.to_string()), clause)
    }

    /// `field` equals `value`, or for array fields contains it.
    pub fn with_value(&mut self, field: &str, value: impl Into<Bson>) -> &mut Self {
        let mut clause = Document::new();
        clause.insert(field, value.into());
        self.put(ClauseKind::Value(field.to_string()), clause)
    }

    /// Merges every clause of `other`, replacing clauses of the same kind.
    pub fn with_filter(&mut self, other: &Self) -> &mut Self {
        for (kind, clause) in &other.clauses {
            self.put(kind.clone(), clause.clone());
        }
        self
    }

    /// Adds a caller-supplied filter document as one more AND'd clause.
    pub fn with_document(&mut self, filter: Document) -> &mut Self {
        if filter.is_empty() {
            return self;
        }
        self.put(ClauseKind::Raw, filter)
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Compiled filter. Clauses are merged into one document when their keys are disjoint,
    /// otherwise wrapped in `$and`.
    pub fn get(&self) -> Document {
        let mut seen = HashSet::new();
        let disjoint = self.clauses.iter().flat_map(|(_, c)| c.keys()).all(|k| seen.insert(k.as_str()));
        if disjoint {
            let mut out = Document::new();
            for (_, clause) in &self.clauses {
                for (k, v) in clause {
                    out.insert(k.clone(), v.clone());
                }
            }
            return out;
        }
        let parts: Vec<Bson> = self.clauses.iter().map(|(_, c)| Bson::Document(c.clone())).collect();
        doc! { "$and": parts }
    }
}
