use super::eval::{bson_equal, get_path, matches};
use super::pipeline::{compare_by, project, run_pipeline};
use super::update::apply_update;
use super::{DocumentStore, FindSpec, UpdateReport};
use crate::consts::ID_FIELD;
use crate::errors::DbError;
use crate::scope::CallContext;
use bson::{Bson, Document};
use parking_lot::RwLock;
use std::collections::BTreeMap;

const CHECK_EVERY: usize = 256;

#[derive(Debug, Default)]
struct Collection {
    docs: Vec<Document>,
    /// Field sets whose combined values must be unique across the collection.
    unique: Vec<Vec<String>>,
}

impl Collection {
    fn check_unique(&self, name: &str, doc: &Document, skip: Option<usize>) -> Result<(), DbError> {
        let id = doc.get(ID_FIELD).cloned().unwrap_or(Bson::Null);
        for (i, existing) in self.docs.iter().enumerate() {
            if Some(i) == skip {
                continue;
            }
            if existing.get(ID_FIELD).is_some_and(|x| bson_equal(x, &id)) {
                return Err(duplicate(name, &id));
            }
            for keys in &self.unique {
                let same = keys.iter().all(|k| {
                    match (get_path(existing, k), get_path(doc, k)) {
                        (Some(a), Some(b)) => bson_equal(a, b),
                        (None, None) => true,
                        _ => false,
                    }
                });
                if same {
                    return Err(duplicate(name, &id));
                }
            }
        }
        Ok(())
    }

    fn position(&self, ctx: &CallContext, filter: &Document) -> Result<Option<usize>, DbError> {
        for (i, d) in self.docs.iter().enumerate() {
            if i % CHECK_EVERY == 0 {
                ctx.check()?;
            }
            if matches(d, filter)? {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }
}

fn duplicate(collection: &str, id: &Bson) -> DbError {
    let id = match id {
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    };
    DbError::DuplicateKey { collection: collection.to_string(), id }
}

/// In-process [`DocumentStore`] keeping every collection as a vector of BSON documents.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<BTreeMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty collection; no-op when it already exists.
    pub fn create_collection(&self, name: &str) {
        self.collections.write().entry(name.to_string()).or_default();
    }

    pub fn drop_collection(&self, name: &str) -> bool {
        self.collections.write().remove(name).is_some()
    }

    /// Number of stored documents, ignoring soft-delete flags.
    pub fn len(&self, collection: &str) -> usize {
        self.collections.read().get(collection).map_or(0, |c| c.docs.len())
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn matching(
        &self,
        ctx: &CallContext,
        collection: &str,
        filter: &Document,
    ) -> Result<Vec<Document>, DbError> {
        ctx.check()?;
        let guard = self.collections.read();
        let Some(col) = guard.get(collection) else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for (i, d) in col.docs.iter().enumerate() {
            if i % CHECK_EVERY == 0 {
                ctx.check()?;
            }
            if matches(d, filter)? {
                out.push(d.clone());
            }
        }
        Ok(out)
    }
}

impl DocumentStore for MemoryStore {
    fn list_collection_names(&self, ctx: &CallContext) -> Result<Vec<String>, DbError> {
        ctx.check()?;
        Ok(self.collections.read().keys().cloned().collect())
    }

    fn find(
        &self,
        ctx: &CallContext,
        collection: &str,
        filter: &Document,
        spec: &FindSpec,
    ) -> Result<Vec<Document>, DbError> {
        let mut docs = self.matching(ctx, collection, filter)?;
        if let Some(sort) = &spec.sort {
            docs.sort_by(|a, b| compare_by(a, b, sort));
        }
        let skip = usize::try_from(spec.skip).unwrap_or(usize::MAX);
        let limit = spec.limit.map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        let window = docs.into_iter().skip(skip).take(limit);
        match &spec.projection {
            Some(p) if !p.is_empty() => window.map(|d| project(&d, p)).collect(),
            _ => Ok(window.collect()),
        }
    }

    fn find_one(
        &self,
        ctx: &CallContext,
        collection: &str,
        filter: &Document,
    ) -> Result<Option<Document>, DbError> {
        ctx.check()?;
        let guard = self.collections.read();
        let Some(col) = guard.get(collection) else {
            return Ok(None);
        };
        Ok(col.position(ctx, filter)?.map(|i| col.docs[i].clone()))
    }

    fn count(
        &self,
        ctx: &CallContext,
        collection: &str,
        filter: &Document,
        limit: Option<u64>,
    ) -> Result<u64, DbError> {
        ctx.check()?;
        let guard = self.collections.read();
        let Some(col) = guard.get(collection) else {
            return Ok(0);
        };
        let mut n = 0u64;
        for (i, d) in col.docs.iter().enumerate() {
            if i % CHECK_EVERY == 0 {
                ctx.check()?;
            }
            if matches(d, filter)? {
                n += 1;
                if limit.is_some_and(|l| n >= l) {
                    break;
                }
            }
        }
        Ok(n)
    }

    fn aggregate(
        &self,
        ctx: &CallContext,
        collection: &str,
        pipeline: &[Document],
    ) -> Result<Vec<Document>, DbError> {
        ctx.check()?;
        let snapshot =
            self.collections.read().get(collection).map(|c| c.docs.clone()).unwrap_or_default();
        run_pipeline(ctx, snapshot, pipeline)
    }

    fn insert_one(&self, ctx: &CallContext, collection: &str, doc: Document) -> Result<(), DbError> {
        self.insert_many(ctx, collection, vec![doc]).map(|_| ())
    }

    fn insert_many(
        &self,
        ctx: &CallContext,
        collection: &str,
        docs: Vec<Document>,
    ) -> Result<u64, DbError> {
        ctx.check()?;
        let mut guard = self.collections.write();
        let col = guard.entry(collection.to_string()).or_default();
        let mut inserted = 0u64;
        for mut doc in docs {
            if !doc.contains_key(ID_FIELD) {
                doc.insert(ID_FIELD, uuid::Uuid::new_v4().to_string());
            }
            col.check_unique(collection, &doc, None)?;
            col.docs.push(doc);
            inserted += 1;
        }
        log::debug!("inserted {inserted} documents into {collection}");
        Ok(inserted)
    }

    fn update_one(
        &self,
        ctx: &CallContext,
        collection: &str,
        filter: &Document,
        update: &Document,
    ) -> Result<UpdateReport, DbError> {
        ctx.check()?;
        let mut guard = self.collections.write();
        let Some(col) = guard.get_mut(collection) else {
            return Ok(UpdateReport::default());
        };
        let Some(i) = col.position(ctx, filter)? else {
            return Ok(UpdateReport::default());
        };
        let mut next = col.docs[i].clone();
        let changed = apply_update(&mut next, update)?;
        if changed {
            col.check_unique(collection, &next, Some(i))?;
            col.docs[i] = next;
        }
        Ok(UpdateReport { matched: 1, modified: u64::from(changed) })
    }

    fn find_one_and_update(
        &self,
        ctx: &CallContext,
        collection: &str,
        filter: &Document,
        update: &Document,
    ) -> Result<Option<Document>, DbError> {
        ctx.check()?;
        let mut guard = self.collections.write();
        let Some(col) = guard.get_mut(collection) else {
            return Ok(None);
        };
        let Some(i) = col.position(ctx, filter)? else {
            return Ok(None);
        };
        let mut next = col.docs[i].clone();
        if apply_update(&mut next, update)? {
            col.check_unique(collection, &next, Some(i))?;
            col.docs[i] = next.clone();
        }
        Ok(Some(next))
    }

    fn delete_one(
        &self,
        ctx: &CallContext,
        collection: &str,
        filter: &Document,
    ) -> Result<u64, DbError> {
        ctx.check()?;
        let mut guard = self.collections.write();
        let Some(col) = guard.get_mut(collection) else {
            return Ok(0);
        };
        match col.position(ctx, filter)? {
            Some(i) => {
                col.docs.remove(i);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn delete_many(
        &self,
        ctx: &CallContext,
        collection: &str,
        filter: &Document,
    ) -> Result<u64, DbError> {
        ctx.check()?;
        let mut guard = self.collections.write();
        let Some(col) = guard.get_mut(collection) else {
            return Ok(0);
        };
        let mut doomed = Vec::with_capacity(col.docs.len());
        for (i, d) in col.docs.iter().enumerate() {
            if i % CHECK_EVERY == 0 {
                ctx.check()?;
            }
            doomed.push(matches(d, filter)?);
        }
        let deleted = doomed.iter().filter(|x| **x).count() as u64;
        let mut flags = doomed.into_iter();
        col.docs.retain(|_| !flags.next().unwrap_or(false));
        log::debug!("deleted {deleted} documents from {collection}");
        Ok(deleted)
    }

    fn create_index(
        &self,
        ctx: &CallContext,
        collection: &str,
        keys: &[&str],
        unique: bool,
    ) -> Result<(), DbError> {
        ctx.check()?;
        let mut guard = self.collections.write();
        let col = guard.entry(collection.to_string()).or_default();
        if !unique {
            return Ok(());
        }
        let keys: Vec<String> = keys.iter().map(|k| (*k).to_string()).collect();
        for (i, a) in col.docs.iter().enumerate() {
            for b in &col.docs[i + 1..] {
                let clash = keys.iter().all(|k| match (get_path(a, k), get_path(b, k)) {
                    (Some(x), Some(y)) => bson_equal(x, y),
                    (None, None) => true,
                    _ => false,
                });
                if clash {
                    let id = b.get(ID_FIELD).cloned().unwrap_or(Bson::Null);
                    return Err(duplicate(collection, &id));
                }
            }
        }
        if !col.unique.contains(&keys) {
            col.unique.push(keys);
        }
        Ok(())
    }
}
