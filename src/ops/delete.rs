use super::{DataAccess, logged};
use crate::consts::{CUSTOMERS_COLLECTION, ID_FIELD, NAME_FIELD};
use crate::errors::{CompoundError, DbError};
use crate::filter::FilterBuilder;
use crate::logger::{AUDIT_TARGET, enter_exit};
use crate::scope::{CallContext, TenantScope};
use crate::types::DocContent;
use bson::doc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::thread;

impl DataAccess {
    /// Deletes the tenant's live document `guid` and returns it as it was.
    ///
    /// `None` when there was nothing to delete.
    ///
    /// # Errors
    /// Store and decode failures.
    pub fn delete_by_guid<T: DocContent>(&self, scope: &TenantScope, guid: &str) -> Result<Option<T>, DbError> {
        let _g = enter_exit("delete_by_guid");
        let Some(prior) = self.get_doc_by_guid::<T>(scope, guid)? else {
            return Ok(None);
        };
        self.delete_prior(scope, prior)
    }

    /// Deletes the tenant's live document named `name` and returns it as it was.
    ///
    /// # Errors
    /// Store and decode failures.
    pub fn delete_by_name<T: DocContent>(&self, scope: &TenantScope, name: &str) -> Result<Option<T>, DbError> {
        let _g = enter_exit("delete_by_name");
        let Some(prior) = self.get_doc_by_name::<T>(scope, name)? else {
            return Ok(None);
        };
        self.delete_prior(scope, prior)
    }

    fn delete_prior<T: DocContent>(&self, scope: &TenantScope, prior: T) -> Result<Option<T>, DbError> {
        let filter = doc! { ID_FIELD: prior.guid() };
        let n = logged(
            "delete",
            self.store.delete_one(scope.ctx(), scope.collection(), &filter),
        )?;
        Ok((n > 0).then_some(prior))
    }

    /// Deletes every live document of the tenant matching `filter`; returns the count.
    ///
    /// # Errors
    /// Store failures.
    pub fn bulk_delete(&self, scope: &TenantScope, mut filter: FilterBuilder) -> Result<u64, DbError> {
        let _g = enter_exit("bulk_delete");
        filter.with_not_deleted_for_tenant(scope.tenant());
        logged(
            "bulk_delete",
            self.store.delete_many(scope.ctx(), scope.collection(), &filter.get()),
        )
    }

    /// # Errors
    /// Store failures.
    pub fn bulk_delete_by_name<S: AsRef<str>>(&self, scope: &TenantScope, names: &[S]) -> Result<u64, DbError> {
        let _g = enter_exit("bulk_delete_by_name");
        let names: Vec<&str> = names.iter().map(AsRef::as_ref).collect();
        let mut filter = FilterBuilder::new();
        filter.with_in(NAME_FIELD, &names);
        self.bulk_delete(scope, filter)
    }

    /// Tenant-wide deletion for the scope's own tenant.
    ///
    /// # Errors
    /// See [`Self::admin_delete_customers_docs`].
    pub fn delete_customer_docs(&self, scope: &TenantScope) -> Result<u64, DbError> {
        let _g = enter_exit("delete_customer_docs");
        self.admin_delete_customers_docs(scope.ctx(), &[scope.tenant()])
    }

    /// Deletes the tenant records of `tenants` and every document they own in every collection.
    ///
    /// One worker per collection runs concurrently; a failing collection does not stop the
    /// others. Returns the total deleted once every worker has finished.
    ///
    /// # Errors
    /// Collection listing failures, or `DbError::PartialDeletion` carrying the partial count and
    /// one entry per failed collection.
    pub fn admin_delete_customers_docs<S: AsRef<str>>(
        &self,
        ctx: &CallContext,
        tenants: &[S],
    ) -> Result<u64, DbError> {
        let _g = enter_exit("admin_delete_customers_docs");
        if tenants.is_empty() {
            return Ok(0);
        }
        let tenants: Vec<&str> = tenants.iter().map(AsRef::as_ref).collect();
        let collections = logged(
            "admin_delete_customers_docs",
            self.store.list_collection_names(ctx),
        )?;

        let mut jobs = vec![(
            CUSTOMERS_COLLECTION.to_string(),
            FilterBuilder::new().with_ids(&tenants).get(),
        )];
        let owned = FilterBuilder::new().with_tenants(&tenants).get();
        jobs.extend(
            collections
                .into_iter()
                .filter(|c| c != CUSTOMERS_COLLECTION)
                .map(|c| (c, owned.clone())),
        );
        let launched = jobs.len();

        let deleted = AtomicU64::new(0);
        let (tx, rx) = mpsc::channel::<(String, DbError)>();
        let store = &self.store;
        let errors = thread::scope(|s| {
            let collector = s.spawn(move || {
                let mut errors = CompoundError::new();
                for (collection, err) in rx {
                    errors.push(collection, err);
                }
                errors
            });

            let mut workers = Vec::with_capacity(jobs.len());
            for (collection, filter) in jobs {
                let worker_tx = tx.clone();
                let deleted = &deleted;
                let name = collection.clone();
                let spawned = thread::Builder::new()
                    .name(format!("delete-{collection}"))
                    .spawn_scoped(s, move || match store.delete_many(ctx, &collection, &filter) {
                        Ok(n) => {
                            deleted.fetch_add(n, Ordering::Relaxed);
                            log::info!("deleted {n} documents from {collection}");
                        }
                        Err(e) => {
                            log::error!("failed to delete documents from {collection}: {e}");
                            let _ = worker_tx.send((collection, e));
                        }
                    });
                match spawned {
                    Ok(handle) => workers.push((name, handle)),
                    Err(e) => {
                        let _ = tx.send((name, DbError::from(e)));
                    }
                }
            }
            for (name, handle) in workers {
                if handle.join().is_err() {
                    let _ = tx.send((name, DbError::Store("deletion worker panicked".into())));
                }
            }
            drop(tx);
            collector.join().unwrap_or_else(|_| {
                let mut errors = CompoundError::new();
                errors.push("*", DbError::Store("error collector panicked".into()));
                errors
            })
        });

        let deleted = deleted.into_inner();
        log::info!(
            target: AUDIT_TARGET,
            "tenant deletion tenants={tenants:?} collections={launched} failed={} deleted={deleted}",
            errors.len()
        );
        if errors.is_empty() {
            Ok(deleted)
        } else {
            Err(DbError::PartialDeletion { deleted, errors })
        }
    }
}
