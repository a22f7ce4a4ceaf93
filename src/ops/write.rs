use super::commands::{add_to_set_command, pull_from_set_command};
use super::{DataAccess, decode, logged};
use crate::errors::DbError;
use crate::filter::FilterBuilder;
use crate::logger::enter_exit;
use crate::scope::{CollectionScope, TenantScope};
use crate::types::{DocContent, Document};
use bson::Bson;
use serde::de::DeserializeOwned;

impl DataAccess {
    /// Applies `update` to the tenant's live document `id` and returns it as it was before
    /// and after.
    ///
    /// `None` when the document does not exist. The read and the update are two store calls;
    /// a concurrent write between them is not detected.
    ///
    /// # Errors
    /// Store and decode failures.
    pub fn update_document<T: DeserializeOwned>(
        &self,
        scope: &TenantScope,
        id: &str,
        update: &bson::Document,
    ) -> Result<Option<(T, T)>, DbError> {
        let _g = enter_exit("update_document");
        let filter = FilterBuilder::new().with_not_deleted_for_tenant(scope.tenant()).with_id(id).get();
        let Some(old) = logged(
            "update_document",
            self.store.find_one(scope.ctx(), scope.collection(), &filter),
        )?
        else {
            return Ok(None);
        };
        let Some(new) = logged(
            "update_document",
            self.store.find_one_and_update(scope.ctx(), scope.collection(), &filter, update),
        )?
        else {
            log::warn!("update_document: {id} disappeared before the update");
            return Ok(None);
        };
        Ok(Some((decode(old)?, decode(new)?)))
    }

    /// Applies `update` to the tenant's live document `id`; returns the modified count.
    ///
    /// # Errors
    /// Store failures.
    pub fn update_one(&self, scope: &TenantScope, id: &str, update: &bson::Document) -> Result<u64, DbError> {
        let _g = enter_exit("update_one");
        let filter = FilterBuilder::new().with_not_deleted_for_tenant(scope.tenant()).with_id(id).get();
        let report = logged(
            "update_one",
            self.store.update_one(scope.ctx(), scope.collection(), &filter, update),
        )?;
        Ok(report.modified)
    }

    /// Adds each value missing from the array at `path`; 0 when all were already present.
    ///
    /// # Errors
    /// Store failures.
    pub fn add_to_array(
        &self,
        scope: &TenantScope,
        id: &str,
        path: &str,
        values: &[Bson],
    ) -> Result<u64, DbError> {
        let _g = enter_exit("add_to_array");
        self.update_one(scope, id, &add_to_set_command(path, values))
    }

    /// Removes the values from the array at `path`; 0 when none were present.
    ///
    /// # Errors
    /// Store failures.
    pub fn pull_from_array(
        &self,
        scope: &TenantScope,
        id: &str,
        path: &str,
        values: &[Bson],
    ) -> Result<u64, DbError> {
        let _g = enter_exit("pull_from_array");
        self.update_one(scope, id, &pull_from_set_command(path, values))
    }

    /// Inserts a prepared envelope as-is; ownership is whatever the envelope says.
    ///
    /// # Errors
    /// `DbError::DuplicateKey`, encode and store failures.
    pub fn insert_db_document<T: DocContent>(
        &self,
        scope: &CollectionScope,
        doc: Document<T>,
    ) -> Result<T, DbError> {
        let _g = enter_exit("insert_db_document");
        let stored = doc.to_bson()?;
        logged(
            "insert_db_document",
            self.store.insert_one(scope.ctx(), scope.collection(), stored),
        )?;
        Ok(doc.content)
    }

    /// Inserts `docs` owned by the scope's tenant, assigning GUIDs and creation times.
    ///
    /// A single document goes through `insert_one`; more go through one `insert_many`.
    ///
    /// # Errors
    /// `DbError::DuplicateKey`, encode and store failures.
    pub fn insert_documents<T: DocContent>(
        &self,
        scope: &TenantScope,
        mut docs: Vec<T>,
    ) -> Result<Vec<T>, DbError> {
        let _g = enter_exit("insert_documents");
        for d in &mut docs {
            d.init_new();
        }
        let mut stored = docs
            .iter()
            .map(|d| Document::new(d.clone(), scope.tenant()).to_bson())
            .collect::<Result<Vec<_>, _>>()?;
        match stored.len() {
            0 => {}
            1 => {
                let only = stored.remove(0);
                logged(
                    "insert_documents",
                    self.store.insert_one(scope.ctx(), scope.collection(), only),
                )?;
            }
            _ => {
                let n = logged(
                    "insert_documents",
                    self.store.insert_many(scope.ctx(), scope.collection(), stored),
                )?;
                log::debug!("insert_documents: {n} documents into {}", scope.collection());
            }
        }
        Ok(docs)
    }
}
