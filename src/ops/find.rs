use super::{DataAccess, decode, decode_all, logged};
use crate::aggregation::split_facet;
use crate::errors::DbError;
use crate::filter::{FilterBuilder, FindOptions};
use crate::logger::enter_exit;
use crate::query::{METADATA_BRANCH, RESULTS_BRANCH};
use crate::scope::{CollectionScope, TenantScope};
use crate::types::SearchResult;
use bson::{Document, doc};
use serde::de::DeserializeOwned;

impl DataAccess {
    /// Every live document of the tenant, optionally including global ones.
    ///
    /// # Errors
    /// Store and decode failures.
    pub fn get_all_for_customer<T: DeserializeOwned>(
        &self,
        scope: &TenantScope,
        include_globals: bool,
    ) -> Result<Vec<T>, DbError> {
        let _g = enter_exit("get_all_for_customer");
        let mut opts = FindOptions::new();
        if include_globals {
            opts.filter().with_not_deleted_for_tenant_and_global(scope.tenant());
        } else {
            opts.filter().with_not_deleted_for_tenant(scope.tenant());
        }
        self.admin_find(&scope.collection_scope(), Some(&opts))
    }

    /// # Errors
    /// Store and decode failures.
    pub fn find_for_customer<T: DeserializeOwned>(
        &self,
        scope: &TenantScope,
        opts: Option<FindOptions>,
    ) -> Result<Vec<T>, DbError> {
        let _g = enter_exit("find_for_customer");
        let mut opts = opts.unwrap_or_default();
        opts.filter().with_not_deleted_for_tenant(scope.tenant());
        self.admin_find(&scope.collection_scope(), Some(&opts))
    }

    /// # Errors
    /// Store and decode failures.
    pub fn find_for_customer_with_globals<T: DeserializeOwned>(
        &self,
        scope: &TenantScope,
        opts: Option<FindOptions>,
    ) -> Result<Vec<T>, DbError> {
        let _g = enter_exit("find_for_customer_with_globals");
        let mut opts = opts.unwrap_or_default();
        opts.filter().with_not_deleted_for_tenant_and_global(scope.tenant());
        self.admin_find(&scope.collection_scope(), Some(&opts))
    }

    /// Find across all tenants; only the caller's filter applies.
    ///
    /// # Errors
    /// Store and decode failures.
    pub fn admin_find<T: DeserializeOwned>(
        &self,
        scope: &CollectionScope,
        opts: Option<&FindOptions>,
    ) -> Result<Vec<T>, DbError> {
        let _g = enter_exit("admin_find");
        let default = FindOptions::default();
        let opts = opts.unwrap_or(&default);
        let docs = logged(
            "admin_find",
            self.store.find(scope.ctx(), scope.collection(), &opts.filter_doc(), &opts.to_find_spec()),
        )?;
        decode_all(docs)
    }

    /// # Errors
    /// Store and decode failures.
    pub fn find_paginated_for_customer<T: DeserializeOwned>(
        &self,
        scope: &TenantScope,
        opts: Option<FindOptions>,
    ) -> Result<SearchResult<T>, DbError> {
        let _g = enter_exit("find_paginated_for_customer");
        let mut opts = opts.unwrap_or_default();
        opts.filter().with_not_deleted_for_tenant(scope.tenant());
        self.admin_find_paginated(&scope.collection_scope(), Some(&opts))
    }

    /// Total match count and one page in a single aggregation.
    ///
    /// # Errors
    /// Store and decode failures.
    pub fn admin_find_paginated<T: DeserializeOwned>(
        &self,
        scope: &CollectionScope,
        opts: Option<&FindOptions>,
    ) -> Result<SearchResult<T>, DbError> {
        let _g = enter_exit("admin_find_paginated");
        let default = FindOptions::default();
        let opts = opts.unwrap_or(&default);
        let pipeline = vec![
            doc! { "$match": opts.filter_doc() },
            doc! { "$facet": {
                METADATA_BRANCH: [{ "$count": "total" }],
                RESULTS_BRANCH: opts.page_stages(),
            } },
        ];
        let docs = logged(
            "admin_find_paginated",
            self.store.aggregate(scope.ctx(), scope.collection(), &pipeline),
        )?;
        let (total, results) = split_facet(docs.into_iter().next());
        Ok(SearchResult { total, results: decode_all(results)? })
    }

    fn find_one_as<T: DeserializeOwned>(
        &self,
        op: &'static str,
        scope: &CollectionScope,
        filter: &Document,
    ) -> Result<Option<T>, DbError> {
        logged(op, self.store.find_one(scope.ctx(), scope.collection(), filter))?
            .map(decode)
            .transpose()
    }

    /// The tenant's live document with `_id == guid`; `None` when there is none.
    ///
    /// # Errors
    /// Store and decode failures.
    pub fn get_doc_by_guid<T: DeserializeOwned>(
        &self,
        scope: &TenantScope,
        guid: &str,
    ) -> Result<Option<T>, DbError> {
        let _g = enter_exit("get_doc_by_guid");
        let filter = FilterBuilder::new().with_not_deleted_for_tenant(scope.tenant()).with_id(guid).get();
        self.find_one_as("get_doc_by_guid", &scope.collection_scope(), &filter)
    }

    /// # Errors
    /// Store and decode failures.
    pub fn get_doc_by_name<T: DeserializeOwned>(
        &self,
        scope: &TenantScope,
        name: &str,
    ) -> Result<Option<T>, DbError> {
        let _g = enter_exit("get_doc_by_name");
        let filter = FilterBuilder::new().with_not_deleted_for_tenant(scope.tenant()).with_name(name).get();
        self.find_one_as("get_doc_by_name", &scope.collection_scope(), &filter)
    }

    /// First document matching `filter` with no tenant scoping; `None` filter matches anything.
    ///
    /// # Errors
    /// Store and decode failures.
    pub fn get_doc<T: DeserializeOwned>(
        &self,
        scope: &CollectionScope,
        filter: Option<&FilterBuilder>,
    ) -> Result<Option<T>, DbError> {
        let _g = enter_exit("get_doc");
        let filter = filter.map(FilterBuilder::get).unwrap_or_default();
        self.find_one_as("get_doc", scope, &filter)
    }

    /// True when at least one live document of the tenant matches `filter`.
    ///
    /// # Errors
    /// Store failures.
    pub fn doc_exist(&self, scope: &TenantScope, filter: Option<&FilterBuilder>) -> Result<bool, DbError> {
        let _g = enter_exit("doc_exist");
        let filter = Self::tenant_filter(scope, filter);
        let n = logged(
            "doc_exist",
            self.store.count(scope.ctx(), scope.collection(), &filter, Some(1)),
        )?;
        Ok(n > 0)
    }

    /// # Errors
    /// Store failures.
    pub fn doc_with_name_exist(&self, scope: &TenantScope, name: &str) -> Result<bool, DbError> {
        let _g = enter_exit("doc_with_name_exist");
        let mut by_name = FilterBuilder::new();
        by_name.with_name(name);
        self.doc_exist(scope, Some(&by_name))
    }

    /// # Errors
    /// Store failures.
    pub fn count_docs(&self, scope: &TenantScope, filter: Option<&FilterBuilder>) -> Result<u64, DbError> {
        let _g = enter_exit("count_docs");
        let filter = Self::tenant_filter(scope, filter);
        logged("count_docs", self.store.count(scope.ctx(), scope.collection(), &filter, None))
    }

    /// Caller clauses first, then the tenant scope, so a scope clause in `extra` is overridden.
    fn tenant_filter(scope: &TenantScope, extra: Option<&FilterBuilder>) -> Document {
        let mut b = extra.cloned().unwrap_or_default();
        b.with_not_deleted_for_tenant(scope.tenant());
        b.get()
    }
}
