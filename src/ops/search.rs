use super::{DataAccess, decode_all, logged};
use crate::aggregation::split_facet;
use crate::errors::DbError;
use crate::filter::FilterBuilder;
use crate::logger::enter_exit;
use crate::query::{
    Window, and_all, build_match, compile_list_request, decode_unique_values, unique_value_pipeline,
};
use crate::scope::TenantScope;
use crate::types::{AggResult, ListRequest, Metadata, SchemaInfo, UniqueValuesRequest, UniqueValuesResponse};
use serde::de::DeserializeOwned;

impl DataAccess {
    fn tenant_scope_filter(scope: &TenantScope) -> bson::Document {
        FilterBuilder::new().with_not_deleted_for_tenant(scope.tenant()).get()
    }

    /// Runs a list request against the tenant's live documents.
    ///
    /// # Errors
    /// `DbError::Format` for malformed requests, store and decode failures.
    pub fn search<T: DeserializeOwned>(
        &self,
        scope: &TenantScope,
        req: &ListRequest,
        schema: &SchemaInfo,
    ) -> Result<AggResult<T>, DbError> {
        let _g = enter_exit("search");
        let query = compile_list_request(req, &Self::tenant_scope_filter(scope), schema, self.max_limit)?;
        log::debug!("search {}: {:?}", scope.collection(), query.pipeline);
        let docs = logged(
            "search",
            self.store.aggregate(scope.ctx(), scope.collection(), &query.pipeline),
        )?;
        let (total, results) = split_facet(docs.into_iter().next());
        let results: Vec<T> = decode_all(results)?;
        let next_skip = query
            .window
            .next_skip(results.len(), u64::try_from(total).unwrap_or(0))
            .map_or(0, |n| i64::try_from(n).unwrap_or(i64::MAX));
        let metadata = Metadata {
            total,
            limit: i64::try_from(query.window.limit).unwrap_or(i64::MAX),
            next_skip,
        };
        Ok(AggResult { metadata, results })
    }

    /// Distinct values and their counts for each requested field, over the tenant's live
    /// documents matching the request filters. Paging applies to the distinct values.
    ///
    /// # Errors
    /// `DbError::Format("fields are required")` for an empty field list, other format
    /// errors and store failures.
    pub fn unique_values(
        &self,
        scope: &TenantScope,
        req: &UniqueValuesRequest,
        schema: &SchemaInfo,
    ) -> Result<UniqueValuesResponse, DbError> {
        let _g = enter_exit("unique_values");
        if req.fields.is_empty() {
            return Err(DbError::format("fields are required"));
        }
        if req.until.as_deref().is_some_and(|u| !u.is_empty()) {
            return Err(DbError::format("until is not supported"));
        }
        let filter = and_all(vec![
            Self::tenant_scope_filter(scope),
            build_match(&req.inner_filters, schema)?,
        ]);
        let window = Window::from_page(req.page_size, req.page_num, self.max_limit);
        let mut response = UniqueValuesResponse::default();
        for field in req.fields.keys() {
            let pipeline = unique_value_pipeline(&[field.as_str()], &filter, window.skip, window.limit, schema);
            let docs = logged(
                "unique_values",
                self.store.aggregate(scope.ctx(), scope.collection(), &pipeline),
            )?;
            let (values, counts) = decode_unique_values(docs.first());
            response.fields.insert(field.clone(), values);
            response.fields_count.insert(field.clone(), counts);
        }
        Ok(response)
    }
}
