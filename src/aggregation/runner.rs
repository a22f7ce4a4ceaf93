use super::template::{TemplateArgs, TemplateRegistry};
use crate::errors::DbError;
use crate::logger::enter_exit;
use crate::query::{METADATA_BRANCH, RESULTS_BRANCH, Window};
use crate::scope::CollectionScope;
use crate::store::{DocumentStore, as_i64};
use crate::types::{AggResult, Metadata};
use bson::{Bson, Document};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Count and page of a `{metadata: [{total}], results: [...]}` facet document.
///
/// The metadata branch is an empty array when nothing matched, which reads as a zero total.
pub(crate) fn split_facet(doc: Option<Document>) -> (i64, Vec<Document>) {
    let Some(mut doc) = doc else {
        return (0, Vec::new());
    };
    let total = doc
        .get_array(METADATA_BRANCH)
        .ok()
        .and_then(|m| m.first())
        .and_then(Bson::as_document)
        .and_then(|m| m.get("total"))
        .and_then(as_i64)
        .unwrap_or(0);
    let results = match doc.remove(RESULTS_BRANCH) {
        Some(Bson::Array(items)) => items
            .into_iter()
            .filter_map(|b| match b {
                Bson::Document(d) => Some(d),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    (total, results)
}

/// Runs named pipeline templates against the store.
#[derive(Clone)]
pub struct AggregationRunner {
    store: Arc<dyn DocumentStore>,
    templates: Arc<TemplateRegistry>,
    max_limit: usize,
}

impl AggregationRunner {
    pub fn new(store: Arc<dyn DocumentStore>, templates: TemplateRegistry, max_limit: usize) -> Self {
        Self { store, templates: Arc::new(templates), max_limit }
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    /// Renders template `name` with `args` plus `skip = cursor` and the capped `limit`, runs
    /// it and unwraps the facet into an [`AggResult`].
    ///
    /// A `limit` of zero or above the configured maximum becomes the maximum. `next_skip` is
    /// set only when more results remain after this page.
    ///
    /// # Errors
    /// Template, store and decode failures.
    pub fn aggregate_with_template<T: DeserializeOwned>(
        &self,
        scope: &CollectionScope,
        name: &str,
        limit: usize,
        cursor: u64,
        args: TemplateArgs,
    ) -> Result<AggResult<T>, DbError> {
        let _g = enter_exit("aggregate_with_template");
        let window = Window::from_skip(cursor, limit, self.max_limit);
        let mut args = args;
        args.insert("skip".to_string(), window.skip.into());
        args.insert("limit".to_string(), window.limit.into());
        log::debug!(
            "aggregate_with_template collection {} template {name} args {args:?}",
            scope.collection()
        );
        let pipeline = self.templates.render(name, &args).inspect_err(|e| {
            log::error!("failed to render template {name}: {e}");
        })?;
        let docs = self
            .store
            .aggregate(scope.ctx(), scope.collection(), &pipeline)
            .inspect_err(|e| log::error!("aggregate_with_template {name}: {e}"))?;
        let Some(first) = docs.into_iter().next() else {
            return Ok(AggResult::default());
        };
        let (total, results) = split_facet(Some(first));
        let results = results
            .into_iter()
            .map(bson::from_document::<T>)
            .collect::<Result<Vec<_>, _>>()?;
        let limit = i64::try_from(window.limit).unwrap_or(i64::MAX);
        let next_skip = window
            .next_skip(results.len(), u64::try_from(total).unwrap_or(0))
            .map_or(0, |n| i64::try_from(n).unwrap_or(i64::MAX));
        Ok(AggResult { metadata: Metadata { total, limit, next_skip }, results })
    }
}
