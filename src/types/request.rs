use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Generic list/search request.
///
/// `inner_filters` groups are OR'd; the fields inside one group are AND'd. Each field value
/// uses the `value1,value2|op1&op2` syntax understood by [`crate::query::parse_field_value`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListRequest {
    pub inner_filters: Vec<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_num: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields_list: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UniqueValuesRequest {
    /// Requested field paths; the map values are unused.
    pub fields: BTreeMap<String, String>,
    pub inner_filters: Vec<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_num: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<String>,
}

impl UniqueValuesRequest {
    pub fn for_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(|f| (f.into(), String::new())).collect(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCount {
    pub field: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniqueValuesResponse {
    pub fields: BTreeMap<String, Vec<String>>,
    pub fields_count: BTreeMap<String, Vec<FieldCount>>,
}

/// Page of a paginated find together with the total number of matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult<T> {
    pub total: i64,
    pub results: Vec<T>,
}

impl<T> Default for SearchResult<T> {
    fn default() -> Self {
        Self { total: 0, results: Vec::new() }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub limit: i64,
    /// Zero means there is no further page.
    #[serde(default)]
    pub next_skip: i64,
}

/// Aggregation envelope: `{metadata: {total, limit, nextSkip}, results}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggResult<T> {
    pub metadata: Metadata,
    pub results: Vec<T>,
}

impl<T> Default for AggResult<T> {
    fn default() -> Self {
        Self { metadata: Metadata::default(), results: Vec::new() }
    }
}
