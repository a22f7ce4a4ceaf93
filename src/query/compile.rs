use super::parse::{FieldItem, item_conditions, parse_field_value};
use crate::consts::ID_FIELD;
use crate::errors::DbError;
use crate::types::{ListRequest, SchemaInfo};
use bson::{Bson, Document, doc};
use std::collections::{BTreeMap, HashSet};

/// Facet branch holding the total-count document.
pub const METADATA_BRANCH: &str = "metadata";
/// Facet branch holding the requested page.
pub const RESULTS_BRANCH: &str = "results";

/// Skip/limit window of one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub skip: u64,
    pub limit: u64,
}

impl Window {
    /// A missing, zero or over-cap page size becomes `cap`; pages are numbered from 1.
    pub fn from_page(page_size: Option<usize>, page_num: Option<usize>, cap: usize) -> Self {
        let limit = match page_size {
            Some(n) if n > 0 && n <= cap => n,
            _ => cap,
        };
        let page = page_num.unwrap_or(1).max(1);
        let limit = limit as u64;
        Self { skip: (page as u64 - 1).saturating_mul(limit), limit }
    }

    /// Caller-supplied skip with the same limit rule.
    pub fn from_skip(skip: u64, limit: usize, cap: usize) -> Self {
        let limit = if limit == 0 || limit > cap { cap } else { limit };
        Self { skip, limit: limit as u64 }
    }

    /// Offset of the following page, present only when more results remain.
    pub fn next_skip(&self, returned: usize, total: u64) -> Option<u64> {
        let next = self.skip + returned as u64;
        (next < total).then_some(next)
    }
}

/// Merges clause documents into one when their keys are disjoint, otherwise wraps them in `$and`.
pub(crate) fn and_all(clauses: Vec<Document>) -> Document {
    let mut clauses: Vec<Document> = clauses.into_iter().filter(|c| !c.is_empty()).collect();
    if clauses.len() <= 1 {
        return clauses.pop().unwrap_or_default();
    }
    let mut seen = HashSet::new();
    if clauses.iter().flat_map(Document::keys).all(|k| seen.insert(k.clone())) {
        return clauses.into_iter().flatten().collect();
    }
    doc! { "$and": clauses }
}

fn or_all(mut clauses: Vec<Document>) -> Document {
    if clauses.len() == 1 {
        return clauses.pop().unwrap_or_default();
    }
    doc! { "$or": clauses }
}

fn field_clause(field: &str, conds: Vec<Document>, item: &FieldItem, schema: &SchemaInfo) -> Document {
    let wrap = |c: Document| -> Document {
        match schema.array_details(field) {
            Some((array, sub)) if !item.is_presence_only() => {
                let inner = if sub.is_empty() {
                    c
                } else {
                    let mut d = Document::new();
                    d.insert(sub, c);
                    d
                };
                doc! { array: { "$elemMatch": inner } }
            }
            _ => {
                let mut d = Document::new();
                d.insert(field, c);
                d
            }
        }
    };
    and_all(conds.into_iter().map(wrap).collect())
}

/// Merges operator documents that do not repeat an operator; repeated operators stay separate.
fn merge_conditions(conds: Vec<Document>) -> Vec<Document> {
    let mut out: Vec<Document> = Vec::new();
    for c in conds {
        match out.iter_mut().find(|m| c.keys().all(|k| !m.contains_key(k))) {
            Some(m) => m.extend(c),
            None => out.push(c),
        }
    }
    out
}

fn group_filter(group: &BTreeMap<String, String>, schema: &SchemaInfo) -> Result<Document, DbError> {
    let mut clauses = Vec::with_capacity(group.len());
    for (field, raw) in group {
        let mut alternatives = Vec::new();
        for item in parse_field_value(raw)? {
            let conds = merge_conditions(item_conditions(&item)?);
            alternatives.push(field_clause(field, conds, &item, schema));
        }
        if !alternatives.is_empty() {
            clauses.push(or_all(alternatives));
        }
    }
    Ok(and_all(clauses))
}

/// Filter for the request's inner filter groups: groups OR'd, fields inside a group AND'd.
///
/// # Errors
/// `DbError::Format` on malformed field syntax.
pub fn build_match(
    groups: &[BTreeMap<String, String>],
    schema: &SchemaInfo,
) -> Result<Document, DbError> {
    let mut ors = Vec::with_capacity(groups.len());
    for g in groups {
        ors.push(group_filter(g, schema)?);
    }
    if ors.is_empty() || ors.iter().any(Document::is_empty) {
        return Ok(Document::new());
    }
    Ok(or_all(ors))
}

/// Parses `field:asc|desc[,field:asc|desc...]`; a bare field sorts ascending.
///
/// # Errors
/// `DbError::Format` naming an unknown direction.
pub fn parse_order_by(order_by: &str) -> Result<Document, DbError> {
    let mut sort = Document::new();
    for part in order_by.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (field, dir) = part.split_once(':').unwrap_or((part, "asc"));
        let dir = match dir.trim() {
            "asc" | "" => 1,
            "desc" => -1,
            other => return Err(DbError::format(format!("invalid sort type {other}"))),
        };
        sort.insert(field.trim(), dir);
    }
    Ok(sort)
}

/// A list request compiled into a single facet pipeline plus the window it reads.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub pipeline: Vec<Document>,
    pub window: Window,
}

/// Compiles a list request into `[$match, $facet{metadata: [$count], results: [$sort, $skip, $limit, $project]}]`.
///
/// `scope` is AND'd with the request's own filter.
///
/// # Errors
/// `DbError::Format` for `until`, unknown operators or sort directions, and malformed ranges.
pub fn compile_list_request(
    req: &ListRequest,
    scope: &Document,
    schema: &SchemaInfo,
    cap: usize,
) -> Result<CompiledQuery, DbError> {
    if req.until.as_deref().is_some_and(|u| !u.is_empty()) {
        return Err(DbError::format("until is not supported"));
    }
    let mut sort = match &req.order_by {
        Some(o) => parse_order_by(o)?,
        None => Document::new(),
    };
    if !sort.contains_key(ID_FIELD) {
        sort.insert(ID_FIELD, 1);
    }
    let user = build_match(&req.inner_filters, schema)?;
    let window = Window::from_page(req.page_size, req.page_num, cap);

    let mut results = vec![doc! { "$sort": sort }];
    if window.skip > 0 {
        results.push(doc! { "$skip": to_i64(window.skip) });
    }
    results.push(doc! { "$limit": to_i64(window.limit) });
    if !req.fields_list.is_empty() {
        let projection: Document =
            req.fields_list.iter().map(|f| (f.clone(), Bson::Int32(1))).collect();
        results.push(doc! { "$project": projection });
    }
    let pipeline = vec![
        doc! { "$match": and_all(vec![scope.clone(), user]) },
        doc! { "$facet": {
            METADATA_BRANCH: [{ "$count": "total" }],
            RESULTS_BRANCH: results,
        } },
    ];
    Ok(CompiledQuery { pipeline, window })
}

pub(crate) fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
