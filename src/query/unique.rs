//! Distinct-value pipelines.
//!
//! Array fields are unwound before grouping, and the original match is re-applied afterwards
//! with every `$elemMatch` on the unwound array hoisted to plain dotted paths.

use super::compile::to_i64;
use crate::consts::{ID_FIELD, OPERATOR_SIGIL};
use crate::store::as_i64;
use crate::types::{FieldCount, SchemaInfo};
use bson::{Bson, Document, doc};
use std::collections::HashSet;

const ELEM_MATCH: &str = "$elemMatch";

fn is_logical(key: &str) -> bool {
    matches!(key, "$and" | "$or" | "$nor")
}

fn is_operator(key: &str) -> bool {
    key.starts_with(OPERATOR_SIGIL)
}

/// Filter body as a closed tree: a leaf value, an ordered mapping or a sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Leaf(Bson),
    Map(Vec<(String, FilterValue)>),
    Seq(Vec<FilterValue>),
}

impl From<&Bson> for FilterValue {
    fn from(value: &Bson) -> Self {
        match value {
            Bson::Document(d) => Self::from(d),
            Bson::Array(items) => Self::Seq(items.iter().map(Self::from).collect()),
            other => Self::Leaf(other.clone()),
        }
    }
}

impl From<&Document> for FilterValue {
    fn from(doc: &Document) -> Self {
        Self::Map(doc.iter().map(|(k, v)| (k.clone(), Self::from(v))).collect())
    }
}

impl FilterValue {
    pub fn into_bson(self) -> Bson {
        match self {
            Self::Leaf(b) => b,
            Self::Seq(items) => Bson::Array(items.into_iter().map(Self::into_bson).collect()),
            Self::Map(entries) => Bson::Document(assemble(entries)),
        }
    }
}

/// Builds a document from `entries`, or an `$and` of single-key documents when a key repeats.
fn assemble(entries: Vec<(String, FilterValue)>) -> Document {
    let mut seen = HashSet::new();
    if entries.iter().all(|(k, _)| seen.insert(k.clone())) {
        return entries.into_iter().map(|(k, v)| (k, v.into_bson())).collect();
    }
    let parts: Vec<Document> = entries
        .into_iter()
        .map(|(k, v)| {
            let mut d = Document::new();
            d.insert(k, v.into_bson());
            d
        })
        .collect();
    doc! { "$and": parts }
}

/// Prefixes every field key under `value` with `array.`, recursing through logical operators.
fn prefix_keys(array: &str, value: FilterValue) -> FilterValue {
    match value {
        FilterValue::Seq(items) => {
            FilterValue::Seq(items.into_iter().map(|v| prefix_keys(array, v)).collect())
        }
        FilterValue::Map(entries) => FilterValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| {
                    if is_logical(&k) {
                        let v = prefix_keys(array, v);
                        (k, v)
                    } else if is_operator(&k) {
                        (k, v)
                    } else {
                        (format!("{array}.{k}"), v)
                    }
                })
                .collect(),
        ),
        leaf => leaf,
    }
}

/// Entries replacing `{array: cond}` once `array` has been unwound.
fn hoist(array: &str, cond: Vec<(String, FilterValue)>) -> Vec<(String, FilterValue)> {
    let mut out = Vec::new();
    let mut kept = Vec::new();
    for (key, value) in cond {
        match value {
            FilterValue::Map(inner) if key == ELEM_MATCH => {
                for (k, v) in inner {
                    if is_logical(&k) {
                        let v = prefix_keys(array, v);
                        out.push((k, v));
                    } else if is_operator(&k) {
                        // element is a scalar; the condition now applies to the field itself
                        kept.push((k, v));
                    } else {
                        out.push((format!("{array}.{k}"), v));
                    }
                }
            }
            other => kept.push((key, other)),
        }
    }
    if !kept.is_empty() {
        out.push((array.to_string(), FilterValue::Map(kept)));
    }
    out
}

fn rewrite(array: &str, entries: Vec<(String, FilterValue)>) -> Vec<(String, FilterValue)> {
    let mut out = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        match value {
            FilterValue::Map(cond) if key == array => out.extend(hoist(array, cond)),
            FilterValue::Seq(parts) if is_logical(&key) => {
                let parts = parts
                    .into_iter()
                    .map(|p| match p {
                        FilterValue::Map(e) => FilterValue::Map(rewrite(array, e)),
                        other => other,
                    })
                    .collect();
                out.push((key, FilterValue::Seq(parts)));
            }
            other => out.push((key, other)),
        }
    }
    out
}

/// Rewrites `filter` for documents in which `array` has been unwound to a single element.
pub fn rewrite_for_unwind(array: &str, filter: &Document) -> Document {
    let FilterValue::Map(entries) = FilterValue::from(filter) else {
        return filter.clone();
    };
    assemble(rewrite(array, entries))
}

/// Group key name used for `field` when several fields are grouped together.
pub fn clean_field(field: &str) -> String {
    field.replace('.', "_")
}

/// Pipeline producing one `{values, count}` document with the distinct values of `fields`.
///
/// Each array enclosing a requested field is unwound once, followed by the rewritten match.
pub fn unique_value_pipeline<S: AsRef<str>>(
    fields: &[S],
    filter: &Document,
    skip: u64,
    limit: u64,
    schema: &SchemaInfo,
) -> Vec<Document> {
    let mut pipeline = vec![doc! { "$match": filter.clone() }];
    let mut unwound = HashSet::new();
    for field in fields {
        if let Some((array, _)) = schema.array_details(field.as_ref())
            && unwound.insert(array.to_string())
        {
            pipeline.push(doc! { "$unwind": format!("${array}") });
            pipeline.push(doc! { "$match": rewrite_for_unwind(array, filter) });
        }
    }
    let group_id = match fields {
        [single] => Bson::String(format!("${}", single.as_ref())),
        _ => {
            let mut set = Document::new();
            let mut key = Document::new();
            for f in fields {
                let clean = clean_field(f.as_ref());
                set.insert(clean.clone(), format!("${}", f.as_ref()));
                key.insert(clean.clone(), format!("${clean}"));
            }
            pipeline.push(doc! { "$set": set });
            Bson::Document(key)
        }
    };
    pipeline.push(doc! { "$group": { ID_FIELD: group_id, "count": { "$sum": 1 } } });
    pipeline.push(doc! { "$sort": { ID_FIELD: 1 } });
    if skip > 0 {
        pipeline.push(doc! { "$skip": to_i64(skip) });
    }
    pipeline.push(doc! { "$limit": to_i64(limit) });
    pipeline.push(doc! { "$group": {
        ID_FIELD: Bson::Null,
        "values": { "$push": "$_id" },
        "count": { "$push": { "key": "$_id", "count": "$count" } },
    } });
    pipeline.push(doc! { "$project": { ID_FIELD: 0, "values": 1, "count": 1 } });
    pipeline
}

/// String form of a grouped value.
pub fn key_to_string(value: &Bson) -> String {
    match value {
        Bson::String(s) => s.clone(),
        Bson::Int32(i) => i.to_string(),
        Bson::Int64(i) => i.to_string(),
        Bson::Double(f) => f.to_string(),
        Bson::Boolean(b) => b.to_string(),
        Bson::Null | Bson::Undefined => String::new(),
        Bson::DateTime(dt) => dt.try_to_rfc3339_string().unwrap_or_else(|_| dt.to_string()),
        Bson::ObjectId(oid) => oid.to_hex(),
        other => other.clone().into_relaxed_extjson().to_string(),
    }
}

/// Decodes the single result document of [`unique_value_pipeline`].
pub fn decode_unique_values(result: Option<&Document>) -> (Vec<String>, Vec<FieldCount>) {
    let Some(result) = result else {
        return (Vec::new(), Vec::new());
    };
    let values = match result.get_array("values") {
        Ok(vs) => vs.iter().map(key_to_string).collect(),
        Err(_) => Vec::new(),
    };
    let counts = match result.get_array("count") {
        Ok(cs) => cs
            .iter()
            .filter_map(Bson::as_document)
            .map(|c| FieldCount {
                field: c.get("key").map(key_to_string).unwrap_or_default(),
                count: c.get("count").and_then(as_i64).unwrap_or(0),
            })
            .collect(),
        Err(_) => Vec::new(),
    };
    (values, counts)
}
