use super::eval::{as_i64, bson_equal, compare_bson, get_path, matches};
use super::update::set_path;
use crate::errors::DbError;
use crate::scope::CallContext;
use bson::{Bson, Document};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Documents scanned between cancellation checks.
const CHECK_EVERY: usize = 256;

/// Runs an aggregation pipeline over an already-loaded collection snapshot.
///
/// # Errors
/// Fails on unknown stages, malformed stage arguments, or when `ctx` is cancelled mid-run.
pub fn run_pipeline(
    ctx: &CallContext,
    mut docs: Vec<Document>,
    stages: &[Document],
) -> Result<Vec<Document>, DbError> {
    for stage in stages {
        ctx.check()?;
        let mut it = stage.iter();
        let (Some((name, arg)), None) = (it.next(), it.next()) else {
            return Err(DbError::Store("a pipeline stage must have exactly one key".into()));
        };
        docs = match name.as_str() {
            "$match" => {
                let filter = arg_doc(name, arg)?;
                let mut out = Vec::with_capacity(docs.len());
                for (i, d) in docs.into_iter().enumerate() {
                    if i % CHECK_EVERY == 0 {
                        ctx.check()?;
                    }
                    if matches(&d, filter)? {
                        out.push(d);
                    }
                }
                out
            }
            "$unwind" => unwind(docs, arg)?,
            "$group" => group(&docs, arg_doc(name, arg)?)?,
            "$sort" => {
                let spec = arg_doc(name, arg)?;
                docs.sort_by(|a, b| compare_by(a, b, spec));
                docs
            }
            "$skip" => {
                let n = arg_count(name, arg)?;
                docs.into_iter().skip(n).collect()
            }
            "$limit" => {
                let n = arg_count(name, arg)?;
                docs.truncate(n);
                docs
            }
            "$project" => {
                let spec = arg_doc(name, arg)?;
                docs.iter().map(|d| project(d, spec)).collect::<Result<_, _>>()?
            }
            "$set" | "$addFields" => {
                let spec = arg_doc(name, arg)?;
                for d in &mut docs {
                    let mut computed = Vec::with_capacity(spec.len());
                    for (k, expr) in spec {
                        computed.push((k, eval_expr(d, expr)?));
                    }
                    for (k, v) in computed {
                        set_path(d, k, v)?;
                    }
                }
                docs
            }
            "$facet" => {
                let spec = arg_doc(name, arg)?;
                let mut out = Document::new();
                for (branch, sub) in spec {
                    let Bson::Array(sub) = sub else {
                        return Err(DbError::Store(format!("$facet branch {branch} must be an array")));
                    };
                    let sub: Vec<Document> = sub
                        .iter()
                        .map(|s| match s {
                            Bson::Document(d) => Ok(d.clone()),
                            _ => Err(DbError::Store(format!("$facet branch {branch} has a non-document stage"))),
                        })
                        .collect::<Result<_, _>>()?;
                    let res = run_pipeline(ctx, docs.clone(), &sub)?;
                    out.insert(branch.clone(), Bson::Array(res.into_iter().map(Bson::Document).collect()));
                }
                vec![out]
            }
            "$count" => {
                let Bson::String(field) = arg else {
                    return Err(DbError::Store("$count needs a field name".into()));
                };
                if docs.is_empty() {
                    Vec::new()
                } else {
                    let n = i64::try_from(docs.len()).unwrap_or(i64::MAX);
                    let mut d = Document::new();
                    d.insert(field.clone(), Bson::Int64(n));
                    vec![d]
                }
            }
            other => return Err(DbError::Store(format!("unsupported pipeline stage: {other}"))),
        };
    }
    Ok(docs)
}

fn arg_doc<'a>(stage: &str, arg: &'a Bson) -> Result<&'a Document, DbError> {
    match arg {
        Bson::Document(d) => Ok(d),
        _ => Err(DbError::Store(format!("{stage} needs a document argument"))),
    }
}

fn arg_count(stage: &str, arg: &Bson) -> Result<usize, DbError> {
    as_i64(arg)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| DbError::Store(format!("{stage} needs a non-negative integer")))
}

fn field_ref(expr: &str) -> Option<&str> {
    expr.strip_prefix('$').filter(|p| !p.is_empty() && !p.starts_with('$'))
}

/// Evaluates an aggregation expression: `"$path"` references, documents of expressions, literals.
pub(crate) fn eval_expr(doc: &Document, expr: &Bson) -> Result<Bson, DbError> {
    match expr {
        Bson::String(s) => match field_ref(s) {
            Some(path) => Ok(get_path(doc, path).cloned().unwrap_or(Bson::Null)),
            None => Ok(expr.clone()),
        },
        Bson::Document(d) => {
            if let Some(k) = d.keys().next()
                && k.starts_with('$')
            {
                if k == "$literal" {
                    return Ok(d.get("$literal").cloned().unwrap_or(Bson::Null));
                }
                return Err(DbError::Store(format!("unsupported expression operator: {k}")));
            }
            let mut out = Document::new();
            for (k, v) in d {
                out.insert(k.clone(), eval_expr(doc, v)?);
            }
            Ok(Bson::Document(out))
        }
        Bson::Array(items) => {
            Ok(Bson::Array(items.iter().map(|i| eval_expr(doc, i)).collect::<Result<_, _>>()?))
        }
        other => Ok(other.clone()),
    }
}

fn unwind(docs: Vec<Document>, arg: &Bson) -> Result<Vec<Document>, DbError> {
    let (path, preserve) = match arg {
        Bson::String(s) => (s.as_str(), false),
        Bson::Document(d) => (
            d.get_str("path").map_err(|_| DbError::Store("$unwind needs a path".into()))?,
            d.get_bool("preserveNullAndEmptyArrays").unwrap_or(false),
        ),
        _ => return Err(DbError::Store("$unwind needs a path".into())),
    };
    let path = field_ref(path).ok_or_else(|| DbError::Store(format!("invalid $unwind path {path}")))?;
    let mut out = Vec::with_capacity(docs.len());
    for d in docs {
        match get_path(&d, path) {
            Some(Bson::Array(items)) if !items.is_empty() => {
                for item in items.clone() {
                    let mut copy = d.clone();
                    set_path(&mut copy, path, item)?;
                    out.push(copy);
                }
            }
            Some(Bson::Array(_) | Bson::Null) | None => {
                if preserve {
                    out.push(d);
                }
            }
            Some(_) => out.push(d),
        }
    }
    Ok(out)
}

enum Acc {
    Sum(Option<i64>, f64),
    Push(Vec<Bson>),
    First(Option<Bson>),
    AddToSet(Vec<Bson>),
}

impl Acc {
    fn new(op: &str) -> Result<Self, DbError> {
        Ok(match op {
            "$sum" => Self::Sum(Some(0), 0.0),
            "$push" => Self::Push(Vec::new()),
            "$first" => Self::First(None),
            "$addToSet" => Self::AddToSet(Vec::new()),
            other => return Err(DbError::Store(format!("unsupported accumulator: {other}"))),
        })
    }

    #[allow(clippy::cast_precision_loss)]
    fn feed(&mut self, v: Bson) {
        match self {
            Self::Sum(int, float) => match v {
                Bson::Int32(_) | Bson::Int64(_) => {
                    let n = as_i64(&v).unwrap_or(0);
                    *int = int.and_then(|i| i.checked_add(n));
                    *float += n as f64;
                }
                Bson::Double(f) => {
                    *int = None;
                    *float += f;
                }
                _ => {}
            },
            Self::Push(items) => items.push(v),
            Self::First(slot) => {
                if slot.is_none() {
                    *slot = Some(v);
                }
            }
            Self::AddToSet(items) => {
                if !items.iter().any(|x| bson_equal(x, &v)) {
                    items.push(v);
                }
            }
        }
    }

    fn finish(self) -> Bson {
        match self {
            Self::Sum(Some(i), _) => Bson::Int64(i),
            Self::Sum(None, f) => Bson::Double(f),
            Self::Push(items) | Self::AddToSet(items) => Bson::Array(items),
            Self::First(v) => v.unwrap_or(Bson::Null),
        }
    }
}

/// Canonical text of a group key; numerically equal keys collapse together.
fn key_repr(b: &Bson) -> String {
    match b {
        Bson::Int32(_) | Bson::Int64(_) => format!("n:{}", as_i64(b).unwrap_or_default()),
        Bson::Double(f) if f.fract() == 0.0 && f.is_finite() => format!("n:{f:.0}"),
        Bson::Double(f) => format!("n:{f}"),
        other => format!("{other:?}"),
    }
}

fn group(docs: &[Document], spec: &Document) -> Result<Vec<Document>, DbError> {
    let id_expr = spec.get("_id").cloned().unwrap_or(Bson::Null);
    let mut fields: Vec<(&String, &str, &Bson)> = Vec::new();
    for (name, acc) in spec {
        if name == "_id" {
            continue;
        }
        let Bson::Document(acc) = acc else {
            return Err(DbError::Store(format!("accumulator for {name} must be a document")));
        };
        let Some((op, arg)) = acc.iter().next() else {
            return Err(DbError::Store(format!("empty accumulator for {name}")));
        };
        fields.push((name, op.as_str(), arg));
    }

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(Bson, Vec<Acc>)> = Vec::new();
    for d in docs {
        let key = eval_expr(d, &id_expr)?;
        let repr = key_repr(&key);
        let slot = match index.get(&repr) {
            Some(i) => *i,
            None => {
                let accs = fields.iter().map(|(_, op, _)| Acc::new(op)).collect::<Result<_, _>>()?;
                groups.push((key, accs));
                index.insert(repr, groups.len() - 1);
                groups.len() - 1
            }
        };
        for (acc, (_, _, arg)) in groups[slot].1.iter_mut().zip(&fields) {
            acc.feed(eval_expr(d, arg)?);
        }
    }

    Ok(groups
        .into_iter()
        .map(|(key, accs)| {
            let mut out = Document::new();
            out.insert("_id", key);
            for ((name, _, _), acc) in fields.iter().zip(accs) {
                out.insert((*name).clone(), acc.finish());
            }
            out
        })
        .collect())
}

pub(crate) fn compare_by(a: &Document, b: &Document, spec: &Document) -> Ordering {
    for (path, dir) in spec {
        let ord = match (get_path(a, path), get_path(b, path)) {
            (Some(x), Some(y)) => compare_bson(x, y),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return if as_i64(dir).unwrap_or(1) < 0 { ord.reverse() } else { ord };
        }
    }
    Ordering::Equal
}

fn is_flag(v: &Bson) -> Option<bool> {
    match v {
        Bson::Boolean(b) => Some(*b),
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => Some(as_i64(v).unwrap_or(1) != 0),
        _ => None,
    }
}

pub(crate) fn project(doc: &Document, spec: &Document) -> Result<Document, DbError> {
    let inclusive = spec.iter().any(|(k, v)| k != "_id" && is_flag(v) != Some(false));
    let keep_id = spec.get("_id").and_then(is_flag).unwrap_or(true);
    if !inclusive {
        let mut out = doc.clone();
        for (k, v) in spec {
            if is_flag(v) == Some(false) {
                unset(&mut out, k);
            }
        }
        return Ok(out);
    }
    let mut out = Document::new();
    if keep_id && let Some(id) = doc.get("_id") {
        out.insert("_id", id.clone());
    }
    for (k, v) in spec {
        if k == "_id" {
            continue;
        }
        match is_flag(v) {
            Some(true) => {
                let parts: Vec<&str> = k.split('.').collect();
                include(doc, &mut out, &parts);
            }
            Some(false) => {}
            None => set_path(&mut out, k, eval_expr(doc, v)?)?,
        }
    }
    Ok(out)
}

fn include(src: &Document, out: &mut Document, parts: &[&str]) {
    let Some((head, rest)) = parts.split_first() else {
        return;
    };
    let Some(value) = src.get(*head) else {
        return;
    };
    if rest.is_empty() {
        out.insert((*head).to_string(), value.clone());
        return;
    }
    match value {
        Bson::Document(inner) => {
            let mut sub = match out.remove(*head) {
                Some(Bson::Document(d)) => d,
                _ => Document::new(),
            };
            include(inner, &mut sub, rest);
            out.insert((*head).to_string(), sub);
        }
        Bson::Array(items) => {
            let previous = match out.remove(*head) {
                Some(Bson::Array(p)) => p,
                _ => Vec::new(),
            };
            let mut projected = Vec::new();
            let mut prev = previous.into_iter();
            for item in items {
                if let Bson::Document(inner) = item {
                    let mut sub = match prev.next() {
                        Some(Bson::Document(d)) => d,
                        _ => Document::new(),
                    };
                    include(inner, &mut sub, rest);
                    projected.push(Bson::Document(sub));
                }
            }
            out.insert((*head).to_string(), Bson::Array(projected));
        }
        _ => {}
    }
}

fn unset(doc: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            doc.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Bson::Document(inner)) = doc.get_mut(head) {
                unset(inner, rest);
            }
        }
    }
}
