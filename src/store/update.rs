use super::eval::{as_i64, bson_equal, matches};
use crate::errors::DbError;
use bson::{Bson, Document};

/// Applies an operator update (`$set`, `$unset`, `$inc`, `$push`, `$addToSet`, `$pull`) in place.
///
/// Returns whether the document actually changed, which is what modified-counts report.
///
/// # Errors
/// Returns `DbError::Store` for unknown operators or operands of the wrong type.
pub fn apply_update(doc: &mut Document, update: &Document) -> Result<bool, DbError> {
    if update.is_empty() {
        return Err(DbError::NoFieldsToUpdate);
    }
    let before = doc.clone();
    for (op, fields) in update {
        let Bson::Document(fields) = fields else {
            return Err(DbError::Store(format!("{op} needs a document of fields")));
        };
        for (path, arg) in fields {
            if path == "_id" {
                return Err(DbError::Store("the _id field is immutable".into()));
            }
            match op.as_str() {
                "$set" => set_path(doc, path, arg.clone())?,
                "$unset" => unset_path(doc, path),
                "$inc" => inc_path(doc, path, arg)?,
                "$push" => {
                    let arr = array_at(doc, path)?;
                    arr.extend(each_values(arg));
                }
                "$addToSet" => {
                    let arr = array_at(doc, path)?;
                    for v in each_values(arg) {
                        if !arr.iter().any(|x| bson_equal(x, &v)) {
                            arr.push(v);
                        }
                    }
                }
                "$pull" => {
                    if let Some(Bson::Array(arr)) = get_path_mut(doc, path) {
                        let mut keep = Vec::with_capacity(arr.len());
                        for item in arr.drain(..) {
                            if !pull_matches(&item, arg)? {
                                keep.push(item);
                            }
                        }
                        *arr = keep;
                    }
                }
                other => return Err(DbError::Store(format!("unknown update operator: {other}"))),
            }
        }
    }
    Ok(*doc != before)
}

fn each_values(arg: &Bson) -> Vec<Bson> {
    match arg {
        Bson::Document(d) if d.contains_key("$each") => match d.get("$each") {
            Some(Bson::Array(items)) => items.clone(),
            Some(other) => vec![other.clone()],
            None => Vec::new(),
        },
        other => vec![other.clone()],
    }
}

fn pull_matches(item: &Bson, arg: &Bson) -> Result<bool, DbError> {
    match arg {
        Bson::Document(cond) if cond.keys().next().is_some_and(|k| k.starts_with('$')) => {
            let probe = bson::doc! {"v": item.clone()};
            let mut wrapped = Document::new();
            wrapped.insert("v", Bson::Document(cond.clone()));
            matches(&probe, &wrapped)
        }
        Bson::Document(cond) => match item {
            Bson::Document(d) => matches(d, cond),
            _ => Ok(false),
        },
        other => Ok(bson_equal(item, other)),
    }
}

fn ensure_subdoc<'a>(root: &'a mut Document, key: &str) -> Result<&'a mut Document, DbError> {
    if !matches!(root.get(key), Some(Bson::Document(_))) {
        if root.get(key).is_some_and(|v| !matches!(v, Bson::Null)) {
            return Err(DbError::Store(format!("cannot create field inside non-document {key}")));
        }
        root.insert(key.to_string(), Bson::Document(Document::new()));
    }
    match root.get_mut(key) {
        Some(Bson::Document(d)) => Ok(d),
        _ => Err(DbError::Store(format!("cannot traverse {key}"))),
    }
}

fn traverse_to_parent<'a, 'p>(
    root: &'a mut Document,
    path: &'p str,
) -> Result<(&'a mut Document, &'p str), DbError> {
    let mut cur = root;
    let mut segs = path.split('.').peekable();
    while let Some(seg) = segs.next() {
        if segs.peek().is_none() {
            return Ok((cur, seg));
        }
        cur = ensure_subdoc(cur, seg)?;
    }
    Err(DbError::Store("empty field path".into()))
}

pub(crate) fn set_path(root: &mut Document, path: &str, value: Bson) -> Result<(), DbError> {
    let (parent, last) = traverse_to_parent(root, path)?;
    parent.insert(last.to_string(), value);
    Ok(())
}

fn unset_path(root: &mut Document, path: &str) {
    let mut cur = root;
    let mut segs = path.split('.').peekable();
    while let Some(seg) = segs.next() {
        if segs.peek().is_none() {
            cur.remove(seg);
            return;
        }
        match cur.get_mut(seg) {
            Some(Bson::Document(d)) => cur = d,
            _ => return,
        }
    }
}

fn get_path_mut<'a>(root: &'a mut Document, path: &str) -> Option<&'a mut Bson> {
    let mut cur = root;
    let mut segs = path.split('.').peekable();
    while let Some(seg) = segs.next() {
        if segs.peek().is_none() {
            return cur.get_mut(seg);
        }
        match cur.get_mut(seg) {
            Some(Bson::Document(d)) => cur = d,
            _ => return None,
        }
    }
    None
}

fn array_at<'a>(root: &'a mut Document, path: &str) -> Result<&'a mut Vec<Bson>, DbError> {
    let (parent, last) = traverse_to_parent(root, path)?;
    if !parent.contains_key(last) {
        parent.insert(last.to_string(), Bson::Array(Vec::new()));
    }
    match parent.get_mut(last) {
        Some(Bson::Array(a)) => Ok(a),
        _ => Err(DbError::Store(format!("field {path} is not an array"))),
    }
}

#[allow(clippy::cast_precision_loss)]
fn inc_path(root: &mut Document, path: &str, by: &Bson) -> Result<(), DbError> {
    let current = get_path_mut(root, path).map(|v| v.clone()).unwrap_or(Bson::Int32(0));
    let next = match (&current, by) {
        (Bson::Int32(a), Bson::Int32(b)) => a.checked_add(*b).map_or_else(|| Bson::Int64(i64::from(*a) + i64::from(*b)), Bson::Int32),
        (Bson::Double(a), b) => Bson::Double(a + numeric(b)?),
        (a, Bson::Double(b)) => Bson::Double(numeric(a)? + b),
        (a, b) => {
            let (x, y) = (
                as_i64(a).ok_or_else(|| not_numeric(path))?,
                as_i64(b).ok_or_else(|| not_numeric(path))?,
            );
            Bson::Int64(x.saturating_add(y))
        }
    };
    set_path(root, path, next)
}

#[allow(clippy::cast_precision_loss)]
fn numeric(b: &Bson) -> Result<f64, DbError> {
    match b {
        Bson::Int32(i) => Ok(f64::from(*i)),
        Bson::Int64(i) => Ok(*i as f64),
        Bson::Double(f) => Ok(*f),
        _ => Err(DbError::Store("$inc requires numeric values".into())),
    }
}

fn not_numeric(path: &str) -> DbError {
    DbError::Store(format!("cannot apply $inc to non-numeric field {path}"))
}
