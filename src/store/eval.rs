use crate::errors::DbError;
use bson::{Bson, Document};
use std::cmp::Ordering;

const MAX_PATH_DEPTH: usize = 32;
const MAX_REGEX_LEN: usize = 1024;

/// Evaluates a Mongo-style filter document against `doc`.
///
/// # Errors
/// Returns `DbError::Store` for unknown operators or malformed operands.
pub fn matches(doc: &Document, filter: &Document) -> Result<bool, DbError> {
    for (key, cond) in filter {
        let ok = match key.as_str() {
            "$and" => {
                let mut all = true;
                for sub in sub_filters(key, cond)? {
                    if !matches(doc, sub)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => {
                let mut any = false;
                for sub in sub_filters(key, cond)? {
                    if matches(doc, sub)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            "$nor" => {
                let mut none = true;
                for sub in sub_filters(key, cond)? {
                    if matches(doc, sub)? {
                        none = false;
                        break;
                    }
                }
                none
            }
            k if k.starts_with('$') => {
                return Err(DbError::Store(format!("unknown top level operator: {k}")));
            }
            path => match_field(doc, path, cond)?,
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn sub_filters<'a>(op: &str, cond: &'a Bson) -> Result<Vec<&'a Document>, DbError> {
    let Bson::Array(items) = cond else {
        return Err(DbError::Store(format!("{op} must be an array")));
    };
    items
        .iter()
        .map(|b| match b {
            Bson::Document(d) => Ok(d),
            _ => Err(DbError::Store(format!("{op} entries must be documents"))),
        })
        .collect()
}

fn match_field(doc: &Document, path: &str, cond: &Bson) -> Result<bool, DbError> {
    let found = lookup(doc, path);
    match cond {
        Bson::Document(ops) if is_operator_doc(ops) => apply_ops(&found, ops),
        Bson::RegularExpression(re) => regex_any(&found, &re.pattern, &re.options),
        other => Ok(eq_any(&found, other)),
    }
}

fn is_operator_doc(d: &Document) -> bool {
    d.keys().next().is_some_and(|k| k.starts_with('$'))
}

fn apply_ops(found: &[&Bson], ops: &Document) -> Result<bool, DbError> {
    for (op, arg) in ops {
        let ok = match op.as_str() {
            "$eq" => eq_any(found, arg),
            "$ne" => !eq_any(found, arg),
            "$gt" => cmp_any(found, arg, |o| o == Ordering::Greater),
            "$gte" => cmp_any(found, arg, |o| o != Ordering::Less),
            "$lt" => cmp_any(found, arg, |o| o == Ordering::Less),
            "$lte" => cmp_any(found, arg, |o| o != Ordering::Greater),
            "$in" => in_any(found, operand_array(op, arg)?),
            "$nin" => !in_any(found, operand_array(op, arg)?),
            "$exists" => !found.is_empty() == truthy(arg),
            "$regex" => {
                let options = ops.get_str("$options").unwrap_or_default();
                match arg {
                    Bson::String(p) => regex_any(found, p, options)?,
                    Bson::RegularExpression(re) => {
                        let opts = if options.is_empty() { re.options.as_str() } else { options };
                        regex_any(found, &re.pattern, opts)?
                    }
                    _ => return Err(DbError::Store("$regex has to be a string".into())),
                }
            }
            "$options" => true,
            "$not" => match arg {
                Bson::Document(inner) => !apply_ops(found, inner)?,
                Bson::RegularExpression(re) => !regex_any(found, &re.pattern, &re.options)?,
                _ => return Err(DbError::Store("$not needs a document or regex".into())),
            },
            "$size" => {
                let want = as_i64(arg).ok_or_else(|| DbError::Store("$size needs a number".into()))?;
                found.iter().any(|v| matches!(v, Bson::Array(a) if a.len() as i64 == want))
            }
            "$elemMatch" => {
                let Bson::Document(inner) = arg else {
                    return Err(DbError::Store("$elemMatch needs an object".into()));
                };
                elem_match(found, inner)?
            }
            other => return Err(DbError::Store(format!("unknown operator: {other}"))),
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn elem_match(found: &[&Bson], cond: &Document) -> Result<bool, DbError> {
    let value_ops = cond
        .keys()
        .all(|k| k.starts_with('$') && !matches!(k.as_str(), "$and" | "$or" | "$nor"));
    for v in found {
        let Bson::Array(items) = v else { continue };
        for item in items {
            let hit = if value_ops {
                apply_ops(&[item], cond)?
            } else if let Bson::Document(d) = item {
                matches(d, cond)?
            } else {
                false
            };
            if hit {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

fn operand_array<'a>(op: &str, arg: &'a Bson) -> Result<&'a [Bson], DbError> {
    match arg {
        Bson::Array(a) => Ok(a),
        _ => Err(DbError::Store(format!("{op} needs an array"))),
    }
}

fn truthy(b: &Bson) -> bool {
    match b {
        Bson::Boolean(v) => *v,
        Bson::Null | Bson::Undefined => false,
        other => as_f64(other).is_none_or(|f| f != 0.0),
    }
}

/// Candidate values for a condition: each resolved value plus the elements of resolved arrays.
fn candidates<'a>(found: &[&'a Bson]) -> Vec<&'a Bson> {
    let mut out = Vec::with_capacity(found.len());
    for v in found {
        out.push(*v);
        if let Bson::Array(items) = v {
            out.extend(items.iter());
        }
    }
    out
}

fn eq_any(found: &[&Bson], target: &Bson) -> bool {
    if found.is_empty() {
        return matches!(target, Bson::Null);
    }
    candidates(found).iter().any(|v| bson_equal(v, target))
}

fn in_any(found: &[&Bson], set: &[Bson]) -> bool {
    set.iter().any(|t| match t {
        Bson::RegularExpression(re) => regex_any(found, &re.pattern, &re.options).unwrap_or(false),
        _ => eq_any(found, t),
    })
}

fn cmp_any(found: &[&Bson], target: &Bson, pred: impl Fn(Ordering) -> bool) -> bool {
    candidates(found)
        .iter()
        .any(|v| type_class(v) == type_class(target) && pred(compare_bson(v, target)))
}

fn regex_any(found: &[&Bson], pattern: &str, options: &str) -> Result<bool, DbError> {
    if pattern.len() > MAX_REGEX_LEN {
        return Err(DbError::Store("regular expression is too long".into()));
    }
    let mut re = regex::RegexBuilder::new(pattern);
    re.case_insensitive(options.contains('i'))
        .multi_line(options.contains('m'))
        .dot_matches_new_line(options.contains('s'));
    let re = re.build().map_err(|e| DbError::Store(format!("invalid regex: {e}")))?;
    Ok(candidates(found).iter().any(|v| match v {
        Bson::String(s) | Bson::Symbol(s) => re.is_match(s),
        _ => false,
    }))
}

/// Resolves a dotted path, descending into arrays of documents the way Mongo does.
pub(crate) fn lookup<'a>(doc: &'a Document, path: &str) -> Vec<&'a Bson> {
    let parts: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    if parts.len() > MAX_PATH_DEPTH {
        return out;
    }
    if let Some((head, rest)) = parts.split_first()
        && let Some(v) = doc.get(*head)
    {
        descend(v, rest, &mut out);
    }
    out
}

fn descend<'a>(value: &'a Bson, parts: &[&str], out: &mut Vec<&'a Bson>) {
    let Some((head, rest)) = parts.split_first() else {
        out.push(value);
        return;
    };
    match value {
        Bson::Document(d) => {
            if let Some(v) = d.get(*head) {
                descend(v, rest, out);
            }
        }
        Bson::Array(items) => {
            if let Ok(idx) = head.parse::<usize>() {
                if let Some(v) = items.get(idx) {
                    descend(v, rest, out);
                }
                return;
            }
            for item in items {
                if matches!(item, Bson::Document(_)) {
                    descend(item, parts, out);
                }
            }
        }
        _ => {}
    }
}

/// Single value at a dotted path through nested documents only; used by expressions.
pub(crate) fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let mut cur = doc.get(parts.next()?)?;
    for part in parts {
        cur = match cur {
            Bson::Document(d) => d.get(part)?,
            _ => return None,
        };
    }
    Some(cur)
}

fn as_f64(b: &Bson) -> Option<f64> {
    match b {
        Bson::Int32(i) => Some(f64::from(*i)),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(f) => Some(*f),
        Bson::Decimal128(d) => d.to_string().parse::<f64>().ok(),
        _ => None,
    }
}

pub(crate) fn as_i64(b: &Bson) -> Option<i64> {
    match b {
        Bson::Int32(i) => Some(i64::from(*i)),
        Bson::Int64(i) => Some(*i),
        Bson::Double(f) if f.fract() == 0.0 => Some(*f as i64),
        _ => None,
    }
}

#[allow(clippy::float_cmp)]
pub(crate) fn bson_equal(a: &Bson, b: &Bson) -> bool {
    match (as_f64(a), as_f64(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Canonical ordering class; values of different classes never satisfy range operators.
fn type_class(v: &Bson) -> u8 {
    use bson::Bson as T;
    match v {
        T::MinKey => 0,
        T::Null | T::Undefined => 1,
        T::Int32(_) | T::Int64(_) | T::Double(_) | T::Decimal128(_) => 2,
        T::String(_) | T::Symbol(_) => 3,
        T::Document(_) => 4,
        T::Array(_) => 5,
        T::Binary(_) => 6,
        T::ObjectId(_) => 7,
        T::Boolean(_) => 8,
        T::DateTime(_) => 9,
        T::Timestamp(_) => 10,
        T::RegularExpression(_) => 11,
        T::DbPointer(_) => 12,
        T::JavaScriptCode(_) | T::JavaScriptCodeWithScope(_) => 13,
        T::MaxKey => 255,
    }
}

/// Total order over BSON values: first by type class, then by value within the class.
pub fn compare_bson(a: &Bson, b: &Bson) -> Ordering {
    use bson::Bson as T;
    let (ca, cb) = (type_class(a), type_class(b));
    if ca != cb {
        return ca.cmp(&cb);
    }
    if let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) {
        return x.total_cmp(&y);
    }
    match (a, b) {
        (T::String(x) | T::Symbol(x), T::String(y) | T::Symbol(y)) => x.cmp(y),
        (T::Boolean(x), T::Boolean(y)) => x.cmp(y),
        (T::DateTime(x), T::DateTime(y)) => x.timestamp_millis().cmp(&y.timestamp_millis()),
        (T::ObjectId(x), T::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        (T::Timestamp(x), T::Timestamp(y)) => (x.time, x.increment).cmp(&(y.time, y.increment)),
        (T::Array(x), T::Array(y)) => {
            for (l, r) in x.iter().zip(y.iter()) {
                let o = compare_bson(l, r);
                if o != Ordering::Equal {
                    return o;
                }
            }
            x.len().cmp(&y.len())
        }
        (T::Document(x), T::Document(y)) => {
            for ((lk, lv), (rk, rv)) in x.iter().zip(y.iter()) {
                let o = compare_bson(lv, rv).then_with(|| lk.cmp(rk));
                if o != Ordering::Equal {
                    return o;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => Ordering::Equal,
    }
}
