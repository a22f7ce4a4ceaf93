use crate::errors::DbError;
use bson::{Bson, Document, doc};

/// Escape that keeps a comma inside a value instead of starting the next one.
const ESCAPED_COMMA: &str = "\\,";
const VALUE_SEPARATOR: char = ',';
const OPERATORS_SEPARATOR: char = '|';
const OPERATOR_CHAIN: char = '&';
const RANGE_SEPARATOR: char = '&';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    Match,
    Regex,
    Exists,
    Missing,
    Range,
    Greater,
    Lower,
}

impl Operator {
    fn parse(token: &str) -> Result<Option<Self>, DbError> {
        Ok(Some(match token {
            "equal" => Self::Equal,
            "match" => Self::Match,
            "regex" => Self::Regex,
            "exists" => Self::Exists,
            "missing" => Self::Missing,
            "range" => Self::Range,
            "greater" => Self::Greater,
            "lower" => Self::Lower,
            "ignorecase" => return Ok(None),
            other => return Err(DbError::format(format!("unsupported operator {other}"))),
        }))
    }

    /// True when the operator tests presence rather than the field's value.
    pub fn is_presence(self) -> bool {
        matches!(self, Self::Exists | Self::Missing)
    }
}

/// One comma-separated item of a field filter: a value and the operators applied to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldItem {
    pub value: String,
    pub operators: Vec<Operator>,
    pub ignore_case: bool,
}

impl FieldItem {
    pub fn is_presence_only(&self) -> bool {
        self.operators.iter().all(|op| op.is_presence())
    }
}

/// Splits on unescaped commas and unescapes `\,` inside each piece.
fn split_values(raw: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut rest = raw;
    while let Some(c) = rest.chars().next() {
        if rest.starts_with(ESCAPED_COMMA) {
            cur.push(VALUE_SEPARATOR);
            rest = &rest[ESCAPED_COMMA.len()..];
            continue;
        }
        if c == VALUE_SEPARATOR {
            out.push(std::mem::take(&mut cur));
        } else {
            cur.push(c);
        }
        rest = &rest[c.len_utf8()..];
    }
    out.push(cur);
    out
}

/// Parses a field filter value such as `a,b|match&ignorecase` or `0&5|range`.
///
/// Items without a value and without an operator are dropped.
///
/// # Errors
/// `DbError::Format` for unknown operators.
pub fn parse_field_value(raw: &str) -> Result<Vec<FieldItem>, DbError> {
    let mut items = Vec::new();
    for piece in split_values(raw) {
        let (value, chain) = match piece.rsplit_once(OPERATORS_SEPARATOR) {
            Some((v, ops)) => (v.to_string(), Some(ops)),
            None => (piece.clone(), None),
        };
        let mut operators = Vec::new();
        let mut ignore_case = false;
        for token in chain.into_iter().flat_map(|c| c.split(OPERATOR_CHAIN)) {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            match Operator::parse(token)? {
                Some(op) if !operators.contains(&op) => operators.push(op),
                Some(_) => {}
                None => ignore_case = true,
            }
        }
        if value.is_empty() && operators.is_empty() {
            continue;
        }
        if operators.is_empty() {
            operators.push(Operator::Equal);
        }
        items.push(FieldItem { value, operators, ignore_case });
    }
    Ok(items)
}

/// Interprets a raw value as int64, then float64, then string.
pub fn typed_value(raw: &str) -> Bson {
    if let Ok(i) = raw.parse::<i64>() {
        return Bson::Int64(i);
    }
    if let Ok(f) = raw.parse::<f64>()
        && f.is_finite()
    {
        return Bson::Double(f);
    }
    Bson::String(raw.to_string())
}

pub fn type_name(v: &Bson) -> &'static str {
    match v {
        Bson::Int64(_) | Bson::Int32(_) => "int64",
        Bson::Double(_) => "float64",
        Bson::String(_) => "string",
        Bson::Boolean(_) => "bool",
        _ => "unknown",
    }
}

fn is_numeric(v: &Bson) -> bool {
    matches!(v, Bson::Int64(_) | Bson::Int32(_) | Bson::Double(_))
}

fn parse_range(value: &str) -> Result<(Bson, Bson), DbError> {
    let parts: Vec<&str> = value.split(RANGE_SEPARATOR).collect();
    let [lo, hi] = parts.as_slice() else {
        return Err(DbError::format(format!("value missing range separator {value}")));
    };
    let (lo, hi) = (typed_value(lo), typed_value(hi));
    let same = (is_numeric(&lo) && is_numeric(&hi)) || type_name(&lo) == type_name(&hi);
    if !same {
        return Err(DbError::format(format!(
            "invalid range must use same value types found {} {}",
            type_name(&lo),
            type_name(&hi)
        )));
    }
    Ok((lo, hi))
}

fn with_options(mut cond: Document, ignore_case: bool) -> Document {
    if ignore_case {
        cond.insert("$options", "i");
    }
    cond
}

/// Operator documents for one item, one per operator; the caller ANDs them.
///
/// # Errors
/// `DbError::Format` for malformed ranges.
pub fn item_conditions(item: &FieldItem) -> Result<Vec<Document>, DbError> {
    let mut out = Vec::with_capacity(item.operators.len());
    for op in &item.operators {
        let cond = match op {
            Operator::Equal if item.ignore_case => with_options(
                doc! { "$regex": format!("^{}$", regex::escape(&item.value)) },
                true,
            ),
            Operator::Equal => match typed_value(&item.value) {
                Bson::String(s) => doc! { "$eq": s },
                typed => doc! { "$in": [typed, item.value.clone()] },
            },
            Operator::Match => {
                with_options(doc! { "$regex": regex::escape(&item.value) }, item.ignore_case)
            }
            Operator::Regex => with_options(doc! { "$regex": item.value.clone() }, item.ignore_case),
            Operator::Exists => doc! { "$exists": true },
            Operator::Missing => doc! { "$exists": false },
            Operator::Range => {
                let (lo, hi) = parse_range(&item.value)?;
                doc! { "$gte": lo, "$lte": hi }
            }
            Operator::Greater => doc! { "$gte": typed_value(&item.value) },
            Operator::Lower => doc! { "$lte": typed_value(&item.value) },
        };
        out.push(cond);
    }
    Ok(out)
}
