/// Scope segment parsing and covering rules
///
/// A segment is one position of a dotted scope. Segments are an explicit
/// tagged union so comparison is a pure function over the variants.

use std::fmt;

use serde_json::Value;

use super::types::{ScopeError, ScopeResult};

pub(crate) const WILDCARD: &str = "*";
const COMMA: char = ',';
const COLON: char = ':';

/// A single position in a [`Scope`](super::Scope)
///
/// - `api` is a [`Segment::Literal`]
/// - `*` is a [`Segment::Wildcard`]
/// - `(1,2,3)` is an unkeyed [`Segment::Values`]
/// - `shops:1,2` is a keyed [`Segment::Values`]; `shops:*` accepts any value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Literal(String),
    Wildcard,
    Values {
        key: Option<String>,
        values: Vec<String>,
    },
}

impl Segment {
    /// Parses one segment (no `.` separators)
    pub fn parse(raw: &str) -> ScopeResult<Self> {
        if raw.is_empty() {
            return Err(ScopeError::InvalidArgument(
                "scope segments cannot be empty".to_string(),
            ));
        }

        if raw == WILDCARD {
            return Ok(Segment::Wildcard);
        }

        if let Some(inner) = raw.strip_prefix('(') {
            let inner = inner.strip_suffix(')').ok_or_else(|| {
                ScopeError::InvalidArgument(format!("unbalanced value list '{}'", raw))
            })?;
            return Ok(Segment::Values {
                key: None,
                values: split_values(raw, inner)?,
            });
        }

        if let Some((key, values)) = raw.split_once(COLON) {
            if key.is_empty() {
                return Err(ScopeError::InvalidArgument(format!(
                    "keyed segment '{}' has an empty key",
                    raw
                )));
            }
            return Ok(Segment::Values {
                key: Some(key.to_string()),
                values: split_values(raw, values)?,
            });
        }

        if raw.contains('*') {
            return Err(ScopeError::InvalidArgument(format!(
                "wildcards must be standalone: '{}'",
                raw
            )));
        }

        Ok(Segment::Literal(raw.to_string()))
    }

    /// Builds an unkeyed value set, rendered as `(a,b,c)`
    pub fn values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Segment::Values {
            key: None,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether this segment accepts any value at its position
    pub fn is_wildcard(&self) -> bool {
        match self {
            Segment::Wildcard => true,
            Segment::Values { values, .. } => values.iter().any(|v| v == WILDCARD),
            Segment::Literal(_) => false,
        }
    }

    /// Whether `self`, at some position of a granted scope, covers `other`
    /// at the same position of a required scope
    pub fn covers(&self, other: &Segment) -> bool {
        match (self, other) {
            (Segment::Wildcard, _) | (_, Segment::Wildcard) => true,
            (Segment::Literal(a), Segment::Literal(b)) => a == b,
            // A bare key grants every value under it: `contacts` ≥ `contacts:*`
            (Segment::Literal(a), Segment::Values { key: Some(key), .. }) => a == key,
            (Segment::Values { key: Some(_), .. }, Segment::Literal(_)) => false,
            (Segment::Literal(a), Segment::Values { key: None, values })
            | (Segment::Values { key: None, values }, Segment::Literal(a)) => {
                values.iter().any(|v| v == a)
            }
            (
                Segment::Values { key: k1, values: v1 },
                Segment::Values { key: k2, values: v2 },
            ) => k1 == k2 && intersects(v1, v2),
        }
    }

    /// Name of the template marker carried by this segment, if any
    ///
    /// `<shop_id>` and `shops:<shop_id>` both carry `shop_id`.
    pub fn template_key(&self) -> Option<&str> {
        match self {
            Segment::Literal(name) => template_name(name),
            Segment::Values { values, .. } if values.len() == 1 => template_name(&values[0]),
            _ => None,
        }
    }

    /// Replaces the template marker with a runtime value
    ///
    /// Values are taken verbatim and never read as scope syntax, so request
    /// data cannot turn into wildcards or value sets.
    pub(crate) fn fill(&self, value: &Value) -> ScopeResult<Segment> {
        let mut values = template_values(value)?;
        match self {
            Segment::Values { key, .. } => Ok(Segment::Values {
                key: key.clone(),
                values,
            }),
            _ if values.len() == 1 && !value.is_array() => Ok(Segment::Literal(values.remove(0))),
            _ => Ok(Segment::Values { key: None, values }),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Literal(name) => f.write_str(name),
            Segment::Wildcard => f.write_str(WILDCARD),
            Segment::Values { key: None, values } => write!(f, "({})", values.join(",")),
            Segment::Values {
                key: Some(key),
                values,
            } => write!(f, "{}:{}", key, values.join(",")),
        }
    }
}

fn split_values(raw: &str, list: &str) -> ScopeResult<Vec<String>> {
    let values: Vec<String> = list.split(COMMA).map(|v| v.trim().to_string()).collect();
    if values.iter().any(|v| v.is_empty()) {
        return Err(ScopeError::InvalidArgument(format!(
            "segment '{}' has an empty value",
            raw
        )));
    }
    Ok(values)
}

fn intersects(a: &[String], b: &[String]) -> bool {
    if a.iter().chain(b).any(|v| v == WILDCARD) {
        return true;
    }
    a.iter().any(|v| b.contains(v))
}

fn template_name(raw: &str) -> Option<&str> {
    raw.strip_prefix('<')
        .and_then(|rest| rest.strip_suffix('>'))
        .filter(|name| !name.is_empty())
}

/// Characters with a meaning in scope syntax
const RESERVED: [char; 8] = ['.', '*', ',', '(', ')', ':', '<', '>'];

fn plain_value(value: String) -> ScopeResult<String> {
    if value.contains(&RESERVED[..]) || value.contains(char::is_whitespace) {
        return Err(ScopeError::InvalidArgument(format!(
            "template value '{}' contains reserved characters",
            value
        )));
    }
    Ok(value)
}

fn template_values(value: &Value) -> ScopeResult<Vec<String>> {
    let scalar = |v: &Value| -> ScopeResult<String> {
        match v {
            Value::String(s) if !s.is_empty() => plain_value(s.clone()),
            Value::Number(n) => plain_value(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(ScopeError::InvalidArgument(format!(
                "cannot expand a scope template with {}",
                other
            ))),
        }
    };

    match value {
        Value::Array(items) if !items.is_empty() => items.iter().map(scalar).collect(),
        Value::Array(_) => Err(ScopeError::InvalidArgument(
            "cannot expand a scope template with an empty list".to_string(),
        )),
        other => Ok(vec![scalar(other)?]),
    }
}
