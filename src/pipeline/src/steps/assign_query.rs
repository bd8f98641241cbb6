use gatehouse_core::JsonMap;
use serde_json::Value;

use crate::outcome::Outcome;
use crate::pipeline::Step;

/// Decodes the query string into the outcome's query map
///
/// Bracketed keys nest: `product[price]=100` becomes
/// `{"product": {"price": "100"}}` and `tags[]=a&tags[]=b` becomes
/// `{"tags": ["a", "b"]}`. Path parameters supplied by the router are merged
/// over the decoded query.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssignQueryStep;

impl Step for AssignQueryStep {
    fn call(&self, outcome: Outcome) -> Outcome {
        let mut query = decode(outcome.request().query_params());
        for (key, value) in outcome.request().path_params() {
            query.insert(key.clone(), value.clone());
        }

        outcome.proceed_with(|o| o.query = query)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Key(String),
    Push,
}

/// Builds a nested map from decoded `key=value` pairs
pub(crate) fn decode(pairs: Vec<(String, String)>) -> JsonMap {
    let mut query = JsonMap::new();
    for (key, value) in pairs {
        let (root, parts) = split_key(&key);
        let slot = query.entry(root).or_insert(Value::Null);
        assign(slot, &parts, value);
    }
    query
}

/// `a[b][]` => ("a", [Key("b"), Push]); malformed brackets keep the key whole
fn split_key(key: &str) -> (String, Vec<Part>) {
    let Some(open) = key.find('[') else {
        return (key.to_string(), Vec::new());
    };
    if open == 0 {
        return (key.to_string(), Vec::new());
    }

    let mut parts = Vec::new();
    let mut rest = &key[open..];
    while !rest.is_empty() {
        let Some(close) = rest.find(']') else {
            return (key.to_string(), Vec::new());
        };
        if !rest.starts_with('[') {
            return (key.to_string(), Vec::new());
        }
        let name = &rest[1..close];
        parts.push(if name.is_empty() {
            Part::Push
        } else {
            Part::Key(name.to_string())
        });
        rest = &rest[close + 1..];
    }

    (key[..open].to_string(), parts)
}

fn assign(slot: &mut Value, parts: &[Part], value: String) {
    match parts.split_first() {
        None => *slot = Value::String(value),
        Some((Part::Push, rest)) => {
            if !slot.is_array() {
                *slot = Value::Array(Vec::new());
            }
            if let Value::Array(items) = slot {
                let mut item = Value::Null;
                assign(&mut item, rest, value);
                items.push(item);
            }
        }
        Some((Part::Key(key), rest)) => {
            if !slot.is_object() {
                *slot = Value::Object(JsonMap::new());
            }
            if let Value::Object(map) = slot {
                let child = map.entry(key.clone()).or_insert(Value::Null);
                assign(child, rest, value);
            }
        }
    }
}
