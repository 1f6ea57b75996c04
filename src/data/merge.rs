//! Data cascade merging.
//!
//! Sources are merged into a fresh value; no source is ever mutated.
//! Under deep merge, nested objects merge key-wise and arrays replace.
//! A later source can opt out of merging for one key by writing it as
//! `override:name`, which replaces `name` wholesale.

use serde_json::{Map, Value};

/// Key prefix that forces replacement instead of a deep merge.
pub const OVERRIDE_PREFIX: &str = "override:";

/// Merge sources in precedence order (later wins) into a new object.
///
/// Non-object sources are ignored.
pub fn merge_all<'a>(sources: impl IntoIterator<Item = &'a Value>, deep: bool) -> Value {
    let mut merged = Map::new();
    for source in sources {
        if let Value::Object(map) = source {
            merge_into(&mut merged, map, deep);
        }
    }
    Value::Object(merged)
}

/// Merge `source` into `target`.
pub fn merge_into(target: &mut Map<String, Value>, source: &Map<String, Value>, deep: bool) {
    for (key, value) in source {
        if !deep {
            target.insert(key.clone(), value.clone());
            continue;
        }

        if let Some(name) = key.strip_prefix(OVERRIDE_PREFIX) {
            target.insert(name.to_owned(), strip_overrides(value));
            continue;
        }

        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_into(existing, incoming, deep);
            }
            _ => {
                target.insert(key.clone(), strip_overrides(value));
            }
        }
    }
}

/// Clone `value`, removing `override:` prefixes from nested keys.
fn strip_overrides(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| {
                    let key = key.strip_prefix(OVERRIDE_PREFIX).unwrap_or(key);
                    (key.to_owned(), strip_overrides(value))
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(strip_overrides).collect()),
        other => other.clone(),
    }
}
