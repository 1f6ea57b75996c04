//! Dotted key paths over JSON data (`page.url`, `pagination.items.0`).

use serde_json::{Map, Value};

/// Look up a dotted path. Numeric segments index into arrays.
pub fn get_path<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(data);
    }
    path.split('.').try_fold(data, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// `true` when the path resolves to a non-null value.
#[inline]
pub fn has_path(data: &Value, path: &str) -> bool {
    get_path(data, path).is_some_and(|v| !v.is_null())
}

/// Set a dotted path, creating intermediate containers as needed.
///
/// A numeric segment indexes an array only when it is in bounds or appends
/// one item; any other segment, including a larger index, is an object key.
/// An array that needs such a key becomes an object keyed by position, so
/// every earlier path still resolves.
pub fn set_path(data: &mut Value, path: &str, value: Value) {
    match path.split_once('.') {
        None => *slot(data, path) = value,
        Some((head, rest)) => set_path(slot(data, head), rest, value),
    }
}

/// The slot `segment` names in `data`, turning `data` into a fitting
/// container first.
fn slot<'a>(data: &'a mut Value, segment: &str) -> &'a mut Value {
    let index = segment.parse::<usize>().ok();
    let fits = match data {
        Value::Object(_) => true,
        Value::Array(items) => index.is_some_and(|i| i <= items.len()),
        _ => false,
    };
    if !fits {
        *data = match (std::mem::take(data), index) {
            (Value::Array(items), _) => Value::Object(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| (i.to_string(), item))
                    .collect(),
            ),
            (_, Some(0)) => Value::Array(Vec::new()),
            _ => Value::Object(Map::new()),
        };
    }

    match data {
        Value::Array(items) => {
            let index = index.unwrap_or_default();
            if index == items.len() {
                items.push(Value::Null);
            }
            &mut items[index]
        }
        Value::Object(map) => map.entry(segment.to_owned()).or_insert(Value::Null),
        other => other,
    }
}

/// Copy only the given paths into a fresh object (reporting selectors).
pub fn select_paths(data: &Value, paths: &[String]) -> Value {
    let mut selected = Value::Object(Map::new());
    for path in paths {
        if let Some(value) = get_path(data, path) {
            set_path(&mut selected, path, value.clone());
        }
    }
    selected
}
