//! Dotted-path reads and writes over JSON documents.
//!
//! Reads follow object keys and, for numeric segments, array indices. Writes
//! build intermediate objects lazily: any segment that is missing, or that
//! holds a non-container value, is replaced with an empty object before the
//! walk continues. This is why compiled path mappings must be applied
//! shallow-to-deep.

use serde_json::{Map, Value};

/// Split a dotted path into its segments.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.')
}

/// Read the value at `path`, if every segment resolves.
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    segments(path).try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|idx| items.get(idx)),
        _ => None,
    })
}

/// Write `new` at `path`, creating intermediate objects on demand.
///
/// Returns `true` when the stored value changed.
pub fn set_path(target: &mut Value, path: &str, new: Value) -> bool {
    let mut parts = segments(path).peekable();
    let mut current = target;

    while let Some(segment) = parts.next() {
        let index = array_index(current, segment);

        if parts.peek().is_none() {
            return match (current, index) {
                (Value::Array(items), Some(idx)) => {
                    let changed = items[idx] != new;
                    items[idx] = new;
                    changed
                }
                (other, _) => {
                    let map = as_object(other);
                    let changed = map.get(segment) != Some(&new);
                    map.insert(segment.to_string(), new);
                    changed
                }
            };
        }

        current = match (current, index) {
            (Value::Array(items), Some(idx)) => &mut items[idx],
            (other, _) => as_object(other)
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
        };
    }

    false
}

fn array_index(value: &Value, segment: &str) -> Option<usize> {
    match value {
        Value::Array(items) => segment.parse::<usize>().ok().filter(|idx| *idx < items.len()),
        _ => None,
    }
}

/// Coerce `value` into an object, discarding whatever it held before.
fn as_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced with an object"),
    }
}
