//! Dotted/bracketed field-path resolution over JSON values
//!
//! Supports object field access (`field.subfield`), array indexing
//! (`[0]`), and combinations (`data.items[0].name`). Missing segments
//! resolve to `None`; resolution never panics.

use serde_json::Value;

/// Resolve a field path against a JSON value
///
/// An empty path resolves to the value itself.
pub fn resolve_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }

    let mut current = value;
    let mut remaining = path;

    while !remaining.is_empty() {
        if let Some(rest) = remaining.strip_prefix('[') {
            let end = rest.find(']')?;
            let index: usize = rest[..end].parse().ok()?;
            current = current.get(index)?;
            remaining = &rest[end + 1..];
            if let Some(after_dot) = remaining.strip_prefix('.') {
                remaining = after_dot;
            }
            continue;
        }

        let (field, rest) = split_segment(remaining);
        if !field.is_empty() {
            current = current.get(field)?;
        }
        remaining = rest;
    }

    Some(current)
}

/// Write a value at a field path, creating intermediate objects
///
/// Dotted segments create nested objects as needed; bracket indices only
/// write into arrays that already exist and are long enough. Returns
/// false if the path could not be written.
pub fn set_path(value: &mut Value, path: &str, new_value: Value) -> bool {
    if path.is_empty() {
        *value = new_value;
        return true;
    }

    let mut current = value;
    let mut remaining = path;

    loop {
        if let Some(rest) = remaining.strip_prefix('[') {
            let Some(end) = rest.find(']') else {
                return false;
            };
            let Ok(index) = rest[..end].parse::<usize>() else {
                return false;
            };
            let after = rest[end + 1..].strip_prefix('.').unwrap_or(&rest[end + 1..]);
            let Some(slot) = current.get_mut(index) else {
                return false;
            };
            if after.is_empty() {
                *slot = new_value;
                return true;
            }
            current = slot;
            remaining = after;
            continue;
        }

        let (field, rest) = split_segment(remaining);
        if field.is_empty() {
            return false;
        }

        if current.is_null() {
            *current = Value::Object(serde_json::Map::new());
        }
        let Value::Object(map) = current else {
            return false;
        };

        if rest.is_empty() {
            map.insert(field.to_string(), new_value);
            return true;
        }

        current = map
            .entry(field.to_string())
            .or_insert(Value::Object(serde_json::Map::new()));
        remaining = rest;
    }
}

/// Split the next object-field segment from a path
fn split_segment(path: &str) -> (&str, &str) {
    let dot = path.find('.');
    let bracket = path.find('[');
    match (dot, bracket) {
        (Some(d), Some(b)) if d < b => (&path[..d], &path[d + 1..]),
        (Some(_) | None, Some(b)) => (&path[..b], &path[b..]),
        (Some(d), None) => (&path[..d], &path[d + 1..]),
        (None, None) => (path, ""),
    }
}
