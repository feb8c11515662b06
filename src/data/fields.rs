//! Dotted-path field access over untyped JSON
//!
//! ActivityPub documents are read by path and never validated against a
//! schema. `"publicKey.id"` walks object keys, numeric segments index into
//! arrays (`"publicKey.0.id"`). Missing or mistyped fields yield `None`.

use serde_json::{Map, Value};

/// Read-only accessors over a decoded JSON value
pub trait FieldAccess {
    /// Value at a dotted path, if present
    fn field(&self, path: &str) -> Option<&Value>;

    /// String at a dotted path (empty strings count as absent)
    fn str_field(&self, path: &str) -> Option<&str> {
        self.field(path)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }

    fn i64_field(&self, path: &str) -> Option<i64> {
        self.field(path).and_then(Value::as_i64)
    }

    fn bool_field(&self, path: &str) -> Option<bool> {
        self.field(path).and_then(Value::as_bool)
    }

    fn array_field(&self, path: &str) -> Option<&Vec<Value>> {
        self.field(path).and_then(Value::as_array)
    }

    fn is_object_field(&self, path: &str) -> bool {
        self.field(path).is_some_and(Value::is_object)
    }

    /// Link-like field: a plain string, the first string of an array, or
    /// the `id` of an inline object.
    ///
    /// Used for `attributedTo`, `actor` and similar properties that
    /// servers express in all three shapes.
    fn link_field(&self, path: &str) -> Option<&str> {
        match self.field(path)? {
            Value::String(s) if !s.is_empty() => Some(s.as_str()),
            Value::Array(items) => items.iter().find_map(|item| match item {
                Value::String(s) if !s.is_empty() => Some(s.as_str()),
                Value::Object(map) => map.get("id").and_then(Value::as_str),
                _ => None,
            }),
            Value::Object(map) => map
                .get("id")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty()),
            _ => None,
        }
    }
}

fn walk<'a>(mut current: &'a Value, path: &str) -> Option<&'a Value> {
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

impl FieldAccess for Value {
    fn field(&self, path: &str) -> Option<&Value> {
        walk(self, path)
    }
}

impl FieldAccess for Map<String, Value> {
    fn field(&self, path: &str) -> Option<&Value> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let first = self.get(head)?;
        match rest {
            Some(rest) => walk(first, rest),
            None => Some(first),
        }
    }
}
