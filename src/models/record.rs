// src/models/record.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The data object a field is displayed for.
///
/// Lookups for keys the record does not have return `None`; they never fail.
pub trait HostRecord {
    fn get(&self, key: &str) -> Option<Value>;

    /// The value under `key` coerced to display text.
    fn get_string(&self, key: &str) -> String {
        coerce_to_string(self.get(key))
    }
}

/// A JSON-backed host record.
///
/// Keys may be dot-separated paths (`author.name`, `tags.0`) that walk
/// nested objects and arrays. A literal key containing dots wins over the
/// path interpretation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy in tests and fixtures.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Non-object values become an empty record.
impl From<Value> for Record {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }
}

impl HostRecord for Record {
    fn get(&self, key: &str) -> Option<Value> {
        lookup(&self.0, key)
    }
}

impl HostRecord for Map<String, Value> {
    fn get(&self, key: &str) -> Option<Value> {
        lookup(self, key)
    }
}

impl HostRecord for Value {
    fn get(&self, key: &str) -> Option<Value> {
        match self {
            Value::Object(map) => lookup(map, key),
            _ => None,
        }
    }
}

impl HostRecord for HashMap<String, Value> {
    fn get(&self, key: &str) -> Option<Value> {
        self.get(key).cloned()
    }
}

fn lookup(map: &Map<String, Value>, key: &str) -> Option<Value> {
    if let Some(value) = map.get(key) {
        return Some(value.clone());
    }
    if !key.contains('.') {
        return None;
    }

    let mut segments = key.split('.');
    let mut current = map.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(inner) => inner.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current.clone())
}

/// Coerces a looked-up or computed value into display text.
///
/// Absent and `null` become `""`, never the text `"null"`.
pub fn coerce_to_string(value: Option<Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(Value::Bool(true)) => "1".to_string(),
        Some(Value::Bool(false)) => String::new(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_key_is_absent() {
        let record = Record::new().with("title", "Hello");
        assert_eq!(record.get("body"), None);
        assert_eq!(record.get("title.length"), None);
    }

    #[test]
    fn dot_paths_walk_objects_and_arrays() {
        let record = Record::from(json!({
            "author": { "name": "Ada" },
            "tags": ["rust", "html"],
        }));
        assert_eq!(record.get("author.name"), Some(json!("Ada")));
        assert_eq!(record.get("tags.1"), Some(json!("html")));
        assert_eq!(record.get("tags.9"), None);
        assert_eq!(record.get("tags.first"), None);
    }

    #[test]
    fn literal_dotted_key_wins() {
        let record = Record::from(json!({ "a.b": "flat", "a": { "b": "nested" } }));
        assert_eq!(record.get("a.b"), Some(json!("flat")));
    }

    #[test]
    fn hash_map_records_do_not_walk_paths() {
        let mut record = HashMap::new();
        record.insert("a".to_string(), json!({ "b": 1 }));
        assert_eq!(HostRecord::get(&record, "a.b"), None);
    }

    #[test]
    fn coercion_rules() {
        assert_eq!(coerce_to_string(None), "");
        assert_eq!(coerce_to_string(Some(Value::Null)), "");
        assert_eq!(coerce_to_string(Some(json!("<b>x</b>"))), "<b>x</b>");
        assert_eq!(coerce_to_string(Some(json!(42))), "42");
        assert_eq!(coerce_to_string(Some(json!(1.5))), "1.5");
        assert_eq!(coerce_to_string(Some(json!(true))), "1");
        assert_eq!(coerce_to_string(Some(json!(false))), "");
        assert_eq!(coerce_to_string(Some(json!([1, 2]))), "[1,2]");
    }
}
