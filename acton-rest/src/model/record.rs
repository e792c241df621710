//! JSON-object records exchanged with a model store

use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single row, represented as a JSON object
///
/// Nested includes are stored under their association alias, either as an
/// object (single associations) or as an array (collection associations).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build a record from a JSON value, returning `None` unless it is an object
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Insert a value, returning `self` for chaining
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Copy every key from `other` that is not already present
    pub fn merge_defaults(&mut self, other: &Map<String, Value>) {
        for (key, value) in other {
            if !self.0.contains_key(key) {
                self.0.insert(key.clone(), value.clone());
            }
        }
    }

    /// Remove each of the given keys
    pub fn strip<S: AsRef<str>>(&mut self, keys: &[S]) {
        for key in keys {
            self.0.remove(key.as_ref());
        }
    }

    /// The value of `key` rendered the way it would appear in a URL
    pub fn display_value(&self, key: &str) -> String {
        match self.0.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    /// Borrow the underlying map
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume the record, returning the underlying map
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Consume the record, returning a JSON object value
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl Deref for Record {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Record {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_requires_object() {
        assert!(Record::from_json(json!({"id": 1})).is_some());
        assert!(Record::from_json(json!([1, 2])).is_none());
        assert!(Record::from_json(Value::Null).is_none());
    }

    #[test]
    fn test_merge_defaults_keeps_existing_values() {
        let mut record = Record::new().with("fav_color", "blue");
        let body = json!({"fav_color": "red", "username": "arthur"});
        if let Value::Object(map) = body {
            record.merge_defaults(&map);
        }
        assert_eq!(record["fav_color"], json!("blue"));
        assert_eq!(record["username"], json!("arthur"));
    }

    #[test]
    fn test_display_value() {
        let record = Record::new()
            .with("id", 7)
            .with("slug", "abc")
            .with("gone", Value::Null);
        assert_eq!(record.display_value("id"), "7");
        assert_eq!(record.display_value("slug"), "abc");
        assert_eq!(record.display_value("gone"), "");
        assert_eq!(record.display_value("missing"), "");
    }

    #[test]
    fn test_serializes_transparently() {
        let record = Record::new().with("id", 1);
        assert_eq!(serde_json::to_value(&record).unwrap(), json!({"id": 1}));
    }
}
