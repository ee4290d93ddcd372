//! Schema-free records
//!
//! A `Record` is an ordered list of named fields holding one of four value kinds.
//! Records come straight out of the export JSON, so deserialization keeps the
//! field order of each object.

use serde::Deserialize;
use std::cmp::Ordering;
use std::fmt;

/// A single field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    TextList(Vec<String>),
}

impl Value {
    /// Convert a JSON value from the export. `null` yields `None` so the field is dropped.
    pub fn from_json(json: serde_json::Value) -> Option<Value> {
        use serde_json::Value as Json;

        let value = match json {
            Json::Null => return None,
            Json::String(s) => Value::Text(s),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::Array(items) if items.iter().all(|i| i.is_string()) => Value::TextList(
                items
                    .into_iter()
                    .filter_map(|i| match i {
                        Json::String(s) => Some(s),
                        _ => None,
                    })
                    .collect(),
            ),
            // Nested structures (e.g. annotations) are kept as compact JSON text
            other => Value::Text(other.to_string()),
        };
        Some(value)
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Integer(_) | Value::Float(_) => 0,
            Value::Text(_) => 1,
            Value::TextList(_) => 2,
        }
    }

    /// Ascending order used by the store's sort key.
    ///
    /// Numbers compare numerically across integer and float, text and lists
    /// lexicographically; mixed kinds order numbers < text < lists.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Integer(a), Value::Float(b)) => (*a as f64).total_cmp(b),
            (Value::Float(a), Value::Integer(b)) => a.total_cmp(&(*b as f64)),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::TextList(a), Value::TextList(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Generic display conversion, used when a column has no translation
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{}", s),
            Value::Integer(i) => write!(f, "{}", i),
            // Debug keeps the decimal point of whole floats: 9.0, not 9
            Value::Float(x) => write!(f, "{:?}", x),
            Value::TextList(items) => write!(f, "{}", items.join(", ")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::TextList(items)
    }
}

/// A mapping from field name to value, in first-seen field order
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "serde_json::Map<String, serde_json::Value>")]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Builder-style insert
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or overwrite a field. New fields go to the end.
    pub fn insert(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| k == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Field names in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn first_key(&self) -> Option<&str> {
        self.fields.first().map(|(k, _)| k.as_str())
    }
}

/// Identical field sets compare equal regardless of field order
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|o| o == v))
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Record {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        let fields = map
            .into_iter()
            .filter_map(|(k, v)| Value::from_json(v).map(|v| (k, v)))
            .collect();
        Self { fields }
    }
}

/// Parse an export: a JSON array of flat objects
pub fn parse_records(bytes: &[u8]) -> Result<Vec<Record>, serde_json::Error> {
    serde_json::from_slice(bytes)
}
