//! The unified request value handed to routines.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_json::Value;

/// A query or form value: one string, or every string when the key repeats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Single(String),
    Multiple(Vec<String>),
}

impl FieldValue {
    fn push(&mut self, value: String) {
        match self {
            FieldValue::Single(first) => {
                let first = std::mem::take(first);
                *self = FieldValue::Multiple(vec![first, value]);
            }
            FieldValue::Multiple(values) => values.push(value),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Single(value.to_string())
    }
}

impl From<Vec<&str>> for FieldValue {
    fn from(values: Vec<&str>) -> Self {
        FieldValue::Multiple(values.into_iter().map(str::to_string).collect())
    }
}

/// Ordered multi-map of string parameters.
///
/// Keys keep the order they were first seen in; a repeated key promotes its
/// value to a list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(String, FieldValue)>,
    /// Key → position in `entries`.
    index: HashMap<String, usize>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.index.get(&key) {
            Some(&position) => self.entries[position].1.push(value),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, FieldValue::Single(value)));
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.index
            .get(key)
            .map(|&position| &self.entries[position].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One uploaded file from a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Everything a routine can know about the request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnifiedRequest {
    pub method: String,
    /// Path as received, still percent-encoded.
    pub raw_path: String,
    /// Percent-decoded path.
    pub path: String,
    pub query: Params,
    /// Lower-cased header names; repeated headers joined with ", ".
    pub headers: BTreeMap<String, String>,
    /// Media type without parameters, lower-cased.
    pub content_type: String,
    pub body: Vec<u8>,
    pub text: Option<String>,
    pub json: Option<Value>,
    pub form: Params,
    pub files: BTreeMap<String, UploadedFile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_keys_promote_to_list() {
        let mut params = Params::new();
        params.append("tag", "x");
        params.append("name", "n");
        params.append("tag", "y");
        params.append("tag", "z");

        assert_eq!(params.get("tag"), Some(&FieldValue::from(vec!["x", "y", "z"])));
        assert_eq!(params.get("name"), Some(&FieldValue::from("n")));
        let keys: Vec<_> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["tag", "name"]);
    }

    #[test]
    fn test_field_value_serializes_untagged() {
        let single = serde_json::to_value(FieldValue::from("a")).unwrap();
        let multiple = serde_json::to_value(FieldValue::from(vec!["a", "b"])).unwrap();
        assert_eq!(single, serde_json::json!("a"));
        assert_eq!(multiple, serde_json::json!(["a", "b"]));
    }
}
