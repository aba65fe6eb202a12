//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Attribute bags.
//!
//! Endpoint descriptions and capabilities carry [`Properties`]: string keys
//! mapped to scalar, array or list [`PropertyValue`]s. Keys keep the case
//! they were inserted with but are looked up case-insensitively, which is
//! what filters expect.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A property value.
///
/// `Array` and `List` are both sequences; they are kept apart so that a
/// description survives a JSON round trip unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum PropertyValue {
    /// Text.
    String(String),
    /// 64-bit integer.
    Long(i64),
    /// 64-bit float.
    Double(f64),
    /// Boolean.
    Boolean(bool),
    /// Fixed sequence.
    Array(Vec<PropertyValue>),
    /// Growable sequence.
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    /// Builds an array of strings.
    pub fn strings<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PropertyValue::Array(
            items
                .into_iter()
                .map(|s| PropertyValue::String(s.into()))
                .collect(),
        )
    }

    /// Returns the text of a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the elements of an array or list.
    pub fn elements(&self) -> Option<&[PropertyValue]> {
        match self {
            PropertyValue::Array(items) | PropertyValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the string elements of a sequence, or the value itself if it
    /// is a single string.
    pub fn string_items(&self) -> Vec<&str> {
        match self {
            PropertyValue::String(s) => vec![s.as_str()],
            PropertyValue::Array(items) | PropertyValue::List(items) => {
                items.iter().filter_map(PropertyValue::as_str).collect()
            }
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => f.write_str(s),
            PropertyValue::Long(v) => write!(f, "{v}"),
            PropertyValue::Double(v) => write!(f, "{v}"),
            PropertyValue::Boolean(v) => write!(f, "{v}"),
            PropertyValue::Array(items) | PropertyValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Long(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Long(i64::from(value))
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Double(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

/// Read access to named attributes, as used by filter matching.
pub trait AttributeSource {
    /// Looks up `key` ignoring ASCII case.
    fn attribute(&self, key: &str) -> Option<&PropertyValue>;
}

/// An ordered attribute bag with case-insensitive lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties(BTreeMap<String, PropertyValue>);

impl Properties {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a property and returns the bag.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets a property, replacing any key that differs only in case.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        let key = key.into();
        self.remove(&key);
        self.0.insert(key, value.into());
    }

    /// Removes a property, ignoring case.
    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        let existing = self.0.keys().find(|k| k.eq_ignore_ascii_case(key))?.clone();
        self.0.remove(&existing)
    }

    /// Looks up a property, ignoring case.
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.0
            .get(key)
            .or_else(|| {
                self.0
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(key))
                    .map(|(_, v)| v)
            })
    }

    /// Returns `true` if a property exists under `key` in any case.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Copies every property of `other` into this bag.
    pub fn extend(&mut self, other: &Properties) {
        for (key, value) in other.iter() {
            self.insert(key.clone(), value.clone());
        }
    }

    /// Iterates properties in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.0.iter()
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the bag is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AttributeSource for Properties {
    fn attribute(&self, key: &str) -> Option<&PropertyValue> {
        self.get(key)
    }
}

impl<K: Into<String>, V: Into<PropertyValue>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut properties = Properties::new();
        for (key, value) in iter {
            properties.insert(key, value);
        }
        properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_lookup() {
        let mut properties = Properties::new().with("Region", "east");
        assert_eq!(properties.get("region"), Some(&PropertyValue::from("east")));
        properties.insert("REGION", "west");
        assert_eq!(properties.len(), 1);
        assert_eq!(properties.get("Region").and_then(PropertyValue::as_str), Some("west"));
        assert!(properties.remove("region").is_some());
        assert!(properties.is_empty());
    }

    #[test]
    fn test_json_keeps_kinds_apart() {
        let properties = Properties::new()
            .with("a", PropertyValue::strings(["x", "y"]))
            .with("l", PropertyValue::List(vec![1i64.into(), 2.5f64.into()]))
            .with("b", true);
        let json = serde_json::to_string(&properties).unwrap();
        assert!(json.contains(r#""type":"Array""#));
        assert!(json.contains(r#""type":"List""#));
        let decoded: Properties = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, properties);
    }

    #[test]
    fn test_string_items() {
        assert_eq!(PropertyValue::from("a").string_items(), vec!["a"]);
        assert_eq!(
            PropertyValue::List(vec!["a".into(), 3i64.into(), "b".into()]).string_items(),
            vec!["a", "b"]
        );
        assert!(PropertyValue::Long(1).string_items().is_empty());
        assert_eq!(PropertyValue::strings(["x", "y"]).to_string(), "[x, y]");
    }
}
