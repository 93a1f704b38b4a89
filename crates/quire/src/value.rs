// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Template context values.
//!
//! Config (TOML), front matter (YAML) and pandoc metadata all funnel into
//! this one tree before reaching a template. Contexts are built by the host
//! and may hold [`Lambda`]s, which is exactly what the sandbox refuses to
//! expose.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub type Map = BTreeMap<String, Value>;

/// A host closure reachable from a template context.
#[derive(Clone)]
pub struct Lambda(Arc<dyn Fn(&str) -> String + Send + Sync>);

impl Lambda {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self(Arc::new(func))
    }

    pub fn call(&self, text: &str) -> String {
        (self.0)(text)
    }
}

impl fmt::Debug for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Lambda(..)")
    }
}

#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(Map),
    Lambda(Lambda),
}

impl Value {
    pub fn map() -> Self {
        Value::Map(Map::new())
    }

    /// Mustache section truthiness: empty strings, zero, empty lists and
    /// empty maps do not render.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
            Value::Lambda(_) => true,
        }
    }

    /// Text used when the value is interpolated with `{{name}}`.
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Value::Null | Value::Map(_) | Value::Lambda(_) => Cow::Borrowed(""),
            Value::Bool(b) => Cow::Owned(b.to_string()),
            Value::Int(i) => Cow::Owned(i.to_string()),
            Value::Float(f) => Cow::Owned(f.to_string()),
            Value::Str(s) => Cow::Borrowed(s),
            Value::List(items) => Cow::Owned(
                items
                    .iter()
                    .map(|v| v.to_text().into_owned())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Integer view of numbers and numeric strings (`toc_header_level = "2"`).
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) => Some(*f as i64),
            Value::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Insert into a map value; non-map values are left untouched.
    pub fn insert<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) {
        if let Value::Map(map) = self {
            map.insert(key.into(), value.into());
        }
    }

    /// Shallow overlay: keys of `other` replace keys of `self`.
    pub fn overlay(&mut self, other: &Map) {
        if let Value::Map(map) = self {
            for (k, v) in other {
                map.insert(k.clone(), v.clone());
            }
        }
    }

    pub fn from_toml(value: &toml::Value) -> Self {
        match value {
            toml::Value::String(s) => Value::Str(s.clone()),
            toml::Value::Integer(i) => Value::Int(*i),
            toml::Value::Float(f) => Value::Float(*f),
            toml::Value::Boolean(b) => Value::Bool(*b),
            toml::Value::Datetime(d) => Value::Str(d.to_string()),
            toml::Value::Array(items) => Value::List(items.iter().map(Value::from_toml).collect()),
            toml::Value::Table(table) => Value::Map(map_from_toml(table)),
        }
    }

    pub fn from_yaml(value: &serde_yaml_ng::Value) -> Self {
        use serde_yaml_ng::Value as Yaml;
        match value {
            Yaml::Null => Value::Null,
            Yaml::Bool(b) => Value::Bool(*b),
            Yaml::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            Yaml::String(s) => Value::Str(s.clone()),
            Yaml::Sequence(items) => Value::List(items.iter().map(Value::from_yaml).collect()),
            Yaml::Mapping(mapping) => Value::Map(
                mapping
                    .iter()
                    .filter_map(|(k, v)| {
                        let key = match k {
                            Yaml::String(s) => s.clone(),
                            Yaml::Number(n) => n.to_string(),
                            Yaml::Bool(b) => b.to_string(),
                            _ => return None,
                        };
                        Some((key, Value::from_yaml(v)))
                    })
                    .collect(),
            ),
            Yaml::Tagged(tagged) => Value::from_yaml(&tagged.value),
        }
    }
}

pub fn map_from_toml(table: &toml::Table) -> Map {
    table
        .iter()
        .map(|(k, v)| (k.clone(), Value::from_toml(v)))
        .collect()
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Value::Int(i64::try_from(i).unwrap_or(i64::MAX))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(map)
    }
}

impl From<Lambda> for Value {
    fn from(lambda: Lambda) -> Self {
        Value::Lambda(lambda)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::from("x").is_truthy());
        assert!(Value::Lambda(Lambda::new(|s| s.to_string())).is_truthy());
    }

    #[test]
    fn test_from_toml() {
        let table: toml::Table = toml::from_str(
            r#"
title = "Report"
level = 2
[client]
name = "ACME"
"#,
        )
        .expect("toml");
        let value = Value::Map(map_from_toml(&table));
        assert_eq!(value.get("title").and_then(Value::as_str), Some("Report"));
        assert_eq!(value.get("level").and_then(Value::as_int), Some(2));
        assert_eq!(
            value
                .get("client")
                .and_then(|c| c.get("name"))
                .and_then(Value::as_str),
            Some("ACME")
        );
    }

    #[test]
    fn test_from_yaml() {
        let yaml: serde_yaml_ng::Value =
            serde_yaml_ng::from_str("title: Scope\ntags: [a, b]\ncount: 3\n").expect("yaml");
        let value = Value::from_yaml(&yaml);
        assert_eq!(value.get("title").and_then(Value::as_str), Some("Scope"));
        assert_eq!(value.get("tags").map(|t| t.to_text().into_owned()), Some("a, b".to_string()));
        assert_eq!(value.get("count").and_then(Value::as_int), Some(3));
    }

    #[test]
    fn test_as_int_from_string() {
        assert_eq!(Value::from("2").as_int(), Some(2));
        assert_eq!(Value::from("two").as_int(), None);
    }
}
