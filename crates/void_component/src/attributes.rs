//! Attribute maps and per-definition attribute defaults
//!
//! Defaults are contributed by the base and each mixin while a definition is
//! built. A key may be contributed by exactly one contribution ("protected
//! mode"). A `null` default marks an attribute as required.

use std::collections::{BTreeMap, HashMap};
use serde::{Serialize, Deserialize};
use serde_json::Value;

use crate::error::{ComponentError, ComponentResult};

/// Name to value attribute map
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, Value>);

impl Attributes {
    /// Create an empty map
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Insert a value, returning the previous one
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<serde_json::Map<String, Value>> for Attributes {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        Self(map.into_iter().collect())
    }
}

impl IntoIterator for Attributes {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// A required attribute has no default
pub fn is_required(value: &Value) -> bool {
    value.is_null()
}

/// One default contributed by a source
#[derive(Debug, Clone, PartialEq)]
pub struct AttrDefault {
    /// Attribute name
    pub name: String,
    /// Default value (`Null` = required)
    pub value: Value,
    /// Name of the contributing source
    pub source: String,
}

/// Merged defaults of a definition, in declaration order
#[derive(Debug, Clone, Default)]
pub struct AttributeDefaults {
    entries: Vec<AttrDefault>,
    index: HashMap<String, usize>,
}

impl AttributeDefaults {
    /// Merge contributions in order, rejecting any key contributed twice
    pub(crate) fn merge(contributions: Vec<AttrDefault>) -> ComponentResult<Self> {
        let mut merged = Self::default();

        for entry in contributions {
            if let Some(&existing) = merged.index.get(&entry.name) {
                return Err(ComponentError::DefinitionConflict {
                    key: entry.name,
                    contributor: entry.source,
                    existing_contributor: merged.entries[existing].source.clone(),
                });
            }
            merged.index.insert(entry.name.clone(), merged.entries.len());
            merged.entries.push(entry);
        }

        Ok(merged)
    }

    /// Default value for an attribute
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.index.get(name).map(|&i| &self.entries[i].value)
    }

    /// Name of the source that declared an attribute
    pub fn source_of(&self, name: &str) -> Option<&str> {
        self.index.get(name).map(|&i| self.entries[i].source.as_str())
    }

    /// Whether an attribute is declared with the required marker
    pub fn is_required(&self, name: &str) -> bool {
        self.get(name).is_some_and(is_required)
    }

    /// Required attribute names, in declaration order
    pub fn required(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| is_required(&e.value))
            .map(|e| e.name.as_str())
    }

    /// Optional attribute names, in declaration order
    pub fn optional(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| !is_required(&e.value))
            .map(|e| e.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttrDefault> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Defaults overlaid by caller values. Caller values always win.
    pub fn resolve(&self, overrides: &Attributes) -> Attributes {
        let mut resolved: Attributes = self
            .entries
            .iter()
            .map(|e| (e.name.clone(), e.value.clone()))
            .collect();

        for (name, value) in overrides.iter() {
            resolved.insert(name, value.clone());
        }

        resolved
    }

    /// First attribute still holding the required marker: declared
    /// attributes in declaration order, then caller-only attributes.
    pub fn first_unresolved<'a>(&'a self, resolved: &'a Attributes) -> Option<&'a str> {
        let declared = self
            .entries
            .iter()
            .map(|e| e.name.as_str())
            .find(|name| resolved.get(name).map_or(true, is_required));

        declared.or_else(|| {
            resolved
                .iter()
                .find(|(name, value)| !self.index.contains_key(*name) && is_required(value))
                .map(|(name, _)| name)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn contribution(name: &str, value: Value, source: &str) -> AttrDefault {
        AttrDefault {
            name: name.into(),
            value,
            source: source.into(),
        }
    }

    #[test]
    fn test_attributes_builder() {
        let attrs = Attributes::new().with("a", 1).with("b", "two");
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.get("a"), Some(&json!(1)));
        assert!(attrs.contains("b"));
        assert!(!attrs.contains("c"));
    }

    #[test]
    fn test_attributes_serde_transparent() {
        let attrs: Attributes = serde_json::from_value(json!({"core": 35})).unwrap();
        assert_eq!(attrs.get("core"), Some(&json!(35)));
        assert_eq!(serde_json::to_value(&attrs).unwrap(), json!({"core": 35}));
    }

    #[test]
    fn test_merge_disjoint() {
        let defaults = AttributeDefaults::merge(vec![
            contribution("core", json!(35), "base"),
            contribution("extra", json!(38), "withGoodDefaults"),
        ])
        .unwrap();

        assert_eq!(defaults.len(), 2);
        assert_eq!(defaults.get("extra"), Some(&json!(38)));
        assert_eq!(defaults.source_of("extra"), Some("withGoodDefaults"));
    }

    #[test]
    fn test_merge_conflict() {
        let result = AttributeDefaults::merge(vec![
            contribution("core", json!(35), "base"),
            contribution("core", json!(38), "withBadDefaults"),
        ]);

        match result {
            Err(ComponentError::DefinitionConflict { key, contributor, existing_contributor }) => {
                assert_eq!(key, "core");
                assert_eq!(contributor, "withBadDefaults");
                assert_eq!(existing_contributor, "base");
            }
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[test]
    fn test_required_and_optional() {
        let defaults = AttributeDefaults::merge(vec![
            contribution("req", Value::Null, "base"),
            contribution("opt", json!("x"), "base"),
            contribution("also_req", Value::Null, "mixin"),
        ])
        .unwrap();

        assert_eq!(defaults.required().collect::<Vec<_>>(), vec!["req", "also_req"]);
        assert_eq!(defaults.optional().collect::<Vec<_>>(), vec!["opt"]);
        assert!(defaults.is_required("req"));
        assert!(!defaults.is_required("opt"));
        assert!(!defaults.is_required("unknown"));
    }

    #[test]
    fn test_resolve_overlay() {
        let defaults = AttributeDefaults::merge(vec![
            contribution("core", json!(35), "base"),
            contribution("req", Value::Null, "base"),
        ])
        .unwrap();

        let resolved = defaults.resolve(&Attributes::new().with("core", 1).with("req", "hello"));
        assert_eq!(resolved.get("core"), Some(&json!(1)));
        assert_eq!(resolved.get("req"), Some(&json!("hello")));
        assert_eq!(defaults.first_unresolved(&resolved), None);
    }

    #[test]
    fn test_first_unresolved_declaration_order() {
        let defaults = AttributeDefaults::merge(vec![
            contribution("zeta", Value::Null, "base"),
            contribution("alpha", Value::Null, "base"),
        ])
        .unwrap();

        let resolved = defaults.resolve(&Attributes::new());
        assert_eq!(defaults.first_unresolved(&resolved), Some("zeta"));

        // Explicit null from the caller does not satisfy a requirement
        let resolved = defaults.resolve(&Attributes::new().with("zeta", 1).with("alpha", Value::Null));
        assert_eq!(defaults.first_unresolved(&resolved), Some("alpha"));
    }

    #[test]
    fn test_first_unresolved_caller_only_null() {
        let defaults = AttributeDefaults::default();
        let resolved = defaults.resolve(&Attributes::new().with("loose", Value::Null));
        assert_eq!(defaults.first_unresolved(&resolved), Some("loose"));
    }
}
