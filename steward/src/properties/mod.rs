//! Ordered, layered key/value property sets.
//!
//! [`Properties`] is the currency passed to module boot, provider
//! persistence and catalog assembly. A set may sit on top of a parent layer:
//! lookups fall through to the parent, writes always land in the top layer.
//! This is how caller-supplied boot attributes are kept out of a persisted
//! service descriptor: the registry wraps them in a fresh layer, and only that
//! layer's non-runtime entries are written back.

mod source;

pub use source::{
    parse_properties, read_properties, write_properties, PropertiesError, PropertySource,
    SourceKind,
};

use std::sync::Arc;

use crate::config::property_keys::is_runtime_key;

/// Ordered property set with an optional read-only parent layer.
#[derive(Debug, Clone, Default)]
pub struct Properties {
    entries: Vec<(String, String)>,
    parent: Option<Arc<Properties>>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty set whose lookups fall through to `parent`.
    pub fn layered(parent: Arc<Properties>) -> Self {
        Self {
            entries: Vec::new(),
            parent: Some(parent),
        }
    }

    /// Value for `key`, consulting parent layers on a miss.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_local(key)
            .or_else(|| self.parent.as_deref().and_then(|p| p.get(key)))
    }

    /// Value for `key` in this layer only.
    pub fn get_local(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// `true` only when the value is `true`, ignoring case and whitespace.
    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// Set `key` in this layer, keeping its original position if present.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Remove `key` from this layer.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    /// Entries of this layer in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries in this layer.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn parent(&self) -> Option<&Arc<Properties>> {
        self.parent.as_ref()
    }

    /// Single-layer copy with parent entries first and this layer's
    /// overrides applied on top.
    pub fn flattened(&self) -> Properties {
        let mut flat = match &self.parent {
            Some(parent) => parent.flattened(),
            None => Properties::new(),
        };
        for (k, v) in &self.entries {
            flat.set(k.clone(), v.clone());
        }
        flat
    }

    /// Copy of this layer without runtime-only keys. Parent layers are
    /// not included.
    pub fn without_runtime(&self) -> Properties {
        self.entries
            .iter()
            .filter(|(k, _)| !is_runtime_key(k))
            .cloned()
            .collect()
    }

    /// Local entries whose key starts with `prefix`, with the prefix removed.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.iter()
            .filter_map(move |(k, v)| k.strip_prefix(prefix).map(|rest| (rest, v)))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut props = Properties::new();
        for (k, v) in iter {
            props.set(k, v);
        }
        props
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::property_keys::{DELETE_ON_CREATE, SERVICE_PROTOCOL};

    #[test]
    fn test_set_keeps_insertion_order() {
        let mut props = Properties::new();
        props.set("b", "1");
        props.set("a", "2");
        props.set("b", "3");

        let keys: Vec<_> = props.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a"], "overwrite keeps original position");
        assert_eq!(props.get("b"), Some("3"));
    }

    #[test]
    fn test_layered_lookup_falls_through() {
        let parent = Arc::new(Properties::from_iter([("shared", "parent"), ("only", "p")]));
        let mut child = Properties::layered(parent);
        child.set("shared", "child");

        assert_eq!(child.get("shared"), Some("child"));
        assert_eq!(child.get("only"), Some("p"));
        assert_eq!(child.get_local("only"), None);
        assert_eq!(child.len(), 1);
    }

    #[test]
    fn test_flattened_applies_overrides_in_place() {
        let parent = Arc::new(Properties::from_iter([("x", "1"), ("y", "2")]));
        let mut child = Properties::layered(parent);
        child.set("x", "9");
        child.set("z", "3");

        let flat: Vec<_> = child
            .flattened()
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        assert_eq!(flat, vec!["x=9", "y=2", "z=3"]);
    }

    #[test]
    fn test_without_runtime_keeps_only_local_persistent_keys() {
        let parent = Arc::new(Properties::from_iter([(DELETE_ON_CREATE, "true")]));
        let mut child = Properties::layered(parent);
        child.set(SERVICE_PROTOCOL, "Logger");
        child.set("steward.__rt.serviceRoot", "/tmp/x");

        let persisted = child.without_runtime();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted.get(SERVICE_PROTOCOL), Some("Logger"));
    }

    #[test]
    fn test_get_bool() {
        let props = Properties::from_iter([("a", " TRUE "), ("b", "yes")]);
        assert!(props.get_bool("a"));
        assert!(!props.get_bool("b"), "only 'true' counts");
        assert!(!props.get_bool("missing"));
    }

    #[test]
    fn test_remove_and_prefix() {
        let mut props = Properties::from_iter([
            ("steward.module.a", "impl.a"),
            ("other", "x"),
            ("steward.module.b", "impl.b"),
        ]);
        let tags: Vec<_> = props.with_prefix("steward.module.").map(|(t, _)| t).collect();
        assert_eq!(tags, vec!["a", "b"]);

        assert_eq!(props.remove("other"), Some("x".to_string()));
        assert_eq!(props.remove("other"), None);
    }
}
