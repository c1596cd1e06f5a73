//! Entity Registry - one keyed store per entity kind
//!
//! Registries are ordered maps, so every walk over a registry visits entities
//! in ascending identity-key order no matter in which order the dump files
//! were read.

use crate::model::Entity;
use std::collections::BTreeMap;

/// Keyed store for one entity kind
#[derive(Debug, Clone)]
pub struct Registry<T> {
    items: BTreeMap<String, T>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            items: BTreeMap::new(),
        }
    }
}

impl<T: Entity> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. Returns the entity that was replaced, if any.
    pub fn register(&mut self, view: T) -> Option<T> {
        let key = view.identity();
        let previous = self.items.insert(key.clone(), view);
        if previous.is_some() {
            tracing::debug!("{} {} re-registered, last write wins", T::KIND, key);
        }
        previous
    }

    /// Look up an entity by identity key
    pub fn get(&self, key: &str) -> Option<&T> {
        self.items.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    /// Entities with their keys, in ascending key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Entities in ascending key order
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Secondary lookup from an attribute value to an identity key
///
/// Populated at registration time. When two entities share a value, the one
/// registered last owns it.
#[derive(Debug, Clone, Default)]
pub struct SecondaryIndex {
    name: &'static str,
    entries: BTreeMap<String, String>,
}

impl SecondaryIndex {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, value: &str, key: &str) {
        if let Some(previous) = self.entries.insert(value.to_string(), key.to_string()) {
            if previous != key {
                tracing::debug!(
                    "{} index: {} moved from {} to {}",
                    self.name,
                    value,
                    previous,
                    key
                );
            }
        }
    }

    /// Drop `value` if it still points at `key`
    pub fn remove(&mut self, value: &str, key: &str) {
        if self.entries.get(value).is_some_and(|k| k == key) {
            self.entries.remove(value);
        }
    }

    pub fn get(&self, value: &str) -> Option<&str> {
        self.entries.get(value).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Vpc;
    use serde_json::json;

    fn vpc(id: &str, name: &str) -> Vpc {
        Vpc::decode(&json!({"VpcId": id, "Tags": [{"Key": "Name", "Value": name}]})).unwrap()
    }

    #[test]
    fn test_register_overwrites() {
        let mut registry = Registry::new();
        assert!(registry.register(vpc("vpc-1", "first")).is_none());
        let previous = registry.register(vpc("vpc-1", "second"));

        assert_eq!(previous.unwrap().display_name(), "first");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("vpc-1").unwrap().display_name(), "second");
    }

    #[test]
    fn test_iteration_is_key_ordered() {
        let mut registry = Registry::new();
        for id in ["vpc-c", "vpc-a", "vpc-b"] {
            registry.register(vpc(id, id));
        }
        let keys: Vec<&str> = registry.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["vpc-a", "vpc-b", "vpc-c"]);
    }

    #[test]
    fn test_get_missing() {
        let registry: Registry<Vpc> = Registry::new();
        assert!(registry.get("vpc-404").is_none());
        assert!(!registry.contains("vpc-404"));
    }

    #[test]
    fn test_index_last_registered_wins() {
        let mut index = SecondaryIndex::new("fqdn");
        index.insert("a.example.com", "lb1");
        index.insert("a.example.com", "lb2");
        assert_eq!(index.get("a.example.com"), Some("lb2"));

        // stale owner cannot remove the new one
        index.remove("a.example.com", "lb1");
        assert_eq!(index.get("a.example.com"), Some("lb2"));

        index.remove("a.example.com", "lb2");
        assert!(index.is_empty());
    }
}
