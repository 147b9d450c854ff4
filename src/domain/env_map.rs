// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ordered key/value map used for raw environments and parsed artifacts.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An insertion-ordered map of environment keys to values.
///
/// Inserting a key that already exists replaces the value but keeps the key's
/// original position, so the merge of several maps lists keys in the order
/// they were first seen. Lookups are linear; configuration maps are small.
///
/// # Examples
///
/// ```
/// use unicfg::domain::EnvMap;
///
/// let mut env = EnvMap::new();
/// env.insert("LOG_LEVEL", "info");
/// env.insert("APP_ENV", "test");
/// env.insert("LOG_LEVEL", "debug");
///
/// assert_eq!(env.get("LOG_LEVEL"), Some("debug"));
/// assert_eq!(env.keys().collect::<Vec<_>>(), vec!["LOG_LEVEL", "APP_ENV"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvMap {
    entries: Vec<(String, String)>,
}

impl EnvMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
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

    /// Returns the value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the value for `key` unless it is missing or blank.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }

    /// Returns `true` if `key` is present (even with an empty value).
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Copies every entry of `other` into `self`; `other` wins on conflicts.
    pub fn extend_from(&mut self, other: &EnvMap) {
        for (key, value) in other.iter() {
            self.insert(key, value);
        }
    }

    /// Iterates over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterates over keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Converts into an unordered `HashMap`.
    pub fn into_hash_map(self) -> HashMap<String, String> {
        self.entries.into_iter().collect()
    }
}

impl<K, V> FromIterator<(K, V)> for EnvMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = EnvMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl IntoIterator for EnvMap {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
