// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration key newtype for type-safe key handling.
//!
//! A `ConfigKey` names either a raw environment variable (`REDIS_HOST`) or a
//! dotted path into a loaded snapshot (`cache.host`, `cors.origin.0`).

use std::fmt;

/// A type-safe wrapper for configuration keys.
///
/// # Examples
///
/// ```
/// use unicfg::domain::config_key::ConfigKey;
///
/// let key = ConfigKey::from("cache.port");
/// assert_eq!(key.segments().collect::<Vec<_>>(), vec!["cache", "port"]);
///
/// assert!(ConfigKey::from("REDIS_HOST").is_env_name());
/// assert!(!ConfigKey::from("cache.port").is_env_name());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfigKey(String);

impl ConfigKey {
    /// Creates a new `ConfigKey` from a `String`.
    pub fn new(key: String) -> Self {
        ConfigKey(key)
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Converts the `ConfigKey` into its inner `String`.
    pub fn into_string(self) -> String {
        self.0
    }

    /// Iterates over the dot-separated segments of the key.
    ///
    /// Empty segments (as in `a..b`) are skipped.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.').filter(|s| !s.is_empty())
    }

    /// Returns `true` if the key is a valid environment variable name.
    ///
    /// Valid names start with an ASCII letter or underscore and continue with
    /// ASCII letters, digits or underscores.
    pub fn is_env_name(&self) -> bool {
        is_env_name(&self.0)
    }

    /// Builds the conventional port key for a component: `{NAME}_SERVICE_PORT`.
    ///
    /// Dashes in the component name become underscores.
    ///
    /// ```
    /// use unicfg::domain::config_key::ConfigKey;
    ///
    /// assert_eq!(ConfigKey::service_port("billing").as_str(), "BILLING_SERVICE_PORT");
    /// assert_eq!(ConfigKey::service_port("audit-log").as_str(), "AUDIT_LOG_SERVICE_PORT");
    /// ```
    pub fn service_port(component: &str) -> Self {
        let name = component.trim().replace('-', "_").to_ascii_uppercase();
        ConfigKey(format!("{}_SERVICE_PORT", name))
    }
}

/// Returns `true` if `name` is a valid environment variable name.
pub(crate) fn is_env_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl From<String> for ConfigKey {
    fn from(s: String) -> Self {
        ConfigKey(s)
    }
}

impl From<&str> for ConfigKey {
    fn from(s: &str) -> Self {
        ConfigKey(s.to_string())
    }
}

impl From<ConfigKey> for String {
    fn from(key: ConfigKey) -> Self {
        key.0
    }
}

impl AsRef<str> for ConfigKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_key_from_str() {
        let key = ConfigKey::from("cache.host");
        assert_eq!(key.as_str(), "cache.host");
        assert_eq!(key.clone().into_string(), "cache.host");
    }

    #[test]
    fn test_config_key_display() {
        let key = ConfigKey::from("services.auth");
        assert_eq!(format!("{}", key), "services.auth");
    }

    #[test]
    fn test_config_key_hash() {
        let mut map = HashMap::new();
        map.insert(ConfigKey::from("a.b"), 1);
        assert_eq!(map.get(&ConfigKey::from("a.b")), Some(&1));
        assert_eq!(map.get(&ConfigKey::from("a.c")), None);
    }

    #[test]
    fn test_segments_skip_empty_parts() {
        let key = ConfigKey::from("cors..origin.0");
        let segments: Vec<_> = key.segments().collect();
        assert_eq!(segments, vec!["cors", "origin", "0"]);
    }

    #[test]
    fn test_segments_of_flat_key() {
        let key = ConfigKey::from("JWT_SECRET");
        assert_eq!(key.segments().count(), 1);
    }

    #[test]
    fn test_env_name_validation() {
        assert!(is_env_name("DATABASE_URL"));
        assert!(is_env_name("_PRIVATE"));
        assert!(is_env_name("a1"));
        assert!(!is_env_name(""));
        assert!(!is_env_name("1ABC"));
        assert!(!is_env_name("HAS-DASH"));
        assert!(!is_env_name("has space"));
    }

    #[test]
    fn test_service_port_key() {
        assert_eq!(ConfigKey::service_port("chat").as_str(), "CHAT_SERVICE_PORT");
        assert_eq!(
            ConfigKey::service_port(" search-index ").as_str(),
            "SEARCH_INDEX_SERVICE_PORT"
        );
    }
}
