// SPDX-License-Identifier: MIT OR Apache-2.0

//! Environment variable configuration source adapter.
//!
//! This module provides an adapter that reads the raw environment from the
//! process environment variables.

use crate::domain::{ConfigKey, ConfigValue, EnvMap, Result};
use crate::ports::ConfigSource;
use std::env;
use std::sync::RwLock;

/// Maximum length for environment variable keys (prevents DoS)
const MAX_ENV_KEY_LEN: usize = 512;

/// Maximum length for environment variable values (prevents DoS)
const MAX_ENV_VALUE_LEN: usize = 1048576; // 1MB

/// Configuration source adapter for process environment variables.
///
/// Keys are used verbatim. An optional prefix restricts the adapter to
/// variables starting with it and strips it from the key, which lets several
/// deployments share one process environment (`CHAT_PROD_REDIS_HOST`).
///
/// # Priority
///
/// Environment variables have a priority of 2 and override env-style files
/// (priority 1).
///
/// # Examples
///
/// ```rust
/// use unicfg::adapters::EnvVarAdapter;
/// use unicfg::ports::ConfigSource;
///
/// let adapter = EnvVarAdapter::new();
/// assert_eq!(adapter.name(), "env");
///
/// let prefixed = EnvVarAdapter::with_prefix("CHAT_");
/// ```
#[derive(Debug)]
pub struct EnvVarAdapter {
    /// Optional prefix to filter environment variables
    prefix: Option<String>,
    /// Cached variables, loaded lazily and cleared on reload
    cache: RwLock<Option<EnvMap>>,
    /// Whether the values were injected rather than read from the process
    fixed: bool,
}

impl EnvVarAdapter {
    /// Creates an adapter reading every process environment variable.
    pub fn new() -> Self {
        Self {
            prefix: None,
            cache: RwLock::new(None),
            fixed: false,
        }
    }

    /// Creates an adapter reading only variables starting with `prefix`.
    ///
    /// The prefix is stripped from the key when storing values.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            cache: RwLock::new(None),
            fixed: false,
        }
    }

    /// Creates an adapter with pre-populated values.
    ///
    /// **Note**: intended for tests; the values are never refreshed from the
    /// process environment, and `reload` keeps them.
    pub fn with_values(values: EnvMap) -> Self {
        Self {
            prefix: None,
            cache: RwLock::new(Some(values)),
            fixed: true,
        }
    }

    /// Reads the process environment.
    fn load(&self) -> EnvMap {
        let mut vars: Vec<(String, String)> = env::vars().collect();
        // process environment order is unspecified
        vars.sort();

        let mut map = EnvMap::new();
        for (key, value) in vars {
            // Validate input sizes to prevent DoS
            if key.len() > MAX_ENV_KEY_LEN || value.len() > MAX_ENV_VALUE_LEN {
                tracing::debug!(
                    "Skipping oversized environment variable: key_len={}, value_len={} (max key={}, max value={})",
                    key.len(),
                    value.len(),
                    MAX_ENV_KEY_LEN,
                    MAX_ENV_VALUE_LEN
                );
                continue;
            }

            let key = match &self.prefix {
                Some(prefix) => match key.strip_prefix(prefix.as_str()) {
                    Some(stripped) if !stripped.is_empty() => stripped.to_string(),
                    _ => continue,
                },
                None => key,
            };

            map.insert(key, value);
        }

        tracing::debug!(
            "Loaded {} environment variables (prefix={:?})",
            map.len(),
            self.prefix
        );

        map
    }

    /// Returns the cached variables, loading them on first use.
    fn cached(&self) -> EnvMap {
        {
            let guard = self.cache.read().unwrap_or_else(|e| e.into_inner());
            if let Some(map) = guard.as_ref() {
                return map.clone();
            }
        }

        let fresh = self.load();
        let mut guard = self.cache.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(fresh.clone());
        fresh
    }
}

impl Default for EnvVarAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigSource for EnvVarAdapter {
    fn name(&self) -> &str {
        "env"
    }

    fn priority(&self) -> u8 {
        2
    }

    fn get(&self, key: &ConfigKey) -> Result<Option<ConfigValue>> {
        Ok(self.cached().get(key.as_str()).map(ConfigValue::from))
    }

    fn all_keys(&self) -> Result<Vec<ConfigKey>> {
        Ok(self.cached().keys().map(ConfigKey::from).collect())
    }

    fn entries(&self) -> Result<EnvMap> {
        Ok(self.cached())
    }

    fn reload(&mut self) -> Result<()> {
        if !self.fixed {
            // Clear cache to force reload on next access
            let mut guard = self.cache.write().unwrap_or_else(|e| e.into_inner());
            *guard = None;
        }
        Ok(())
    }
}
