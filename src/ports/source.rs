// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration source trait definition.
//!
//! This module defines the `ConfigSource` trait, the port through which the
//! authority reads the raw environment. The process environment and env-style
//! files are both sources.

use crate::domain::{ConfigKey, ConfigValue, EnvMap, Result};
use std::path::Path;

/// A trait for raw configuration sources.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` because the authority may reload from
/// a watcher thread.
///
/// # Priority
///
/// Each source has a priority value (0-255). When several sources define the
/// same key, the one with the higher priority wins:
///
/// - **2**: Process environment variables
/// - **1**: Env-style files
///
/// # Examples
///
/// ```rust
/// use unicfg::ports::ConfigSource;
/// use unicfg::domain::{ConfigKey, ConfigValue, Result};
///
/// struct Fixed;
///
/// impl ConfigSource for Fixed {
///     fn name(&self) -> &str { "fixed" }
///     fn priority(&self) -> u8 { 1 }
///     fn get(&self, key: &ConfigKey) -> Result<Option<ConfigValue>> {
///         Ok((key.as_str() == "LOG_LEVEL").then(|| ConfigValue::from("debug")))
///     }
///     fn all_keys(&self) -> Result<Vec<ConfigKey>> {
///         Ok(vec![ConfigKey::from("LOG_LEVEL")])
///     }
///     fn reload(&mut self) -> Result<()> { Ok(()) }
/// }
///
/// let entries = Fixed.entries().unwrap();
/// assert_eq!(entries.get("LOG_LEVEL"), Some("debug"));
/// ```
pub trait ConfigSource: Send + Sync {
    /// Returns a short name for logging, such as "env" or "env-file".
    fn name(&self) -> &str;

    /// Returns the priority of this source; higher wins.
    fn priority(&self) -> u8;

    /// Retrieves the raw value for `key`, or `Ok(None)` if it is not defined.
    fn get(&self, key: &ConfigKey) -> Result<Option<ConfigValue>>;

    /// Returns every key this source defines.
    fn all_keys(&self) -> Result<Vec<ConfigKey>>;

    /// Re-reads the underlying storage.
    ///
    /// Sources that cannot change at runtime may treat this as a no-op.
    fn reload(&mut self) -> Result<()>;

    /// Retrieves a value by string key.
    fn get_str(&self, key: &str) -> Result<Option<ConfigValue>> {
        self.get(&ConfigKey::from(key))
    }

    /// Returns every entry this source defines.
    ///
    /// The default implementation combines [`all_keys`](Self::all_keys) and
    /// [`get`](Self::get); sources with ordered storage should override it.
    fn entries(&self) -> Result<EnvMap> {
        let mut map = EnvMap::new();
        for key in self.all_keys()? {
            if let Some(value) = self.get(&key)? {
                map.insert(key.into_string(), value.as_string());
            }
        }
        Ok(map)
    }

    /// Returns the file backing this source, if any.
    ///
    /// The authority starts one watcher per file-backed source.
    fn watch_path(&self) -> Option<&Path> {
        None
    }
}
