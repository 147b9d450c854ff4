// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared mocks and fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use unicfg::domain::{ConfigError, ConfigKey, ConfigValue, EnvMap, Result};
use unicfg::ports::{ChangeCallback, ConfigSource, ConfigWatcher};

/// A 64-character secret accepted in every tier.
pub const SECRET: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

/// A second 64-character secret.
pub const REFRESH_SECRET: &str =
    "fedcba9876543210fedcba9876543210fedcba9876543210fedcba9876543210";

/// Minimal raw environment that validates in development.
pub fn valid_env() -> EnvMap {
    [
        ("JWT_SECRET", SECRET),
        ("JWT_REFRESH_SECRET", REFRESH_SECRET),
        ("DATABASE_URL", "postgresql://chat:pw@db:5432/chat"),
    ]
    .into_iter()
    .collect()
}

/// Raw environment that validates in production.
pub fn production_env() -> EnvMap {
    let mut env = valid_env();
    env.insert("APP_ENV", "production");
    env.insert("REDIS_HOST", "cache.internal");
    env.insert("SMTP_HOST", "smtp.internal");
    env.insert("CORS_ORIGIN", "https://chat.example.com");
    env
}

/// Writes `content` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// A mock configuration source whose values can change after it is handed
/// to an authority.
#[derive(Debug, Clone)]
pub struct MockConfigSource {
    name: String,
    priority: u8,
    values: Arc<Mutex<EnvMap>>,
    fail_reload: Arc<AtomicBool>,
    reloads: Arc<AtomicUsize>,
}

impl MockConfigSource {
    /// Creates an empty mock source.
    pub fn new(name: impl Into<String>, priority: u8) -> Self {
        Self {
            name: name.into(),
            priority,
            values: Arc::new(Mutex::new(EnvMap::new())),
            fail_reload: Arc::new(AtomicBool::new(false)),
            reloads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Adds a value.
    pub fn with_value(self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }

    /// Adds every value from `values`.
    pub fn with_values(self, values: &EnvMap) -> Self {
        self.values.lock().unwrap().extend_from(values);
        self
    }

    /// Sets a value; visible to the authority on its next reload.
    pub fn set(&self, key: &str, value: &str) {
        self.values.lock().unwrap().insert(key, value);
    }

    /// Removes a value.
    pub fn remove(&self, key: &str) {
        self.values.lock().unwrap().remove(key);
    }

    /// Makes subsequent reloads fail.
    pub fn fail_reloads(&self, fail: bool) {
        self.fail_reload.store(fail, Ordering::SeqCst);
    }

    /// Number of reloads the authority has requested.
    pub fn reload_count(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }

    /// Boxes a clone for an authority builder.
    pub fn boxed(&self) -> Box<dyn ConfigSource> {
        Box::new(self.clone())
    }
}

impl ConfigSource for MockConfigSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn get(&self, key: &ConfigKey) -> Result<Option<ConfigValue>> {
        Ok(self
            .values
            .lock()
            .unwrap()
            .get(key.as_str())
            .map(ConfigValue::from))
    }

    fn all_keys(&self) -> Result<Vec<ConfigKey>> {
        Ok(self
            .values
            .lock()
            .unwrap()
            .keys()
            .map(ConfigKey::from)
            .collect())
    }

    fn entries(&self) -> Result<EnvMap> {
        Ok(self.values.lock().unwrap().clone())
    }

    fn reload(&mut self) -> Result<()> {
        self.reloads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reload.load(Ordering::SeqCst) {
            Err(ConfigError::SourceError {
                source_name: self.name.clone(),
                message: "Mock reload failure".to_string(),
                source: None,
            })
        } else {
            Ok(())
        }
    }
}

/// A watcher that fires only when the test tells it to.
#[derive(Clone, Default)]
pub struct ManualWatcher {
    callback: Arc<Mutex<Option<ChangeCallback>>>,
}

impl ManualWatcher {
    /// Creates an idle watcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates one detected modification; returns `false` if not watching.
    pub fn trigger(&self, path: &str) -> bool {
        let callback = self.callback.lock().unwrap().clone();
        match callback {
            Some(callback) => {
                callback(ConfigKey::from(path));
                true
            }
            None => false,
        }
    }

    /// Returns `true` while a callback is registered.
    pub fn is_watching(&self) -> bool {
        self.callback.lock().unwrap().is_some()
    }
}

impl ConfigWatcher for ManualWatcher {
    fn watch(&mut self, callback: ChangeCallback) -> Result<()> {
        *self.callback.lock().unwrap() = Some(callback);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        *self.callback.lock().unwrap() = None;
        Ok(())
    }
}
