// SPDX-License-Identifier: MIT OR Apache-2.0

//! The configuration authority.
//!
//! The authority owns the configuration sources, turns their merged output into
//! a validated and derived [`ConfigSnapshot`], and publishes that snapshot to
//! the rest of the process. It is created once at startup and shared as an
//! `Arc<ConfigAuthority>`.

use crate::domain::{
    ConfigError, ConfigKey, ConfigSnapshot, ConfigValue, ConfigurationService, EnvMap, Result,
    ServiceConfig, Tier,
};
use crate::ports::{ChangeCallback, ConfigSource, ConfigWatcher};
use crate::service::deriver::derive;
use crate::service::events::{ConfigEvent, ConfigEventKind, EventBus};
use crate::service::validator::SchemaValidator;
use arc_swap::ArcSwapOption;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

/// Lifecycle state of a [`ConfigAuthority`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthorityState {
    /// No snapshot has been installed yet
    Uninitialized,
    /// A snapshot is installed
    Loaded,
    /// A reload is in progress; the previous snapshot is still served
    Reloading,
    /// `cleanup` ran; watchers are stopped
    Terminated,
}

/// A started watcher and the file it covers, if any.
struct WatchRegistration {
    path: Option<PathBuf>,
    watcher: Box<dyn ConfigWatcher>,
}

/// The process-wide configuration authority.
///
/// Sources are merged by priority (higher wins), validated for the tier named
/// by `APP_ENV`, derived, and installed as one immutable snapshot. Readers
/// never block: the snapshot is swapped atomically, and readers holding the
/// previous `Arc` keep a consistent view.
///
/// # Examples
///
/// ```rust
/// use unicfg::domain::{ConfigKey, EnvMap};
/// use unicfg::service::ConfigAuthority;
///
/// # fn main() -> unicfg::domain::Result<()> {
/// let env: EnvMap = [
///     ("JWT_SECRET", "a".repeat(32)),
///     ("JWT_REFRESH_SECRET", "b".repeat(32)),
///     ("DATABASE_URL", "postgres://chat@db/chat".to_string()),
/// ]
/// .into_iter()
/// .collect();
///
/// let authority = ConfigAuthority::builder().with_env_values(env).build();
/// authority.load()?;
///
/// assert_eq!(authority.get(&ConfigKey::from("cache.port"))?.as_str(), "6379");
/// assert_eq!(authority.service_config("auth")?.port, Some(3001));
/// # Ok(())
/// # }
/// ```
pub struct ConfigAuthority {
    /// Sources, highest priority first
    sources: Mutex<Vec<Box<dyn ConfigSource>>>,
    validator: SchemaValidator,
    snapshot: ArcSwapOption<ConfigSnapshot>,
    state: RwLock<AuthorityState>,
    events: EventBus,
    watchers: Mutex<Vec<WatchRegistration>>,
    /// Serializes reloads
    reload_lock: Mutex<()>,
    poll_interval: Option<Duration>,
}

impl ConfigAuthority {
    /// Creates a new authority builder.
    pub fn builder() -> ConfigAuthorityBuilder {
        ConfigAuthorityBuilder::new()
    }

    /// Creates an authority reading the process environment and, if present,
    /// `.env` in the OS-appropriate config directory.
    ///
    /// The authority is not loaded yet.
    pub fn with_defaults(app_name: &str, qualifier: &str) -> Self {
        Self::builder()
            .with_env_vars()
            .with_default_env_file(app_name, qualifier)
            .build()
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> AuthorityState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: AuthorityState) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Returns the names of the configured sources, highest priority first.
    pub fn source_names(&self) -> Vec<String> {
        let sources = self.sources.lock().unwrap_or_else(|e| e.into_inner());
        sources.iter().map(|s| s.name().to_string()).collect()
    }

    /// Re-reads every source and merges them; higher priority wins.
    fn read_sources(&self) -> Result<EnvMap> {
        let mut sources = self.sources.lock().unwrap_or_else(|e| e.into_inner());
        let mut merged = EnvMap::new();
        for source in sources.iter_mut().rev() {
            source.reload()?;
            let entries = source.entries()?;
            tracing::debug!(
                "Source '{}' (priority {}) supplied {} keys",
                source.name(),
                source.priority(),
                entries.len()
            );
            merged.extend_from(&entries);
        }
        Ok(merged)
    }

    fn build_snapshot(&self) -> Result<Arc<ConfigSnapshot>> {
        let raw = self.read_sources()?;
        let tier = SchemaValidator::tier_of(&raw);
        let validated = self.validator.validate(&raw, tier)?;
        let derived = derive(&validated);
        Ok(Arc::new(ConfigSnapshot::new(validated, derived)))
    }

    /// Reads, validates and derives the configuration and installs it.
    ///
    /// On error nothing is installed; callers at process boot should treat
    /// the error as fatal.
    pub fn load(&self) -> Result<Arc<ConfigSnapshot>> {
        let snapshot = self.build_snapshot()?;
        self.snapshot.store(Some(Arc::clone(&snapshot)));
        if self.state() != AuthorityState::Terminated {
            self.set_state(AuthorityState::Loaded);
        }
        tracing::info!(
            "Loaded configuration for the {} tier ({} addressable keys)",
            snapshot.tier(),
            snapshot.entries().count()
        );
        Ok(snapshot)
    }

    /// Re-reads all sources and installs a new snapshot.
    ///
    /// Concurrent calls run one at a time. On success listeners receive
    /// [`ConfigEvent::Changed`]. On failure the previous snapshot stays
    /// active, listeners receive [`ConfigEvent::ReloadFailed`], and
    /// [`ConfigError::ReloadFailed`] is returned. A reload that leaves the
    /// development tier stops every watcher.
    pub fn reload(&self) -> Result<()> {
        let outcome = {
            let _guard = self.reload_lock.lock().unwrap_or_else(|e| e.into_inner());
            let previous = self.state();
            if previous == AuthorityState::Loaded {
                self.set_state(AuthorityState::Reloading);
            }

            let outcome = self.build_snapshot();
            match &outcome {
                Ok(snapshot) => {
                    self.snapshot.store(Some(Arc::clone(snapshot)));
                    if previous != AuthorityState::Terminated {
                        self.set_state(AuthorityState::Loaded);
                    }
                    tracing::info!("Reloaded configuration for the {} tier", snapshot.tier());
                }
                Err(e) => {
                    self.set_state(previous);
                    tracing::error!("Configuration reload failed, keeping previous snapshot: {}", e);
                }
            }
            outcome
        };

        // listeners run without the reload lock so they may reload again
        match outcome {
            Ok(snapshot) => {
                let tier = snapshot.tier();
                self.emit(&ConfigEvent::Changed(snapshot));
                if tier != Tier::Development && self.watcher_count() > 0 {
                    tracing::info!("Tier changed to {}, stopping file watchers", tier);
                    self.unwatch();
                }
                Ok(())
            }
            Err(e) => {
                self.emit(&ConfigEvent::ReloadFailed(e.to_string()));
                Err(ConfigError::ReloadFailed {
                    source: Box::new(e),
                })
            }
        }
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Result<Arc<ConfigSnapshot>> {
        self.snapshot.load_full().ok_or(ConfigError::NotInitialized)
    }

    /// Looks up a dotted path in the current snapshot.
    pub fn get(&self, key: &ConfigKey) -> Result<ConfigValue> {
        self.snapshot()?.get(key)
    }

    /// Looks up a dotted path, returning `fallback` if it is missing.
    pub fn get_or(&self, key: &ConfigKey, fallback: &str) -> Result<ConfigValue> {
        match self.snapshot()?.get(key) {
            Err(ConfigError::ConfigKeyNotFound { .. }) => Ok(ConfigValue::from(fallback)),
            other => other,
        }
    }

    /// Returns a copy of the current snapshot.
    pub fn get_all(&self) -> Result<ConfigSnapshot> {
        Ok(self.snapshot()?.as_ref().clone())
    }

    /// Projects the configuration for one service; unknown names never fail.
    pub fn service_config(&self, name: &str) -> Result<ServiceConfig> {
        Ok(self.snapshot()?.service_config(name))
    }

    /// Registers a listener for events of `kind`.
    pub fn on<F>(&self, kind: ConfigEventKind, handler: F)
    where
        F: Fn(&ConfigEvent) + Send + Sync + 'static,
    {
        self.events.on(kind, Arc::new(handler));
    }

    /// Publishes `event` to its listeners and returns how many were called.
    pub fn emit(&self, event: &ConfigEvent) -> usize {
        self.events.emit(event)
    }

    /// Starts one polling watcher per file-backed source.
    ///
    /// Watching is only active in the development tier; other tiers start
    /// nothing. Files that are already watched are skipped. Returns the number
    /// of watchers started.
    #[cfg(feature = "reload")]
    pub fn watch(self: &Arc<Self>) -> Result<usize> {
        use crate::adapters::FileWatcher;

        if !self.watching_allowed()? {
            return Ok(0);
        }

        let paths: Vec<PathBuf> = {
            let sources = self.sources.lock().unwrap_or_else(|e| e.into_inner());
            sources
                .iter()
                .filter_map(|s| s.watch_path().map(Path::to_path_buf))
                .collect()
        };

        let mut started = 0;
        for path in paths {
            if self.is_watching(&path) {
                continue;
            }
            let watcher = FileWatcher::new(&path, self.poll_interval)?;
            self.register(Some(path), Box::new(watcher))?;
            started += 1;
        }
        Ok(started)
    }

    /// Starts a caller-supplied watcher whose events trigger [`reload`](Self::reload).
    ///
    /// Like [`watch`](Self::watch) this only applies in the development tier;
    /// returns `false` if the watcher was not started.
    pub fn watch_with(self: &Arc<Self>, watcher: Box<dyn ConfigWatcher>) -> Result<bool> {
        if !self.watching_allowed()? {
            return Ok(false);
        }
        self.register(None, watcher)?;
        Ok(true)
    }

    fn watching_allowed(&self) -> Result<bool> {
        if self.state() == AuthorityState::Terminated {
            return Err(ConfigError::WatcherError {
                message: "Configuration authority has been cleaned up".to_string(),
                source: None,
            });
        }
        let tier = self.snapshot()?.tier();
        if tier != Tier::Development {
            tracing::info!("File watching is disabled in the {} tier", tier);
            return Ok(false);
        }
        Ok(true)
    }

    fn is_watching(&self, path: &Path) -> bool {
        let watchers = self.watchers.lock().unwrap_or_else(|e| e.into_inner());
        watchers.iter().any(|r| r.path.as_deref() == Some(path))
    }

    fn register(self: &Arc<Self>, path: Option<PathBuf>, mut watcher: Box<dyn ConfigWatcher>) -> Result<()> {
        let authority = Arc::downgrade(self);
        let callback: ChangeCallback = Arc::new(move |key: ConfigKey| {
            let Some(authority) = authority.upgrade() else {
                return;
            };
            tracing::info!("Detected change in {}, reloading configuration", key);
            // failures are logged and published by reload itself
            let _ = authority.reload();
        });

        watcher.watch(callback)?;
        let mut watchers = self.watchers.lock().unwrap_or_else(|e| e.into_inner());
        watchers.push(WatchRegistration { path, watcher });
        Ok(())
    }

    /// Returns the number of active watchers.
    pub fn watcher_count(&self) -> usize {
        self.watchers.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Stops every watcher and returns how many were stopped.
    ///
    /// Calling `unwatch` with no active watchers is a no-op.
    pub fn unwatch(&self) -> usize {
        let registrations: Vec<WatchRegistration> = {
            let mut watchers = self.watchers.lock().unwrap_or_else(|e| e.into_inner());
            watchers.drain(..).collect()
        };

        let count = registrations.len();
        for mut registration in registrations {
            if let Err(e) = registration.watcher.stop() {
                tracing::warn!("Failed to stop configuration watcher: {}", e);
            }
        }
        if count > 0 {
            tracing::debug!("Stopped {} configuration watchers", count);
        }
        count
    }

    /// Stops all watchers and marks the authority terminated.
    ///
    /// Idempotent; also runs on drop. The last snapshot stays readable.
    pub fn cleanup(&self) {
        self.unwatch();
        if self.state() != AuthorityState::Terminated {
            self.set_state(AuthorityState::Terminated);
            tracing::debug!("Configuration authority terminated");
        }
    }
}

impl Drop for ConfigAuthority {
    fn drop(&mut self) {
        self.cleanup();
    }
}

impl fmt::Debug for ConfigAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigAuthority")
            .field("sources", &self.source_names())
            .field("state", &self.state())
            .field("watchers", &self.watcher_count())
            .field("events", &self.events)
            .finish()
    }
}

impl ConfigurationService for ConfigAuthority {
    fn get(&self, key: &ConfigKey) -> Result<ConfigValue> {
        ConfigAuthority::get(self, key)
    }

    fn get_or(&self, key: &ConfigKey, fallback: &str) -> Result<ConfigValue> {
        ConfigAuthority::get_or(self, key, fallback)
    }

    fn get_all(&self) -> Result<ConfigSnapshot> {
        ConfigAuthority::get_all(self)
    }

    fn snapshot(&self) -> Result<Arc<ConfigSnapshot>> {
        ConfigAuthority::snapshot(self)
    }

    fn service_config(&self, name: &str) -> Result<ServiceConfig> {
        ConfigAuthority::service_config(self, name)
    }

    fn reload(&self) -> Result<()> {
        ConfigAuthority::reload(self)
    }
}

/// Builder for constructing a [`ConfigAuthority`].
///
/// # Examples
///
/// ```rust,no_run
/// use unicfg::service::ConfigAuthority;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # fn main() -> unicfg::domain::Result<()> {
/// let authority = Arc::new(
///     ConfigAuthority::builder()
///         .with_env_vars()
///         .with_env_file("/srv/chat/.env")?
///         .poll_interval(Duration::from_millis(500))
///         .build(),
/// );
/// authority.load()?;
/// # Ok(())
/// # }
/// ```
pub struct ConfigAuthorityBuilder {
    sources: Vec<Box<dyn ConfigSource>>,
    validator: SchemaValidator,
    poll_interval: Option<Duration>,
}

impl ConfigAuthorityBuilder {
    /// Creates a new builder with no sources.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            validator: SchemaValidator::new(),
            poll_interval: None,
        }
    }

    /// Adds a configuration source.
    pub fn with_source(mut self, source: Box<dyn ConfigSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Adds the process environment as a source.
    pub fn with_env_vars(self) -> Self {
        use crate::adapters::EnvVarAdapter;
        self.with_source(Box::new(EnvVarAdapter::new()))
    }

    /// Adds process environment variables starting with `prefix`.
    pub fn with_env_prefix(self, prefix: impl Into<String>) -> Self {
        use crate::adapters::EnvVarAdapter;
        self.with_source(Box::new(EnvVarAdapter::with_prefix(prefix)))
    }

    /// Adds fixed values in place of the process environment.
    pub fn with_env_values(self, values: EnvMap) -> Self {
        use crate::adapters::EnvVarAdapter;
        self.with_source(Box::new(EnvVarAdapter::with_values(values)))
    }

    /// Adds an env-style file as a source; the file must exist.
    pub fn with_env_file(self, path: impl AsRef<Path>) -> Result<Self> {
        use crate::adapters::EnvFileAdapter;
        let adapter = EnvFileAdapter::from_file(path)?;
        Ok(self.with_source(Box::new(adapter)))
    }

    /// Adds `.env` from the OS-appropriate config directory if it exists.
    pub fn with_default_env_file(self, app_name: &str, qualifier: &str) -> Self {
        use crate::adapters::EnvFileAdapter;
        match EnvFileAdapter::from_default_location(app_name, qualifier) {
            Ok(adapter) => self.with_source(Box::new(adapter)),
            Err(e) => {
                tracing::debug!("No default env file for {}: {}", app_name, e);
                self
            }
        }
    }

    /// Uses a custom validator.
    pub fn with_validator(mut self, validator: SchemaValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Sets the interval file watchers poll at.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Builds the authority; call [`ConfigAuthority::load`] before use.
    pub fn build(mut self) -> ConfigAuthority {
        self.sources
            .sort_by_key(|source| std::cmp::Reverse(source.priority()));

        ConfigAuthority {
            sources: Mutex::new(self.sources),
            validator: self.validator,
            snapshot: ArcSwapOption::empty(),
            state: RwLock::new(AuthorityState::Uninitialized),
            events: EventBus::new(),
            watchers: Mutex::new(Vec::new()),
            reload_lock: Mutex::new(()),
            poll_interval: self.poll_interval,
        }
    }
}

impl Default for ConfigAuthorityBuilder {
    fn default() -> Self {
        Self::new()
    }
}
