// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration watcher trait definition.
//!
//! This module defines the `ConfigWatcher` trait, which monitors a configuration
//! source for changes and triggers a callback when one is detected.

use crate::domain::{ConfigKey, Result};
use std::sync::Arc;

/// Type alias for change notification callbacks.
///
/// The callback receives a key naming what changed; file watchers pass the
/// file path.
pub type ChangeCallback = Arc<dyn Fn(ConfigKey) + Send + Sync>;

/// A trait for watching configuration sources for changes.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; callbacks are usually invoked from a
/// background thread.
///
/// # Examples
///
/// ```rust
/// use unicfg::ports::{ChangeCallback, ConfigWatcher};
/// use unicfg::domain::Result;
///
/// #[derive(Default)]
/// struct Manual {
///     callback: Option<ChangeCallback>,
/// }
///
/// impl ConfigWatcher for Manual {
///     fn watch(&mut self, callback: ChangeCallback) -> Result<()> {
///         self.callback = Some(callback);
///         Ok(())
///     }
///
///     fn stop(&mut self) -> Result<()> {
///         self.callback = None;
///         Ok(())
///     }
/// }
/// ```
pub trait ConfigWatcher: Send + Sync {
    /// Starts watching; `callback` is invoked once per detected change.
    ///
    /// Callbacks should return quickly; the authority's reload runs inside it.
    fn watch(&mut self, callback: ChangeCallback) -> Result<()>;

    /// Stops watching. Calling `stop` on a stopped watcher is a no-op.
    fn stop(&mut self) -> Result<()>;
}
