// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process configuration events.
//!
//! Listeners are plain callbacks kept in registration order. Emitting an event
//! calls every listener for its kind synchronously on the emitting thread.

use crate::domain::ConfigSnapshot;
use std::fmt;
use std::sync::{Arc, RwLock};

/// An event published by the authority.
#[derive(Clone, Debug)]
pub enum ConfigEvent {
    /// A new snapshot was installed
    Changed(Arc<ConfigSnapshot>),
    /// A reload was rejected; the previous snapshot is still active
    ReloadFailed(String),
}

impl ConfigEvent {
    /// Returns the kind used to match listeners.
    pub fn kind(&self) -> ConfigEventKind {
        match self {
            ConfigEvent::Changed(_) => ConfigEventKind::Changed,
            ConfigEvent::ReloadFailed(_) => ConfigEventKind::ReloadFailed,
        }
    }
}

/// Kinds of [`ConfigEvent`] a listener can subscribe to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConfigEventKind {
    /// See [`ConfigEvent::Changed`]
    Changed,
    /// See [`ConfigEvent::ReloadFailed`]
    ReloadFailed,
}

impl fmt::Display for ConfigEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfigEventKind::Changed => "change",
            ConfigEventKind::ReloadFailed => "reload-failed",
        })
    }
}

/// Type alias for event listeners.
pub type EventHandler = Arc<dyn Fn(&ConfigEvent) + Send + Sync>;

/// Ordered listener registry.
///
/// # Examples
///
/// ```rust
/// use unicfg::service::{ConfigEvent, ConfigEventKind, EventBus};
/// use std::sync::Arc;
///
/// let bus = EventBus::new();
/// bus.on(ConfigEventKind::ReloadFailed, Arc::new(|event| {
///     if let ConfigEvent::ReloadFailed(reason) = event {
///         eprintln!("reload rejected: {reason}");
///     }
/// }));
/// assert_eq!(bus.emit(&ConfigEvent::ReloadFailed("bad port".into())), 1);
/// ```
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<Vec<(ConfigEventKind, EventHandler)>>,
}

impl EventBus {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for events of `kind`.
    pub fn on(&self, kind: ConfigEventKind, handler: EventHandler) {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        listeners.push((kind, handler));
    }

    /// Calls every listener registered for the event's kind, in registration
    /// order, and returns how many were called.
    ///
    /// The registry lock is released before any handler runs, so handlers may
    /// register further listeners.
    pub fn emit(&self, event: &ConfigEvent) -> usize {
        let kind = event.kind();
        let handlers: Vec<EventHandler> = {
            let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner());
            listeners
                .iter()
                .filter(|(k, _)| *k == kind)
                .map(|(_, h)| Arc::clone(h))
                .collect()
        };

        tracing::debug!("Dispatching {} event to {} listeners", kind, handlers.len());
        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    /// Returns the number of listeners for `kind`.
    pub fn listener_count(&self, kind: ConfigEventKind) -> usize {
        let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner());
        listeners.iter().filter(|(k, _)| *k == kind).count()
    }

    /// Removes every listener.
    pub fn clear(&self) {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        listeners.clear();
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner());
        f.debug_struct("EventBus")
            .field("listeners", &listeners.len())
            .finish()
    }
}
