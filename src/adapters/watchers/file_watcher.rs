// SPDX-License-Identifier: MIT OR Apache-2.0

//! Polling watcher for configuration file changes.
//!
//! This module provides a watcher that polls a configuration file and triggers
//! reload callbacks when its content changes.

use crate::domain::{ConfigError, ConfigKey, Result};
use crate::ports::{ChangeCallback, ConfigWatcher};
use notify::{Event, PollWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default interval between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Default window in which repeated change events collapse into one.
const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Polling watcher for a single configuration file.
///
/// Uses `notify::PollWatcher` with content comparison, so it works on network
/// and container filesystems where native events are missing, and edits that
/// keep the modification time still count. Events arriving within the debounce
/// window of the previous callback are dropped.
///
/// # Examples
///
/// ```rust,no_run
/// use unicfg::adapters::FileWatcher;
/// use unicfg::ports::ConfigWatcher;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # fn main() -> unicfg::domain::Result<()> {
/// let mut watcher = FileWatcher::new("/srv/chat/.env", Some(Duration::from_millis(500)))?;
///
/// watcher.watch(Arc::new(|key| {
///     println!("Configuration changed: {}", key);
/// }))?;
///
/// watcher.stop()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FileWatcher {
    /// Path to the file being watched
    file_path: PathBuf,
    /// Interval between polls
    poll_interval: Duration,
    /// Debounce window
    debounce_delay: Duration,
    /// Internal poll watcher
    watcher: Option<PollWatcher>,
    /// Thread dispatching events to the callback
    watch_thread: Option<JoinHandle<()>>,
    /// Stop signal sender
    stop_tx: Option<Sender<()>>,
}

impl FileWatcher {
    /// Creates a watcher for the file at `path`.
    ///
    /// `poll_interval` defaults to [`DEFAULT_POLL_INTERVAL`].
    pub fn new(path: impl AsRef<Path>, poll_interval: Option<Duration>) -> Result<Self> {
        let file_path = path.as_ref().to_path_buf();

        if !file_path.exists() {
            return Err(ConfigError::WatcherError {
                message: format!("File does not exist: {}", file_path.display()),
                source: None,
            });
        }

        Ok(Self {
            file_path,
            poll_interval: poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL),
            debounce_delay: DEFAULT_DEBOUNCE,
            watcher: None,
            watch_thread: None,
            stop_tx: None,
        })
    }

    /// Sets the debounce window.
    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debounce_delay = delay;
        self
    }

    /// Returns the watched path.
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Returns `true` while the watcher is running.
    pub fn is_running(&self) -> bool {
        self.watcher.is_some()
    }

    fn dispatch_loop(
        file_path: PathBuf,
        debounce_delay: Duration,
        event_rx: Receiver<notify::Result<Event>>,
        stop_rx: Receiver<()>,
        callback: ChangeCallback,
    ) {
        let mut last_event_time: Option<Instant> = None;

        loop {
            if stop_rx.try_recv().is_ok() {
                break;
            }

            let event = match event_rx.recv_timeout(Duration::from_millis(100)) {
                Ok(Ok(event)) => event,
                Ok(Err(e)) => {
                    tracing::warn!("Poll error on {}: {}", file_path.display(), e);
                    continue;
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };

            if !(event.kind.is_modify() || event.kind.is_create()) {
                continue;
            }

            let now = Instant::now();
            let should_trigger = last_event_time
                .map(|last| now.duration_since(last) >= debounce_delay)
                .unwrap_or(true);

            if should_trigger {
                last_event_time = Some(now);
                tracing::debug!("Detected change in {}", file_path.display());
                callback(ConfigKey::from(file_path.to_string_lossy().as_ref()));
            }
        }
    }
}

impl ConfigWatcher for FileWatcher {
    fn watch(&mut self, callback: ChangeCallback) -> Result<()> {
        if self.watcher.is_some() {
            return Err(ConfigError::WatcherError {
                message: "Watcher is already running".to_string(),
                source: None,
            });
        }

        let (event_tx, event_rx) = channel();
        let (stop_tx, stop_rx) = channel::<()>();

        let config = notify::Config::default()
            .with_poll_interval(self.poll_interval)
            .with_compare_contents(true);
        let mut watcher = PollWatcher::new(event_tx, config).map_err(|e| {
            ConfigError::WatcherError {
                message: format!("Failed to create poll watcher: {}", e),
                source: Some(Box::new(e)),
            }
        })?;

        watcher
            .watch(&self.file_path, RecursiveMode::NonRecursive)
            .map_err(|e| ConfigError::WatcherError {
                message: format!("Failed to start watching: {}", e),
                source: Some(Box::new(e)),
            })?;

        let file_path = self.file_path.clone();
        let debounce_delay = self.debounce_delay;
        let watch_thread = thread::Builder::new()
            .name("unicfg-file-watcher".to_string())
            .spawn(move || {
                Self::dispatch_loop(file_path, debounce_delay, event_rx, stop_rx, callback)
            })
            .map_err(|e| ConfigError::WatcherError {
                message: format!("Failed to spawn watcher thread: {}", e),
                source: Some(Box::new(e)),
            })?;

        tracing::info!(
            "Watching {} every {:?}",
            self.file_path.display(),
            self.poll_interval
        );
        self.watcher = Some(watcher);
        self.stop_tx = Some(stop_tx);
        self.watch_thread = Some(watch_thread);

        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        // dropping the poll watcher ends its thread and disconnects the channel
        self.watcher = None;

        if let Some(handle) = self.watch_thread.take() {
            // a callback that drops the last owner of this watcher runs stop on
            // the dispatch thread itself
            if handle.thread().id() != thread::current().id() {
                handle.join().map_err(|_| ConfigError::WatcherError {
                    message: "Failed to join watcher thread".to_string(),
                    source: None,
                })?;
            }
        }

        Ok(())
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    #[test]
    fn test_file_watcher_new() {
        let temp_file = NamedTempFile::new().unwrap();
        let watcher = FileWatcher::new(temp_file.path(), None).unwrap();
        assert_eq!(watcher.poll_interval, DEFAULT_POLL_INTERVAL);
        assert!(!watcher.is_running());
    }

    #[test]
    fn test_file_watcher_nonexistent_file() {
        let watcher = FileWatcher::new("/nonexistent/path/to/.env", None);
        assert!(matches!(watcher, Err(ConfigError::WatcherError { .. })));
    }

    #[test]
    fn test_file_watcher_watch_and_stop_idempotent() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut watcher =
            FileWatcher::new(temp_file.path(), Some(Duration::from_millis(50))).unwrap();

        assert!(watcher.watch(Arc::new(|_key: ConfigKey| {})).is_ok());
        assert!(watcher.is_running());
        assert!(watcher.stop().is_ok());
        assert!(!watcher.is_running());
        assert!(watcher.stop().is_ok());
    }

    #[test]
    fn test_file_watcher_double_watch() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut watcher = FileWatcher::new(temp_file.path(), None).unwrap();

        let callback: ChangeCallback = Arc::new(|_key: ConfigKey| {});

        assert!(watcher.watch(callback.clone()).is_ok());
        assert!(watcher.watch(callback).is_err());

        watcher.stop().unwrap();
    }

    #[test]
    fn test_file_watcher_triggers_on_change() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();
        fs::write(&path, "LOG_LEVEL=info\n").unwrap();

        let mut watcher = FileWatcher::new(&path, Some(Duration::from_millis(50))).unwrap();

        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = Arc::clone(&hits);
        watcher
            .watch(Arc::new(move |_key: ConfigKey| {
                hits_clone.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();

        thread::sleep(Duration::from_millis(150));
        fs::write(&path, "LOG_LEVEL=debug\n").unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while hits.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(25));
        }

        watcher.stop().unwrap();
        assert!(hits.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_file_watcher_custom_debounce() {
        let temp_file = NamedTempFile::new().unwrap();
        let watcher = FileWatcher::new(temp_file.path(), None)
            .unwrap()
            .with_debounce(Duration::from_secs(1));

        assert_eq!(watcher.debounce_delay, Duration::from_secs(1));
    }
}
