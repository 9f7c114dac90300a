//! Storage backends and change notifications
//!
//! A [`StorageBackend`] is a flat string-to-string slot map. Every operation
//! is fallible so callers can see a disabled or broken backend; the
//! [`PreferenceStore`](crate::PreferenceStore) above it decides how to
//! recover. Writes made through a backend are observable by any other
//! context sharing it through a [`StorageWatcher`].

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

/// Default number of unread events a watcher may fall behind by
pub const DEFAULT_WATCH_CAPACITY: usize = 64;

/// Storage error types
#[derive(Debug, Error)]
pub enum StorageError {
    /// Sled database error
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    /// The backend refused the operation
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// A stored value was not valid UTF-8
    #[error("Encoding error: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// A write to a watched key, as seen by another context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// The key that changed
    pub key: String,
    /// The new raw value, or `None` if the key was removed
    pub new_value: Option<String>,
}

/// A synchronous string slot store
pub trait StorageBackend: Send + Sync {
    /// Get the raw value stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a raw value under `key`
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`, returning whether it existed
    fn remove(&self, key: &str) -> Result<bool>;

    /// Watch writes to `key` made by any context sharing this backend
    fn watch(&self, key: &str) -> Result<StorageWatcher>;
}

/// Fan-out of writes to every [`StorageWatcher`] of one backend
///
/// The channel is bounded and lagging: a watcher nobody reads only loses its
/// oldest events, and a write never waits on a reader.
#[derive(Debug, Clone)]
pub(crate) struct ChangeFeed {
    tx: broadcast::Sender<StorageEvent>,
}

impl ChangeFeed {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub(crate) fn publish(&self, key: &str, new_value: Option<&str>) {
        let event =
            StorageEvent { key: key.to_string(), new_value: new_value.map(str::to_string) };
        // No watchers is fine
        let _ = self.tx.send(event);
    }

    pub(crate) fn watch(&self, key: &str) -> StorageWatcher {
        StorageWatcher { key: key.to_string(), rx: self.tx.subscribe() }
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_WATCH_CAPACITY)
    }
}

/// Receives [`StorageEvent`]s for a single key
///
/// Reads never wait. A watcher that falls more than the feed capacity
/// behind skips the oldest events; the latest write is always kept.
pub struct StorageWatcher {
    key: String,
    rx: broadcast::Receiver<StorageEvent>,
}

impl StorageWatcher {
    /// The watched key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Take the next pending event for the watched key, if any
    pub fn try_next(&mut self) -> Option<StorageEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if event.key == self.key => return Some(event),
                Ok(_) => continue,
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::debug!(key = %self.key, skipped, "storage watcher lagged");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Drain every pending event
    pub fn drain(&mut self) -> Vec<StorageEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}

impl std::fmt::Debug for StorageWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageWatcher").field("key", &self.key).finish_non_exhaustive()
    }
}

/// In-process backend
///
/// Clones of an `Arc<MemoryBackend>` behave like browser tabs sharing one
/// origin's storage. The backend can be switched off to simulate storage
/// that is disabled or throws.
#[derive(Default)]
pub struct MemoryBackend {
    values: Mutex<HashMap<String, String>>,
    feed: ChangeFeed,
    unavailable: AtomicBool,
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend whose watchers keep at most `capacity` unread events
    pub fn with_watch_capacity(capacity: usize) -> Self {
        Self { feed: ChangeFeed::new(capacity), ..Default::default() }
    }

    /// Create a backend that rejects every operation
    pub fn unavailable() -> Self {
        let backend = Self::default();
        backend.set_available(false);
        backend
    }

    /// Enable or disable the backend
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("memory backend disabled".to_string()));
        }
        Ok(())
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.check()?;
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.check()?;
        self.values.lock().insert(key.to_string(), value.to_string());
        self.feed.publish(key, Some(value));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        self.check()?;
        let existed = self.values.lock().remove(key).is_some();
        if existed {
            self.feed.publish(key, None);
        }
        Ok(existed)
    }

    fn watch(&self, key: &str) -> Result<StorageWatcher> {
        self.check()?;
        Ok(self.feed.watch(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_set_and_get() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.get("theme").unwrap(), None);

        backend.set("theme", "dark").unwrap();
        assert_eq!(backend.get("theme").unwrap(), Some("dark".to_string()));
    }

    #[test]
    fn test_memory_remove() {
        let backend = MemoryBackend::new();
        backend.set("theme", "light").unwrap();

        assert!(backend.remove("theme").unwrap());
        assert!(!backend.remove("theme").unwrap());
        assert_eq!(backend.get("theme").unwrap(), None);
    }

    #[test]
    fn test_memory_unavailable_rejects_operations() {
        let backend = MemoryBackend::unavailable();

        assert!(matches!(backend.get("theme"), Err(StorageError::Unavailable(_))));
        assert!(matches!(backend.set("theme", "dark"), Err(StorageError::Unavailable(_))));
        assert!(backend.watch("theme").is_err());

        backend.set_available(true);
        backend.set("theme", "dark").unwrap();
        assert_eq!(backend.get("theme").unwrap(), Some("dark".to_string()));
    }

    #[test]
    fn test_memory_watch_reports_writes_to_key() {
        let backend = MemoryBackend::new();
        let mut watcher = backend.watch("theme").unwrap();

        backend.set("other", "x").unwrap();
        backend.set("theme", "dark").unwrap();
        backend.remove("theme").unwrap();

        let events = watcher.drain();
        assert_eq!(
            events,
            vec![
                StorageEvent { key: "theme".to_string(), new_value: Some("dark".to_string()) },
                StorageEvent { key: "theme".to_string(), new_value: None },
            ]
        );
        assert!(watcher.try_next().is_none());
    }

    #[test]
    fn test_unread_watcher_never_blocks_writer() {
        let backend = MemoryBackend::with_watch_capacity(8);
        let mut watcher = backend.watch("theme").unwrap();

        for i in 0..1000 {
            let value = if i % 2 == 0 { "dark" } else { "light" };
            backend.set("theme", value).unwrap();
        }

        let events = watcher.drain();
        assert!(events.len() <= 8);
        assert_eq!(events.last().unwrap().new_value, Some("light".to_string()));
        assert!(watcher.try_next().is_none());
    }

    #[test]
    fn test_watchers_share_one_feed() {
        let backend = MemoryBackend::new();
        let mut first = backend.watch("theme").unwrap();
        let mut second = backend.watch("theme").unwrap();

        backend.set("theme", "dark").unwrap();

        assert_eq!(first.try_next().unwrap().new_value, Some("dark".to_string()));
        assert_eq!(second.try_next().unwrap().new_value, Some("dark".to_string()));
    }

    #[test]
    fn test_dropped_watcher_does_not_affect_writes() {
        let backend = MemoryBackend::new();
        drop(backend.watch("theme").unwrap());

        backend.set("theme", "light").unwrap();
        assert_eq!(backend.get("theme").unwrap(), Some("light".to_string()));
    }
}
