//! Durable key-value store for preferences
//!
//! This module provides a sled-backed [`StorageBackend`]. Values are stored
//! as raw UTF-8 so the persisted layout is exactly the literal a preference
//! holds (for the theme slot: `light`, `dark` or `system`).

use sled::Db;
use std::sync::Arc;

use crate::backend::{ChangeFeed, Result, StorageBackend, StorageWatcher, DEFAULT_WATCH_CAPACITY};

/// Key-value store configuration
#[derive(Debug, Clone)]
pub struct KvConfig {
    /// Database path
    pub path: String,
    /// Cache capacity in bytes
    pub cache_capacity: u64,
    /// Enable compression
    pub use_compression: bool,
    /// Flush interval in milliseconds (None for flush on every write)
    pub flush_every_ms: Option<u64>,
    /// Unread events kept per watcher before the oldest are dropped
    pub watch_capacity: usize,
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            path: "course_site_kv.db".to_string(),
            cache_capacity: 4 * 1024 * 1024, // 4MB
            use_compression: true,
            flush_every_ms: Some(500),
            watch_capacity: DEFAULT_WATCH_CAPACITY,
        }
    }
}

impl KvConfig {
    /// Create a new configuration with a custom path
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), ..Default::default() }
    }

    /// Set cache capacity in bytes
    pub fn cache_capacity(mut self, bytes: u64) -> Self {
        self.cache_capacity = bytes;
        self
    }

    /// Enable or disable compression
    pub fn use_compression(mut self, enabled: bool) -> Self {
        self.use_compression = enabled;
        self
    }

    /// Set flush interval in milliseconds
    pub fn flush_every_ms(mut self, ms: Option<u64>) -> Self {
        self.flush_every_ms = ms;
        self
    }

    /// Set how many unread events a watcher keeps
    pub fn watch_capacity(mut self, capacity: usize) -> Self {
        self.watch_capacity = capacity;
        self
    }
}

/// Key-value store implementation
///
/// Clones share the database and the change feed, so every clone's writes
/// reach every clone's watchers.
#[derive(Clone)]
pub struct KvStore {
    db: Arc<Db>,
    feed: ChangeFeed,
    flush_on_write: bool,
}

impl KvStore {
    /// Create a new key-value store with configuration
    pub fn new(config: KvConfig) -> Result<Self> {
        let mut db_config = sled::Config::new()
            .path(&config.path)
            .cache_capacity(config.cache_capacity)
            .use_compression(config.use_compression);

        if let Some(ms) = config.flush_every_ms {
            db_config = db_config.flush_every_ms(Some(ms));
        }

        let db = db_config.open()?;
        tracing::debug!(path = %config.path, "opened preference store");

        Ok(Self {
            db: Arc::new(db),
            feed: ChangeFeed::new(config.watch_capacity),
            flush_on_write: config.flush_every_ms.is_none(),
        })
    }

    /// Create an in-memory key-value store (for testing)
    pub fn in_memory() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;

        Ok(Self { db: Arc::new(db), feed: ChangeFeed::default(), flush_on_write: false })
    }

    /// Get a raw value by key
    pub fn get_raw(&self, key: &str) -> Result<Option<String>> {
        match self.db.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(String::from_utf8(bytes.to_vec())?)),
            None => Ok(None),
        }
    }

    /// Set a raw value by key
    pub fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        self.db.insert(key.as_bytes(), value.as_bytes())?;
        if self.flush_on_write {
            self.flush()?;
        }
        self.feed.publish(key, Some(value));
        Ok(())
    }

    /// Remove a value by key
    pub fn remove_raw(&self, key: &str) -> Result<bool> {
        let existed = self.db.remove(key.as_bytes())?.is_some();
        if existed {
            if self.flush_on_write {
                self.flush()?;
            }
            self.feed.publish(key, None);
        }
        Ok(existed)
    }

    /// Check if a key exists
    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.db.contains_key(key.as_bytes())?)
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    /// Get the number of keys in the store
    pub fn len(&self) -> usize {
        self.db.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }
}

impl StorageBackend for KvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.get_raw(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.set_raw(key, value)
    }

    fn remove(&self, key: &str) -> Result<bool> {
        self.remove_raw(key)
    }

    fn watch(&self, key: &str) -> Result<StorageWatcher> {
        Ok(self.feed.watch(key))
    }
}
