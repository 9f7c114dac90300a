//! The persisted theme preference
//!
//! [`PreferenceStore`] mirrors the user's [`ThemeMode`] into a single key of a
//! [`StorageBackend`]. It never fails: a backend that is disabled or broken
//! reads as "nothing persisted" and drops writes, with a warning logged for
//! diagnostics. A theme engine must not break page load because storage is
//! off.

use app_core::ThemeMode;
use std::sync::Arc;

use crate::backend::{MemoryBackend, StorageBackend, StorageEvent, StorageWatcher};

/// Key holding the theme preference unless configured otherwise
pub const DEFAULT_THEME_KEY: &str = "theme";

/// Durable slot holding the user's last explicit theme mode
#[derive(Clone)]
pub struct PreferenceStore {
    backend: Arc<dyn StorageBackend>,
    key: String,
}

impl PreferenceStore {
    /// Create a store over `backend` using [`DEFAULT_THEME_KEY`]
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend, key: DEFAULT_THEME_KEY.to_string() }
    }

    /// Create a store over a fresh in-memory backend
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Use a different key for the preference
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// The key the preference is stored under
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the persisted mode, if any
    pub fn read(&self) -> Option<ThemeMode> {
        match self.backend.get(&self.key) {
            Ok(Some(raw)) => parse_mode(&self.key, &raw),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key = %self.key, "Failed to read theme preference: {}", e);
                None
            }
        }
    }

    /// Persist `mode`
    pub fn write(&self, mode: ThemeMode) {
        if let Err(e) = self.backend.set(&self.key, mode.as_str()) {
            tracing::warn!(key = %self.key, %mode, "Failed to persist theme preference: {}", e);
        }
    }

    /// Remove the persisted mode, deferring to the environment from now on
    pub fn clear(&self) {
        if let Err(e) = self.backend.remove(&self.key) {
            tracing::warn!(key = %self.key, "Failed to clear theme preference: {}", e);
        }
    }

    /// Watch writes to the preference made by other contexts
    ///
    /// Returns `None` when the backend cannot be watched.
    pub fn watch(&self) -> Option<StorageWatcher> {
        match self.backend.watch(&self.key) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                tracing::warn!(key = %self.key, "Failed to watch theme preference: {}", e);
                None
            }
        }
    }

    /// Interpret a storage event
    ///
    /// Returns `None` when the event concerns another key. Otherwise returns
    /// the newly persisted mode, where an unreadable value counts as removed.
    pub fn parse_event(&self, event: &StorageEvent) -> Option<Option<ThemeMode>> {
        if event.key != self.key {
            return None;
        }
        Some(event.new_value.as_deref().and_then(|raw| parse_mode(&self.key, raw)))
    }
}

impl std::fmt::Debug for PreferenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceStore").field("key", &self.key).finish_non_exhaustive()
    }
}

fn parse_mode(key: &str, raw: &str) -> Option<ThemeMode> {
    match raw.parse() {
        Ok(mode) => Some(mode),
        Err(e) => {
            tracing::warn!(key, "Ignoring persisted theme preference: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KvStore;

    #[test]
    fn test_read_empty_store() {
        let store = PreferenceStore::in_memory();
        assert_eq!(store.read(), None);
    }

    #[test]
    fn test_write_then_read_every_mode() {
        let store = PreferenceStore::in_memory();
        for mode in ThemeMode::ALL {
            store.write(mode);
            assert_eq!(store.read(), Some(mode));
        }
    }

    #[test]
    fn test_round_trip_across_store_instances() {
        let backend: Arc<dyn StorageBackend> = Arc::new(KvStore::in_memory().unwrap());

        for mode in ThemeMode::ALL {
            PreferenceStore::new(Arc::clone(&backend)).write(mode);
            let reloaded = PreferenceStore::new(Arc::clone(&backend));
            assert_eq!(reloaded.read(), Some(mode));
        }
    }

    #[test]
    fn test_persisted_layout_is_plain_literal() {
        let backend = Arc::new(MemoryBackend::new());
        let store = PreferenceStore::new(backend.clone());

        store.write(ThemeMode::Dark);
        assert_eq!(backend.get(DEFAULT_THEME_KEY).unwrap(), Some("dark".to_string()));
    }

    #[test]
    fn test_custom_key() {
        let backend = Arc::new(MemoryBackend::new());
        let store = PreferenceStore::new(backend.clone()).with_key("course-theme");

        store.write(ThemeMode::Light);
        assert_eq!(store.key(), "course-theme");
        assert_eq!(backend.get("course-theme").unwrap(), Some("light".to_string()));
        assert_eq!(backend.get(DEFAULT_THEME_KEY).unwrap(), None);
    }

    #[test]
    fn test_unavailable_backend_reads_as_empty() {
        let backend = Arc::new(MemoryBackend::unavailable());
        let store = PreferenceStore::new(backend.clone());

        store.write(ThemeMode::Dark);
        assert_eq!(store.read(), None);
        store.clear();
        assert!(store.watch().is_none());

        backend.set_available(true);
        assert_eq!(store.read(), None);
    }

    #[test]
    fn test_unknown_literal_reads_as_empty() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set(DEFAULT_THEME_KEY, "sepia").unwrap();

        let store = PreferenceStore::new(backend);
        assert_eq!(store.read(), None);
    }

    #[test]
    fn test_clear_removes_preference() {
        let store = PreferenceStore::in_memory();
        store.write(ThemeMode::Light);
        store.clear();
        assert_eq!(store.read(), None);
    }

    #[test]
    fn test_parse_event() {
        let store = PreferenceStore::in_memory();
        let event = |key: &str, value: Option<&str>| StorageEvent {
            key: key.to_string(),
            new_value: value.map(str::to_string),
        };

        assert_eq!(store.parse_event(&event("other", Some("dark"))), None);
        assert_eq!(store.parse_event(&event("theme", Some("dark"))), Some(Some(ThemeMode::Dark)));
        assert_eq!(store.parse_event(&event("theme", None)), Some(None));
        assert_eq!(store.parse_event(&event("theme", Some("bogus"))), Some(None));
    }

    #[test]
    fn test_watch_sees_writes_from_other_store() {
        let backend: Arc<dyn StorageBackend> = Arc::new(MemoryBackend::new());
        let tab_a = PreferenceStore::new(Arc::clone(&backend));
        let tab_b = PreferenceStore::new(Arc::clone(&backend));

        let mut watcher = tab_b.watch().unwrap();
        tab_a.write(ThemeMode::Dark);

        let event = watcher.try_next().unwrap();
        assert_eq!(tab_b.parse_event(&event), Some(Some(ThemeMode::Dark)));
    }
}
