//! Storage layer for the course site theme engine
//!
//! This crate provides the durable preference slot the theme engine reads on
//! startup and writes whenever the user picks a mode, together with the
//! backends it can sit on and the change feed used for cross-context sync.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod kv;
pub mod preferences;

pub use backend::{
    MemoryBackend, StorageBackend, StorageError, StorageEvent, StorageWatcher,
    DEFAULT_WATCH_CAPACITY,
};
pub use kv::{KvConfig, KvStore};
pub use preferences::{PreferenceStore, DEFAULT_THEME_KEY};
