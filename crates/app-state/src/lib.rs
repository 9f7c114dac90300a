//! Theme state for Course Site
//!
//! This crate ties the preference store, the environment observer and the
//! presentation root together: [`ThemeEngine`] resolves the appearance and
//! publishes changes, [`ThemeContext`] is the handle consumers hold.
//!
//! ```rust
//! use app_core::{Appearance, ThemeMode};
//! use app_platform::{EnvironmentObserver, ManualHost};
//! use app_state::ThemeEngine;
//! use app_ui::DocumentRoot;
//! use std::sync::Arc;
//! use storage::MemoryBackend;
//!
//! let host = Arc::new(ManualHost::new(Appearance::Dark));
//! let root = Arc::new(DocumentRoot::new());
//! let engine = ThemeEngine::builder(
//!     Arc::new(MemoryBackend::new()),
//!     EnvironmentObserver::new(host.clone()),
//! )
//! .root(root.clone())
//! .build();
//!
//! assert_eq!(engine.resolved(), Appearance::Dark);
//! engine.set_mode(ThemeMode::Light);
//! assert_eq!(root.snapshot().attribute("data-theme"), Some("light"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod context;
pub mod engine;
pub mod subscription;

pub use config::{ConfigError, EngineConfig};
pub use context::ThemeContext;
pub use engine::{ThemeEngine, ThemeEngineBuilder};
pub use subscription::{
    MountScope, SubscriberRegistry, Subscription, SubscriptionToken, ThemeCallback,
};
