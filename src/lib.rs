//! Course Site theme support
//!
//! Re-exports the theme stack spread across the workspace crates, so an
//! application depends on one crate:
//!
//! - [`app_core`]: modes, appearances and resolution
//! - [`storage`]: the persisted preference
//! - [`app_platform`]: the environment observer and hosts
//! - [`app_ui`]: root markers and propagation
//! - [`app_state`]: the engine and the consumer-facing context
//!
//! ```rust
//! use course_site::{
//!     Appearance, DocumentRoot, EngineConfig, EnvironmentObserver, ManualHost,
//!     MemoryBackend, ThemeContext, ThemeMode,
//! };
//! use std::sync::Arc;
//!
//! let context = ThemeContext::new(EngineConfig::default());
//! context.set_mode(ThemeMode::Dark);
//!
//! let root = Arc::new(DocumentRoot::new());
//! context.start(
//!     Arc::new(MemoryBackend::new()),
//!     EnvironmentObserver::new(Arc::new(ManualHost::new(Appearance::Light))),
//!     Some(root.clone()),
//! );
//!
//! assert_eq!(context.get_resolved(), Appearance::Dark);
//! assert!(root.snapshot().has_class("dark"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod logging;

pub use app_core::{resolve, Appearance, ThemeMode, ThemeSnapshot};
pub use app_platform::{AppearanceHost, EnvironmentObserver, ManualHost, SystemHost};
pub use app_state::{
    EngineConfig, MountScope, Subscription, ThemeContext, ThemeEngine, ThemeEngineBuilder,
};
pub use app_ui::{AppearanceEvent, DocumentRoot, MarkerConfig, PresentationRoot};
pub use storage::{KvConfig, KvStore, MemoryBackend, PreferenceStore, StorageBackend};
