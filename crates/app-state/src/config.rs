//! Theme engine configuration
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration:
//!
//! ```rust
//! use app_state::EngineConfig;
//!
//! let config = EngineConfig::from_json_str("{}").unwrap();
//! assert_eq!(config.storage_key, "theme");
//!
//! let config = EngineConfig::from_json_str(
//!     r#"{"storageKey":"course-theme","markers":{"attribute":"data-mode"}}"#,
//! )
//! .unwrap();
//! assert_eq!(config.markers.attribute, "data-mode");
//! ```

use app_core::Appearance;
use app_ui::{MarkerConfig, MarkerError};
use serde::{Deserialize, Serialize};
use storage::DEFAULT_THEME_KEY;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Malformed JSON
    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid marker settings
    #[error("Invalid marker configuration: {0}")]
    Markers(#[from] MarkerError),

    /// Empty storage key
    #[error("Storage key must not be empty")]
    EmptyStorageKey,

    /// Zero event capacity
    #[error("Event capacity must be at least 1")]
    ZeroEventCapacity,
}

/// Result type for configuration loading
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Theme engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Key holding the persisted mode
    pub storage_key: String,
    /// Root marker names and accent colors
    pub markers: MarkerConfig,
    /// Appearance reported by a context whose engine has not started
    pub fallback_appearance: Appearance,
    /// Adopt modes written to the store by other contexts
    pub cross_context_sync: bool,
    /// Buffer size of the appearance broadcast channel
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_THEME_KEY.to_string(),
            markers: MarkerConfig::default(),
            fallback_appearance: Appearance::Light,
            cross_context_sync: true,
            event_capacity: 16,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field
    pub fn validate(&self) -> Result<()> {
        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::EmptyStorageKey);
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::ZeroEventCapacity);
        }
        self.markers.validate()?;
        Ok(())
    }

    /// Set the storage key
    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Set the marker configuration
    pub fn markers(mut self, markers: MarkerConfig) -> Self {
        self.markers = markers;
        self
    }

    /// Set the pre-start fallback appearance
    pub fn fallback_appearance(mut self, appearance: Appearance) -> Self {
        self.fallback_appearance = appearance;
        self
    }

    /// Enable or disable cross-context sync
    pub fn cross_context_sync(mut self, enabled: bool) -> Self {
        self.cross_context_sync = enabled;
        self
    }

    /// Set the broadcast buffer size
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}
