//! Theme mode and resolved appearance
//!
//! [`ThemeMode`] is what the user asked for. [`Appearance`] is what gets
//! rendered. The two are joined by [`resolve`], which is total and pure:
//!
//! ```rust
//! use app_core::{resolve, Appearance, ThemeMode};
//!
//! assert_eq!(resolve(ThemeMode::Dark, Appearance::Light), Appearance::Dark);
//! assert_eq!(resolve(ThemeMode::System, Appearance::Dark), Appearance::Dark);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a theme literal cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseThemeError {
    /// The value is not one of the accepted mode literals
    #[error("Unknown theme mode: {0}")]
    UnknownMode(String),

    /// The value is not one of the accepted appearance literals
    #[error("Unknown appearance: {0}")]
    UnknownAppearance(String),
}

/// The user's theme intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    /// Always render light
    Light,
    /// Always render dark
    Dark,
    /// Follow the operating environment
    #[default]
    System,
}

impl ThemeMode {
    /// All modes, in the order a picker would list them
    pub const ALL: [ThemeMode; 3] = [ThemeMode::Light, ThemeMode::Dark, ThemeMode::System];

    /// The persisted string literal for this mode
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
            ThemeMode::System => "system",
        }
    }

    /// Whether this mode defers to the environment
    pub fn is_system(&self) -> bool {
        matches!(self, ThemeMode::System)
    }

    /// The explicit mode pinning the given appearance
    pub fn explicit(appearance: Appearance) -> Self {
        match appearance {
            Appearance::Light => ThemeMode::Light,
            Appearance::Dark => ThemeMode::Dark,
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemeMode {
    type Err = ParseThemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "light" => Ok(ThemeMode::Light),
            "dark" => Ok(ThemeMode::Dark),
            "system" => Ok(ThemeMode::System),
            other => Err(ParseThemeError::UnknownMode(other.to_string())),
        }
    }
}

/// The concrete appearance being rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Appearance {
    /// Light appearance
    #[default]
    Light,
    /// Dark appearance
    Dark,
}

impl Appearance {
    /// The marker literal written to the presentation root
    pub fn as_str(&self) -> &'static str {
        match self {
            Appearance::Light => "light",
            Appearance::Dark => "dark",
        }
    }

    /// The other appearance
    pub fn opposite(&self) -> Self {
        match self {
            Appearance::Light => Appearance::Dark,
            Appearance::Dark => Appearance::Light,
        }
    }

    /// Check if this is the dark appearance
    pub fn is_dark(&self) -> bool {
        matches!(self, Appearance::Dark)
    }
}

impl fmt::Display for Appearance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Appearance {
    type Err = ParseThemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "light" => Ok(Appearance::Light),
            "dark" => Ok(Appearance::Dark),
            other => Err(ParseThemeError::UnknownAppearance(other.to_string())),
        }
    }
}

/// Resolve a mode against the environment preference
pub fn resolve(mode: ThemeMode, environment: Appearance) -> Appearance {
    match mode {
        ThemeMode::Light => Appearance::Light,
        ThemeMode::Dark => Appearance::Dark,
        ThemeMode::System => environment,
    }
}

/// Mode and resolved appearance observed together
///
/// This is the payload delivered to subscribers, so a single notification
/// carries both the intent and the effective value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ThemeSnapshot {
    /// The user's intent
    pub mode: ThemeMode,
    /// The rendered appearance
    pub appearance: Appearance,
}

impl ThemeSnapshot {
    /// Build a snapshot by resolving `mode` against `environment`
    pub fn resolved(mode: ThemeMode, environment: Appearance) -> Self {
        Self { mode, appearance: resolve(mode, environment) }
    }
}
