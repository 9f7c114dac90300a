//! Root marker configuration
//!
//! [`MarkerConfig`] names the attribute and meta hint written to the root and
//! holds the accent color advertised for each appearance. The class token is
//! always the appearance literal itself so style rules can match either
//! marker with the same value.

use app_core::Appearance;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Marker configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkerError {
    /// Attribute or meta name is empty or contains invalid characters
    #[error("Invalid marker name: {0:?}")]
    InvalidName(String),

    /// Accent color is not a `#RRGGBB` hex color
    #[error("Invalid theme color: {0:?}")]
    InvalidColor(String),
}

/// Parse a hex color string to RGB components
pub fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

/// Names and values written to the presentation root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarkerConfig {
    /// Attribute carrying the appearance literal
    pub attribute: String,
    /// Name of the meta hint carrying the accent color
    pub meta_name: String,
    /// Accent color advertised while light
    pub light_theme_color: String,
    /// Accent color advertised while dark
    pub dark_theme_color: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            attribute: "data-theme".to_string(),
            meta_name: "theme-color".to_string(),
            light_theme_color: "#FFFFFF".to_string(),
            dark_theme_color: "#0A0A0A".to_string(),
        }
    }
}

impl MarkerConfig {
    /// Set the attribute name
    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.attribute = name.into();
        self
    }

    /// Set the meta hint name
    pub fn meta_name(mut self, name: impl Into<String>) -> Self {
        self.meta_name = name.into();
        self
    }

    /// Set the accent colors for light and dark
    pub fn theme_colors(mut self, light: impl Into<String>, dark: impl Into<String>) -> Self {
        self.light_theme_color = light.into();
        self.dark_theme_color = dark.into();
        self
    }

    /// Check names and colors
    pub fn validate(&self) -> Result<(), MarkerError> {
        for name in [&self.attribute, &self.meta_name] {
            if !is_valid_name(name) {
                return Err(MarkerError::InvalidName(name.clone()));
            }
        }
        for color in [&self.light_theme_color, &self.dark_theme_color] {
            if parse_hex_color(color).is_none() {
                return Err(MarkerError::InvalidColor(color.clone()));
            }
        }
        Ok(())
    }

    /// The accent color for `appearance`
    pub fn theme_color(&self, appearance: Appearance) -> &str {
        match appearance {
            Appearance::Light => &self.light_theme_color,
            Appearance::Dark => &self.dark_theme_color,
        }
    }

    /// The full marker set for `appearance`
    pub fn markers_for(&self, appearance: Appearance) -> RootMarkers {
        RootMarkers {
            appearance,
            attribute: self.attribute.clone(),
            meta_name: self.meta_name.clone(),
            theme_color: self.theme_color(appearance).to_string(),
        }
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':')
}

/// One complete update of the root's markers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootMarkers {
    /// Appearance being applied; also the attribute value and class token
    pub appearance: Appearance,
    /// Attribute name
    pub attribute: String,
    /// Meta hint name
    pub meta_name: String,
    /// Accent color written to the meta hint
    pub theme_color: String,
}

impl RootMarkers {
    /// Class token to add
    pub fn class_token(&self) -> &'static str {
        self.appearance.as_str()
    }

    /// Class token to remove
    pub fn stale_class_token(&self) -> &'static str {
        self.appearance.opposite().as_str()
    }
}
