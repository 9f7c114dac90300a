//! Core theme domain for the course site
//!
//! This crate holds the value types shared by every layer of the theme
//! engine: the user's [`ThemeMode`] intent, the binary [`Appearance`] that is
//! actually rendered, and the pure [`resolve`] function joining the two.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod appearance;

pub use appearance::{resolve, Appearance, ParseThemeError, ThemeMode, ThemeSnapshot};
