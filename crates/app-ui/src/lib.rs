//! Presentation layer for the course site theme engine
//!
//! This crate owns the shared presentation root that passive style rules
//! read, and the layer that writes resolved appearances onto it.
//!
//! The root carries two redundant markers that always agree:
//! - a discrete attribute (`data-theme="dark"` by default)
//! - a class token (`dark` or `light`)
//!
//! plus a `theme-color` meta hint. All three are written in one update by
//! [`Propagator::apply`], which then broadcasts an [`AppearanceEvent`] for
//! code that cannot hold a subscription handle.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use app_core::Appearance;
//! use app_ui::{DocumentRoot, MarkerConfig, Propagator};
//!
//! let root = Arc::new(DocumentRoot::new());
//! let propagator = Propagator::new(MarkerConfig::default(), 16);
//! propagator.apply(Appearance::Dark);
//! propagator.attach_root(root.clone());
//!
//! let snapshot = root.snapshot();
//! assert_eq!(snapshot.attribute("data-theme"), Some("dark"));
//! assert!(snapshot.has_class("dark"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod markers;
pub mod propagation;
pub mod root;

pub use markers::{parse_hex_color, MarkerConfig, MarkerError, RootMarkers};
pub use propagation::{Applied, AppearanceEvent, Propagator};
pub use root::{DocumentRoot, PresentationRoot, RootSnapshot};
