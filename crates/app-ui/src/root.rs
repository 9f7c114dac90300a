//! The shared presentation root
//!
//! [`PresentationRoot`] is the seam to whatever node style rules key off.
//! [`DocumentRoot`] is the in-process implementation: attributes, class list
//! and meta hints behind one lock, so a reader can never see the attribute
//! and the class disagree.

use app_core::Appearance;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::markers::RootMarkers;

/// The node carrying the appearance markers
#[cfg_attr(test, mockall::automock)]
pub trait PresentationRoot: Send + Sync {
    /// Write every marker in `markers` as one update
    fn apply_markers(&self, markers: &RootMarkers);

    /// The appearance currently carried, if any has been applied
    fn current_appearance(&self) -> Option<Appearance>;
}

/// Consistent copy of a [`DocumentRoot`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootSnapshot {
    /// Attributes by name
    pub attributes: BTreeMap<String, String>,
    /// Class tokens
    pub classes: BTreeSet<String>,
    /// Meta hints by name
    pub meta: BTreeMap<String, String>,
    /// Appearance last applied through markers
    pub appearance: Option<Appearance>,
}

impl RootSnapshot {
    /// Get an attribute value
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Check for a class token
    pub fn has_class(&self, token: &str) -> bool {
        self.classes.contains(token)
    }

    /// Get a meta hint value
    pub fn meta(&self, name: &str) -> Option<&str> {
        self.meta.get(name).map(String::as_str)
    }
}

/// In-process presentation root
#[derive(Debug, Default)]
pub struct DocumentRoot {
    state: RwLock<RootSnapshot>,
    writes: AtomicUsize,
}

impl DocumentRoot {
    /// Create an empty root
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an unrelated class token (page-level classes set by other code)
    pub fn with_class(self, token: impl Into<String>) -> Self {
        self.state.write().classes.insert(token.into());
        self
    }

    /// Take a consistent copy of the root
    pub fn snapshot(&self) -> RootSnapshot {
        self.state.read().clone()
    }

    /// Number of marker updates applied
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl PresentationRoot for DocumentRoot {
    fn apply_markers(&self, markers: &RootMarkers) {
        let mut state = self.state.write();
        state.attributes.insert(markers.attribute.clone(), markers.appearance.as_str().to_string());
        state.classes.remove(markers.stale_class_token());
        state.classes.insert(markers.class_token().to_string());
        state.meta.insert(markers.meta_name.clone(), markers.theme_color.clone());
        state.appearance = Some(markers.appearance);
        self.writes.fetch_add(1, Ordering::SeqCst);
    }

    fn current_appearance(&self) -> Option<Appearance> {
        self.state.read().appearance
    }
}
