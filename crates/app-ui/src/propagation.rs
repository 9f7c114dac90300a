//! Propagation of resolved appearances
//!
//! [`Propagator`] is the single writer of the presentation root. It applies
//! the attribute, class token and accent hint in one call to
//! [`PresentationRoot::apply_markers`], skips values the root already
//! carries, and queues the latest value while no root is attached.

use app_core::Appearance;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::markers::MarkerConfig;
use crate::root::PresentationRoot;

/// Broadcast payload announcing a new appearance on the root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppearanceEvent {
    /// The appearance now carried by the root
    pub appearance: Appearance,
}

/// Outcome of [`Propagator::apply`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Markers were written and the event broadcast
    Written,
    /// The root already carried this appearance
    Unchanged,
    /// No root is attached yet; the value will be applied on attach
    Queued,
}

struct PropagatorState {
    root: Option<Arc<dyn PresentationRoot>>,
    pending: Option<Appearance>,
}

/// Writes appearances to the presentation root
pub struct Propagator {
    markers: MarkerConfig,
    state: Mutex<PropagatorState>,
    events: broadcast::Sender<AppearanceEvent>,
}

impl Propagator {
    /// Create a propagator with no root attached
    ///
    /// `event_capacity` bounds how many events a slow broadcast receiver may
    /// lag behind before it starts missing them.
    pub fn new(markers: MarkerConfig, event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self { markers, state: Mutex::new(PropagatorState { root: None, pending: None }), events }
    }

    /// Attach `root` at construction
    pub fn with_root(self, root: Arc<dyn PresentationRoot>) -> Self {
        self.state.lock().root = Some(root);
        self
    }

    /// The marker configuration
    pub fn markers(&self) -> &MarkerConfig {
        &self.markers
    }

    /// Apply `appearance` to the root
    pub fn apply(&self, appearance: Appearance) -> Applied {
        let mut state = self.state.lock();
        let Some(root) = state.root.clone() else {
            tracing::debug!(%appearance, "presentation root missing, queueing appearance");
            state.pending = Some(appearance);
            return Applied::Queued;
        };
        self.write(root.as_ref(), appearance)
    }

    /// Attach the root, flushing any queued appearance onto it
    ///
    /// Returns the appearance that was flushed, if one was pending.
    pub fn attach_root(&self, root: Arc<dyn PresentationRoot>) -> Option<Appearance> {
        let mut state = self.state.lock();
        let pending = state.pending.take();
        if let Some(appearance) = pending {
            self.write(root.as_ref(), appearance);
        }
        state.root = Some(root);
        pending
    }

    /// Whether a root is attached
    pub fn has_root(&self) -> bool {
        self.state.lock().root.is_some()
    }

    /// The appearance waiting for a root, if any
    pub fn pending(&self) -> Option<Appearance> {
        self.state.lock().pending
    }

    /// Receive an [`AppearanceEvent`] every time the root changes
    pub fn subscribe_events(&self) -> broadcast::Receiver<AppearanceEvent> {
        self.events.subscribe()
    }

    fn write(&self, root: &dyn PresentationRoot, appearance: Appearance) -> Applied {
        if root.current_appearance() == Some(appearance) {
            return Applied::Unchanged;
        }

        root.apply_markers(&self.markers.markers_for(appearance));
        tracing::debug!(%appearance, "applied appearance to presentation root");

        // No receivers is fine; the event is best-effort
        let _ = self.events.send(AppearanceEvent { appearance });
        Applied::Written
    }
}

impl std::fmt::Debug for Propagator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Propagator")
            .field("markers", &self.markers)
            .field("has_root", &self.has_root())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::root::{DocumentRoot, MockPresentationRoot};
    use mockall::predicate::*;

    fn propagator() -> Propagator {
        Propagator::new(MarkerConfig::default(), 8)
    }

    #[test]
    fn test_apply_writes_markers_and_broadcasts() {
        let root = Arc::new(DocumentRoot::new());
        let propagator = propagator().with_root(root.clone());
        let mut events = propagator.subscribe_events();

        assert_eq!(propagator.apply(Appearance::Dark), Applied::Written);

        let snapshot = root.snapshot();
        assert_eq!(snapshot.attribute("data-theme"), Some("dark"));
        assert!(snapshot.has_class("dark"));
        assert_eq!(events.try_recv().unwrap(), AppearanceEvent { appearance: Appearance::Dark });
    }

    #[test]
    fn test_apply_same_value_is_noop() {
        let root = Arc::new(DocumentRoot::new());
        let propagator = propagator().with_root(root.clone());
        let mut events = propagator.subscribe_events();

        propagator.apply(Appearance::Light);
        assert_eq!(propagator.apply(Appearance::Light), Applied::Unchanged);

        assert_eq!(root.write_count(), 1);
        assert!(events.try_recv().is_ok());
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_apply_without_root_queues_latest() {
        let propagator = propagator();

        assert_eq!(propagator.apply(Appearance::Dark), Applied::Queued);
        assert_eq!(propagator.apply(Appearance::Light), Applied::Queued);
        assert_eq!(propagator.pending(), Some(Appearance::Light));

        let root = Arc::new(DocumentRoot::new());
        assert_eq!(propagator.attach_root(root.clone()), Some(Appearance::Light));
        assert_eq!(propagator.pending(), None);
        assert!(propagator.has_root());
        assert_eq!(root.current_appearance(), Some(Appearance::Light));
        assert_eq!(root.write_count(), 1);
    }

    #[test]
    fn test_attach_without_pending() {
        let propagator = propagator();
        let root = Arc::new(DocumentRoot::new());
        assert_eq!(propagator.attach_root(root.clone()), None);
        assert_eq!(root.write_count(), 0);
    }

    #[test]
    fn test_apply_sends_one_marker_update_per_change() {
        let mut root = MockPresentationRoot::new();
        root.expect_current_appearance().returning(|| Some(Appearance::Light));
        root.expect_apply_markers()
            .with(function(|m: &crate::RootMarkers| {
                m.appearance == Appearance::Dark
                    && m.attribute == "data-theme"
                    && m.theme_color == "#0A0A0A"
            }))
            .times(1)
            .return_const(());

        let propagator = propagator().with_root(Arc::new(root));
        assert_eq!(propagator.apply(Appearance::Dark), Applied::Written);
        assert_eq!(propagator.apply(Appearance::Light), Applied::Unchanged);
    }
}
