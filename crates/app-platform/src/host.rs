//! Host appearance sources
//!
//! An [`AppearanceHost`] is the thin seam between the engine and whatever
//! reports the environment's color scheme. The observer installs at most one
//! listener on it.

use app_core::Appearance;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Callback invoked by a host when its preference flips
pub type HostCallback = Arc<dyn Fn(Appearance) + Send + Sync>;

/// Handle identifying a listener installed on a host
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HostListenerId(pub u64);

/// Source of the environment's appearance preference
pub trait AppearanceHost: Send + Sync {
    /// Sample the current preference, or `None` if the host cannot tell
    fn sample(&self) -> Option<Appearance>;

    /// Install a change listener
    fn add_listener(&self, callback: HostCallback) -> HostListenerId;

    /// Remove a previously installed listener; unknown ids are ignored
    fn remove_listener(&self, id: HostListenerId);
}

/// Listener table shared by the bundled hosts
#[derive(Default)]
pub(crate) struct ListenerTable {
    next_id: u64,
    listeners: BTreeMap<HostListenerId, HostCallback>,
}

impl ListenerTable {
    pub(crate) fn insert(&mut self, callback: HostCallback) -> HostListenerId {
        self.next_id += 1;
        let id = HostListenerId(self.next_id);
        self.listeners.insert(id, callback);
        id
    }

    pub(crate) fn remove(&mut self, id: HostListenerId) {
        self.listeners.remove(&id);
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }

    pub(crate) fn snapshot(&self) -> Vec<HostCallback> {
        self.listeners.values().cloned().collect()
    }
}

#[derive(Default)]
struct ManualState {
    preference: Option<Appearance>,
    listeners: ListenerTable,
}

/// A host whose preference is set programmatically
///
/// Embedders bridge their platform's change signal into [`ManualHost::set`];
/// tests use it as a fake environment.
#[derive(Default)]
pub struct ManualHost {
    state: Mutex<ManualState>,
}

impl ManualHost {
    /// Create a host reporting `preference`
    pub fn new(preference: Appearance) -> Self {
        let host = Self::default();
        host.state.lock().preference = Some(preference);
        host
    }

    /// Create a host that cannot report a preference
    pub fn unsupported() -> Self {
        Self::default()
    }

    /// Change the preference, notifying listeners if it flipped
    pub fn set(&self, preference: Appearance) {
        let listeners = {
            let mut state = self.state.lock();
            if state.preference == Some(preference) {
                return;
            }
            state.preference = Some(preference);
            state.listeners.snapshot()
        };

        for listener in listeners {
            listener(preference);
        }
    }

    /// Stop reporting a preference
    pub fn set_unsupported(&self) {
        self.state.lock().preference = None;
    }

    /// Number of listeners currently installed
    pub fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }
}

impl AppearanceHost for ManualHost {
    fn sample(&self) -> Option<Appearance> {
        self.state.lock().preference
    }

    fn add_listener(&self, callback: HostCallback) -> HostListenerId {
        self.state.lock().listeners.insert(callback)
    }

    fn remove_listener(&self, id: HostListenerId) {
        self.state.lock().listeners.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_manual_host_sample() {
        assert_eq!(ManualHost::new(Appearance::Dark).sample(), Some(Appearance::Dark));
        assert_eq!(ManualHost::unsupported().sample(), None);
    }

    #[test]
    fn test_manual_host_fires_only_on_flip() {
        let host = ManualHost::new(Appearance::Light);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        host.add_listener(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        host.set(Appearance::Light);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        host.set(Appearance::Dark);
        host.set(Appearance::Dark);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_manual_host_remove_listener() {
        let host = ManualHost::new(Appearance::Light);
        let id = host.add_listener(Arc::new(|_| panic!("removed listener fired")));
        assert_eq!(host.listener_count(), 1);

        host.remove_listener(id);
        host.remove_listener(id);
        assert_eq!(host.listener_count(), 0);

        host.set(Appearance::Dark);
    }
}
