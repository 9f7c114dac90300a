//! Environment preference observer
//!
//! The observer fans many internal callers into a single host listener. The
//! host listener is installed with the first [`EnvironmentObserver::on_change`]
//! registration and removed when the last registration goes away or the
//! observer is disposed, so repeated mounts never accumulate host listeners.

use app_core::Appearance;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use crate::host::{AppearanceHost, HostCallback, HostListenerId};

type EnvCallback = Arc<dyn Fn(Appearance) + Send + Sync>;

#[derive(Default)]
struct ObserverState {
    next_id: u64,
    callbacks: BTreeMap<u64, EnvCallback>,
    host_listener: Option<HostListenerId>,
    last: Option<Appearance>,
    disposed: bool,
}

/// Watches the host environment's appearance preference
#[derive(Clone)]
pub struct EnvironmentObserver {
    host: Arc<dyn AppearanceHost>,
    state: Arc<Mutex<ObserverState>>,
}

impl EnvironmentObserver {
    /// Create an observer over `host`
    pub fn new(host: Arc<dyn AppearanceHost>) -> Self {
        Self { host, state: Arc::new(Mutex::new(ObserverState::default())) }
    }

    /// Sample the host preference
    ///
    /// Hosts that cannot report a preference are treated as light.
    pub fn current(&self) -> Appearance {
        self.host.sample().unwrap_or_else(|| {
            tracing::debug!("environment appearance unsupported, defaulting to light");
            Appearance::Light
        })
    }

    /// Register `callback` for preference flips
    ///
    /// The returned handle unregisters on drop. Registering on a disposed
    /// observer returns an inert handle.
    pub fn on_change<F>(&self, callback: F) -> EnvSubscription
    where
        F: Fn(Appearance) + Send + Sync + 'static,
    {
        let mut state = self.state.lock();
        if state.disposed {
            tracing::debug!("on_change called on disposed environment observer");
            return EnvSubscription::inert();
        }

        state.next_id += 1;
        let id = state.next_id;
        state.callbacks.insert(id, Arc::new(callback));

        if state.host_listener.is_none() {
            state.last = self.host.sample();
            let weak = Arc::downgrade(&self.state);
            let listener: HostCallback = Arc::new(move |preference| {
                if let Some(state) = weak.upgrade() {
                    dispatch(&state, preference);
                }
            });
            state.host_listener = Some(self.host.add_listener(listener));
            tracing::debug!("installed environment host listener");
        }

        EnvSubscription {
            id: Some(id),
            state: Arc::downgrade(&self.state),
            host: Some(Arc::clone(&self.host)),
        }
    }

    /// Remove the host listener and every registration
    pub fn dispose(&self) {
        let mut state = self.state.lock();
        if state.disposed {
            return;
        }
        state.disposed = true;
        state.callbacks.clear();
        if let Some(id) = state.host_listener.take() {
            self.host.remove_listener(id);
            tracing::debug!("removed environment host listener on dispose");
        }
    }

    /// Whether [`dispose`](Self::dispose) has been called
    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    /// Whether a host listener is currently installed
    pub fn has_host_listener(&self) -> bool {
        self.state.lock().host_listener.is_some()
    }

    /// Number of live registrations
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().callbacks.len()
    }
}

fn dispatch(state: &Mutex<ObserverState>, preference: Appearance) {
    let callbacks: Vec<(u64, EnvCallback)> = {
        let mut guard = state.lock();
        if guard.disposed || guard.last == Some(preference) {
            return;
        }
        guard.last = Some(preference);
        guard.callbacks.iter().map(|(id, cb)| (*id, Arc::clone(cb))).collect()
    };

    tracing::debug!(%preference, "environment appearance changed");
    for (id, callback) in callbacks {
        // A callback may have unregistered a later one
        if state.lock().callbacks.contains_key(&id) {
            callback(preference);
        }
    }
}

/// Registration handle returned by [`EnvironmentObserver::on_change`]
#[must_use = "dropping the handle unregisters the callback"]
pub struct EnvSubscription {
    id: Option<u64>,
    state: Weak<Mutex<ObserverState>>,
    host: Option<Arc<dyn AppearanceHost>>,
}

impl EnvSubscription {
    fn inert() -> Self {
        Self { id: None, state: Weak::new(), host: None }
    }

    /// Whether this handle is still registered
    pub fn is_active(&self) -> bool {
        match (self.id, self.state.upgrade()) {
            (Some(id), Some(state)) => state.lock().callbacks.contains_key(&id),
            _ => false,
        }
    }

    /// Unregister; calling this more than once is a no-op
    pub fn unsubscribe(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        let Some(state) = self.state.upgrade() else {
            return;
        };

        let mut guard = state.lock();
        guard.callbacks.remove(&id);
        if guard.callbacks.is_empty() {
            if let (Some(listener), Some(host)) = (guard.host_listener.take(), &self.host) {
                host.remove_listener(listener);
                tracing::debug!("removed environment host listener");
            }
        }
    }
}

impl Drop for EnvSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for EnvSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvSubscription").field("id", &self.id).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ManualHost;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn observer(preference: Appearance) -> (Arc<ManualHost>, EnvironmentObserver) {
        let host = Arc::new(ManualHost::new(preference));
        let observer = EnvironmentObserver::new(host.clone());
        (host, observer)
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn(Appearance) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        (count, move |_| {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_current_samples_host() {
        let (host, observer) = observer(Appearance::Dark);
        assert_eq!(observer.current(), Appearance::Dark);

        host.set(Appearance::Light);
        assert_eq!(observer.current(), Appearance::Light);
    }

    #[test]
    fn test_unsupported_host_defaults_to_light() {
        let observer = EnvironmentObserver::new(Arc::new(ManualHost::unsupported()));
        assert_eq!(observer.current(), Appearance::Light);
    }

    #[test]
    fn test_single_host_listener_for_many_callers() {
        let (host, observer) = observer(Appearance::Light);
        let (count, callback) = counter();
        let callback = Arc::new(callback);

        let subs: Vec<_> = (0..3)
            .map(|_| {
                let cb = Arc::clone(&callback);
                observer.on_change(move |pref| cb(pref))
            })
            .collect();

        assert_eq!(host.listener_count(), 1);
        assert_eq!(observer.subscriber_count(), 3);

        host.set(Appearance::Dark);
        assert_eq!(count.load(Ordering::SeqCst), 3);

        drop(subs);
        assert_eq!(host.listener_count(), 0);
        assert!(!observer.has_host_listener());
    }

    #[test]
    fn test_repeated_mounts_do_not_leak_host_listeners() {
        let (host, observer) = observer(Appearance::Light);

        for _ in 0..10 {
            let sub = observer.on_change(|_| {});
            assert_eq!(host.listener_count(), 1);
            drop(sub);
        }

        assert_eq!(host.listener_count(), 0);
    }

    #[test]
    fn test_unsubscribe_stops_delivery_and_is_idempotent() {
        let (host, observer) = observer(Appearance::Light);
        let (count, callback) = counter();
        let _keep = observer.on_change(|_| {});
        let mut sub = observer.on_change(callback);

        assert!(sub.is_active());
        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!sub.is_active());

        host.set(Appearance::Dark);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(host.listener_count(), 1);
    }

    #[test]
    fn test_dispose_removes_host_listener() {
        let (host, observer) = observer(Appearance::Light);
        let (count, callback) = counter();
        let sub = observer.on_change(callback);

        observer.dispose();
        observer.dispose();
        assert!(observer.is_disposed());
        assert_eq!(host.listener_count(), 0);

        host.set(Appearance::Dark);
        assert_eq!(count.load(Ordering::SeqCst), 0);

        drop(sub);
        let late = observer.on_change(|_| panic!("fired after dispose"));
        assert!(!late.is_active());
        host.set(Appearance::Light);
    }

    #[test]
    fn test_callback_can_unregister_a_later_one() {
        let (host, observer) = observer(Appearance::Light);
        let victim: Arc<Mutex<Option<EnvSubscription>>> = Arc::new(Mutex::new(None));

        let slot = Arc::clone(&victim);
        let _first = observer.on_change(move |_| {
            if let Some(mut sub) = slot.lock().take() {
                sub.unsubscribe();
            }
        });
        *victim.lock() = Some(observer.on_change(|_| panic!("unregistered callback fired")));

        host.set(Appearance::Dark);
        assert_eq!(observer.subscriber_count(), 1);
    }
}
