//! Theme resolution engine
//!
//! The engine owns the user's [`ThemeMode`], the latest environment sample,
//! and the [`ThemeSnapshot`] derived from them. Every input funnels through
//! one transition path:
//!
//! 1. the input updates the state under the engine lock
//! 2. the snapshot is re-resolved; an unchanged snapshot ends the transition
//! 3. the new snapshot is published: root markers first (only when the
//!    appearance changed), then subscribers
//!
//! Publishing is never re-entered. A mode change requested from inside a
//! subscriber callback updates the state and returns; the running dispatch
//! notices the newer generation, abandons the stale round and publishes the
//! newest snapshot, so no subscriber acts on an intermediate value.

use app_core::{Appearance, ThemeMode, ThemeSnapshot};
use app_platform::{EnvSubscription, EnvironmentObserver};
use app_ui::{AppearanceEvent, PresentationRoot, Propagator};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use storage::{PreferenceStore, StorageBackend, StorageEvent, StorageWatcher};
use tokio::sync::broadcast;

use crate::config::EngineConfig;
use crate::subscription::{MountScope, SubscriberRegistry, Subscription, ThemeCallback};

#[derive(Debug)]
struct EngineState {
    mode: ThemeMode,
    environment: Appearance,
    current: ThemeSnapshot,
    published: ThemeSnapshot,
    generation: u64,
    disposed: bool,
}

struct EngineInner {
    config: EngineConfig,
    store: PreferenceStore,
    observer: EnvironmentObserver,
    propagator: Propagator,
    registry: Arc<SubscriberRegistry>,
    state: Mutex<EngineState>,
    publishing: AtomicBool,
    env_subscription: Mutex<Option<EnvSubscription>>,
    storage_watcher: Mutex<Option<StorageWatcher>>,
}

/// Builder for [`ThemeEngine`]
pub struct ThemeEngineBuilder {
    config: EngineConfig,
    backend: Arc<dyn StorageBackend>,
    observer: EnvironmentObserver,
    root: Option<Arc<dyn PresentationRoot>>,
    registry: Option<Arc<SubscriberRegistry>>,
    initial_mode: Option<ThemeMode>,
}

impl ThemeEngineBuilder {
    /// Use `config` instead of the defaults
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach the presentation root up front
    pub fn root(mut self, root: Arc<dyn PresentationRoot>) -> Self {
        self.root = Some(root);
        self
    }

    /// Share an existing subscriber registry
    pub fn registry(mut self, registry: Arc<SubscriberRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Start in `mode`, persisting it, instead of the stored mode
    pub fn initial_mode(mut self, mode: ThemeMode) -> Self {
        self.initial_mode = Some(mode);
        self
    }

    /// Resolve the initial appearance and start observing the environment
    ///
    /// An invalid configuration is logged and replaced by the defaults.
    pub fn build(mut self) -> ThemeEngine {
        if let Err(e) = self.config.validate() {
            tracing::warn!("Invalid theme engine configuration, using defaults: {}", e);
            self.config = EngineConfig::default();
        }
        let store = PreferenceStore::new(self.backend).with_key(self.config.storage_key.clone());

        let persisted = store.read();
        let mode = match self.initial_mode {
            Some(mode) => {
                if persisted != Some(mode) {
                    store.write(mode);
                }
                mode
            }
            None => persisted.unwrap_or_default(),
        };
        let environment = self.observer.current();
        let current = ThemeSnapshot::resolved(mode, environment);

        let mut propagator =
            Propagator::new(self.config.markers.clone(), self.config.event_capacity);
        if let Some(root) = self.root {
            propagator = propagator.with_root(root);
        }
        // First paint gets the right appearance, or it waits for the root
        propagator.apply(current.appearance);

        let storage_watcher = if self.config.cross_context_sync { store.watch() } else { None };

        let inner = Arc::new(EngineInner {
            config: self.config,
            store,
            observer: self.observer,
            propagator,
            registry: self.registry.unwrap_or_default(),
            state: Mutex::new(EngineState {
                mode,
                environment,
                current,
                published: current,
                generation: 0,
                disposed: false,
            }),
            publishing: AtomicBool::new(false),
            env_subscription: Mutex::new(None),
            storage_watcher: Mutex::new(storage_watcher),
        });

        let weak = Arc::downgrade(&inner);
        let subscription = inner.observer.on_change(move |preference| {
            if let Some(inner) = weak.upgrade() {
                ThemeEngine { inner }.environment_changed(preference);
            }
        });
        *inner.env_subscription.lock() = Some(subscription);

        tracing::debug!(
            %mode,
            %environment,
            appearance = %current.appearance,
            persisted = persisted.is_some(),
            "theme engine initialized"
        );

        ThemeEngine { inner }
    }
}

/// The theme resolution engine
///
/// Cloning yields another handle to the same engine. The engine stops
/// observing the environment once [`dispose`](Self::dispose) is called or the
/// last handle is dropped.
#[derive(Clone)]
pub struct ThemeEngine {
    inner: Arc<EngineInner>,
}

impl ThemeEngine {
    /// Start building an engine over a storage backend and an observer
    pub fn builder(
        backend: Arc<dyn StorageBackend>,
        observer: EnvironmentObserver,
    ) -> ThemeEngineBuilder {
        ThemeEngineBuilder {
            config: EngineConfig::default(),
            backend,
            observer,
            root: None,
            registry: None,
            initial_mode: None,
        }
    }

    /// The configuration in use
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// The user's current mode
    pub fn mode(&self) -> ThemeMode {
        self.inner.state.lock().mode
    }

    /// The resolved appearance
    pub fn resolved(&self) -> Appearance {
        self.inner.state.lock().current.appearance
    }

    /// Mode and appearance read together
    pub fn snapshot(&self) -> ThemeSnapshot {
        self.inner.state.lock().current
    }

    /// The latest environment sample
    pub fn environment(&self) -> Appearance {
        self.inner.state.lock().environment
    }

    /// Whether [`dispose`](Self::dispose) has been called
    pub fn is_disposed(&self) -> bool {
        self.inner.state.lock().disposed
    }

    /// The preference store the engine writes to
    pub fn store(&self) -> &PreferenceStore {
        &self.inner.store
    }

    /// Select a mode
    ///
    /// Selecting the current mode does nothing: no store write and no
    /// propagation.
    pub fn set_mode(&self, mode: ThemeMode) {
        let committed = self.commit("set_mode", |state| {
            if state.mode == mode {
                return false;
            }
            state.mode = mode;
            true
        });
        if committed {
            self.inner.store.write(mode);
            self.publish();
        }
    }

    /// Switch to the explicit opposite of the current appearance
    pub fn toggle(&self) {
        let next = ThemeMode::explicit(self.resolved().opposite());
        self.set_mode(next);
    }

    /// Record a new environment preference
    ///
    /// Only a `System` mode follows it; explicit modes keep their appearance.
    pub fn environment_changed(&self, preference: Appearance) {
        self.transition("environment", |state| {
            if state.environment == preference {
                return false;
            }
            state.environment = preference;
            true
        });
    }

    /// Adopt a mode persisted by another context
    ///
    /// The mode is not written back to the store. A removed or unreadable
    /// value means `System`. Events for other keys are ignored.
    pub fn storage_changed(&self, event: &StorageEvent) {
        let Some(persisted) = self.inner.store.parse_event(event) else {
            return;
        };
        let mode = persisted.unwrap_or_default();
        self.transition("storage", |state| {
            if state.mode == mode {
                return false;
            }
            state.mode = mode;
            true
        });
    }

    /// Apply pending writes made by other contexts
    ///
    /// Only the last pending write is applied. Returns whether one was found.
    pub fn sync_storage(&self) -> bool {
        let events = match self.inner.storage_watcher.lock().as_mut() {
            Some(watcher) => watcher.drain(),
            None => return false,
        };
        match events.last() {
            Some(event) => {
                self.storage_changed(event);
                true
            }
            None => false,
        }
    }

    /// Subscribe to snapshot changes
    ///
    /// Returns an inert handle once the engine is disposed.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ThemeSnapshot) + Send + Sync + 'static,
    {
        let callback: ThemeCallback = Arc::new(callback);
        match self.inner.registry.register(callback, None) {
            Some(token) => Subscription::new(&self.inner.registry, token),
            None => {
                tracing::debug!("subscribe called on disposed theme engine");
                Subscription::inert()
            }
        }
    }

    /// Subscribe for as long as `scope` is alive
    ///
    /// Returns false once the engine is disposed.
    pub fn subscribe_scoped<F>(&self, scope: &MountScope, callback: F) -> bool
    where
        F: Fn(&ThemeSnapshot) + Send + Sync + 'static,
    {
        self.inner.registry.register(Arc::new(callback), Some(scope)).is_some()
    }

    /// Receive an [`AppearanceEvent`] whenever the root changes
    pub fn subscribe_events(&self) -> broadcast::Receiver<AppearanceEvent> {
        self.inner.propagator.subscribe_events()
    }

    /// Attach the presentation root, applying the current appearance to it
    pub fn attach_root(&self, root: Arc<dyn PresentationRoot>) {
        self.inner.propagator.attach_root(root);
        let appearance = self.inner.state.lock().published.appearance;
        self.inner.propagator.apply(appearance);
    }

    /// Deliver the current snapshot to every subscriber
    pub(crate) fn announce(&self) {
        let (snapshot, generation) = {
            let state = self.inner.state.lock();
            if state.disposed {
                return;
            }
            (state.published, state.generation)
        };
        let is_current = || self.inner.state.lock().generation == generation;
        self.inner.registry.dispatch(&snapshot, &is_current);
    }

    /// Stop observing the environment and drop every subscription
    ///
    /// Later calls to any mutator or `subscribe` are no-ops.
    pub fn dispose(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.disposed {
                return;
            }
            state.disposed = true;
        }
        self.inner.env_subscription.lock().take();
        self.inner.storage_watcher.lock().take();
        self.inner.registry.close();
        tracing::debug!("theme engine disposed");
    }

    fn transition<F>(&self, reason: &'static str, update: F)
    where
        F: FnOnce(&mut EngineState) -> bool,
    {
        if self.commit(reason, update) {
            self.publish();
        }
    }

    /// Apply `update` under the engine lock; true when the snapshot changed
    fn commit<F>(&self, reason: &'static str, update: F) -> bool
    where
        F: FnOnce(&mut EngineState) -> bool,
    {
        let mut state = self.inner.state.lock();
        if state.disposed {
            tracing::debug!(reason, "ignoring theme update on disposed engine");
            return false;
        }
        if !update(&mut state) {
            return false;
        }
        let next = ThemeSnapshot::resolved(state.mode, state.environment);
        if next == state.current {
            return false;
        }
        state.current = next;
        state.generation += 1;
        tracing::debug!(
            reason,
            mode = %next.mode,
            appearance = %next.appearance,
            "theme state changed"
        );
        true
    }

    fn publish(&self) {
        loop {
            if self.inner.publishing.swap(true, Ordering::AcqRel) {
                // The running publisher will pick up the new state
                return;
            }
            {
                // Released on unwind too, so a panicking subscriber cannot
                // wedge later publishes
                let _publishing = PublishingGuard(&self.inner.publishing);
                self.drain();
            }

            let state = self.inner.state.lock();
            if state.disposed || state.current == state.published {
                return;
            }
        }
    }

    fn drain(&self) {
        loop {
            let (snapshot, generation, appearance_changed) = {
                let mut state = self.inner.state.lock();
                if state.disposed || state.current == state.published {
                    return;
                }
                let appearance_changed = state.current.appearance != state.published.appearance;
                state.published = state.current;
                (state.current, state.generation, appearance_changed)
            };

            if appearance_changed {
                self.inner.propagator.apply(snapshot.appearance);
            }

            let is_current = || self.inner.state.lock().generation == generation;
            if !self.inner.registry.dispatch(&snapshot, &is_current) {
                tracing::debug!(generation, "theme dispatch superseded by newer state");
            }
        }
    }
}

struct PublishingGuard<'a>(&'a AtomicBool);

impl Drop for PublishingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl std::fmt::Debug for ThemeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeEngine").field("state", &*self.inner.state.lock()).finish()
    }
}
