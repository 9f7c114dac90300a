//! Theme context
//!
//! [`ThemeContext`] is what consumers hold. It can be created before the
//! engine's dependencies exist: until [`start`](ThemeContext::start) is
//! called it buffers the requested mode and accepts subscriptions, and
//! `start` then delivers the first snapshot to everyone who subscribed early.

use app_core::{resolve, Appearance, ThemeMode, ThemeSnapshot};
use app_platform::EnvironmentObserver;
use app_ui::PresentationRoot;
use parking_lot::Mutex;
use std::sync::Arc;
use storage::StorageBackend;

use crate::config::EngineConfig;
use crate::engine::ThemeEngine;
use crate::subscription::{MountScope, SubscriberRegistry, Subscription, ThemeCallback};

#[derive(Default)]
struct ContextState {
    engine: Option<ThemeEngine>,
    buffered: Option<ThemeMode>,
}

/// Consumer-facing handle to the theme
pub struct ThemeContext {
    config: EngineConfig,
    registry: Arc<SubscriberRegistry>,
    state: Mutex<ContextState>,
}

impl ThemeContext {
    /// Create a context that has not started yet
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            registry: Arc::new(SubscriberRegistry::new()),
            state: Mutex::new(ContextState::default()),
        }
    }

    /// Build the engine and notify early subscribers
    ///
    /// A mode set before this call is applied and persisted. Starting twice
    /// returns the running engine; starting after [`dispose`](Self::dispose)
    /// returns a disposed one.
    pub fn start(
        &self,
        backend: Arc<dyn StorageBackend>,
        observer: EnvironmentObserver,
        root: Option<Arc<dyn PresentationRoot>>,
    ) -> ThemeEngine {
        let engine = {
            let mut state = self.state.lock();
            if let Some(engine) = &state.engine {
                tracing::debug!("theme context already started");
                return engine.clone();
            }

            if self.registry.is_closed() {
                // Disposed before start: nothing is persisted or painted
                tracing::debug!("theme context started after dispose");
                let engine = ThemeEngine::builder(backend, observer)
                    .config(self.config.clone().cross_context_sync(false))
                    .registry(Arc::clone(&self.registry))
                    .build();
                engine.dispose();
                state.buffered = None;
                state.engine = Some(engine.clone());
                return engine;
            }

            let mut builder = ThemeEngine::builder(backend, observer)
                .config(self.config.clone())
                .registry(Arc::clone(&self.registry));
            if let Some(root) = root {
                builder = builder.root(root);
            }
            if let Some(mode) = state.buffered.take() {
                builder = builder.initial_mode(mode);
            }

            let engine = builder.build();
            state.engine = Some(engine.clone());
            engine
        };

        engine.announce();
        engine
    }

    /// The running engine, if started
    pub fn engine(&self) -> Option<ThemeEngine> {
        self.state.lock().engine.clone()
    }

    /// Whether [`start`](Self::start) has been called
    pub fn is_ready(&self) -> bool {
        self.state.lock().engine.is_some()
    }

    /// The user's mode
    pub fn get_mode(&self) -> ThemeMode {
        let state = self.state.lock();
        match &state.engine {
            Some(engine) => engine.mode(),
            None => state.buffered.unwrap_or_default(),
        }
    }

    /// The resolved appearance
    ///
    /// Before start this is the buffered explicit mode's appearance, or the
    /// configured fallback.
    pub fn get_resolved(&self) -> Appearance {
        self.snapshot().appearance
    }

    /// Mode and appearance read together
    pub fn snapshot(&self) -> ThemeSnapshot {
        let state = self.state.lock();
        match &state.engine {
            Some(engine) => engine.snapshot(),
            None => {
                let mode = state.buffered.unwrap_or_default();
                ThemeSnapshot { mode, appearance: resolve(mode, self.config.fallback_appearance) }
            }
        }
    }

    /// Select a mode; before start the last request wins
    pub fn set_mode(&self, mode: ThemeMode) {
        let engine = {
            let mut state = self.state.lock();
            match &state.engine {
                Some(engine) => engine.clone(),
                None => {
                    state.buffered = Some(mode);
                    return;
                }
            }
        };
        engine.set_mode(mode);
    }

    /// Switch to the explicit opposite of the current appearance
    pub fn toggle(&self) {
        let next = ThemeMode::explicit(self.get_resolved().opposite());
        self.set_mode(next);
    }

    /// Subscribe to snapshot changes
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ThemeSnapshot) + Send + Sync + 'static,
    {
        if let Some(engine) = self.engine() {
            return engine.subscribe(callback);
        }
        let callback: ThemeCallback = Arc::new(callback);
        match self.registry.register(callback, None) {
            Some(token) => Subscription::new(&self.registry, token),
            None => Subscription::inert(),
        }
    }

    /// Subscribe for as long as `scope` is alive
    pub fn subscribe_scoped<F>(&self, scope: &MountScope, callback: F) -> bool
    where
        F: Fn(&ThemeSnapshot) + Send + Sync + 'static,
    {
        self.registry.register(Arc::new(callback), Some(scope)).is_some()
    }

    /// Drop registrations whose scope has gone; returns how many were removed
    pub fn prune(&self) -> usize {
        self.registry.prune()
    }

    /// Number of live registrations
    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    /// Dispose the engine, or refuse further subscriptions if not started
    pub fn dispose(&self) {
        match self.engine() {
            Some(engine) => engine.dispose(),
            None => self.registry.close(),
        }
    }
}

impl Default for ThemeContext {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl std::fmt::Debug for ThemeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeContext")
            .field("config", &self.config)
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use app_platform::ManualHost;
    use app_ui::DocumentRoot;
    use parking_lot::Mutex as PlMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use storage::MemoryBackend;

    fn start(
        context: &ThemeContext,
        backend: Arc<MemoryBackend>,
        environment: Appearance,
    ) -> (ThemeEngine, Arc<ManualHost>) {
        let host = Arc::new(ManualHost::new(environment));
        let engine = context.start(backend, EnvironmentObserver::new(host.clone()), None);
        (engine, host)
    }

    #[test]
    fn test_before_start_uses_fallback() {
        let context = ThemeContext::new(EngineConfig::default().fallback_appearance(Appearance::Dark));

        assert!(!context.is_ready());
        assert_eq!(context.get_mode(), ThemeMode::System);
        assert_eq!(context.get_resolved(), Appearance::Dark);
    }

    #[test]
    fn test_buffered_mode_last_wins_and_is_persisted() {
        let context = ThemeContext::default();
        context.set_mode(ThemeMode::Dark);
        context.set_mode(ThemeMode::Light);
        assert_eq!(context.get_mode(), ThemeMode::Light);
        assert_eq!(context.get_resolved(), Appearance::Light);

        let backend = Arc::new(MemoryBackend::new());
        let (engine, _host) = start(&context, backend.clone(), Appearance::Dark);

        assert_eq!(engine.mode(), ThemeMode::Light);
        assert_eq!(backend.get("theme").unwrap(), Some("light".to_string()));
    }

    #[test]
    fn test_early_subscribers_get_first_snapshot() {
        let context = ThemeContext::default();
        let seen = Arc::new(PlMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _subscription = context.subscribe(move |snapshot| sink.lock().push(*snapshot));

        start(&context, Arc::new(MemoryBackend::new()), Appearance::Dark);

        assert_eq!(
            *seen.lock(),
            vec![ThemeSnapshot { mode: ThemeMode::System, appearance: Appearance::Dark }]
        );
    }

    #[test]
    fn test_start_twice_returns_running_engine() {
        let context = ThemeContext::default();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let _subscription = context.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let backend = Arc::new(MemoryBackend::new());
        let (first, _host) = start(&context, backend.clone(), Appearance::Light);
        first.set_mode(ThemeMode::Dark);
        let (second, _other) = start(&context, backend, Appearance::Light);

        assert_eq!(second.mode(), ThemeMode::Dark);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_facade_delegates_after_start() {
        let context = ThemeContext::default();
        let root = Arc::new(DocumentRoot::new());
        let host = Arc::new(ManualHost::new(Appearance::Light));
        context.start(
            Arc::new(MemoryBackend::new()),
            EnvironmentObserver::new(host.clone()),
            Some(root.clone()),
        );

        context.toggle();
        assert_eq!(context.get_mode(), ThemeMode::Dark);
        assert_eq!(root.snapshot().attribute("data-theme"), Some("dark"));

        context.set_mode(ThemeMode::System);
        host.set(Appearance::Dark);
        assert_eq!(
            context.snapshot(),
            ThemeSnapshot { mode: ThemeMode::System, appearance: Appearance::Dark }
        );
    }

    #[test]
    fn test_toggle_before_start() {
        let context = ThemeContext::default();
        context.toggle();
        assert_eq!(context.get_mode(), ThemeMode::Dark);
    }

    #[test]
    fn test_scoped_subscribers_pruned() {
        let context = ThemeContext::default();
        let scope = MountScope::new();
        assert!(context.subscribe_scoped(&scope, |_| {}));
        assert_eq!(context.subscriber_count(), 1);

        drop(scope);
        assert_eq!(context.prune(), 1);
        assert_eq!(context.subscriber_count(), 0);
    }

    #[test]
    fn test_subscribe_after_dispose_is_inert() {
        let context = ThemeContext::default();
        let (engine, host) = start(&context, Arc::new(MemoryBackend::new()), Appearance::Light);

        context.dispose();
        assert!(engine.is_disposed());
        assert_eq!(host.listener_count(), 0);

        let subscription = context.subscribe(|_| panic!("fired after dispose"));
        assert!(!subscription.is_active());
        assert!(!context.subscribe_scoped(&MountScope::new(), |_| {}));
        context.set_mode(ThemeMode::Dark);
        assert_eq!(context.get_mode(), ThemeMode::System);
    }

    #[test]
    fn test_dispose_before_start_refuses_subscriptions() {
        let context = ThemeContext::default();
        context.dispose();
        assert!(!context.subscribe(|_| {}).is_active());
    }

    #[test]
    fn test_start_after_dispose_returns_disposed_engine() {
        let context = ThemeContext::default();
        context.set_mode(ThemeMode::Dark);
        context.dispose();

        let backend = Arc::new(MemoryBackend::new());
        let (engine, host) = start(&context, backend.clone(), Appearance::Light);

        assert!(engine.is_disposed());
        assert_eq!(host.listener_count(), 0);
        assert_eq!(backend.get("theme").unwrap(), None);

        engine.set_mode(ThemeMode::Dark);
        assert_eq!(context.get_mode(), ThemeMode::System);
    }
}
