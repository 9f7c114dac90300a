//! Subscriber registry
//!
//! Subscriptions live in an arena of slots. Each registration is identified
//! by a [`SubscriptionToken`] carrying the slot index and the slot's
//! generation, so a stale token can never reach a callback registered later
//! in the same slot. Liveness is checked under the registry lock immediately
//! before every invocation, which makes "no callback after unsubscribe" hold
//! even when one callback removes another mid-dispatch.

use app_core::ThemeSnapshot;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// Callback invoked with every new theme snapshot
pub type ThemeCallback = Arc<dyn Fn(&ThemeSnapshot) + Send + Sync>;

/// Identifies one registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken {
    index: usize,
    generation: u64,
}

/// Lifetime marker for a mounted consumer
///
/// Registrations made with a scope are pruned once the scope is dropped,
/// whether or not the consumer remembered to unsubscribe.
#[derive(Debug, Default)]
pub struct MountScope {
    alive: Arc<()>,
}

impl MountScope {
    /// Create a live scope
    pub fn new() -> Self {
        Self::default()
    }

    fn liveness(&self) -> Weak<()> {
        Arc::downgrade(&self.alive)
    }
}

struct Entry {
    callback: ThemeCallback,
    scope: Option<Weak<()>>,
}

impl Entry {
    fn is_live(&self) -> bool {
        self.scope.as_ref().map_or(true, |scope| scope.strong_count() > 0)
    }
}

#[derive(Default)]
struct Slot {
    generation: u64,
    entry: Option<Entry>,
}

#[derive(Default)]
struct RegistryState {
    slots: Vec<Slot>,
    free: Vec<usize>,
    closed: bool,
}

impl RegistryState {
    fn release(&mut self, index: usize) {
        let slot = &mut self.slots[index];
        if slot.entry.take().is_some() {
            slot.generation += 1;
            self.free.push(index);
        }
    }

    fn live_entry(&self, token: SubscriptionToken) -> Option<&Entry> {
        let slot = self.slots.get(token.index)?;
        if slot.generation != token.generation {
            return None;
        }
        slot.entry.as_ref().filter(|entry| entry.is_live())
    }
}

/// Arena of subscriber callbacks
#[derive(Default)]
pub struct SubscriberRegistry {
    state: Mutex<RegistryState>,
}

impl SubscriberRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback`, returning `None` once the registry is closed
    pub fn register(
        &self,
        callback: ThemeCallback,
        scope: Option<&MountScope>,
    ) -> Option<SubscriptionToken> {
        let mut state = self.state.lock();
        if state.closed {
            return None;
        }

        let entry = Entry { callback, scope: scope.map(MountScope::liveness) };
        let index = match state.free.pop() {
            Some(index) => index,
            None => {
                state.slots.push(Slot::default());
                state.slots.len() - 1
            }
        };
        let slot = &mut state.slots[index];
        slot.entry = Some(entry);
        Some(SubscriptionToken { index, generation: slot.generation })
    }

    /// Remove a registration; stale or repeated tokens are ignored
    pub fn unregister(&self, token: SubscriptionToken) -> bool {
        let mut state = self.state.lock();
        let current = state
            .slots
            .get(token.index)
            .is_some_and(|slot| slot.generation == token.generation && slot.entry.is_some());
        if current {
            state.release(token.index);
        }
        current
    }

    /// Whether `token` still refers to a live registration
    pub fn is_live(&self, token: SubscriptionToken) -> bool {
        self.state.lock().live_entry(token).is_some()
    }

    /// Drop registrations whose mount scope has ended
    pub fn prune(&self) -> usize {
        let mut state = self.state.lock();
        let dead: Vec<usize> = state
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.entry.as_ref().is_some_and(|entry| !entry.is_live()))
            .map(|(index, _)| index)
            .collect();
        for index in &dead {
            state.release(*index);
        }
        if !dead.is_empty() {
            tracing::debug!(count = dead.len(), "pruned stale theme subscriptions");
        }
        dead.len()
    }

    /// Number of live registrations
    pub fn len(&self) -> usize {
        let state = self.state.lock();
        state.slots.iter().filter(|slot| slot.entry.as_ref().is_some_and(Entry::is_live)).count()
    }

    /// Check if there are no live registrations
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every registration and refuse new ones
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        for index in 0..state.slots.len() {
            state.release(index);
        }
    }

    /// Whether [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Deliver `snapshot` to every live registration
    ///
    /// `is_current` is consulted before each invocation; once it reports
    /// false the round stops and `false` is returned so the caller can
    /// deliver the newer snapshot instead.
    pub fn dispatch(&self, snapshot: &ThemeSnapshot, is_current: &dyn Fn() -> bool) -> bool {
        self.prune();
        let tokens: Vec<SubscriptionToken> = {
            let state = self.state.lock();
            state
                .slots
                .iter()
                .enumerate()
                .filter(|(_, slot)| slot.entry.is_some())
                .map(|(index, slot)| SubscriptionToken { index, generation: slot.generation })
                .collect()
        };

        for token in tokens {
            if !is_current() {
                return false;
            }
            let callback =
                self.state.lock().live_entry(token).map(|entry| Arc::clone(&entry.callback));
            if let Some(callback) = callback {
                callback(snapshot);
            }
        }
        true
    }
}

/// Handle returned by `subscribe`
///
/// Dropping the handle unsubscribes, so a consumer that unmounts without
/// cleanup does not leak its callback.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct Subscription {
    token: Option<SubscriptionToken>,
    registry: Weak<SubscriberRegistry>,
}

impl Subscription {
    pub(crate) fn new(registry: &Arc<SubscriberRegistry>, token: SubscriptionToken) -> Self {
        Self { token: Some(token), registry: Arc::downgrade(registry) }
    }

    pub(crate) fn inert() -> Self {
        Self { token: None, registry: Weak::new() }
    }

    /// The registration token, if still subscribed
    pub fn token(&self) -> Option<SubscriptionToken> {
        self.token
    }

    /// Whether the callback can still fire
    pub fn is_active(&self) -> bool {
        match (self.token, self.registry.upgrade()) {
            (Some(token), Some(registry)) => registry.is_live(token),
            _ => false,
        }
    }

    /// Stop receiving notifications; repeated calls are no-ops
    pub fn unsubscribe(&mut self) {
        if let (Some(token), Some(registry)) = (self.token.take(), self.registry.upgrade()) {
            registry.unregister(token);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("token", &self.token).finish_non_exhaustive()
    }
}
