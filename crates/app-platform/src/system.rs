//! Desktop environment host
//!
//! Desktop platforms expose the color scheme as a setting rather than as an
//! event stream, so [`SystemHost`] turns periodic [`SystemHost::poll`] calls
//! into change notifications. The setting itself is read with `dark-light`.

use app_core::Appearance;
use dark_light::Mode;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::host::{AppearanceHost, HostCallback, HostListenerId, ListenerTable};

type Sampler = Arc<dyn Fn() -> Option<Appearance> + Send + Sync>;

#[derive(Default)]
struct SystemState {
    last: Option<Appearance>,
    listeners: ListenerTable,
}

/// Host reading the operating system's appearance setting
pub struct SystemHost {
    sampler: Sampler,
    state: Mutex<SystemState>,
}

impl Default for SystemHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemHost {
    /// Create a host reading the operating system setting
    pub fn new() -> Self {
        Self::with_sampler(detect_platform)
    }

    /// Create a host using a custom sampler
    pub fn with_sampler<F>(sampler: F) -> Self
    where
        F: Fn() -> Option<Appearance> + Send + Sync + 'static,
    {
        let sampler: Sampler = Arc::new(sampler);
        let last = sampler();
        Self { sampler, state: Mutex::new(SystemState { last, ..Default::default() }) }
    }

    /// Re-sample the setting and notify listeners if it flipped
    ///
    /// Returns the new appearance when a flip was observed.
    pub fn poll(&self) -> Option<Appearance> {
        let current = (self.sampler)()?;
        let listeners = {
            let mut state = self.state.lock();
            if state.last == Some(current) {
                return None;
            }
            state.last = Some(current);
            state.listeners.snapshot()
        };

        tracing::debug!(appearance = %current, "system appearance flipped");
        for listener in listeners {
            listener(current);
        }
        Some(current)
    }
}

impl AppearanceHost for SystemHost {
    // Leaves `last` alone so a flip seen here is still reported by poll()
    fn sample(&self) -> Option<Appearance> {
        (self.sampler)()
    }

    fn add_listener(&self, callback: HostCallback) -> HostListenerId {
        self.state.lock().listeners.insert(callback)
    }

    fn remove_listener(&self, id: HostListenerId) {
        self.state.lock().listeners.remove(id);
    }
}

fn detect_platform() -> Option<Appearance> {
    match dark_light::detect() {
        Ok(mode) => appearance_from(mode),
        Err(e) => {
            tracing::debug!("system appearance unavailable: {}", e);
            None
        }
    }
}

fn appearance_from(mode: Mode) -> Option<Appearance> {
    match mode {
        Mode::Dark => Some(Appearance::Dark),
        Mode::Light => Some(Appearance::Light),
        Mode::Unspecified => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn switchable() -> (Arc<AtomicBool>, SystemHost) {
        let dark = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&dark);
        let host = SystemHost::with_sampler(move || {
            Some(if flag.load(Ordering::SeqCst) { Appearance::Dark } else { Appearance::Light })
        });
        (dark, host)
    }

    #[test]
    fn test_poll_fires_on_flip_only() {
        let (dark, host) = switchable();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        host.add_listener(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(host.poll(), None);

        dark.store(true, Ordering::SeqCst);
        assert_eq!(host.poll(), Some(Appearance::Dark));
        assert_eq!(host.poll(), None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsupported_sampler() {
        let host = SystemHost::with_sampler(|| None);
        assert_eq!(host.sample(), None);
        assert_eq!(host.poll(), None);
    }

    #[test]
    fn test_os_mode_mapping() {
        assert_eq!(appearance_from(Mode::Dark), Some(Appearance::Dark));
        assert_eq!(appearance_from(Mode::Light), Some(Appearance::Light));
        assert_eq!(appearance_from(Mode::Unspecified), None);
    }
}
