//! Platform-specific code for the course site theme engine
//!
//! This crate watches the host environment's light/dark preference. The
//! [`EnvironmentObserver`] is the only entry point the engine uses; the host
//! behind it is either a [`SystemHost`] reading the desktop setting or a
//! [`ManualHost`] driven by the embedder (and by tests).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod host;
pub mod observer;
pub mod system;

pub use host::{AppearanceHost, HostCallback, HostListenerId, ManualHost};
pub use observer::{EnvSubscription, EnvironmentObserver};
pub use system::SystemHost;
