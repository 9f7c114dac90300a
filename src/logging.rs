//! Logging setup
//!
//! Every crate in the workspace logs through `tracing`; this installs the
//! subscriber that prints those events.

use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info";

/// Install a global fmt subscriber filtered by `RUST_LOG`
///
/// Does nothing if a global subscriber is already installed.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    if let Err(e) = install(filter) {
        tracing::debug!("logging already initialized: {}", e);
    }
}

/// Install a global fmt subscriber with an explicit filter directive
///
/// Fails if the directive does not parse or a subscriber is already set.
pub fn try_init_with(filter: &str) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_new(filter)?;
    install(filter)
}

fn install(filter: EnvFilter) -> Result<(), LoggingError> {
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))
}

/// Logging setup errors
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The filter directive did not parse
    #[error("Invalid log filter: {0}")]
    InvalidFilter(#[from] ParseError),

    /// A global subscriber was already installed
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}
