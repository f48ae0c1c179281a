//! Tracing subscriber setup shared by the binaries.
//!
//! `RUST_LOG` takes precedence over `ObservabilityConfig::log_level`.

use crate::config::ObservabilityConfig;
use crate::error::{Result, StubError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Returns `StubError::Internal` if a global subscriber is already installed.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| {
            StubError::Configuration(format!("Invalid log level {:?}: {e}", config.log_level))
        })?;

    let json_layer = config
        .json_logs
        .then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!config.json_logs)
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| StubError::Internal(format!("Failed to install tracing subscriber: {e}")))
}
