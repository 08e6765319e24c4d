//! Structured logging setup.
//!
//! The runtime only emits `tracing` events; installing a subscriber is left
//! to the host. [`init_tracing`] is a convenience for binaries and tests.

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::{ConfigError, RuntimeConfig};

/// Environment variable whose filter directives override the configured level
pub const LOG_ENV: &str = "TICKWIRE_LOG";

/// Install a formatted subscriber filtered by `TICKWIRE_LOG` or `level`.
///
/// Returns `Ok(false)` when a global subscriber was already installed.
pub fn init_tracing(level: &str) -> Result<bool, ConfigError> {
    parse_log_level(level)?;
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level.to_lowercase()));

    let installed = Registry::default()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(level, "Logging initialized");
    }
    Ok(installed)
}

/// Install logging using the level from a runtime configuration
pub fn init_from_config(config: &RuntimeConfig) -> Result<bool, ConfigError> {
    init_tracing(&config.log_level)
}

/// Parse log level string to tracing Level
pub fn parse_log_level(level: &str) -> Result<Level, ConfigError> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(ConfigError::invalid_value(
            "log_level",
            level,
            "trace, debug, info, warn or error",
        )),
    }
}
