//! Structured logging setup.
//!
//! The library itself only emits `tracing` events; applications embedding it
//! call [`init_logging`] once (or install their own subscriber).

use crate::config::LoggingConfig;
use crate::error::Result;
use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber built from `config`.
///
/// `RUST_LOG` wins over the configured level when set. Calling this again
/// after a subscriber is installed is a no-op.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string().to_lowercase()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = if config.json_format {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if installed.is_ok() {
        tracing::debug!(app = %config.app_name, "Logging initialized");
    }
    Ok(())
}
