//! Wall-clock helpers for vote timestamps.

use crate::error::{constants, ProtocolError, Result};
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the unix epoch for the given instant.
///
/// # Errors
/// Returns `ProtocolError::ConfigError` if the instant predates UNIX_EPOCH
pub fn unix_seconds(at: SystemTime) -> Result<u64> {
    at.duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .map_err(|_| ProtocolError::ConfigError(constants::ERR_SYSTEM_TIME.into()))
}

/// Seconds since the unix epoch, now.
pub fn current_timestamp() -> Result<u64> {
    unix_seconds(SystemTime::now())
}
