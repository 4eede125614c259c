//! Timeout defaults and an async timeout wrapper.

use crate::error::{ProtocolError, Result};
use std::future::Future;
use std::time::Duration;

/// Default time allowed for the TCP connect
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default time allowed for the server greeting to arrive
pub const GREETING_TIMEOUT: Duration = Duration::from_secs(5);

/// Default time allowed for the v2 acknowledgment to arrive
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound accepted by config validation
pub const MAX_TIMEOUT: Duration = Duration::from_secs(300);

/// Run `fut`, failing with `ProtocolError::Timeout` once `duration` elapses.
pub async fn with_timeout<F, T>(duration: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProtocolError::Timeout),
    }
}
