//! # Error Types
//!
//! Error handling for the Votifier client.
//!
//! Every failure a vote send can run into is one variant of [`ProtocolError`],
//! from refusing to connect to the server rejecting the signed payload.
//! Failures are single-shot: nothing in this crate retries, callers own any
//! retry policy.
//!
//! ## Error Categories
//! - **Transport Errors**: unreachable host, failed writes, missing acknowledgments
//! - **Protocol Errors**: greeting mismatch, oversized frames, bad frame headers
//! - **Cryptographic Errors**: unusable RSA keys, payloads too large for the key
//! - **Server Errors**: a v2 acknowledgment whose status is not `ok`
//! - **Configuration Errors**: missing credentials, invalid settings
//!
//! ## Example Usage
//! ```rust
//! use votifier_client::error::ProtocolError;
//!
//! fn describe(err: &ProtocolError) -> &'static str {
//!     match err {
//!         ProtocolError::ProtocolMismatch(_) => "wrong protocol version configured?",
//!         ProtocolError::ServerRejected { .. } => "server refused the vote",
//!         _ => "send failed",
//!     }
//! }
//!
//! let err = ProtocolError::ProtocolMismatch("HELLO world".into());
//! assert_eq!(describe(&err), "wrong protocol version configured?");
//! ```

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Transport errors
    pub const ERR_CONNECT_TIMEOUT: &str = "Timed out connecting to server";
    pub const ERR_INCOMPLETE_WRITE: &str = "Payload was not fully written";
    pub const ERR_NO_GREETING: &str = "Server sent no greeting";

    /// Acknowledgment errors
    pub const ERR_ACK_TIMEOUT: &str = "Timed out waiting for acknowledgment";
    pub const ERR_ACK_CLOSED: &str = "Connection closed before acknowledgment";

    /// Cryptographic errors
    pub const ERR_KEY_UNREADABLE: &str = "Public key is neither PEM nor base64 DER";
    pub const ERR_HMAC_KEY: &str = "Token cannot be used as an HMAC key";

    /// Configuration errors
    pub const ERR_MISSING_PUBLIC_KEY: &str = "Protocol v1 requires a public key";
    pub const ERR_MISSING_TOKEN: &str = "Protocol v2 requires a token";
    pub const ERR_CLASSIC_V2: &str = "Classic Votifier servers only speak protocol v1";

    /// Clock errors
    pub const ERR_SYSTEM_TIME: &str = "System time error: time went backwards";
}

/// ProtocolError is the primary error type for every vote send.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cannot connect to {addr}: {reason}")]
    Connection { addr: String, reason: String },

    #[error("Not a Votifier v2 greeting: {0:?}")]
    ProtocolMismatch(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Failed to send vote: {0}")]
    SendFailed(String),

    #[error("No acknowledgment received: {0}")]
    NoResponse(String),

    #[error(
        "Server rejected vote with status {status:?} (cause: {}, error: {})",
        .cause.as_deref().unwrap_or("none"),
        .error.as_deref().unwrap_or("none")
    )]
    ServerRejected {
        status: String,
        cause: Option<String>,
        error: Option<String>,
    },

    #[error("Vote message too large: {0} bytes")]
    OversizedPayload(usize),

    #[error("Invalid frame header")]
    InvalidHeader,

    #[error("Timeout occurred")]
    Timeout,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProtocolError {
    /// True for failures caused by the network rather than by the protocol exchange.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ProtocolError::Io(_)
                | ProtocolError::Connection { .. }
                | ProtocolError::SendFailed(_)
                | ProtocolError::Timeout
        )
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
