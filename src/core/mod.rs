//! # Core Protocol Components
//!
//! Value types and wire encoding shared by both protocol versions.
//!
//! ## Components
//! - **Vote**: voter identity, stamped with a timestamp at send time
//! - **Server**: host, port and credential of one Votifier server
//! - **Envelope**: signed v2 payload and the server's acknowledgment
//! - **Codec**: Tokio codec for the v2 frame
//!
//! ## Wire Format (v2)
//! ```text
//! [Magic(2) = 0x733a] [Length(2)] [{"signature":"..","payload":"<json>"}]
//! ```

pub mod codec;
pub mod envelope;
pub mod server;
pub mod vote;
