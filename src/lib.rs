//! # votifier-client
//!
//! Client for the Votifier vote-notification protocol, used to tell a game
//! server plugin that a player voted on an external site.
//!
//! Two wire protocols are supported:
//! - **v1**: the vote block is RSA-encrypted with the server's public key and
//!   sent without waiting for an answer.
//! - **v2**: the server greets with a challenge, the vote is signed with a
//!   shared token (HMAC-SHA256), framed, sent, and acknowledged in JSON.
//!
//! Every send opens one connection, transmits one vote, and closes the
//! connection on every path before the result is returned. Nothing retries.
//!
//! ## Example
//! ```no_run
//! use votifier_client::{send_vote, ServerIdentity, Vote};
//!
//! # async fn run() -> votifier_client::Result<()> {
//! let server = ServerIdentity::v2("mc.example.org", 8192, "my-token");
//! let vote = Vote::new("alice", "my-vote-site", "203.0.113.7");
//! send_vote(&vote, &server).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod utils;

pub use crate::config::ClientConfig;
pub use crate::core::server::{ProtocolVersion, ServerIdentity, ServerKind};
pub use crate::core::vote::{StampedVote, Vote};
pub use crate::error::{ProtocolError, Result};
pub use crate::protocol::dispatcher::{send_vote, send_vote_blocking, Dispatcher};
pub use crate::protocol::Protocol;
