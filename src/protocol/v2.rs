//! Token (v2) protocol.
//!
//! Sequence for one vote:
//!
//! ```text
//! Connected -> GreetingVerified -> PayloadSent -> AckReceived -> Success
//!     \________________\_______________\______________\______-> Failed
//! ```
//!
//! Any failure aborts the send; nothing is retried.

use crate::config::TransportConfig;
use crate::core::codec::VoteFrameCodec;
use crate::core::envelope::{Ack, Envelope};
use crate::core::vote::StampedVote;
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::greeting::Greeting;
use crate::transport::Connection;
use bytes::BytesMut;
use std::fmt;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

/// Progress through one v2 send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendState {
    Connected,
    GreetingVerified,
    PayloadSent,
    AckReceived,
}

impl fmt::Display for SendState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SendState::Connected => "connected",
            SendState::GreetingVerified => "greeting_verified",
            SendState::PayloadSent => "payload_sent",
            SendState::AckReceived => "ack_received",
        };
        f.write_str(name)
    }
}

/// Read limits for the greeting and acknowledgment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadLimits {
    pub greeting_bytes: usize,
    pub greeting_timeout: Duration,
    pub response_bytes: usize,
    pub response_timeout: Duration,
}

impl Default for ReadLimits {
    fn default() -> Self {
        Self::from(&TransportConfig::default())
    }
}

impl From<&TransportConfig> for ReadLimits {
    fn from(config: &TransportConfig) -> Self {
        Self {
            greeting_bytes: config.greeting_limit,
            greeting_timeout: config.greeting_timeout,
            response_bytes: config.response_limit,
            response_timeout: config.response_timeout,
        }
    }
}

#[derive(Clone)]
pub struct V2Protocol {
    token: String,
    limits: ReadLimits,
}

impl fmt::Debug for V2Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("V2Protocol")
            .field("token", &"<redacted>")
            .field("limits", &self.limits)
            .finish()
    }
}

impl V2Protocol {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            limits: ReadLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: ReadLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Sign the vote for `challenge` and frame it for the wire
    pub fn encode(&self, vote: &StampedVote, challenge: &str) -> Result<BytesMut> {
        let envelope = Envelope::sign(vote, challenge, &self.token)?;
        VoteFrameCodec::frame(&envelope)
    }

    /// Run the full greeting / payload / acknowledgment exchange
    pub async fn send<S>(&self, conn: &mut Connection<S>, vote: &StampedVote) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut state = SendState::Connected;
        let outcome = self.exchange(conn, vote, &mut state).await;
        if let Err(ref e) = outcome {
            warn!(state = %state, error = %e, "v2 send failed");
        }
        outcome
    }

    async fn exchange<S>(
        &self,
        conn: &mut Connection<S>,
        vote: &StampedVote,
        state: &mut SendState,
    ) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let raw = match conn
            .receive(self.limits.greeting_bytes, self.limits.greeting_timeout)
            .await
        {
            Ok(raw) => raw,
            Err(ProtocolError::Timeout) => {
                return Err(ProtocolError::ProtocolMismatch(
                    constants::ERR_NO_GREETING.into(),
                ))
            }
            Err(e) => return Err(e),
        };
        let greeting = Greeting::parse(&raw).ok_or_else(|| {
            ProtocolError::ProtocolMismatch(String::from_utf8_lossy(&raw).into_owned())
        })?;
        *state = SendState::GreetingVerified;
        debug!(state = %state, version = greeting.version(), "Greeting verified");

        let frame = self.encode(vote, greeting.challenge())?;
        let written = conn.send(&frame).await?;
        if written != frame.len() {
            return Err(ProtocolError::SendFailed(
                constants::ERR_INCOMPLETE_WRITE.into(),
            ));
        }
        *state = SendState::PayloadSent;
        debug!(state = %state, bytes = written, "Payload sent");

        let response = match conn
            .receive(self.limits.response_bytes, self.limits.response_timeout)
            .await
        {
            Ok(bytes) if bytes.is_empty() => {
                return Err(ProtocolError::NoResponse(constants::ERR_ACK_CLOSED.into()))
            }
            Ok(bytes) => bytes,
            Err(ProtocolError::Timeout) => {
                return Err(ProtocolError::NoResponse(constants::ERR_ACK_TIMEOUT.into()))
            }
            Err(e) => return Err(ProtocolError::NoResponse(e.to_string())),
        };
        *state = SendState::AckReceived;
        debug!(state = %state, bytes = response.len(), "Acknowledgment received");

        parse_ack(&response)?.into_result()
    }
}

/// Parse the server's JSON acknowledgment.
///
/// Only text that is not JSON at all counts as no response; any JSON value
/// is an answer and is judged by its `status`.
pub fn parse_ack(raw: &[u8]) -> Result<Ack> {
    serde_json::from_slice::<serde_json::Value>(raw)
        .map(Ack::from)
        .map_err(|e| ProtocolError::NoResponse(format!("malformed acknowledgment: {e}")))
}
