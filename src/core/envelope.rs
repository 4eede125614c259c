//! Signed v2 vote envelope.
//!
//! The payload JSON is signed as text and then embedded in the outer message
//! as a JSON *string*, so the server verifies exactly the bytes that were
//! signed. Field order of [`VotePayload`] is part of the signed content.

use crate::core::vote::StampedVote;
use crate::error::{constants, ProtocolError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Inner signed object. Serialized in declaration order.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VotePayload {
    pub username: String,
    pub service_name: String,
    pub timestamp: String,
    pub address: String,
    pub challenge: String,
}

impl VotePayload {
    pub fn new(vote: &StampedVote, challenge: &str) -> Self {
        Self {
            username: vote.username().to_owned(),
            service_name: vote.service_name().to_owned(),
            timestamp: vote.timestamp().to_owned(),
            address: vote.address().to_owned(),
            challenge: challenge.to_owned(),
        }
    }
}

/// Outer message: `{"signature": ..., "payload": "<payload json text>"}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Envelope {
    pub signature: String,
    pub payload: String,
}

impl Envelope {
    /// Build and sign the envelope for one vote and challenge
    pub fn sign(vote: &StampedVote, challenge: &str, token: &str) -> Result<Self> {
        let payload = serde_json::to_string(&VotePayload::new(vote, challenge))?;
        let signature = sign_payload(&payload, token)?;
        Ok(Self { signature, payload })
    }

    /// Check the signature the way the server does
    pub fn verify(&self, token: &str) -> bool {
        let Ok(expected) = STANDARD.decode(&self.signature) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(token.as_bytes()) else {
            return false;
        };
        mac.update(self.payload.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }

    /// Decode the embedded payload
    pub fn vote_payload(&self) -> Result<VotePayload> {
        Ok(serde_json::from_str(&self.payload)?)
    }

    /// The outer JSON text as it goes on the wire
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// `base64(HMAC-SHA256(token, payload))`
pub fn sign_payload(payload: &str, token: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(token.as_bytes())
        .map_err(|_| ProtocolError::Encryption(constants::ERR_HMAC_KEY.into()))?;
    mac.update(payload.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Server acknowledgment for a v2 vote.
///
/// Built from any JSON value: string fields are taken as-is, other
/// non-null values keep their JSON text.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Ack {
    pub status: Option<String>,
    pub cause: Option<String>,
    pub error: Option<String>,
}

impl From<Value> for Ack {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(fields) => {
                let text = |name: &str| match fields.get(name) {
                    None | Some(Value::Null) => None,
                    Some(Value::String(s)) => Some(s.clone()),
                    Some(other) => Some(other.to_string()),
                };
                Self {
                    status: text("status"),
                    cause: text("cause"),
                    error: text("error"),
                }
            }
            other => Self {
                error: Some(other.to_string()),
                ..Self::default()
            },
        }
    }
}

impl Ack {
    pub fn is_ok(&self) -> bool {
        self.status.as_deref() == Some("ok")
    }

    /// Turn a non-`ok` acknowledgment into the matching error
    pub fn into_result(self) -> Result<()> {
        if self.is_ok() {
            return Ok(());
        }
        Err(ProtocolError::ServerRejected {
            status: self.status.unwrap_or_default(),
            cause: self.cause,
            error: self.error,
        })
    }
}
