//! Server identity: where to send votes and how to authenticate them.

use crate::error::{constants, ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire protocol spoken by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVersion {
    /// Legacy RSA-encrypted block, no acknowledgment
    V1,
    /// HMAC-signed JSON envelope with challenge and acknowledgment
    #[default]
    V2,
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolVersion::V1 => f.write_str("v1"),
            ProtocolVersion::V2 => f.write_str("v2"),
        }
    }
}

/// Plugin running on the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServerKind {
    /// The classic Votifier plugin (v1 only)
    Classic,
    /// NuVotifier (v1 or v2)
    #[default]
    NuVotifier,
}

/// Secret material for the configured protocol version
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// RSA public key, PEM or the bare base64 body of `public.key`
    PublicKey(String),
    /// Shared token for HMAC signing
    Token(String),
}

impl Credential {
    pub fn protocol(&self) -> ProtocolVersion {
        match self {
            Credential::PublicKey(_) => ProtocolVersion::V1,
            Credential::Token(_) => ProtocolVersion::V2,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::PublicKey(_) => f.write_str("PublicKey(..)"),
            Credential::Token(_) => f.write_str("Token(<redacted>)"),
        }
    }
}

/// Everything needed to reach one Votifier server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerIdentity {
    host: String,
    port: u16,
    kind: ServerKind,
    credential: Credential,
}

impl ServerIdentity {
    /// A server spoken to over the legacy RSA protocol
    pub fn v1(host: impl Into<String>, port: u16, public_key: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            kind: ServerKind::Classic,
            credential: Credential::PublicKey(public_key.into()),
        }
    }

    /// A NuVotifier server spoken to over the token protocol
    pub fn v2(host: impl Into<String>, port: u16, token: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            kind: ServerKind::NuVotifier,
            credential: Credential::Token(token.into()),
        }
    }

    /// Override the server kind
    pub fn with_kind(mut self, kind: ServerKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn kind(&self) -> ServerKind {
        self.kind
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn protocol(&self) -> ProtocolVersion {
        self.credential.protocol()
    }

    /// `host:port` for display and connecting
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check that the identity can be used for a send
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(ProtocolError::ConfigError("Server host cannot be empty".into()));
        }
        if self.port == 0 {
            return Err(ProtocolError::ConfigError("Server port cannot be 0".into()));
        }
        match &self.credential {
            Credential::PublicKey(key) if key.trim().is_empty() => Err(ProtocolError::ConfigError(
                constants::ERR_MISSING_PUBLIC_KEY.into(),
            )),
            Credential::Token(token) if token.is_empty() => Err(ProtocolError::ConfigError(
                constants::ERR_MISSING_TOKEN.into(),
            )),
            Credential::Token(_) if self.kind == ServerKind::Classic => Err(
                ProtocolError::ConfigError(constants::ERR_CLASSIC_V2.into()),
            ),
            _ => Ok(()),
        }
    }
}
