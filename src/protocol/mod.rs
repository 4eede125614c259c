//! # Protocol Layer
//!
//! The two Votifier wire protocols and the dispatcher that drives them.
//!
//! ## Components
//! - **Greeting**: recognises the v2 banner and extracts its challenge
//! - **V1**: RSA-encrypted vote block, fire and forget
//! - **V2**: HMAC-signed JSON frame with challenge and acknowledgment
//! - **Dispatcher**: stamps the vote, connects, sends, always closes
//!
//! The protocol set is fixed by the servers in the wild, so [`Protocol`] is a
//! closed enum rather than a trait object.

pub mod dispatcher;
pub mod greeting;
pub mod v1;
pub mod v2;


use crate::config::TransportConfig;
use crate::core::server::{Credential, ProtocolVersion, ServerIdentity};
use crate::core::vote::StampedVote;
use crate::error::Result;
use crate::transport::Connection;
use tokio::io::{AsyncRead, AsyncWrite};

pub use v1::V1Protocol;
pub use v2::{ReadLimits, V2Protocol};

/// Protocol strategy selected from the server's credential
#[derive(Debug, Clone)]
pub enum Protocol {
    V1(V1Protocol),
    V2(V2Protocol),
}

impl Protocol {
    /// Build the strategy for `server`, parsing its key up front
    pub fn for_server(server: &ServerIdentity, transport: &TransportConfig) -> Result<Self> {
        Ok(match server.credential() {
            Credential::PublicKey(key) => Protocol::V1(V1Protocol::from_public_key(key)?),
            Credential::Token(token) => {
                Protocol::V2(V2Protocol::new(token.clone()).with_limits(transport.into()))
            }
        })
    }

    pub fn version(&self) -> ProtocolVersion {
        match self {
            Protocol::V1(_) => ProtocolVersion::V1,
            Protocol::V2(_) => ProtocolVersion::V2,
        }
    }

    /// Send one stamped vote over an open connection
    pub async fn send<S>(&self, conn: &mut Connection<S>, vote: &StampedVote) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        match self {
            Protocol::V1(v1) => v1.send(conn, vote).await,
            Protocol::V2(v2) => v2.send(conn, vote).await,
        }
    }
}
