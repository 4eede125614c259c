//! Legacy (v1) protocol.
//!
//! The vote is written as newline-terminated fields, encrypted as a single
//! RSA PKCS#1 v1.5 block with the server's public key, and sent as-is. The
//! server sends no acknowledgment and the greeting is not read.

use crate::core::vote::StampedVote;
use crate::error::{constants, ProtocolError, Result};
use crate::transport::Connection;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::rand_core::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

/// PKCS#1 v1.5 padding overhead in bytes
const PKCS1_OVERHEAD: usize = 11;

#[derive(Debug, Clone)]
pub struct V1Protocol {
    key: RsaPublicKey,
}

impl V1Protocol {
    /// Build from a PEM public key or the bare base64 DER written to `public.key`
    pub fn from_public_key(key: &str) -> Result<Self> {
        Ok(Self {
            key: parse_public_key(key)?,
        })
    }

    pub fn from_key(key: RsaPublicKey) -> Self {
        Self { key }
    }

    /// Largest plaintext a single block can carry
    pub fn capacity(&self) -> usize {
        self.key.size().saturating_sub(PKCS1_OVERHEAD)
    }

    /// Encrypt the vote block
    pub fn encrypt(&self, vote: &StampedVote) -> Result<Vec<u8>> {
        let block = plaintext(vote);
        if block.len() > self.capacity() {
            return Err(ProtocolError::Encryption(format!(
                "vote block is {} bytes, key holds at most {}",
                block.len(),
                self.capacity()
            )));
        }

        self.key
            .encrypt(&mut OsRng, Pkcs1v15Encrypt, block.as_bytes())
            .map_err(|e| ProtocolError::Encryption(e.to_string()))
    }

    /// Encrypt and transmit; nothing is read back
    pub async fn send<S>(&self, conn: &mut Connection<S>, vote: &StampedVote) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let block = self.encrypt(vote)?;
        let written = conn.send(&block).await?;
        if written != block.len() {
            return Err(ProtocolError::SendFailed(
                constants::ERR_INCOMPLETE_WRITE.into(),
            ));
        }

        debug!(bytes = written, "v1 block sent");
        Ok(())
    }
}

/// `VOTE\n{service}\n{username}\n{address}\n{timestamp}\n`
pub fn plaintext(vote: &StampedVote) -> String {
    format!(
        "VOTE\n{}\n{}\n{}\n{}\n",
        vote.service_name(),
        vote.username(),
        vote.address(),
        vote.timestamp()
    )
}

fn parse_public_key(key: &str) -> Result<RsaPublicKey> {
    let trimmed = key.trim();

    if trimmed.starts_with("-----BEGIN RSA PUBLIC KEY-----") {
        return RsaPublicKey::from_pkcs1_pem(trimmed)
            .map_err(|e| ProtocolError::Encryption(e.to_string()));
    }
    if trimmed.starts_with("-----BEGIN") {
        return RsaPublicKey::from_public_key_pem(trimmed)
            .map_err(|e| ProtocolError::Encryption(e.to_string()));
    }

    let body: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    let der = STANDARD
        .decode(body)
        .map_err(|_| ProtocolError::Encryption(constants::ERR_KEY_UNREADABLE.into()))?;
    RsaPublicKey::from_public_key_der(&der).map_err(|e| ProtocolError::Encryption(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::core::vote::Vote;
    use rsa::pkcs1::EncodeRsaPublicKey;
    use rsa::pkcs8::{EncodePublicKey, LineEnding};
    use rsa::RsaPrivateKey;

    fn keypair() -> (RsaPrivateKey, RsaPublicKey) {
        let private = RsaPrivateKey::new(&mut OsRng, 1024).unwrap();
        let public = RsaPublicKey::from(&private);
        (private, public)
    }

    fn stamped() -> StampedVote {
        StampedVote::with_timestamp(Vote::new("alice", "svc", "1.2.3.4"), "1700000000")
    }

    #[test]
    fn plaintext_field_order() {
        assert_eq!(
            plaintext(&stamped()),
            "VOTE\nsvc\nalice\n1.2.3.4\n1700000000\n"
        );
    }

    #[test]
    fn block_decrypts_to_plaintext() {
        let (private, public) = keypair();
        let protocol = V1Protocol::from_key(public);

        let block = protocol.encrypt(&stamped()).unwrap();
        assert_eq!(block.len(), 128);

        let clear = private.decrypt(Pkcs1v15Encrypt, &block).unwrap();
        assert_eq!(clear, plaintext(&stamped()).as_bytes());
    }

    #[test]
    fn accepts_every_key_encoding() {
        let (_, public) = keypair();

        let spki_pem = public.to_public_key_pem(LineEnding::LF).unwrap();
        let pkcs1_pem = public.to_pkcs1_pem(LineEnding::LF).unwrap();
        let bare = STANDARD.encode(public.to_public_key_der().unwrap().as_bytes());

        for key in [spki_pem.as_str(), pkcs1_pem.as_str(), bare.as_str()] {
            let protocol = V1Protocol::from_public_key(key).unwrap();
            assert_eq!(protocol.key, public);
        }
    }

    #[test]
    fn malformed_key_is_an_encryption_error() {
        assert!(matches!(
            V1Protocol::from_public_key("not a key!"),
            Err(ProtocolError::Encryption(_))
        ));
        assert!(matches!(
            V1Protocol::from_public_key("-----BEGIN PUBLIC KEY-----\nAAAA\n-----END PUBLIC KEY-----"),
            Err(ProtocolError::Encryption(_))
        ));
    }

    #[test]
    fn oversized_vote_is_rejected() {
        let (_, public) = keypair();
        let protocol = V1Protocol::from_key(public);
        let vote = StampedVote::with_timestamp(
            Vote::new("a".repeat(200), "svc", "1.2.3.4"),
            "1700000000",
        );
        assert!(matches!(
            protocol.encrypt(&vote),
            Err(ProtocolError::Encryption(_))
        ));
    }
}
