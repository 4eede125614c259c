//! Tokio codec for v2 vote frames.
//!
//! ```text
//! [Magic(2) = 0x733a] [Length(2), big-endian] [Envelope JSON (Length bytes)]
//! ```
//!
//! The length counts UTF-8 bytes of the JSON text. The client only ever
//! encodes; decoding is the server's view of the same frame.

use crate::core::envelope::Envelope;
use crate::error::{ProtocolError, Result};
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Magic number that marks a v2 vote frame
pub const V2_MAGIC: u16 = 0x733a;

/// Size of magic plus length
pub const HEADER_LEN: usize = 4;

/// Largest JSON body the 16-bit length field can describe
pub const MAX_MESSAGE_LEN: usize = u16::MAX as usize;

#[derive(Debug, Default, Clone, Copy)]
pub struct VoteFrameCodec;

impl VoteFrameCodec {
    /// Encode one envelope into a fresh buffer
    pub fn frame(envelope: &Envelope) -> Result<BytesMut> {
        let mut buf = BytesMut::new();
        VoteFrameCodec.encode(envelope.clone(), &mut buf)?;
        Ok(buf)
    }
}

impl Encoder<Envelope> for VoteFrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Envelope, dst: &mut BytesMut) -> Result<()> {
        let json = item.to_json()?;
        let len = u16::try_from(json.len()).map_err(|_| ProtocolError::OversizedPayload(json.len()))?;

        dst.reserve(HEADER_LEN + json.len());
        dst.put_u16(V2_MAGIC);
        dst.put_u16(len);
        dst.extend_from_slice(json.as_bytes());
        Ok(())
    }
}

impl Decoder for VoteFrameCodec {
    type Item = Envelope;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Envelope>> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        let magic = u16::from_be_bytes([src[0], src[1]]);
        if magic != V2_MAGIC {
            return Err(ProtocolError::InvalidHeader);
        }

        let len = u16::from_be_bytes([src[2], src[3]]) as usize;
        if src.len() < HEADER_LEN + len {
            src.reserve(HEADER_LEN + len - src.len());
            return Ok(None);
        }

        src.advance(HEADER_LEN);
        let body = src.split_to(len);
        Ok(Some(serde_json::from_slice(&body)?))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn envelope(payload: &str) -> Envelope {
        Envelope {
            signature: "c2ln".into(),
            payload: payload.into(),
        }
    }

    #[test]
    fn header_layout() {
        let env = envelope("{}");
        let json = env.to_json().unwrap();
        let frame = VoteFrameCodec::frame(&env).unwrap();

        assert_eq!(&frame[..2], &[0x73, 0x3a]);
        assert_eq!(u16::from_be_bytes([frame[2], frame[3]]) as usize, json.len());
        assert_eq!(&frame[HEADER_LEN..], json.as_bytes());
    }

    #[test]
    fn length_counts_utf8_bytes() {
        let env = envelope("日本語");
        let json = env.to_json().unwrap();
        let frame = VoteFrameCodec::frame(&env).unwrap();

        assert!(json.len() > json.chars().count());
        assert_eq!(u16::from_be_bytes([frame[2], frame[3]]) as usize, json.len());
    }

    #[test]
    fn oversized_message_is_rejected() {
        let env = envelope(&"x".repeat(MAX_MESSAGE_LEN));
        assert!(matches!(
            VoteFrameCodec::frame(&env),
            Err(ProtocolError::OversizedPayload(_))
        ));
    }

    #[test]
    fn decode_waits_for_full_frame() {
        let env = envelope(r#"{"username":"alice"}"#);
        let frame = VoteFrameCodec::frame(&env).unwrap();

        let mut partial = BytesMut::from(&frame[..frame.len() - 3]);
        assert!(VoteFrameCodec.decode(&mut partial).unwrap().is_none());

        partial.extend_from_slice(&frame[frame.len() - 3..]);
        assert_eq!(VoteFrameCodec.decode(&mut partial).unwrap(), Some(env));
        assert!(partial.is_empty());
    }

    #[test]
    fn decode_rejects_wrong_magic() {
        let mut buf = BytesMut::from(&[0x00, 0x01, 0x00, 0x02, b'{', b'}'][..]);
        assert!(matches!(
            VoteFrameCodec.decode(&mut buf),
            Err(ProtocolError::InvalidHeader)
        ));
    }
}
