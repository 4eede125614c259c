//! Server greeting parsing.
//!
//! A v2 server opens with `VOTIFIER <version> <challenge>\n`. The greeting is
//! split on single spaces; it is accepted when it is non-empty, mentions
//! `VOTIFIER`, and yields exactly three tokens. The last token loses its final
//! character (the line terminator) to become the challenge.

/// A parsed v2 greeting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeting {
    version: String,
    challenge: String,
}

impl Greeting {
    /// Parse raw greeting bytes, `None` if they are not a v2 banner
    pub fn parse(raw: &[u8]) -> Option<Self> {
        let text = String::from_utf8_lossy(raw);
        if !verify_greeting(&text) {
            return None;
        }

        let mut parts = text.split(' ');
        let _tag = parts.next()?;
        let version = parts.next()?;
        let last = parts.next()?;

        let mut challenge = last.chars();
        challenge.next_back();

        Some(Self {
            version: version.to_owned(),
            challenge: challenge.as_str().to_owned(),
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn challenge(&self) -> &str {
        &self.challenge
    }
}

/// True if `raw` looks like a Votifier v2 greeting
pub fn verify_greeting(raw: &str) -> bool {
    !raw.is_empty() && raw.contains("VOTIFIER") && raw.split(' ').count() == 3
}
