//! Vote records.
//!
//! A [`Vote`] carries the voter identity and nothing else. The timestamp is
//! assigned only when the vote is about to go out, by turning the vote into a
//! [`StampedVote`]. Encoders take `StampedVote`, so an unstamped vote can never
//! reach the wire.

use crate::error::Result;
use crate::utils::time::unix_seconds;
use std::time::SystemTime;

/// A vote as supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vote {
    username: String,
    service_name: String,
    address: String,
}

impl Vote {
    /// Create a vote for `username`, cast on `service_name` from `address`
    pub fn new(
        username: impl Into<String>,
        service_name: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            service_name: service_name.into(),
            address: address.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Stamp the vote with the current wall-clock time
    pub fn stamp(&self) -> Result<StampedVote> {
        self.stamped_at(SystemTime::now())
    }

    /// Stamp the vote with an explicit instant
    pub fn stamped_at(&self, at: SystemTime) -> Result<StampedVote> {
        let seconds = unix_seconds(at)?;
        Ok(StampedVote::with_timestamp(self.clone(), seconds.to_string()))
    }
}

/// A vote whose timestamp is fixed for the lifetime of one send attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StampedVote {
    vote: Vote,
    timestamp: String,
}

impl StampedVote {
    /// Attach a preformatted timestamp
    pub fn with_timestamp(vote: Vote, timestamp: impl Into<String>) -> Self {
        Self {
            vote,
            timestamp: timestamp.into(),
        }
    }

    pub fn username(&self) -> &str {
        self.vote.username()
    }

    pub fn service_name(&self) -> &str {
        self.vote.service_name()
    }

    pub fn address(&self) -> &str {
        self.vote.address()
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn vote(&self) -> &Vote {
        &self.vote
    }
}
