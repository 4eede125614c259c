//! # Transport
//!
//! Byte-stream plumbing under the protocol: connect with a timeout, write a
//! whole payload, read up to N bytes with a timeout, close.

pub mod tcp;

pub use tcp::Connection;
