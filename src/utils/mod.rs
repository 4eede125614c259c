//! # Utility Modules
//!
//! Supporting utilities for logging, metrics, and timing.
//!
//! ## Components
//! - **Logging**: Structured logging configuration
//! - **Metrics**: Thread-safe counters for vote outcomes and traffic
//! - **Time**: Unix timestamps for stamping votes
//! - **Timeout**: Timeout defaults and the async timeout wrapper

pub mod logging;
pub mod metrics;
pub mod time;
pub mod timeout;

pub use metrics::{Metrics, MetricsSnapshot};
