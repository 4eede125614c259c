//! Observability and Metrics
//!
//! Counters for vote sends, kept in atomics so one collector can be shared by
//! any number of callers sending votes from different threads.

use crate::error::ProtocolError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::{debug, info};

/// Metrics collector for vote sends
#[derive(Debug)]
pub struct Metrics {
    /// Total send attempts
    pub votes_total: AtomicU64,
    /// Sends that completed without error
    pub votes_success: AtomicU64,
    /// Sends that failed for any reason
    pub votes_failed: AtomicU64,
    /// Failures to reach or write to the server
    pub connection_errors: AtomicU64,
    /// Greeting, framing or acknowledgment failures
    pub protocol_errors: AtomicU64,
    /// Acknowledgments with a status other than `ok`
    pub rejections: AtomicU64,
    /// Total bytes written to servers
    pub bytes_sent: AtomicU64,
    /// Total bytes read from servers
    pub bytes_received: AtomicU64,
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            votes_total: AtomicU64::new(0),
            votes_success: AtomicU64::new(0),
            votes_failed: AtomicU64::new(0),
            connection_errors: AtomicU64::new(0),
            protocol_errors: AtomicU64::new(0),
            rejections: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record the start of a send
    pub fn vote_attempt(&self) {
        self.votes_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed send
    pub fn vote_success(&self) {
        self.votes_success.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed send, classified by its error
    pub fn vote_failed(&self, error: &ProtocolError) {
        self.votes_failed.fetch_add(1, Ordering::Relaxed);
        match error {
            ProtocolError::ServerRejected { .. } => {
                self.rejections.fetch_add(1, Ordering::Relaxed);
            }
            e if e.is_transport() => {
                self.connection_errors.fetch_add(1, Ordering::Relaxed);
            }
            ProtocolError::ProtocolMismatch(_)
            | ProtocolError::NoResponse(_)
            | ProtocolError::OversizedPayload(_)
            | ProtocolError::InvalidHeader
            | ProtocolError::Json(_) => {
                self.protocol_errors.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    /// Record traffic for one connection
    pub fn traffic(&self, sent: u64, received: u64) {
        self.bytes_sent.fetch_add(sent, Ordering::Relaxed);
        self.bytes_received.fetch_add(received, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            votes_total: self.votes_total.load(Ordering::Relaxed),
            votes_success: self.votes_success.load(Ordering::Relaxed),
            votes_failed: self.votes_failed.load(Ordering::Relaxed),
            connection_errors: self.connection_errors.load(Ordering::Relaxed),
            protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            votes_total = snapshot.votes_total,
            votes_success = snapshot.votes_success,
            votes_failed = snapshot.votes_failed,
            connection_errors = snapshot.connection_errors,
            protocol_errors = snapshot.protocol_errors,
            rejections = snapshot.rejections,
            bytes_sent = snapshot.bytes_sent,
            bytes_received = snapshot.bytes_received,
            uptime_seconds = snapshot.uptime_seconds,
            "Votifier client metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub votes_total: u64,
    pub votes_success: u64,
    pub votes_failed: u64,
    pub connection_errors: u64,
    pub protocol_errors: u64,
    pub rejections: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub uptime_seconds: u64,
}

static METRICS: OnceLock<Arc<Metrics>> = OnceLock::new();

/// Get the process-wide metrics instance
pub fn global() -> Arc<Metrics> {
    METRICS.get_or_init(|| Arc::new(Metrics::new())).clone()
}

/// Timer for measuring operation duration
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    /// Start timing an operation
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        debug!(
            operation = self.operation,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
    }
}
