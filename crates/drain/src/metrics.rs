//! Stage counters for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// In-process counters for a single drain stage.
///
/// Owned by the [`Drain`](crate::Drain) and shared with its workers; values
/// accumulate across restarts of the same stage.
#[derive(Debug, Default)]
pub struct DrainMetrics {
    /// Payloads handed to a worker slot
    payloads_dispatched: AtomicU64,
    /// Payloads written successfully
    payloads_written: AtomicU64,
    /// Records contained in successfully written payloads
    records_written: AtomicU64,
    /// Failed write attempts
    write_failures: AtomicU64,
}

impl DrainMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one payload handed off to a worker
    pub fn record_dispatched(&self) {
        self.payloads_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one successfully written payload and its records
    pub fn record_written(&self, records: usize) {
        self.payloads_written.fetch_add(1, Ordering::Relaxed);
        self.records_written.fetch_add(records as u64, Ordering::Relaxed);
    }

    /// Count one failed write attempt
    pub fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Payloads handed off so far
    pub fn payloads_dispatched(&self) -> u64 {
        self.payloads_dispatched.load(Ordering::Relaxed)
    }

    /// Payloads written so far
    pub fn payloads_written(&self) -> u64 {
        self.payloads_written.load(Ordering::Relaxed)
    }

    /// Records written so far
    pub fn records_written(&self) -> u64 {
        self.records_written.load(Ordering::Relaxed)
    }

    /// Failed writes so far
    pub fn write_failures(&self) -> u64 {
        self.write_failures.load(Ordering::Relaxed)
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            payloads_dispatched: self.payloads_dispatched(),
            payloads_written: self.payloads_written(),
            records_written: self.records_written(),
            write_failures: self.write_failures(),
        }
    }
}

/// Snapshot of stage counters (for reporting)
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub payloads_dispatched: u64,
    pub payloads_written: u64,
    pub records_written: u64,
    pub write_failures: u64,
}
