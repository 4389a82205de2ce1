//! Drain stage metric recording helpers.
//!
//! Thin wrappers around the `metrics` macros so every call site emits the
//! same metric names with a `destination` label. All of them are no-ops
//! until a recorder is installed (see [`crate::init_metrics_only`]).

use metrics::{counter, gauge, histogram};

/// A payload left the read-dispatch loop for a worker slot.
pub fn record_payload_dispatched(destination: &str) {
    counter!(
        "outfall_payloads_dispatched_total",
        "destination" => destination.to_string()
    )
    .increment(1);
}

/// A worker finished writing a payload.
pub fn record_payload_written(destination: &str, records: usize) {
    counter!(
        "outfall_payloads_written_total",
        "destination" => destination.to_string()
    )
    .increment(1);

    counter!(
        "outfall_records_written_total",
        "destination" => destination.to_string()
    )
    .increment(records as u64);
}

/// Time spent inside one `Writer::write` call.
pub fn record_write_duration(destination: &str, seconds: f64) {
    histogram!(
        "outfall_write_duration_seconds",
        "destination" => destination.to_string()
    )
    .record(seconds);
}

/// A write failed; the worker keeps running.
pub fn record_write_failure(destination: &str) {
    counter!(
        "outfall_write_failures_total",
        "destination" => destination.to_string()
    )
    .increment(1);
}

/// A stop sequence ran to completion.
pub fn record_drain_stopped(destination: &str) {
    counter!(
        "outfall_drain_stops_total",
        "destination" => destination.to_string()
    )
    .increment(1);
}

/// A worker picked a payload out of its hand-off slot.
pub fn record_worker_busy(destination: &str) {
    gauge!(
        "outfall_busy_workers",
        "destination" => destination.to_string()
    )
    .increment(1.0);
}

/// A worker finished its payload and is about to park itself idle again.
pub fn record_worker_idle(destination: &str) {
    gauge!(
        "outfall_busy_workers",
        "destination" => destination.to_string()
    )
    .decrement(1.0);
}
