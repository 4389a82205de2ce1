//! MemoryWriter - buffers written records in memory

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use contracts::{ContractError, DestinationConfig, DestinationId, Payload, Record, Writer};
use tracing::{debug, instrument};

/// Writer that keeps every written batch in memory.
///
/// Backs `kind = "memory"` destinations in demos and is the lens the
/// integration tests look through: everything a stage wrote stays
/// observable after the stage has stopped. The optional `capacity` param
/// caps retained batches, dropping the oldest first; counters keep running
/// regardless.
pub struct MemoryWriter {
    name: DestinationId,
    batches: Mutex<VecDeque<Vec<Record>>>,
    capacity: AtomicUsize,
    payload_count: AtomicUsize,
    record_count: AtomicUsize,
    teardown_count: AtomicUsize,
    end_of_stream_seen: AtomicBool,
}

impl MemoryWriter {
    /// Create a new MemoryWriter for the given destination name.
    pub fn new(name: impl Into<DestinationId>) -> Self {
        Self {
            name: name.into(),
            batches: Mutex::new(VecDeque::new()),
            capacity: AtomicUsize::new(usize::MAX),
            payload_count: AtomicUsize::new(0),
            record_count: AtomicUsize::new(0),
            teardown_count: AtomicUsize::new(0),
            end_of_stream_seen: AtomicBool::new(false),
        }
    }

    /// Record batches retained so far, oldest first.
    pub fn written(&self) -> Vec<Vec<Record>> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Payloads written, including ones a capacity cap has since dropped.
    pub fn payload_count(&self) -> usize {
        self.payload_count.load(Ordering::SeqCst)
    }

    /// Records written across all payloads.
    pub fn record_count(&self) -> usize {
        self.record_count.load(Ordering::SeqCst)
    }

    /// True once a payload with the end-of-stream marker was written.
    pub fn end_of_stream_seen(&self) -> bool {
        self.end_of_stream_seen.load(Ordering::SeqCst)
    }

    /// Completed teardown calls.
    pub fn teardown_count(&self) -> usize {
        self.teardown_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Writer for MemoryWriter {
    #[instrument(name = "memory_writer_setup", skip(self, config), fields(destination = %self.name))]
    async fn setup(&self, config: &DestinationConfig) -> Result<(), ContractError> {
        let capacity = match config.get("capacity") {
            None => usize::MAX,
            Some(raw) => raw.parse::<usize>().map_err(|_| {
                ContractError::destination_setup(
                    self.name.as_str(),
                    format!("capacity '{raw}' is not a number"),
                )
            })?,
        };
        self.capacity.store(capacity, Ordering::Relaxed);
        Ok(())
    }

    async fn write(&self, payload: &Payload) -> Result<(), ContractError> {
        self.payload_count.fetch_add(1, Ordering::SeqCst);
        self.record_count
            .fetch_add(payload.records.len(), Ordering::SeqCst);
        if payload.end_of_stream {
            self.end_of_stream_seen.store(true, Ordering::SeqCst);
        }

        let capacity = self.capacity.load(Ordering::Relaxed);
        let mut batches = self.batches.lock().unwrap_or_else(PoisonError::into_inner);
        batches.push_back(payload.records.clone());
        while batches.len() > capacity {
            batches.pop_front();
        }
        Ok(())
    }

    #[instrument(name = "memory_writer_teardown", skip(self))]
    async fn teardown(&self) -> Result<(), ContractError> {
        self.teardown_count.fetch_add(1, Ordering::SeqCst);
        debug!(
            destination = %self.name,
            payloads = self.payload_count(),
            "MemoryWriter closed"
        );
        Ok(())
    }
}
