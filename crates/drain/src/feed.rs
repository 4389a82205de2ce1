//! RecordFeed - synthetic payload generator
//!
//! Feeds a ChannelSource with generated records for demo runs and tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use contracts::{FeedConfig, Payload, Record};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::source::PayloadSender;

/// Generator emitting payloads of synthetic records at a fixed rate.
///
/// Each record carries a monotonically increasing `seq`, the `stream` name,
/// and an `emitted_at` timestamp. With a non-zero `payload_count` the final
/// payload carries the end-of-stream marker and the sender is dropped right
/// after it; with zero the feed runs until [`RecordFeed::stop`].
pub struct RecordFeed {
    stream: String,
    config: FeedConfig,
    running: Arc<AtomicBool>,
}

impl RecordFeed {
    /// Create a new feed for the given stream name.
    pub fn new(stream: impl Into<String>, config: FeedConfig) -> Self {
        Self {
            stream: stream.into(),
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start emitting into `sender`. The task ends when the configured
    /// payload count is reached, the channel closes, or `stop` is called.
    pub fn spawn(&self, sender: PayloadSender) -> JoinHandle<()> {
        let stream = self.stream.clone();
        let config = self.config.clone();
        let running = Arc::clone(&self.running);

        running.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            // rate_hz is validated > 0 upstream; a bad value degrades to
            // flat-out emission rather than a panic here.
            let interval = if config.rate_hz.is_finite() && config.rate_hz > 0.0 {
                Duration::from_secs_f64(1.0 / config.rate_hz)
            } else {
                Duration::ZERO
            };

            let mut seq: u64 = 0;
            let mut emitted: u64 = 0;

            debug!(
                stream = %stream,
                payloads = config.payload_count,
                rate_hz = config.rate_hz,
                "Record feed started"
            );

            while running.load(Ordering::Relaxed) {
                emitted += 1;
                let last = config.payload_count != 0 && emitted >= config.payload_count;

                let mut records = Vec::with_capacity(config.records_per_payload);
                for _ in 0..config.records_per_payload {
                    seq += 1;
                    records.push(
                        Record::new()
                            .with_field("seq", seq)
                            .with_field("stream", stream.as_str())
                            .with_field("emitted_at", Utc::now().to_rfc3339()),
                    );
                }

                let payload = Payload::new(records).with_end_of_stream(last);
                if sender.send(payload).await.is_err() {
                    debug!(stream = %stream, "Feed channel closed");
                    break;
                }
                trace!(stream = %stream, payload = emitted, last, "Payload emitted");

                if last {
                    break;
                }
                tokio::time::sleep(interval).await;
            }

            running.store(false, Ordering::SeqCst);
            debug!(stream = %stream, emitted, "Record feed finished");
            // The sender drops here; once no other sender exists the source
            // observes closure after draining what is buffered.
        })
    }

    /// Ask the feed to stop before its payload count is reached.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}
