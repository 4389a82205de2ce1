//! LogWriter - emits payload summaries via tracing

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use contracts::{ContractError, DestinationConfig, DestinationId, Payload, Writer};
use tracing::{debug, info, instrument, trace};

/// Writer that logs a summary line per payload.
///
/// With `level = "debug"` the summary drops to debug level, keeping a
/// high-volume stream out of the default log output. Individual records go
/// out at trace level either way.
pub struct LogWriter {
    name: DestinationId,
    debug_level: AtomicBool,
}

impl LogWriter {
    /// Create a new LogWriter for the given destination name.
    pub fn new(name: impl Into<DestinationId>) -> Self {
        Self {
            name: name.into(),
            debug_level: AtomicBool::new(false),
        }
    }

    fn log_payload_summary(&self, payload: &Payload) {
        if self.debug_level.load(Ordering::Relaxed) {
            debug!(
                destination = %self.name,
                records = payload.records.len(),
                end_of_stream = payload.end_of_stream,
                "Payload received"
            );
        } else {
            info!(
                destination = %self.name,
                records = payload.records.len(),
                end_of_stream = payload.end_of_stream,
                "Payload received"
            );
        }

        for record in &payload.records {
            if let Ok(json) = serde_json::to_string(record) {
                trace!(destination = %self.name, record = %json, "Record");
            }
        }
    }
}

#[async_trait]
impl Writer for LogWriter {
    #[instrument(name = "log_writer_setup", skip(self, config), fields(destination = %self.name))]
    async fn setup(&self, config: &DestinationConfig) -> Result<(), ContractError> {
        match config.get("level") {
            None | Some("info") => self.debug_level.store(false, Ordering::Relaxed),
            Some("debug") => self.debug_level.store(true, Ordering::Relaxed),
            Some(other) => {
                return Err(ContractError::destination_setup(
                    self.name.as_str(),
                    format!("unsupported level '{other}' (expected 'info' or 'debug')"),
                ));
            }
        }
        Ok(())
    }

    async fn write(&self, payload: &Payload) -> Result<(), ContractError> {
        self.log_payload_summary(payload);
        Ok(())
    }

    #[instrument(name = "log_writer_teardown", skip(self))]
    async fn teardown(&self) -> Result<(), ContractError> {
        info!(destination = %self.name, "LogWriter closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Record;

    #[tokio::test]
    async fn test_write_accepts_any_payload() {
        let writer = LogWriter::new("test_log");
        writer.setup(&DestinationConfig::default()).await.unwrap();

        let payload = Payload::new(vec![Record::new().with_field("seq", 1)]);
        writer.write(&payload).await.unwrap();

        let marker = Payload::new(Vec::new()).with_end_of_stream(true);
        writer.write(&marker).await.unwrap();

        writer.teardown().await.unwrap();
    }

    #[tokio::test]
    async fn test_level_param_switches_to_debug() {
        let writer = LogWriter::new("test_log");
        let config = DestinationConfig::default().with_param("level", "debug");
        writer.setup(&config).await.unwrap();
        assert!(writer.debug_level.load(Ordering::Relaxed));

        let config = DestinationConfig::default().with_param("level", "info");
        writer.setup(&config).await.unwrap();
        assert!(!writer.debug_level.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn test_unknown_level_fails_setup() {
        let writer = LogWriter::new("test_log");
        let config = DestinationConfig::default().with_param("level", "loud");
        let err = writer.setup(&config).await.unwrap_err();
        assert!(err.to_string().contains("unsupported level 'loud'"));
    }
}
