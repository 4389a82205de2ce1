//! FileWriter - appends records to a local file as JSON lines

use std::path::PathBuf;

use async_trait::async_trait;
use contracts::{ContractError, DestinationConfig, DestinationId, Payload, Writer};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Open-file state, present between setup and teardown.
struct OpenFile {
    file: BufWriter<File>,
    path: PathBuf,
}

/// Writer that persists records in JSONL form.
///
/// The open file sits behind a `tokio::sync::Mutex`, so concurrent worker
/// writes serialize and never interleave lines. Each payload flushes once
/// after its last record.
///
/// Params: `path` (required), `mode` (`append` default, `truncate`).
pub struct FileWriter {
    name: DestinationId,
    state: Mutex<Option<OpenFile>>,
}

impl FileWriter {
    /// Create a new FileWriter for the given destination name.
    pub fn new(name: impl Into<DestinationId>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Writer for FileWriter {
    #[instrument(name = "file_writer_setup", skip(self, config), fields(destination = %self.name))]
    async fn setup(&self, config: &DestinationConfig) -> Result<(), ContractError> {
        let path = PathBuf::from(config.require(&self.name, "path")?);
        let truncate = match config.get("mode") {
            None | Some("append") => false,
            Some("truncate") => true,
            Some(other) => {
                return Err(ContractError::destination_setup(
                    self.name.as_str(),
                    format!("unsupported mode '{other}' (expected 'append' or 'truncate')"),
                ));
            }
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    ContractError::destination_setup(
                        self.name.as_str(),
                        format!("create {}: {e}", parent.display()),
                    )
                })?;
            }
        }

        let mut options = OpenOptions::new();
        options.create(true);
        if truncate {
            options.write(true).truncate(true);
        } else {
            options.append(true);
        }
        let file = options.open(&path).await.map_err(|e| {
            ContractError::destination_setup(
                self.name.as_str(),
                format!("open {}: {e}", path.display()),
            )
        })?;

        debug!(destination = %self.name, path = %path.display(), truncate, "File opened");

        let mut state = self.state.lock().await;
        *state = Some(OpenFile {
            file: BufWriter::new(file),
            path,
        });
        Ok(())
    }

    async fn write(&self, payload: &Payload) -> Result<(), ContractError> {
        // A bare end-of-stream marker has nothing to persist.
        if payload.records.is_empty() {
            return Ok(());
        }

        let io_err =
            |e: std::io::Error| ContractError::destination_write(self.name.as_str(), e.to_string());

        let mut state = self.state.lock().await;
        let Some(open) = state.as_mut() else {
            return Err(ContractError::destination_write(
                self.name.as_str(),
                "writer is not set up",
            ));
        };

        for record in &payload.records {
            let line = serde_json::to_vec(record)
                .map_err(|e| ContractError::destination_write(self.name.as_str(), e.to_string()))?;
            open.file.write_all(&line).await.map_err(io_err)?;
            open.file.write_all(b"\n").await.map_err(io_err)?;
        }
        open.file.flush().await.map_err(io_err)?;
        Ok(())
    }

    #[instrument(name = "file_writer_teardown", skip(self))]
    async fn teardown(&self) -> Result<(), ContractError> {
        let mut state = self.state.lock().await;
        if let Some(mut open) = state.take() {
            open.file.shutdown().await.map_err(|e| {
                ContractError::destination_teardown(self.name.as_str(), e.to_string())
            })?;
            debug!(destination = %self.name, path = %open.path.display(), "FileWriter closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Record;
    use tempfile::tempdir;

    fn payload(seqs: &[u64]) -> Payload {
        Payload::new(
            seqs.iter()
                .map(|seq| Record::new().with_field("seq", *seq))
                .collect(),
        )
    }

    fn read_lines(path: &std::path::Path) -> Vec<Record> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_setup_requires_path() {
        let writer = FileWriter::new("archive");
        let err = writer.setup(&DestinationConfig::default()).await.unwrap_err();
        assert!(err.to_string().contains("missing required param 'path'"));
    }

    #[tokio::test]
    async fn test_unknown_mode_fails_setup() {
        let dir = tempdir().unwrap();
        let writer = FileWriter::new("archive");
        let config = DestinationConfig::default()
            .with_param("path", dir.path().join("out.jsonl").display().to_string())
            .with_param("mode", "overwrite");
        let err = writer.setup(&config).await.unwrap_err();
        assert!(err.to_string().contains("unsupported mode 'overwrite'"));
    }

    #[tokio::test]
    async fn test_write_before_setup_fails() {
        let writer = FileWriter::new("archive");
        let err = writer.write(&payload(&[1])).await.unwrap_err();
        assert!(err.to_string().contains("not set up"));
    }

    #[tokio::test]
    async fn test_writes_json_lines_and_creates_parents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/out/events.jsonl");
        let config =
            DestinationConfig::default().with_param("path", path.display().to_string());

        let writer = FileWriter::new("archive");
        writer.setup(&config).await.unwrap();
        writer.write(&payload(&[1, 2])).await.unwrap();
        writer.write(&payload(&[3])).await.unwrap();
        writer.teardown().await.unwrap();

        let records = read_lines(&path);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].get("seq"), Some(&serde_json::Value::from(1)));
        assert_eq!(records[2].get("seq"), Some(&serde_json::Value::from(3)));
    }

    #[tokio::test]
    async fn test_empty_marker_payload_writes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let config =
            DestinationConfig::default().with_param("path", path.display().to_string());

        let writer = FileWriter::new("archive");
        writer.setup(&config).await.unwrap();
        writer
            .write(&Payload::new(Vec::new()).with_end_of_stream(true))
            .await
            .unwrap();
        writer.teardown().await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[tokio::test]
    async fn test_default_mode_appends_across_sessions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let config =
            DestinationConfig::default().with_param("path", path.display().to_string());

        for seq in [1_u64, 2] {
            let writer = FileWriter::new("archive");
            writer.setup(&config).await.unwrap();
            writer.write(&payload(&[seq])).await.unwrap();
            writer.teardown().await.unwrap();
        }

        assert_eq!(read_lines(&path).len(), 2);
    }

    #[tokio::test]
    async fn test_truncate_mode_starts_fresh() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let append =
            DestinationConfig::default().with_param("path", path.display().to_string());
        let truncate = append.clone().with_param("mode", "truncate");

        let writer = FileWriter::new("archive");
        writer.setup(&append).await.unwrap();
        writer.write(&payload(&[1, 2, 3])).await.unwrap();
        writer.teardown().await.unwrap();

        let writer = FileWriter::new("archive");
        writer.setup(&truncate).await.unwrap();
        writer.write(&payload(&[9])).await.unwrap();
        writer.teardown().await.unwrap();

        let records = read_lines(&path);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("seq"), Some(&serde_json::Value::from(9)));
    }
}
