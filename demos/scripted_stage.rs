//! Scripted Stage Demo
//!
//! Drives one drain stage by hand: a short scripted stream goes through a
//! channel source into a memory destination, the stage stops itself at the
//! end-of-stream marker, and the retained batches are printed. No blueprint
//! file and no CLI involved.
//!
//! Run with: cargo run --bin scripted_stage

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use contracts::{
    Destination, DestinationConfig, DestinationKind, DestinationMap, DrainSettings, Payload,
    Record,
};
use drain::{ChannelSource, Drain, DrainSupervisor, MemoryWriter};
use tokio::sync::mpsc;
use tracing::info;

/// Forwards the stop notification to main over a channel.
struct ChannelSupervisor {
    stopped_tx: mpsc::Sender<()>,
}

#[async_trait]
impl DrainSupervisor for ChannelSupervisor {
    async fn drain_stopped(&self, drain: Arc<Drain>, map: Arc<DestinationMap>) {
        info!(drain = ?drain.id(), destination = %map.name(), "Stage reported stopped");
        let _ = self.stopped_tx.send(()).await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("Starting Scripted Stage Demo");

    // ==== Stage 1: Assemble the drain stage ====
    let map = Arc::new(DestinationMap::new(
        "events/latest",
        "events",
        Destination {
            name: "latest".into(),
            kind: DestinationKind::Memory,
        },
        DestinationConfig::default(),
    ));
    let writer = Arc::new(MemoryWriter::new("latest"));
    let (source, feeder) = ChannelSource::bounded(8);
    let (stopped_tx, mut stopped_rx) = mpsc::channel(1);
    let supervisor = Arc::new(ChannelSupervisor { stopped_tx });

    let drain = Drain::new(
        map.id().clone(),
        DrainSettings {
            workers: 2,
            tick_interval_ms: 1,
            source_capacity: 8,
        },
    );
    drain
        .start_with_writer(supervisor, Arc::clone(&map), writer.clone(), source)
        .await?;
    info!(workers = drain.workers(), "Stage running");

    // ==== Stage 2: Feed the scripted stream ====
    let script: Vec<Vec<u64>> = vec![vec![1, 2], vec![3], vec![4, 5, 6]];
    for seqs in &script {
        let records = seqs
            .iter()
            .map(|seq| Record::new().with_field("seq", *seq))
            .collect();
        feeder.send(Payload::new(records)).await?;
    }
    // An empty payload carrying the marker ends the stream.
    feeder
        .send(Payload::new(Vec::new()).with_end_of_stream(true))
        .await?;

    // ==== Stage 3: Wait for the self-stop ====
    tokio::time::timeout(Duration::from_secs(5), stopped_rx.recv())
        .await?
        .ok_or("stage never reported its stop")?;

    // ==== Stage 4: Inspect what landed ====
    let snapshot = drain.metrics().snapshot();
    info!(
        payloads = snapshot.payloads_written,
        records = snapshot.records_written,
        failures = snapshot.write_failures,
        "Stage counters"
    );

    for (index, batch) in writer.written().iter().enumerate() {
        let seqs: Vec<u64> = batch
            .iter()
            .filter_map(|record| record.get("seq").and_then(|value| value.as_u64()))
            .collect();
        info!(batch = index, ?seqs, "Retained batch");
    }

    info!("Scripted Stage Demo finished");
    Ok(())
}
