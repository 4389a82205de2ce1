//! Blueprint Pipeline Demo
//!
//! Loads a blueprint file (or falls back to a built-in one), runs one drain
//! stage per destination with a synthetic record feed driving each, and
//! prints the per-destination counters once every stage has stopped itself.
//!
//! Run with: cargo run --bin blueprint_pipeline [config_path]

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use config_loader::ConfigLoader;
use contracts::{
    ConfigVersion, DestinationKind, DestinationMap, DestinationSpec, DrainBlueprint,
    DrainSettings, FeedConfig, StreamConfig,
};
use drain::{ChannelSource, Drain, DrainSupervisor, RecordFeed};
use tokio::sync::mpsc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Reports every stopped stage over a channel.
struct StopReporter {
    stopped_tx: mpsc::Sender<()>,
}

#[async_trait]
impl DrainSupervisor for StopReporter {
    async fn drain_stopped(&self, _drain: Arc<Drain>, map: Arc<DestinationMap>) {
        info!(destination = %map.name(), "Stage reported stopped");
        let _ = self.stopped_tx.send(()).await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Blueprint Pipeline Demo");

    // ==== Stage 1: Load or build the blueprint ====
    let blueprint = if let Some(path) = std::env::args().nth(1) {
        info!(path = %path, "Loading blueprint");
        ConfigLoader::load_from_path(Path::new(&path))?
    } else {
        create_demo_blueprint()
    };
    info!(
        stream = %blueprint.stream.name,
        destinations = blueprint.destinations.len(),
        "Blueprint ready"
    );

    // ==== Stage 2: One stage per destination ====
    let (stopped_tx, mut stopped_rx) = mpsc::channel(blueprint.destinations.len().max(1));
    let supervisor: Arc<dyn DrainSupervisor> = Arc::new(StopReporter { stopped_tx });

    let mut stages = Vec::new();
    for spec in &blueprint.destinations {
        let map = Arc::new(blueprint.destination_map(spec));
        let drain = Drain::new(map.id().clone(), blueprint.drain.clone());
        let (source, sender) = ChannelSource::bounded(blueprint.drain.source_capacity);

        drain
            .start(Arc::clone(&supervisor), Arc::clone(&map), source)
            .await?;

        let feed = RecordFeed::new(blueprint.stream.name.clone(), blueprint.feed.clone());
        let feed_handle = feed.spawn(sender);
        info!(destination = %map.name(), kind = %map.destination().kind, "Stage running");
        stages.push((drain, map, feed, feed_handle));
    }

    // ==== Stage 3: Wait until every stage stops itself ====
    let total = stages.len();
    let wait_all = async {
        let mut remaining = total;
        while remaining > 0 {
            if stopped_rx.recv().await.is_none() {
                break;
            }
            remaining -= 1;
        }
    };

    if tokio::time::timeout(Duration::from_secs(30), wait_all)
        .await
        .is_err()
    {
        warn!("Deadline hit, stopping stages");
        for (drain, _, feed, _) in &stages {
            feed.stop();
            drain.stop(true).await?;
        }
    }

    // ==== Stage 4: Join the feeds and print counters ====
    for (drain, map, _, feed_handle) in &mut stages {
        let _ = tokio::time::timeout(Duration::from_secs(2), feed_handle).await;
        let snapshot = drain.metrics().snapshot();
        info!(
            destination = %map.name(),
            dispatched = snapshot.payloads_dispatched,
            written = snapshot.payloads_written,
            records = snapshot.records_written,
            failures = snapshot.write_failures,
            "Stage counters"
        );
    }

    info!("Blueprint Pipeline Demo finished");
    Ok(())
}

fn create_demo_blueprint() -> DrainBlueprint {
    DrainBlueprint {
        version: ConfigVersion::V1,
        stream: StreamConfig {
            name: "events".to_string(),
        },
        feed: FeedConfig {
            payload_count: 40,
            records_per_payload: 4,
            rate_hz: 100.0,
        },
        drain: DrainSettings {
            workers: 2,
            tick_interval_ms: 1,
            source_capacity: 16,
        },
        destinations: vec![
            DestinationSpec {
                name: "audit".into(),
                kind: DestinationKind::Log,
                config: BTreeMap::new(),
            },
            DestinationSpec {
                name: "latest".into(),
                kind: DestinationKind::Memory,
                config: BTreeMap::from([("capacity".to_string(), "8".to_string())]),
            },
        ],
    }
}
