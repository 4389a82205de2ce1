//! Pipeline assembly - one drain stage per configured destination.
//!
//! Builds the map/source/feed trio for every destination in the blueprint,
//! starts the stages under a channel-backed supervisor, and waits until
//! they all stop: on their own at end of stream, at the optional deadline,
//! or on Ctrl-C/SIGTERM.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use contracts::DestinationMap;
use drain::{ChannelSource, Drain, DrainSupervisor, RecordFeed};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::stats::{DestinationStats, RunSummary};

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The validated run blueprint
    pub blueprint: contracts::DrainBlueprint,

    /// Stop every stage after this long (None = run to end of stream)
    pub duration: Option<Duration>,

    /// Feed payload count override (None = blueprint value)
    pub payloads: Option<u64>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Supervisor that reports every stopped stage over a channel.
struct RunSupervisor {
    stopped_tx: mpsc::Sender<Bytes>,
}

#[async_trait]
impl DrainSupervisor for RunSupervisor {
    async fn drain_stopped(&self, drain: Arc<Drain>, map: Arc<DestinationMap>) {
        debug!(destination = %map.name(), "Stage reported stopped");
        // Capacity covers one callback per stage, so the send cannot wedge
        // a stop sequence even while nobody is receiving.
        let _ = self.stopped_tx.send(drain.id().clone()).await;
    }
}

/// One assembled stage and the feed driving it.
struct Stage {
    drain: Arc<Drain>,
    feed: RecordFeed,
    feed_handle: JoinHandle<()>,
    map: Arc<DestinationMap>,
}

/// Assembles and runs the drain stages described by a blueprint.
pub struct DrainPipeline {
    config: PipelineConfig,
}

impl DrainPipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run every stage to completion and collect the summary.
    pub async fn run(self) -> Result<RunSummary> {
        let started = Instant::now();
        let blueprint = &self.config.blueprint;

        // Metrics exporter (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port).context("Failed to start metrics endpoint")?;
        }

        if blueprint.destinations.is_empty() {
            warn!("No destinations configured - nothing to drain");
            return Ok(RunSummary {
                destinations: Vec::new(),
                elapsed: started.elapsed(),
                interrupted: false,
            });
        }

        let mut feed_config = blueprint.feed.clone();
        if let Some(payloads) = self.config.payloads {
            info!(payloads, "Overriding feed payload count from CLI");
            feed_config.payload_count = payloads;
        }

        // Each stage reports its stop exactly once; capacity covers all of
        // them so no callback ever waits on this channel.
        let (stopped_tx, mut stopped_rx) = mpsc::channel::<Bytes>(blueprint.destinations.len());
        let supervisor: Arc<dyn DrainSupervisor> = Arc::new(RunSupervisor { stopped_tx });

        let mut stages: Vec<Stage> = Vec::with_capacity(blueprint.destinations.len());
        for spec in &blueprint.destinations {
            let map = Arc::new(blueprint.destination_map(spec));
            let drain = Drain::new(map.id().clone(), blueprint.drain.clone());
            let (source, sender) = ChannelSource::bounded(blueprint.drain.source_capacity);

            if let Err(e) = drain
                .start(Arc::clone(&supervisor), Arc::clone(&map), source)
                .await
            {
                // Unwind whatever already started before bailing out.
                stop_stages(&stages).await;
                return Err(anyhow::Error::new(e)).with_context(|| {
                    format!("Failed to start drain for destination '{}'", map.name())
                });
            }

            let feed = RecordFeed::new(blueprint.stream.name.clone(), feed_config.clone());
            let feed_handle = feed.spawn(sender);

            info!(
                destination = %map.name(),
                kind = %map.destination().kind,
                workers = drain.workers(),
                "Stage running"
            );
            stages.push(Stage {
                drain,
                feed,
                feed_handle,
                map,
            });
        }

        let interrupted = self.wait_for_stages(&stages, &mut stopped_rx).await;

        // Bounded feeds are done by now; stop covers unbounded ones whose
        // next send fails against the torn-down source.
        for stage in &mut stages {
            stage.feed.stop();
            if tokio::time::timeout(Duration::from_secs(5), &mut stage.feed_handle)
                .await
                .is_err()
            {
                warn!(destination = %stage.map.name(), "Feed did not finish in time");
            }
        }

        let destinations = stages
            .iter()
            .map(|stage| {
                let snapshot = stage.drain.metrics().snapshot();
                DestinationStats {
                    destination: stage.map.name().to_string(),
                    kind: stage.map.destination().kind.to_string(),
                    payloads_dispatched: snapshot.payloads_dispatched,
                    payloads_written: snapshot.payloads_written,
                    records_written: snapshot.records_written,
                    write_failures: snapshot.write_failures,
                }
            })
            .collect();

        let summary = RunSummary {
            destinations,
            elapsed: started.elapsed(),
            interrupted,
        };

        info!(
            elapsed_secs = summary.elapsed.as_secs_f64(),
            interrupted, "All stages stopped"
        );

        Ok(summary)
    }

    /// Block until every stage has reported its stop. Returns true when the
    /// deadline or a shutdown signal forced the stops.
    async fn wait_for_stages(
        &self,
        stages: &[Stage],
        stopped_rx: &mut mpsc::Receiver<Bytes>,
    ) -> bool {
        let mut remaining = stages.len();
        let mut interrupted = false;

        let duration = self.config.duration;
        let deadline = async move {
            match duration {
                Some(duration) => tokio::time::sleep(duration).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);

        let shutdown = setup_shutdown_signal();
        tokio::pin!(shutdown);

        while remaining > 0 {
            tokio::select! {
                Some(id) = stopped_rx.recv() => {
                    remaining -= 1;
                    debug!(drain = ?id, remaining, "Stage stop acknowledged");
                }
                _ = &mut deadline, if !interrupted => {
                    info!("Run duration elapsed, stopping stages");
                    interrupted = true;
                    stop_stages(stages).await;
                }
                _ = &mut shutdown, if !interrupted => {
                    warn!("Shutdown signal received, stopping stages");
                    interrupted = true;
                    stop_stages(stages).await;
                }
            }
        }

        interrupted
    }
}

/// Stop every running stage, feeds first so nothing new piles up.
///
/// Stages that already stopped on their own treat this as a no-op.
async fn stop_stages(stages: &[Stage]) {
    for stage in stages {
        stage.feed.stop();
        if let Err(e) = stage.drain.stop(true).await {
            warn!(destination = %stage.map.name(), error = %e, "Stage stop failed");
        }
    }
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
