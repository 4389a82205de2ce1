//! Drain - the destination-writing stage orchestrator
//!
//! Owns the source, the writer, and the worker pool for one
//! stream-to-destination binding. Runs the read-dispatch loop, drives the
//! Stopped/Running/Stopping lifecycle, and reports every completed stop to
//! the supervisor.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use contracts::{DestinationId, DestinationMap, DrainSettings, RecordSource, Writer};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::error::DrainError;
use crate::metrics::DrainMetrics;
use crate::pool::{idle_pool, IdleWorkers};
use crate::supervisor::DrainSupervisor;
use crate::worker::{spawn_worker, WorkerContext};
use crate::writers;

/// Lifecycle phase of a [`Drain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrainState {
    /// No run in progress; `start` is allowed
    #[default]
    Stopped,
    /// Read-dispatch loop and workers are live
    Running,
    /// A stop sequence is tearing the current run down
    Stopping,
}

impl DrainState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::Stopping => "stopping",
        }
    }
}

impl fmt::Display for DrainState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything one run owns. Built by `start`, taken out again by the one
/// `stop` call that wins the transition to `Stopping`.
struct RunState {
    writer: Arc<dyn Writer>,
    source: Arc<dyn RecordSource>,
    map: Arc<DestinationMap>,
    supervisor: Arc<dyn DrainSupervisor>,
    cancel_tx: mpsc::Sender<()>,
    loop_handle: JoinHandle<()>,
    stop_tx: watch::Sender<bool>,
    worker_handles: Vec<JoinHandle<()>>,
}

/// Orchestrator state guarded by the lifecycle lock.
///
/// The lock covers only phase transitions and the per-run references; the
/// payload path (pool hand-offs, writes) never touches it.
struct Lifecycle {
    state: DrainState,
    run: Option<RunState>,
}

/// The destination-writing stage.
///
/// One `Drain` drains one payload stream into one destination through a
/// bounded pool of writer workers. A stopped drain can be started again
/// with a fresh map and source; its [`DrainMetrics`] accumulate across runs.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use contracts::DrainSettings;
/// use drain::{ChannelSource, Drain};
/// # use contracts::DestinationMap;
/// # async fn example(supervisor: Arc<dyn drain::DrainSupervisor>, map: Arc<DestinationMap>) {
/// let (source, feeder) = ChannelSource::bounded(64);
/// let drain = Drain::new("events/archive", DrainSettings::default());
/// drain.start(supervisor, map, source).await.unwrap();
/// # let _ = feeder;
/// # }
/// ```
pub struct Drain {
    id: Bytes,
    settings: DrainSettings,
    metrics: Arc<DrainMetrics>,
    lifecycle: Mutex<Lifecycle>,
}

impl Drain {
    /// Create a stopped stage.
    ///
    /// `id` is an opaque identifier the supervisor can use to tell its
    /// stages apart. Zero workers or a zero tick would make the stage
    /// unable to progress, so both are raised to one.
    pub fn new(id: impl Into<Bytes>, mut settings: DrainSettings) -> Arc<Self> {
        settings.workers = settings.workers.max(1);
        settings.tick_interval_ms = settings.tick_interval_ms.max(1);

        Arc::new(Self {
            id: id.into(),
            settings,
            metrics: Arc::new(DrainMetrics::new()),
            lifecycle: Mutex::new(Lifecycle {
                state: DrainState::Stopped,
                run: None,
            }),
        })
    }

    /// Opaque stage identifier.
    pub fn id(&self) -> &Bytes {
        &self.id
    }

    /// Configured worker pool size.
    pub fn workers(&self) -> usize {
        self.settings.workers
    }

    /// Stage counters, cumulative across runs.
    pub fn metrics(&self) -> &Arc<DrainMetrics> {
        &self.metrics
    }

    /// Current lifecycle phase.
    pub async fn state(&self) -> DrainState {
        self.lifecycle.lock().await.state
    }

    /// True before the first start and after every completed stop.
    pub async fn stopped(&self) -> bool {
        self.lifecycle.lock().await.state == DrainState::Stopped
    }

    /// The binding of the run in progress, `None` once stopped.
    pub async fn destination_map(&self) -> Option<Arc<DestinationMap>> {
        self.lifecycle
            .lock()
            .await
            .run
            .as_ref()
            .map(|run| Arc::clone(&run.map))
    }

    /// Start draining `map` from `source`, resolving the writer from the
    /// destination kind.
    ///
    /// # Errors
    /// [`DrainError::Busy`] unless the stage is stopped; writer or source
    /// setup failures are returned as-is and leave the stage stopped with
    /// nothing spawned.
    pub async fn start(
        self: &Arc<Self>,
        supervisor: Arc<dyn DrainSupervisor>,
        map: Arc<DestinationMap>,
        source: Arc<dyn RecordSource>,
    ) -> Result<(), DrainError> {
        let writer = writers::for_destination(map.destination());
        self.start_with_writer(supervisor, map, writer, source).await
    }

    /// Start draining with an explicit writer instead of the kind-resolved
    /// one. Embedders and tests use this to keep a handle on the writer.
    #[instrument(
        name = "drain_start",
        skip(self, supervisor, map, writer, source),
        fields(drain = ?self.id, destination = %map.name(), stream = map.stream())
    )]
    pub async fn start_with_writer(
        self: &Arc<Self>,
        supervisor: Arc<dyn DrainSupervisor>,
        map: Arc<DestinationMap>,
        writer: Arc<dyn Writer>,
        source: Arc<dyn RecordSource>,
    ) -> Result<(), DrainError> {
        let mut lifecycle = self.lifecycle.lock().await;

        if lifecycle.state != DrainState::Stopped {
            warn!(state = %lifecycle.state, "Start refused, stage is busy");
            return Err(DrainError::Busy {
                state: lifecycle.state,
            });
        }

        writer.setup(map.config()).await?;

        if let Err(e) = source.setup(&map).await {
            // Unwind the writer; its teardown error is secondary to the
            // setup failure being reported.
            if let Err(te) = writer.teardown().await {
                warn!(error = %te, "Writer teardown after failed source setup");
            }
            return Err(e.into());
        }

        let workers = self.settings.workers;
        let (registrar, idle) = idle_pool(workers);
        let (stop_tx, stop_rx) = watch::channel(false);
        let (cancel_tx, cancel_rx) = mpsc::channel::<()>(1);

        let mut worker_handles = Vec::with_capacity(workers);
        for index in 0..workers {
            worker_handles.push(spawn_worker(
                WorkerContext {
                    index,
                    destination: map.name().clone(),
                    writer: Arc::clone(&writer),
                    registrar: registrar.clone(),
                    metrics: Arc::clone(&self.metrics),
                },
                stop_rx.clone(),
            ));
        }
        // Workers now hold the only registrars; the pool closes when the
        // last worker exits.
        drop(registrar);

        let loop_handle = tokio::spawn(read_dispatch_loop(
            Arc::clone(self),
            Arc::clone(&source),
            map.name().clone(),
            idle,
            cancel_rx,
            Duration::from_millis(self.settings.tick_interval_ms),
        ));

        lifecycle.run = Some(RunState {
            writer,
            source,
            map: Arc::clone(&map),
            supervisor,
            cancel_tx,
            loop_handle,
            stop_tx,
            worker_handles,
        });
        lifecycle.state = DrainState::Running;

        info!(workers, "Drain started");
        Ok(())
    }

    /// Stop the run in progress.
    ///
    /// Idempotent: whichever caller wins the transition to `Stopping`
    /// performs the full sequence; every other concurrent or repeated call
    /// returns `Ok(())` immediately. The sequence cancels and joins the
    /// read-dispatch loop (after which no payload can be dispatched),
    /// signals the workers and waits for their in-flight writes, tears the
    /// writer and source down best-effort, transitions back to `Stopped`,
    /// and finally notifies the supervisor.
    ///
    /// `graceful` is recorded for the log trail; both values take the
    /// cooperative path that waits for in-flight work without a deadline.
    #[instrument(name = "drain_stop", skip(self), fields(drain = ?self.id, graceful))]
    pub async fn stop(self: &Arc<Self>, graceful: bool) -> Result<(), DrainError> {
        let run = {
            let mut lifecycle = self.lifecycle.lock().await;
            if lifecycle.state != DrainState::Running {
                debug!(state = %lifecycle.state, "Stop is a no-op");
                return Ok(());
            }
            let Some(run) = lifecycle.run.take() else {
                return Ok(());
            };
            lifecycle.state = DrainState::Stopping;
            run
        };

        let destination = run.map.name().clone();
        info!(destination = %destination, "Stopping drain");

        // Cancel the read-dispatch loop and wait for it to wind down; the
        // join is the acknowledgement that no further dispatch can happen.
        if run.cancel_tx.send(()).await.is_err() {
            debug!("Read-dispatch loop already gone");
        }
        if let Err(e) = run.loop_handle.await {
            error!(error = %e, "Read-dispatch loop task panicked");
        }

        // Workers finish the write they are on, drain a payload already
        // parked in their slot, and exit without re-registering.
        if run.stop_tx.send(true).is_err() {
            debug!("All workers already gone");
        }
        for (index, handle) in run.worker_handles.into_iter().enumerate() {
            if let Err(e) = handle.await {
                error!(worker = index, error = %e, "Worker task panicked");
            }
        }

        // Teardown is best-effort; shutdown always runs to completion.
        if let Err(e) = run.writer.teardown().await {
            error!(destination = %destination, error = %e, "Writer teardown failed");
        }
        if let Err(e) = run.source.teardown().await {
            error!(destination = %destination, error = %e, "Source teardown failed");
        }

        {
            let mut lifecycle = self.lifecycle.lock().await;
            lifecycle.state = DrainState::Stopped;
        }

        observability::record_drain_stopped(&destination);
        info!(destination = %destination, "Drain stopped");

        // Outside the lock, so the callback observes a settled stage.
        run.supervisor
            .drain_stopped(Arc::clone(self), Arc::clone(&run.map))
            .await;

        Ok(())
    }
}

/// Poll the source on a fixed tick and hand each payload to one idle
/// worker. Runs as its own task until cancelled; exits only through the
/// cancellation handshake (or with the pool gone, which cannot happen
/// before the stop sequence).
async fn read_dispatch_loop(
    drain: Arc<Drain>,
    source: Arc<dyn RecordSource>,
    destination: DestinationId,
    mut idle: IdleWorkers,
    mut cancel_rx: mpsc::Receiver<()>,
    tick: Duration,
) {
    debug!(destination = %destination, "Read-dispatch loop started");

    // Only the first end-of-stream or read error spawns a stop task;
    // anything the loop sees while that stop is pending is ignored.
    let mut stop_triggered = false;

    loop {
        // Cancellation outranks the tick.
        tokio::select! {
            biased;
            _ = cancel_rx.recv() => {
                debug!(destination = %destination, "Read-dispatch loop cancelled");
                break;
            }
            _ = tokio::time::sleep(tick) => {}
        }

        let payload = match source.read().await {
            Ok(Some(payload)) => payload,
            Ok(None) => continue,
            Err(e) => {
                if !stop_triggered {
                    stop_triggered = true;
                    error!(destination = %destination, error = %e, "Source read failed, stopping drain");
                    spawn_stop(&drain);
                }
                continue;
            }
        };

        let end_of_stream = payload.end_of_stream;

        // Backpressure point: with every worker busy this blocks, and no
        // further reads happen until one parks its slot again.
        let Some(slot) = idle.recv().await else {
            error!(destination = %destination, "Worker pool closed with a payload in hand");
            break;
        };

        if slot.send(payload).await.is_err() {
            // Worker exited between parking its slot and the hand-off;
            // only reachable once a stop is already tearing the run down.
            warn!(destination = %destination, "Idle worker gone, payload dropped");
            continue;
        }

        drain.metrics.record_dispatched();
        observability::record_payload_dispatched(&destination);

        if end_of_stream && !stop_triggered {
            stop_triggered = true;
            info!(destination = %destination, "End of stream, stopping drain");
            spawn_stop(&drain);
        }
    }
}

/// Trigger a stop from inside the read-dispatch loop.
///
/// The stop sequence joins the loop task, so it must run on a task of its
/// own; the loop keeps polling until the cancellation arrives.
fn spawn_stop(drain: &Arc<Drain>) {
    let drain = Arc::clone(drain);
    tokio::spawn(async move {
        if let Err(e) = drain.stop(true).await {
            error!(error = %e, "Self-triggered stop failed");
        }
    });
}
