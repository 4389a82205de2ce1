//! Writer workers - bounded pool of tasks draining hand-off slots
//!
//! Each worker owns a capacity-1 payload slot. The cycle is: check the stop
//! signal, park the slot in the idle pool, wait for a payload (or the stop
//! signal), write it, repeat. A failed write is logged and counted; the
//! worker stays in rotation so one bad payload never shrinks the pool.

use std::sync::Arc;
use std::time::Instant;

use contracts::{DestinationId, Payload, Writer};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument};

use crate::metrics::DrainMetrics;
use crate::pool::IdleRegistrar;

/// Everything one worker task needs, captured at spawn time.
pub(crate) struct WorkerContext {
    pub index: usize,
    pub destination: DestinationId,
    pub writer: Arc<dyn Writer>,
    pub registrar: IdleRegistrar,
    pub metrics: Arc<DrainMetrics>,
}

pub(crate) fn spawn_worker(ctx: WorkerContext, stop_rx: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(worker_loop(ctx, stop_rx))
}

#[instrument(
    name = "drain_worker",
    skip(ctx, stop_rx),
    fields(worker = ctx.index, destination = %ctx.destination)
)]
async fn worker_loop(ctx: WorkerContext, mut stop_rx: watch::Receiver<bool>) {
    let (slot, mut payloads) = mpsc::channel::<Payload>(1);

    debug!("Worker started");

    loop {
        // Stop observed between writes; leave without parking again.
        if *stop_rx.borrow() {
            debug!("Worker stopping");
            break;
        }

        if ctx.registrar.send(slot.clone()).await.is_err() {
            // Pool receiver is gone, so no payload can ever reach this
            // slot again.
            debug!("Idle pool closed");
            break;
        }

        // A payload already in the slot outranks the stop signal: the
        // read loop handed it off before the stop, so it gets written.
        tokio::select! {
            biased;
            payload = payloads.recv() => {
                // The worker holds its own sender; recv cannot return None.
                let Some(payload) = payload else { break };
                observability::record_worker_busy(&ctx.destination);
                write_payload(&ctx, &payload).await;
                observability::record_worker_idle(&ctx.destination);
            }
            _ = stop_rx.changed() => {
                // The slot may have been filled between the last poll and
                // the signal; drain it before leaving.
                if let Ok(payload) = payloads.try_recv() {
                    write_payload(&ctx, &payload).await;
                }
                debug!("Worker stopping");
                break;
            }
        }
    }
}

/// Write one payload, absorbing failure.
async fn write_payload(ctx: &WorkerContext, payload: &Payload) {
    let started = Instant::now();
    match ctx.writer.write(payload).await {
        Ok(()) => {
            ctx.metrics.record_written(payload.records.len());
            observability::record_payload_written(&ctx.destination, payload.records.len());
            observability::record_write_duration(&ctx.destination, started.elapsed().as_secs_f64());
        }
        Err(e) => {
            ctx.metrics.record_write_failure();
            observability::record_write_failure(&ctx.destination);
            error!(
                worker = ctx.index,
                records = payload.records.len(),
                error = %e,
                "Write failed, payload dropped"
            );
        }
    }
}
