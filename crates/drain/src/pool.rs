//! Idle-worker hand-off pool

use contracts::Payload;
use tokio::sync::mpsc;

/// Sending half of one worker's capacity-1 payload slot.
pub(crate) type PayloadSlot = mpsc::Sender<Payload>;

/// Worker side of the pool: parks the worker's slot when it goes idle.
pub(crate) type IdleRegistrar = mpsc::Sender<PayloadSlot>;

/// Dispatch side of the pool: yields the slot of the next idle worker.
pub(crate) type IdleWorkers = mpsc::Receiver<PayloadSlot>;

/// Bounded queue matching payloads to idle workers.
///
/// Capacity equals the worker count and each worker parks at most one
/// registration at a time, so registering never waits for space. Receiving
/// from an empty pool blocks until a worker frees up, which is the stage's
/// backpressure point.
pub(crate) fn idle_pool(workers: usize) -> (IdleRegistrar, IdleWorkers) {
    mpsc::channel(workers)
}
