//! ChannelSource - RecordSource over an in-process channel

use std::sync::{Arc, Mutex, PoisonError};

use async_channel::TryRecvError;
use async_trait::async_trait;
use contracts::{ContractError, DestinationId, DestinationMap, Payload, RecordSource};
use tracing::debug;

/// Sending half handed to whoever produces payloads.
pub type PayloadSender = async_channel::Sender<Payload>;

/// Record source backed by a bounded in-process queue.
///
/// `read` never waits: an empty queue is "nothing yet", and a closed-and
/// -drained queue is the terminal [`ContractError::SourceClosed`] that makes
/// the stage stop itself. Payloads buffered at close time still come out
/// first. Teardown closes the queue from the receiving side, so feeders see
/// their next send fail instead of filling a queue nobody reads.
pub struct ChannelSource {
    receiver: async_channel::Receiver<Payload>,
    bound: Mutex<Option<DestinationId>>,
}

impl ChannelSource {
    /// Create a source and the sender that feeds it.
    ///
    /// `capacity` bounds the number of buffered payloads; senders wait when
    /// it is full. A zero capacity is raised to one.
    pub fn bounded(capacity: usize) -> (Arc<Self>, PayloadSender) {
        let (sender, receiver) = async_channel::bounded(capacity.max(1));
        (
            Arc::new(Self {
                receiver,
                bound: Mutex::new(None),
            }),
            sender,
        )
    }

    /// Payloads currently buffered.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// True once every sender is gone or teardown ran.
    pub fn is_closed(&self) -> bool {
        self.receiver.is_closed()
    }
}

#[async_trait]
impl RecordSource for ChannelSource {
    async fn setup(&self, map: &DestinationMap) -> Result<(), ContractError> {
        let mut bound = self.bound.lock().unwrap_or_else(PoisonError::into_inner);
        *bound = Some(map.name().clone());
        debug!(
            stream = map.stream(),
            destination = %map.name(),
            capacity = self.receiver.capacity().unwrap_or(0),
            "ChannelSource bound"
        );
        Ok(())
    }

    async fn read(&self) -> Result<Option<Payload>, ContractError> {
        match self.receiver.try_recv() {
            Ok(payload) => Ok(Some(payload)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Closed) => Err(ContractError::SourceClosed),
        }
    }

    async fn teardown(&self) -> Result<(), ContractError> {
        self.receiver.close();
        let bound = self
            .bound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(destination) = bound {
            debug!(destination = %destination, "ChannelSource closed");
        }
        Ok(())
    }
}
