//! RecordSource trait - upstream payload feed.

use async_trait::async_trait;

use crate::{ContractError, DestinationMap, Payload};

/// Upstream payload source a stage polls on its tick.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Bind the source to the stream/destination it feeds.
    async fn setup(&self, map: &DestinationMap) -> Result<(), ContractError>;

    /// Pull the next payload without waiting for one.
    ///
    /// `Ok(None)` means nothing is available right now; the caller polls
    /// again on its next tick. An error is terminal: the stage stops itself
    /// once it sees one.
    async fn read(&self) -> Result<Option<Payload>, ContractError>;

    /// Release the upstream hookup. Called once during stage teardown.
    async fn teardown(&self) -> Result<(), ContractError>;
}
