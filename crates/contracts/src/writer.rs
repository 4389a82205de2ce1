//! Writer trait - destination write executor.
//!
//! Defines the abstract interface implemented per destination kind.

use async_trait::async_trait;

use crate::{ContractError, DestinationConfig, Payload};

/// Destination write executor.
///
/// One writer instance backs all workers of a stage and is shared behind an
/// `Arc`, so implementations must tolerate concurrent `write` calls and
/// synchronize internally wherever the sink demands it.
#[async_trait]
pub trait Writer: Send + Sync {
    /// Prepare the writer with the binding's run-time params.
    ///
    /// # Errors
    /// A setup failure aborts the stage start; nothing gets spawned.
    async fn setup(&self, config: &DestinationConfig) -> Result<(), ContractError>;

    /// Write one payload.
    ///
    /// Called concurrently from up to pool-size workers. Failures are
    /// logged and counted by the caller; the stage keeps running.
    async fn write(&self, payload: &Payload) -> Result<(), ContractError>;

    /// Release held resources. Called once during stage teardown.
    async fn teardown(&self) -> Result<(), ContractError>;
}
