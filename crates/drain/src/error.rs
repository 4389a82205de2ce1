//! Drain error types

use thiserror::Error;

use crate::stage::DrainState;

/// Errors surfaced by the drain lifecycle operations.
///
/// Runtime failures (rejected writes, source hiccups) never show up here;
/// those are logged and absorbed so one bad payload cannot take the stage
/// down. Only start-time problems reach the caller.
#[derive(Debug, Error)]
pub enum DrainError {
    /// Start was refused because the stage is not stopped
    #[error("drain is busy ({state})")]
    Busy {
        /// Lifecycle state observed at the time of the call
        state: DrainState,
    },

    /// A collaborator failed while the stage was being started
    #[error("{0}")]
    Contract(#[from] contracts::ContractError),
}
