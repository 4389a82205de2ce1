//! DrainSupervisor trait - stop notifications for the owning component

use std::sync::Arc;

use async_trait::async_trait;
use contracts::DestinationMap;

use crate::stage::Drain;

/// Owner of one or more drain stages.
///
/// A supervisor hands a [`DestinationMap`] to [`Drain::start`] and gets it
/// back through [`drain_stopped`](DrainSupervisor::drain_stopped) exactly
/// once per run, whether the stop was requested externally or triggered by
/// the stage itself (end of stream, terminal read error). The callback fires
/// strictly after teardown and the transition back to stopped, so the
/// supervisor always observes a stage it could immediately restart.
#[async_trait]
pub trait DrainSupervisor: Send + Sync {
    /// The given stage finished a full stop sequence for `map`.
    async fn drain_stopped(&self, drain: Arc<Drain>, map: Arc<DestinationMap>);
}
