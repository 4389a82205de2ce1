//! # Drain
//!
//! The destination-writing stage.
//!
//! Responsibilities:
//! - Poll a `RecordSource` on a fixed tick, without blocking on empty reads
//! - Hand each payload to exactly one idle worker from a bounded pool
//! - Stop cooperatively on demand, and stop itself at end of stream or on a
//!   terminal read error
//! - Report every completed stop to the owning `DrainSupervisor`

pub mod error;
pub mod feed;
pub mod metrics;
pub mod source;
pub mod stage;
pub mod supervisor;
pub mod writers;

mod pool;
mod worker;

pub use contracts::{
    DestinationMap, DrainSettings, FeedConfig, Payload, Record, RecordSource, Writer,
};
pub use error::DrainError;
pub use feed::RecordFeed;
pub use metrics::{DrainMetrics, MetricsSnapshot};
pub use source::{ChannelSource, PayloadSender};
pub use stage::{Drain, DrainState};
pub use supervisor::DrainSupervisor;
pub use writers::{FileWriter, LogWriter, MemoryWriter};
