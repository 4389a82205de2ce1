//! Pipeline assembly module.

mod assembly;
mod stats;

pub use assembly::{DrainPipeline, PipelineConfig};
pub use stats::{DestinationStats, RunSummary};
