//! # Contracts
//!
//! Shared interface contracts: the data structures and traits every other
//! crate in the workspace builds against. Business crates depend on this
//! crate only; reverse dependencies are prohibited.
//!
//! ## Data model
//! - A [`Payload`] is a batch of [`Record`]s pulled from upstream in one
//!   read; the final batch of a stream carries the end-of-stream marker.
//! - A [`DestinationMap`] binds a stream to one configured [`Destination`].
//! - [`Writer`] and [`RecordSource`] are the collaborator seams a drain
//!   stage drives; both are object-safe and shared across tasks.

mod blueprint;
mod destination;
mod destination_id;
mod error;
mod payload;
mod source;
mod writer;

pub use blueprint::*;
pub use destination::*;
pub use destination_id::DestinationId;
pub use error::*;
pub use payload::*;
pub use source::RecordSource;
pub use writer::Writer;
