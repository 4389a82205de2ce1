//! Writer implementations
//!
//! Contains LogWriter, FileWriter, and MemoryWriter plus the factory that
//! picks one from a destination's kind.

mod file;
mod log;
mod memory;

pub use self::file::FileWriter;
pub use self::log::LogWriter;
pub use self::memory::MemoryWriter;

use std::sync::Arc;

use contracts::{Destination, DestinationKind, Writer};

/// Build the writer backing `destination`.
///
/// Construction is infallible; param problems surface from the writer's
/// `setup` during stage start.
pub fn for_destination(destination: &Destination) -> Arc<dyn Writer> {
    match destination.kind {
        DestinationKind::Log => Arc::new(LogWriter::new(destination.name.clone())),
        DestinationKind::File => Arc::new(FileWriter::new(destination.name.clone())),
        DestinationKind::Memory => Arc::new(MemoryWriter::new(destination.name.clone())),
    }
}
