//! Destination model - what a stage writes to and how a stream is bound to it.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{ContractError, DestinationId};

/// Kind of write target backing a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationKind {
    /// Structured log lines through the active subscriber
    Log,
    /// JSON-lines file on local disk
    File,
    /// In-memory buffer (demos, tests)
    Memory,
}

impl DestinationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::File => "file",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for DestinationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named write target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Destination {
    /// Unique name within a blueprint; shows up in logs and metric labels.
    pub name: DestinationId,

    /// Backing writer kind.
    pub kind: DestinationKind,
}

/// Run-time settings for one stream-to-destination binding.
///
/// Free-form string map; each writer pulls and validates the params it
/// understands during setup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DestinationConfig {
    params: BTreeMap<String, String>,
}

impl DestinationConfig {
    pub fn new(params: BTreeMap<String, String>) -> Self {
        Self { params }
    }

    /// Builder-style param insertion, used by tests and demo wiring.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Param that must be present for writer setup to succeed.
    pub fn require(&self, destination: &DestinationId, key: &str) -> Result<&str, ContractError> {
        self.get(key).ok_or_else(|| {
            ContractError::destination_setup(
                destination.as_str(),
                format!("missing required param '{key}'"),
            )
        })
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Binding of one stream to one destination.
///
/// Built by the supervising side once per run and shared immutably with the
/// running stage; the stage hands it back through the stop notification.
#[derive(Debug, Clone)]
pub struct DestinationMap {
    id: Bytes,
    stream: String,
    destination: Destination,
    config: DestinationConfig,
}

impl DestinationMap {
    pub fn new(
        id: impl Into<Bytes>,
        stream: impl Into<String>,
        destination: Destination,
        config: DestinationConfig,
    ) -> Self {
        Self {
            id: id.into(),
            stream: stream.into(),
            destination,
            config,
        }
    }

    /// Opaque binding identifier.
    pub fn id(&self) -> &Bytes {
        &self.id
    }

    /// Name of the stream being drained.
    pub fn stream(&self) -> &str {
        &self.stream
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Run-time params handed to the writer during setup.
    pub fn config(&self) -> &DestinationConfig {
        &self.config
    }

    /// Destination name, for log fields and metric labels.
    pub fn name(&self) -> &DestinationId {
        &self.destination.name
    }
}
