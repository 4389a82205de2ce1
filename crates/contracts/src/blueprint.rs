//! DrainBlueprint - Config Loader output
//!
//! Describes a complete run: the stream being drained, the synthetic feed,
//! stage tuning, and the destinations records are routed to.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{Destination, DestinationConfig, DestinationId, DestinationKind, DestinationMap};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete run blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrainBlueprint {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Stream identity
    pub stream: StreamConfig,

    /// Synthetic feed tuning (demo runs)
    #[serde(default)]
    pub feed: FeedConfig,

    /// Stage tuning
    #[serde(default)]
    pub drain: DrainSettings,

    /// Destinations records are routed to; one stage per entry
    #[serde(default)]
    pub destinations: Vec<DestinationSpec>,
}

/// Stream identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Stream name; shows up in log fields and generated records
    pub name: String,
}

/// Synthetic feed settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Payloads to emit before the end-of-stream marker; 0 = until stopped
    #[serde(default = "default_payload_count")]
    pub payload_count: u64,

    /// Records per payload
    #[serde(default = "default_records_per_payload")]
    pub records_per_payload: usize,

    /// Payload emission rate (Hz), must be > 0
    #[serde(default = "default_rate_hz")]
    pub rate_hz: f64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            payload_count: default_payload_count(),
            records_per_payload: default_records_per_payload(),
            rate_hz: default_rate_hz(),
        }
    }
}

fn default_payload_count() -> u64 {
    100
}

fn default_records_per_payload() -> usize {
    8
}

fn default_rate_hz() -> f64 {
    50.0
}

/// Stage tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrainSettings {
    /// Writer workers per destination (idle-pool size), must be >= 1
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Source poll interval in milliseconds, must be >= 1
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Payloads buffered between feed and stage, must be >= 1
    #[serde(default = "default_source_capacity")]
    pub source_capacity: usize,
}

impl Default for DrainSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            tick_interval_ms: default_tick_interval_ms(),
            source_capacity: default_source_capacity(),
        }
    }
}

fn default_workers() -> usize {
    4
}

fn default_tick_interval_ms() -> u64 {
    1
}

fn default_source_capacity() -> usize {
    64
}

/// One destination entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationSpec {
    /// Unique name within the blueprint
    pub name: DestinationId,

    /// Backing writer kind
    pub kind: DestinationKind,

    /// Kind-specific params, handed to writer setup
    #[serde(default)]
    pub config: BTreeMap<String, String>,
}

impl DestinationSpec {
    /// Runtime destination descriptor.
    pub fn destination(&self) -> Destination {
        Destination {
            name: self.name.clone(),
            kind: self.kind,
        }
    }
}

impl DrainBlueprint {
    /// Build the runtime binding for one destination entry.
    ///
    /// The binding id is derived from the stream and destination names; it
    /// only needs to be unique within one running process.
    pub fn destination_map(&self, spec: &DestinationSpec) -> DestinationMap {
        let id = format!("{}/{}", self.stream.name, spec.name);
        DestinationMap::new(
            Bytes::from(id.into_bytes()),
            self.stream.name.clone(),
            spec.destination(),
            DestinationConfig::new(spec.config.clone()),
        )
    }
}
