//! Destination identity - the name a blueprint gives a write target.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Name of one destination within a stream, e.g. `"archive"` or `"latest"`.
///
/// The name is assigned in the blueprint and then rides along everywhere the
/// destination shows up: the map binding it to a stream, the writer built for
/// it, every worker of its stage, and the label on the log lines and metrics
/// those emit. It wraps a shared `Arc<str>` so all of them refer to one
/// allocation instead of carrying copies of the string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationId(Arc<str>);

impl DestinationId {
    /// The name as a plain string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for DestinationId {
    type Target = str;

    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for DestinationId {
    fn from(name: &str) -> Self {
        Self(Arc::from(name))
    }
}

impl From<String> for DestinationId {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl PartialEq<str> for DestinationId {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for DestinationId {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// In blueprints the name is a bare string, not a wrapper table.
impl Serialize for DestinationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DestinationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}
