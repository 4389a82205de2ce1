//! Payload and Record - the unit of work handed to writers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One structured item flowing through the stage.
///
/// A record is a flat JSON object. Field access goes through [`Record::get`]
/// and mutation through [`Record::insert`]; writers decide how the fields
/// are rendered on the way out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    /// Empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insertion, used by feeds and tests.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Insert or replace a field.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Look up a field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// All fields in insertion-independent (map) order.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// A batch of records pulled from the source in one read.
///
/// The batch that closes a stream carries `end_of_stream = true`; it may be
/// a bare marker with no records or still carry trailing records, which are
/// written like any others before the stage shuts itself down.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    /// Records in arrival order.
    pub records: Vec<Record>,

    /// Marks the final payload of the stream.
    #[serde(default)]
    pub end_of_stream: bool,
}

impl Payload {
    /// Payload in the middle of a stream.
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            end_of_stream: false,
        }
    }

    /// Flip the end-of-stream marker, builder style.
    #[must_use]
    pub fn with_end_of_stream(mut self, end_of_stream: bool) -> Self {
        self.end_of_stream = end_of_stream;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_field_roundtrip() {
        let record = Record::new()
            .with_field("seq", 7)
            .with_field("stream", "events");

        assert_eq!(record.get("seq"), Some(&Value::from(7)));
        assert_eq!(record.get("stream"), Some(&Value::from("events")));
        assert_eq!(record.get("missing"), None);
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn record_serializes_transparently() {
        let record = Record::new().with_field("seq", 1);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"seq":1}"#);

        let parsed: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn end_of_stream_defaults_to_false() {
        let payload: Payload = serde_json::from_str(r#"{"records":[{"seq":1}]}"#).unwrap();
        assert!(!payload.end_of_stream);
        assert_eq!(payload.records.len(), 1);

        let marker = Payload::new(Vec::new()).with_end_of_stream(true);
        assert!(marker.end_of_stream);
        assert!(marker.records.is_empty());
    }
}
