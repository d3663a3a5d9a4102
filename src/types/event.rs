//! Stream event type
//!
//! An event is one unit of data yielded by the stream source. Its payload is
//! opaque to the crawler: it is kept as a JSON value and persisted verbatim as
//! one line in the output sink.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An opaque event received from the stream source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event {
    payload: Value,
}

impl Event {
    /// Wrap a JSON payload
    pub fn new(payload: Value) -> Self {
        Self { payload }
    }

    /// Consume the event, returning the payload
    pub fn into_payload(self) -> Value {
        self.payload
    }

    /// Serialize event to a single JSON line (without the trailing newline)
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize event from raw bytes as read off the wire
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

impl From<Value> for Event {
    fn from(payload: Value) -> Self {
        Self::new(payload)
    }
}
