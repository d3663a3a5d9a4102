//! Event to record encoding

use thiserror::Error;

use crate::types::Event;

/// An event could not be turned into a record
#[derive(Debug, Error)]
#[error("failed to encode event: {0}")]
pub struct EncodeError(#[from] serde_json::Error);

/// Turns one event into one line-delimited record
pub trait RecordEncoder: Send {
    fn encode(&self, event: &Event) -> Result<Vec<u8>, EncodeError>;
}

/// Compact JSON followed by a newline
///
/// Compact JSON escapes control characters inside strings, so a record never
/// contains a newline other than its terminator.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLineEncoder;

impl RecordEncoder for JsonLineEncoder {
    fn encode(&self, event: &Event) -> Result<Vec<u8>, EncodeError> {
        let mut record = event.to_json_line()?.into_bytes();
        record.push(b'\n');
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_is_single_line() {
        let event = Event::new(json!({"text": "multi\nline\r\ntext", "n": 1}));
        let record = JsonLineEncoder.encode(&event).unwrap();

        assert_eq!(record.last(), Some(&b'\n'));
        assert_eq!(record.iter().filter(|b| **b == b'\n').count(), 1);

        let line = std::str::from_utf8(&record).unwrap().trim_end();
        assert_eq!(Event::from_slice(line.as_bytes()).unwrap(), event);
    }
}
