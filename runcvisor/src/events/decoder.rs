//! Incremental decoder for an unframed stream of JSON objects.
//!
//! Bytes are fed as they arrive; complete values are peeled off the front of
//! the buffer one at a time. Two kinds of noise are tolerated:
//!
//! - a complete JSON object that is not an [`Event`] is dropped whole;
//! - anything else (a syntax error, or a complete non-object value such as a
//!   stray string that swallowed the start of the next record) drops bytes up
//!   to the next `{` after the failing position, so the decoder always makes
//!   progress and a record hidden behind the noise is still found.
//!
//! Once [`EventDecoder::end_of_input`] is called, an incomplete value at the
//! front of the buffer is treated as noise too.

use super::Event;
use serde_json::Value;

/// Outcome of one decode step.
#[derive(Debug)]
pub(crate) enum Decoded {
    Event(Event),
    /// A record was skipped; carries the reason for logging.
    Malformed(String),
    /// The buffer holds no complete value yet.
    NeedMore,
}

#[derive(Debug, Default)]
pub(crate) struct EventDecoder {
    buf: Vec<u8>,
    ended: bool,
}

impl EventDecoder {
    pub(crate) fn feed(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Mark the stream as finished. Leftover bytes are then decoded as far as
    /// possible instead of waiting for more.
    pub(crate) fn end_of_input(&mut self) {
        self.ended = true;
    }

    /// Decode the next value at the front of the buffer.
    pub(crate) fn decode_next(&mut self) -> Decoded {
        let mut values = serde_json::Deserializer::from_slice(&self.buf).into_iter::<Value>();

        match values.next() {
            None => {
                // Only whitespace left.
                self.buf.clear();
                Decoded::NeedMore
            }
            Some(Ok(value)) if value.is_object() => {
                let consumed = values.byte_offset();
                self.buf.drain(..consumed);
                match serde_json::from_value::<Event>(value) {
                    Ok(event) => Decoded::Event(event),
                    Err(e) => Decoded::Malformed(format!("not an event: {}", e)),
                }
            }
            Some(Ok(value)) => {
                let skip = self.resync_offset();
                self.buf.drain(..skip);
                Decoded::Malformed(format!("not an event: {}", value_kind(&value)))
            }
            Some(Err(e)) if e.is_eof() && !self.ended => Decoded::NeedMore,
            Some(Err(e)) => {
                let reason = if e.is_eof() {
                    format!("truncated record at end of stream ({} bytes)", self.buf.len())
                } else {
                    e.to_string()
                };
                let skip = self.resync_offset();
                self.buf.drain(..skip);
                Decoded::Malformed(reason)
            }
        }
    }

    /// Number of bytes still buffered.
    #[cfg(test)]
    pub(crate) fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Offset of the next candidate record start, skipping at least one byte.
    fn resync_offset(&self) -> usize {
        self.buf
            .iter()
            .skip(1)
            .position(|b| *b == b'{')
            .map(|pos| pos + 1)
            .unwrap_or(self.buf.len())
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
