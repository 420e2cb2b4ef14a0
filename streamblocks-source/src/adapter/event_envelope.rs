use serde_json::Value;

use crate::adapter::SourceAdapter;
use crate::chunk::SourceChunk;

/// Event types whose payload is a text delta.
const TEXT_EVENT_TYPES: [&str; 4] = ["text", "text-delta", "text_delta", "content_block_delta"];

/// Event types that terminate the stream.
const TERMINAL_EVENT_TYPES: [&str; 4] = ["done", "finish", "stop", "message_stop"];

/// Adapter for event-envelope chunks with a `type` discriminator.
///
/// Provider SDK streams commonly wrap payloads in typed envelopes: text
/// deltas arrive under one set of event types, while other events carry only
/// control information. This adapter selects the text-bearing shapes and
/// signals completion on terminal event types.
///
/// Recognized text shapes, tried in order:
///
/// - `{"type": <text type>, "text": "..."}`
/// - `{"type": <text type>, "delta": "..."}`
/// - `{"type": <text type>, "delta": {"text": "..."}}`
///
/// # Examples
///
/// ```
/// use streamblocks_source::{EventEnvelopeAdapter, SourceAdapter, SourceChunk};
/// use serde_json::json;
///
/// let adapter = EventEnvelopeAdapter::new();
///
/// let delta = SourceChunk::value(json!({
///     "type": "content_block_delta",
///     "delta": {"text": "Hello"}
/// }));
/// assert_eq!(adapter.extract_text(&delta), Some("Hello".to_string()));
///
/// let stop = SourceChunk::value(json!({"type": "message_stop"}));
/// assert_eq!(adapter.extract_text(&stop), None);
/// assert!(adapter.is_complete(&stop));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct EventEnvelopeAdapter;

impl EventEnvelopeAdapter {
    /// Creates a new event-envelope adapter.
    pub fn new() -> Self {
        Self
    }

    fn event_type<'a>(&self, chunk: &'a SourceChunk) -> Option<&'a str> {
        match chunk {
            SourceChunk::Value(value) => value.get("type").and_then(Value::as_str),
            SourceChunk::Text(_) => None,
        }
    }
}

impl SourceAdapter for EventEnvelopeAdapter {
    fn name(&self) -> &str {
        "event_envelope"
    }

    fn matches(&self, chunk: &SourceChunk) -> bool {
        self.event_type(chunk).is_some()
    }

    fn extract_text(&self, chunk: &SourceChunk) -> Option<String> {
        let event_type = self.event_type(chunk)?;
        if !TEXT_EVENT_TYPES.contains(&event_type) {
            return None;
        }

        let SourceChunk::Value(value) = chunk else {
            return None;
        };

        value
            .get("text")
            .and_then(Value::as_str)
            .or_else(|| value.get("delta").and_then(Value::as_str))
            .or_else(|| {
                value
                    .get("delta")
                    .and_then(|delta| delta.get("text"))
                    .and_then(Value::as_str)
            })
            .map(str::to_string)
    }

    fn is_complete(&self, chunk: &SourceChunk) -> bool {
        self.event_type(chunk)
            .is_some_and(|event_type| TERMINAL_EVENT_TYPES.contains(&event_type))
    }
}
