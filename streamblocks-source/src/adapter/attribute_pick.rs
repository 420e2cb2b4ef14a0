use serde_json::Value;

use crate::adapter::SourceAdapter;
use crate::chunk::SourceChunk;

/// Attribute names probed for a textual payload, in priority order.
const TEXT_ATTRIBUTES: [&str; 3] = ["text", "delta", "content"];

/// Adapter for JSON chunks that carry text under a well-known attribute.
///
/// Recognizes objects with a string-valued `text`, `delta`, or `content`
/// field. Objects that carry a `type` discriminator are left to the
/// event-envelope adapter during detection.
///
/// # Examples
///
/// ```
/// use streamblocks_source::{AttributePickAdapter, SourceAdapter, SourceChunk};
/// use serde_json::json;
///
/// let adapter = AttributePickAdapter::new();
/// let chunk = SourceChunk::value(json!({"delta": "partial "}));
///
/// assert!(adapter.matches(&chunk));
/// assert_eq!(adapter.extract_text(&chunk), Some("partial ".to_string()));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributePickAdapter;

impl AttributePickAdapter {
    /// Creates a new attribute-pick adapter.
    pub fn new() -> Self {
        Self
    }

    fn pick<'a>(&self, value: &'a Value) -> Option<&'a str> {
        let object = value.as_object()?;
        TEXT_ATTRIBUTES
            .iter()
            .find_map(|attribute| object.get(*attribute).and_then(Value::as_str))
    }
}

impl SourceAdapter for AttributePickAdapter {
    fn name(&self) -> &str {
        "attribute_pick"
    }

    fn matches(&self, chunk: &SourceChunk) -> bool {
        match chunk {
            SourceChunk::Value(value) => {
                let has_discriminator = value
                    .as_object()
                    .is_some_and(|object| object.get("type").is_some_and(Value::is_string));
                !has_discriminator && self.pick(value).is_some()
            }
            SourceChunk::Text(_) => false,
        }
    }

    fn extract_text(&self, chunk: &SourceChunk) -> Option<String> {
        match chunk {
            SourceChunk::Value(value) => self.pick(value).map(str::to_string),
            SourceChunk::Text(_) => None,
        }
    }
}
