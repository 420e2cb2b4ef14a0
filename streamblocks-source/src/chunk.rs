use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An opaque chunk produced by an upstream source.
///
/// Upstream producers emit chunks in whatever shape their transport uses:
/// plain text fragments, or JSON values mirroring a provider SDK's streaming
/// events. The extraction engine never inspects a chunk directly — a
/// [`SourceAdapter`](crate::SourceAdapter) is responsible for pulling the
/// textual payload out of it.
///
/// # Examples
///
/// ```
/// use streamblocks_source::SourceChunk;
/// use serde_json::json;
///
/// let text = SourceChunk::text("Hello");
/// let value = SourceChunk::value(json!({"delta": "Hello"}));
///
/// assert!(!text.is_empty());
/// assert!(SourceChunk::text("").is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceChunk {
    /// The chunk is the text itself.
    Text(String),

    /// A JSON-shaped chunk carrying text (or control information) somewhere
    /// inside it.
    Value(Value),
}

impl SourceChunk {
    /// Creates a plain-text chunk.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Creates a JSON-shaped chunk.
    pub fn value(value: Value) -> Self {
        Self::Value(value)
    }

    /// Returns `true` when the chunk carries no usable payload.
    ///
    /// Empty chunks are skipped during adapter auto-detection: the first
    /// non-empty chunk decides which adapter handles the stream.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Value(value) => match value {
                Value::Null => true,
                Value::String(s) => s.is_empty(),
                Value::Object(map) => map.is_empty(),
                Value::Array(items) => items.is_empty(),
                _ => false,
            },
        }
    }
}

impl From<&str> for SourceChunk {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for SourceChunk {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Value> for SourceChunk {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}
