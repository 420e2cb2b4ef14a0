use crate::adapter::SourceAdapter;
use crate::chunk::SourceChunk;

/// Adapter for sources whose chunks are the text itself.
///
/// Matches [`SourceChunk::Text`] and JSON string chunks; everything else is
/// treated as control information.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityAdapter;

impl SourceAdapter for IdentityAdapter {
    fn name(&self) -> &str {
        "identity"
    }

    fn matches(&self, chunk: &SourceChunk) -> bool {
        matches!(
            chunk,
            SourceChunk::Text(_) | SourceChunk::Value(serde_json::Value::String(_))
        )
    }

    fn extract_text(&self, chunk: &SourceChunk) -> Option<String> {
        match chunk {
            SourceChunk::Text(text) => Some(text.clone()),
            SourceChunk::Value(serde_json::Value::String(text)) => Some(text.clone()),
            SourceChunk::Value(_) => None,
        }
    }
}
