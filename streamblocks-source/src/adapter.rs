/// Adapter for JSON chunks carrying text under a well-known attribute.
pub mod attribute_pick;
/// Adapter for event-envelope chunks with a `type` discriminator.
pub mod event_envelope;
/// Adapter for chunks that are the text itself.
pub mod identity;

pub use attribute_pick::AttributePickAdapter;
pub use event_envelope::EventEnvelopeAdapter;
pub use identity::IdentityAdapter;

use std::sync::Arc;

use crate::chunk::SourceChunk;

/// A strategy for extracting text from opaque upstream chunks.
///
/// A source adapter is a small function-like value injected into the stream
/// processor. It answers two questions per chunk: "what is the textual
/// payload, if any?" and "does this chunk signal that the stream is done?".
/// Chunks that carry only control information yield `None` from
/// [`extract_text`](SourceAdapter::extract_text) and are otherwise ignored.
///
/// Adapters must be cheap and side-effect-free: the same adapter instance is
/// applied to every chunk of a stream.
pub trait SourceAdapter: Send + Sync {
    /// A short name identifying the adapter (used in logs).
    fn name(&self) -> &str;

    /// Returns `true` when this adapter recognizes the chunk's shape.
    ///
    /// Used only during auto-detection against the first non-empty chunk of
    /// a stream; once an adapter is selected it handles every later chunk
    /// whether or not `matches` would hold for it.
    fn matches(&self, chunk: &SourceChunk) -> bool;

    /// Extracts the textual payload of a chunk, or `None` for control-only
    /// chunks.
    fn extract_text(&self, chunk: &SourceChunk) -> Option<String>;

    /// Returns `true` when the chunk hints that the stream is complete.
    ///
    /// The default implementation never signals completion; sources without
    /// an in-band terminator rely on stream exhaustion instead.
    fn is_complete(&self, chunk: &SourceChunk) -> bool {
        let _ = chunk;
        false
    }
}

/// Selects the built-in adapter matching a probe chunk.
///
/// Adapters are tried in order of shape specificity: identity (the chunk is
/// the text), event-envelope (a `type` discriminator selects the payload
/// shape), then attribute-pick (a well-known text-bearing attribute). The
/// first match wins and should be reused for the remainder of the stream.
///
/// Returns `None` when no built-in adapter recognizes the chunk.
///
/// # Examples
///
/// ```
/// use streamblocks_source::{detect_adapter, SourceChunk};
/// use serde_json::json;
///
/// let adapter = detect_adapter(&SourceChunk::text("plain")).unwrap();
/// assert_eq!(adapter.name(), "identity");
///
/// let adapter = detect_adapter(&SourceChunk::value(json!({
///     "type": "text", "text": "enveloped"
/// })))
/// .unwrap();
/// assert_eq!(adapter.name(), "event_envelope");
/// ```
pub fn detect_adapter(chunk: &SourceChunk) -> Option<Arc<dyn SourceAdapter>> {
    let adapters: [Arc<dyn SourceAdapter>; 3] = [
        Arc::new(IdentityAdapter),
        Arc::new(EventEnvelopeAdapter::new()),
        Arc::new(AttributePickAdapter::new()),
    ];

    adapters.into_iter().find(|adapter| adapter.matches(chunk))
}
