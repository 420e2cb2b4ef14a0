use std::pin::Pin;

use futures_util::Stream;

use crate::chunk::SourceChunk;
use crate::error::SourceError;

/// A boxed stream of chunks, as consumed by the engine's pull-based mode.
///
/// Concrete sources (HTTP SSE readers, provider SDK streams, test fixtures)
/// are erased behind this alias so the engine stays transport-agnostic.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<SourceChunk, SourceError>> + Send>>;
