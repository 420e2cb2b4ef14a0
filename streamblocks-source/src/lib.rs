//! StreamBlocks Source - Upstream contract for chunked text sources
//!
//! This crate defines the boundary between the StreamBlocks extraction engine
//! and whatever produces the text it processes. The engine never assumes a
//! specific upstream shape: it consumes a sequence of opaque [`SourceChunk`]s
//! and relies on a [`SourceAdapter`] to pull the textual payload out of each
//! one.
//!
//! # Architecture
//!
//! - [`SourceChunk`]: an opaque chunk — either plain text or a JSON-shaped
//!   value produced by a provider SDK.
//! - [`SourceAdapter`]: a strategy object that extracts text from a chunk and
//!   optionally signals stream completion.
//! - Built-in adapters: [`IdentityAdapter`], [`AttributePickAdapter`],
//!   [`EventEnvelopeAdapter`], plus [`detect_adapter`] which picks the first
//!   adapter whose predicate matches a probe chunk.
//! - [`ChunkStream`]: the boxed stream type consumed by the engine's
//!   pull-based processing mode.
//!
//! # Example
//!
//! ```
//! use streamblocks_source::{detect_adapter, SourceChunk};
//! use serde_json::json;
//!
//! let chunk = SourceChunk::value(json!({"delta": "Hello, "}));
//! let adapter = detect_adapter(&chunk).expect("a built-in adapter matches");
//!
//! assert_eq!(adapter.extract_text(&chunk), Some("Hello, ".to_string()));
//! ```

#![warn(missing_docs)]

/// Source adapters: the text-extraction strategy and its built-in variants.
pub mod adapter;
/// The opaque chunk type produced by upstream sources.
pub mod chunk;
/// Error types for upstream sources.
pub mod error;
/// Stream type aliases for pull-based consumption.
pub mod stream;

pub use adapter::{
    AttributePickAdapter, EventEnvelopeAdapter, IdentityAdapter, SourceAdapter, detect_adapter,
};
pub use chunk::SourceChunk;
pub use error::SourceError;
pub use stream::ChunkStream;
