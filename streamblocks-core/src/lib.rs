//! StreamBlocks Core - Streaming extraction of typed, structured blocks
//!
//! This crate extracts marker-delimited "blocks" from a streaming sequence of
//! text chunks produced by a generative source (e.g. a language-model
//! response). Blocks are identified as they open, accumulated line by line,
//! validated against registered JSON Schemas, and reported through a typed
//! event stream — all before the upstream producer finishes, and without
//! buffering the whole stream.
//!
//! # Architecture
//!
//! The engine is a pipeline of four cooperating components:
//!
//! - [`LineAccumulator`]: converts arbitrarily-split text fragments into a
//!   numbered sequence of complete lines.
//! - [`Syntax`]: a pluggable format module that classifies lines (opening /
//!   closing / boundary / interior) and parses completed candidates into
//!   metadata and content. Three formats are built in:
//!   [`DelimiterPreamble`], [`DelimiterFrontmatter`], and
//!   [`MarkdownFrontmatter`].
//! - [`BlockStateMachine`]: drives the in-flight [`BlockCandidate`]s,
//!   enforces size limits, and produces state-machine events.
//! - [`StreamProcessor`]: the public entry point. Pulls chunks from an
//!   upstream source, binds parsed blocks to typed schemas through the
//!   [`Registry`], and emits the public [`StreamEvent`] stream.
//!
//! # Processing modes
//!
//! A processor can be driven two ways over the same internal state:
//!
//! - **Pull**: [`StreamProcessor::process`] consumes a chunk stream and
//!   yields events, suspending only while awaiting the next upstream chunk.
//! - **Push**: [`StreamProcessor::feed`] returns the batch of events
//!   produced by one chunk; [`StreamProcessor::finalize`] flushes trailing
//!   state. The caller owns scheduling.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use streamblocks_core::{
//!     DelimiterPreamble, Registry, StreamEventPayload, StreamProcessor, TypeBinding,
//! };
//! use streamblocks_source::SourceChunk;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut registry = Registry::new(Arc::new(DelimiterPreamble::new()));
//! registry.register(
//!     "note",
//!     TypeBinding::new(json!({"type": "object"}), json!({"type": "string"}))?,
//! )?;
//!
//! let mut processor = StreamProcessor::new(Arc::new(registry));
//! let mut events = processor.feed(SourceChunk::text("!!n1:note\nremember this\n!!end\n"));
//! events.extend(processor.finalize());
//!
//! let extracted: Vec<_> = events
//!     .iter()
//!     .filter_map(|event| match &event.payload {
//!         StreamEventPayload::BlockEnd { block } => Some(block),
//!         _ => None,
//!     })
//!     .collect();
//! assert_eq!(extracted.len(), 1);
//! assert_eq!(extracted[0].block_type, "note");
//! # Ok(())
//! # }
//! ```
//!
//! # Guarantees
//!
//! - Every input byte is reported exactly once at line granularity: as free
//!   text outside blocks, as a section delta inside a block, or inside the
//!   raw text of a completed or rejected block.
//! - Events are emitted in line order; a block's start strictly precedes its
//!   deltas, which strictly precede its end or error.
//! - The non-chunk-level event sequence depends only on the concatenated
//!   byte stream, not on how it was split into chunks.
//! - Every opening eventually produces exactly one `BlockEnd` or
//!   `BlockError`; partial blocks are never silently dropped.

#![warn(missing_docs)]

/// Extracted block records and fingerprinting.
pub mod block;
/// In-flight block candidates and their state machine states.
pub mod candidate;
/// Error types and the block error taxonomy.
pub mod error;
/// The public event stream.
pub mod event;
/// Chunk-to-line accumulation.
pub mod line_accumulator;
/// The stream processor orchestrator.
pub mod processor;
/// Block-type registration and schema binding.
pub mod registry;
/// The per-line block detection state machine.
pub mod state_machine;
/// The pluggable syntax contract and built-in formats.
pub mod syntax;

pub use block::{ExtractedBlock, fingerprint};
pub use candidate::{BlockCandidate, CandidateState, Section};
pub use error::{BlockErrorCode, ParseErrorKind, StreamBlocksError, SyntaxParseError};
pub use event::{EventStream, StreamEvent, StreamEventPayload};
pub use line_accumulator::{Line, LineAccumulator};
pub use processor::{ProcessorOptions, StreamProcessor};
pub use registry::{BlockValidator, ContentDecoder, Registry, TypeBinding, WILDCARD_TYPE};
pub use state_machine::{BlockStateMachine, MachineEvent};
pub use syntax::{
    DelimiterFrontmatter, DelimiterPreamble, DetectionResult, MarkdownFrontmatter, ParsedBlock,
    Syntax,
};
