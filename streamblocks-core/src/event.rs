use std::collections::BTreeMap;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use streamblocks_source::SourceChunk;

use crate::block::ExtractedBlock;
use crate::candidate::Section;
use crate::error::BlockErrorCode;

/// A boxed stream of public events, as produced by pull-based processing.
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// An event emitted by the stream processor.
///
/// Every event carries a monotonic id (1-based, per stream) and a creation
/// timestamp around its [`payload`](StreamEvent::payload). The event stream
/// is the engine's sole contract with consumers; there is no out-of-band
/// channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamEvent {
    /// Monotonically increasing event id, starting at 1.
    pub event_id: u64,

    /// When the event was created.
    pub timestamp: DateTime<Utc>,

    /// What happened.
    #[serde(flatten)]
    pub payload: StreamEventPayload,
}

/// The payload of a [`StreamEvent`].
///
/// Serializes with a `type` discriminator in kebab-case and camelCase field
/// names, making the stream wire-ready for WebSockets or event logs.
///
/// # Event ordering
///
/// - `StreamStarted` precedes all other events; `StreamFinished` follows all
///   others.
/// - For one block: `BlockStart` strictly precedes every delta for that
///   block, which strictly precede its `BlockEnd` or `BlockError`.
/// - Events are emitted in non-decreasing line-number order.
///
/// # Usage Pattern
///
/// ```no_run
/// use futures_util::StreamExt;
/// use streamblocks_core::{StreamEventPayload, StreamProcessor};
/// # async fn example(processor: StreamProcessor, chunks: streamblocks_source::ChunkStream) {
/// let mut events = processor.process(chunks);
/// while let Some(event) = events.next().await {
///     match event.payload {
///         StreamEventPayload::BlockEnd { block } => {
///             println!("extracted {}", block.block_id);
///         }
///         StreamEventPayload::BlockError { error_code, reason, .. } => {
///             eprintln!("rejected: {error_code} ({reason})");
///         }
///         _ => {}
///     }
/// }
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamEventPayload {
    /// Processing of a stream began.
    #[serde(rename_all = "camelCase")]
    StreamStarted {
        /// Identifier of the stream.
        stream_id: String,
    },

    /// Processing of a stream finished, with summary statistics.
    #[serde(rename_all = "camelCase")]
    StreamFinished {
        /// Identifier of the stream.
        stream_id: String,
        /// Number of blocks that validated successfully.
        blocks_extracted: u64,
        /// Number of openings that ended in a block error.
        blocks_rejected: u64,
        /// Total number of events emitted, including this one.
        total_events: u64,
        /// Wall-clock processing duration in milliseconds.
        duration_ms: u64,
    },

    /// A fatal upstream error terminated the stream.
    #[serde(rename_all = "camelCase")]
    StreamError {
        /// Identifier of the stream.
        stream_id: String,
        /// Human-readable description of the failure.
        error_message: String,
        /// Machine-readable error class.
        error_code: String,
    },

    /// A complete line outside any block.
    #[serde(rename_all = "camelCase")]
    TextContent {
        /// 1-based line number.
        line_number: u64,
        /// The line's text, without its trailing newline.
        content: String,
    },

    /// The raw text of one upstream chunk, independent of line events.
    ///
    /// Chunk-level deltas partition the same bytes that line-level events
    /// report; they are emitted only when explicitly enabled.
    #[serde(rename_all = "camelCase")]
    TextDelta {
        /// The chunk's raw text.
        delta: String,
        /// Whether a block candidate was open when the chunk arrived.
        inside_block: bool,
        /// Id of the oldest open candidate, when inside a block.
        #[serde(skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
        /// Section the oldest open candidate was accumulating.
        #[serde(skip_serializing_if = "Option::is_none")]
        section: Option<Section>,
    },

    /// A block opening was detected.
    #[serde(rename_all = "camelCase")]
    BlockStart {
        /// Synthetic block identifier.
        block_id: String,
        /// Name of the syntax that detected the opening.
        syntax_name: String,
        /// Line number of the opening marker.
        start_line: u64,
        /// Metadata embedded in the opening marker, for syntaxes that
        /// carry it inline.
        #[serde(skip_serializing_if = "Option::is_none")]
        inline_metadata: Option<BTreeMap<String, String>>,
        /// The block type, when the opening marker reveals it.
        #[serde(skip_serializing_if = "Option::is_none")]
        block_type: Option<String>,
    },

    /// A line was retained in an open block's header section.
    #[serde(rename_all = "camelCase")]
    BlockHeaderDelta {
        /// Id of the block.
        block_id: String,
        /// The retained line.
        delta: String,
        /// Line number of the retained line.
        current_line: u64,
        /// The block's running byte count.
        accumulated_size: u64,
        /// Inline metadata of the block, when present.
        #[serde(skip_serializing_if = "Option::is_none")]
        inline_metadata: Option<BTreeMap<String, String>>,
    },

    /// A line was retained in an open block's metadata section.
    #[serde(rename_all = "camelCase")]
    BlockMetadataDelta {
        /// Id of the block.
        block_id: String,
        /// The retained line.
        delta: String,
        /// Line number of the retained line.
        current_line: u64,
        /// The block's running byte count.
        accumulated_size: u64,
        /// Whether this line is the section boundary ending the metadata.
        is_boundary: bool,
    },

    /// A line was retained in an open block's content section.
    #[serde(rename_all = "camelCase")]
    BlockContentDelta {
        /// Id of the block.
        block_id: String,
        /// The retained line.
        delta: String,
        /// Line number of the retained line.
        current_line: u64,
        /// The block's running byte count.
        accumulated_size: u64,
    },

    /// A block closed, parsed, and validated successfully.
    BlockEnd {
        /// The extracted block.
        #[serde(flatten)]
        block: ExtractedBlock,
    },

    /// A block candidate was rejected.
    ///
    /// Every opening produces either a `BlockEnd` or a `BlockError`; partial
    /// blocks are never silently dropped. The raw text is carried for
    /// diagnostics when available.
    #[serde(rename_all = "camelCase")]
    BlockError {
        /// Id of the rejected block, when an opening was involved.
        #[serde(skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
        /// The rejection class.
        error_code: BlockErrorCode,
        /// Human-readable description of the rejection.
        reason: String,
        /// Line number of the opening marker.
        start_line: u64,
        /// Line number of the last retained line, when known.
        #[serde(skip_serializing_if = "Option::is_none")]
        end_line: Option<u64>,
        /// The candidate's raw text, for diagnostics.
        #[serde(skip_serializing_if = "Option::is_none")]
        raw_text: Option<String>,
    },

    /// An upstream chunk forwarded untouched.
    ///
    /// Emitted when original-event passthrough is enabled, interleaved with
    /// the engine's own events so downstream consumers still see the
    /// provider's stream.
    Raw {
        /// The original chunk.
        chunk: SourceChunk,
    },
}
