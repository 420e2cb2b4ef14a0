mod options;

pub use options::ProcessorOptions;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use streamblocks_source::{
    IdentityAdapter, SourceAdapter, SourceChunk, SourceError, detect_adapter,
};

use crate::block::{ExtractedBlock, fingerprint};
use crate::candidate::BlockCandidate;
use crate::error::BlockErrorCode;
use crate::event::{EventStream, StreamEvent, StreamEventPayload};
use crate::line_accumulator::{Line, LineAccumulator};
use crate::registry::{BindFailure, Registry, WILDCARD_TYPE};
use crate::state_machine::{BlockStateMachine, MachineEvent};

/// The public entry point: orchestrates extraction over one stream.
///
/// A processor wires the pipeline together — adapter resolution, line
/// accumulation, the block state machine, and registry binding — and wraps
/// everything into the public [`StreamEvent`] stream.
///
/// # Processing modes
///
/// - **Pull**: [`process`](StreamProcessor::process) consumes a chunk stream
///   and yields events. Internal work never suspends; the only suspension
///   point is awaiting the next upstream chunk.
/// - **Push**: [`feed`](StreamProcessor::feed) returns the events one chunk
///   produced; [`finalize`](StreamProcessor::finalize) flushes the final
///   partial line, rejects unclosed candidates, and emits the stream
///   summary. The caller owns scheduling, and internal state persists
///   between calls until [`reset`](StreamProcessor::reset) or `finalize`.
///
/// # Examples
///
/// Push-based processing:
///
/// ```
/// use std::sync::Arc;
/// use serde_json::json;
/// use streamblocks_core::{DelimiterPreamble, Registry, StreamProcessor, TypeBinding};
/// use streamblocks_source::SourceChunk;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut registry = Registry::new(Arc::new(DelimiterPreamble::new()));
/// registry.register(
///     "note",
///     TypeBinding::new(json!({"type": "object"}), json!({"type": "string"}))?,
/// )?;
///
/// let mut processor = StreamProcessor::new(Arc::new(registry)).max_block_size(4096);
/// let mut events = processor.feed(SourceChunk::text("!!n1:note\nhi\n!!end\n"));
/// events.extend(processor.finalize());
/// # Ok(())
/// # }
/// ```
pub struct StreamProcessor {
    registry: Arc<Registry>,
    options: ProcessorOptions,
    configured_adapter: Option<Arc<dyn SourceAdapter>>,
    adapter: Option<Arc<dyn SourceAdapter>>,
    cancellation: Option<CancellationToken>,
    accumulator: LineAccumulator,
    machine: BlockStateMachine,
    recent_lines: VecDeque<String>,
    stream_id: String,
    next_event_id: u64,
    total_events: u64,
    blocks_extracted: u64,
    blocks_rejected: u64,
    started: bool,
    finished: bool,
    errored: bool,
    completion_hinted: bool,
    started_at: Option<Instant>,
}

impl StreamProcessor {
    /// Creates a processor with default options.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_options(registry, ProcessorOptions::default())
    }

    /// Creates a processor with explicit options.
    pub fn with_options(registry: Arc<Registry>, options: ProcessorOptions) -> Self {
        let accumulator = LineAccumulator::new(options.max_line_length);
        let machine =
            BlockStateMachine::new(Arc::clone(registry.syntax()), options.max_block_size);
        Self {
            registry,
            options,
            configured_adapter: None,
            adapter: None,
            cancellation: None,
            accumulator,
            machine,
            recent_lines: VecDeque::new(),
            stream_id: format!("stream-{}", Uuid::new_v4()),
            next_event_id: 1,
            total_events: 0,
            blocks_extracted: 0,
            blocks_rejected: 0,
            started: false,
            finished: false,
            errored: false,
            completion_hinted: false,
            started_at: None,
        }
    }

    /// Sets how many recent lines to retain for debugging context.
    pub fn lines_buffer(mut self, lines_buffer: usize) -> Self {
        self.options.lines_buffer = lines_buffer;
        self
    }

    /// Sets the byte limit above which lines are truncated.
    pub fn max_line_length(mut self, max_line_length: usize) -> Self {
        self.options.max_line_length = max_line_length;
        self
    }

    /// Sets the per-candidate byte ceiling.
    pub fn max_block_size(mut self, max_block_size: u64) -> Self {
        self.options.max_block_size = max_block_size;
        self
    }

    /// Enables or disables forwarding of untouched upstream chunks.
    pub fn emit_original_events(mut self, emit: bool) -> Self {
        self.options.emit_original_events = emit;
        self
    }

    /// Enables or disables chunk-level text deltas.
    pub fn emit_text_deltas(mut self, emit: bool) -> Self {
        self.options.emit_text_deltas = emit;
        self
    }

    /// Enables or disables adapter auto-detection.
    pub fn auto_detect_adapter(mut self, auto_detect: bool) -> Self {
        self.options.auto_detect_adapter = auto_detect;
        self
    }

    /// Sets an explicit source adapter, bypassing auto-detection.
    pub fn adapter(mut self, adapter: Arc<dyn SourceAdapter>) -> Self {
        self.configured_adapter = Some(Arc::clone(&adapter));
        self.adapter = Some(adapter);
        self
    }

    /// Attaches a cancellation token, honored between chunks in pull mode.
    ///
    /// Cancellation does not flush: open candidates produce no unclosed
    /// errors, matching a caller that simply stops iterating.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// The processor's stream id, as carried by its lifecycle events.
    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    /// The most recent lines seen, newest last. Bounded by the configured
    /// lines buffer; intended for caller-side diagnostics.
    pub fn recent_lines(&self) -> impl Iterator<Item = &str> {
        self.recent_lines.iter().map(String::as_str)
    }

    /// Whether the selected adapter has hinted stream completion.
    pub fn completion_hinted(&self) -> bool {
        self.completion_hinted
    }

    /// Consumes a chunk stream and yields the public event stream.
    ///
    /// Emits the stream-started event before the first chunk, processes
    /// chunks until exhaustion (or an adapter completion hint, a fatal
    /// error, or cancellation), then finalizes. A fatal upstream error
    /// yields a stream-error event and terminates without flushing.
    pub fn process<S>(mut self, source: S) -> EventStream
    where
        S: Stream<Item = Result<SourceChunk, SourceError>> + Send + 'static,
    {
        Box::pin(async_stream::stream! {
            let mut source = Box::pin(source);
            loop {
                if let Some(token) = &self.cancellation {
                    if token.is_cancelled() {
                        log::debug!("stream `{}` cancelled between chunks", self.stream_id);
                        return;
                    }
                }
                let Some(item) = source.next().await else {
                    break;
                };
                match item {
                    Ok(chunk) => {
                        for event in self.feed(chunk) {
                            yield event;
                        }
                        if self.errored {
                            return;
                        }
                        if self.completion_hinted {
                            break;
                        }
                    }
                    Err(error) => {
                        for event in self.fail(&error) {
                            yield event;
                        }
                        return;
                    }
                }
            }
            for event in self.finalize() {
                yield event;
            }
        })
    }

    /// Processes one chunk and returns the events it produced.
    ///
    /// The first call emits the stream-started event and, when no explicit
    /// adapter is configured, resolves one against the first non-empty
    /// chunk. Calls after `finalize` or a fatal error are ignored.
    pub fn feed(&mut self, chunk: SourceChunk) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.finished || self.errored {
            log::warn!("chunk fed to a terminated stream `{}`", self.stream_id);
            return events;
        }
        self.ensure_started(&mut events);

        if self.options.emit_original_events {
            self.push_event(StreamEventPayload::Raw { chunk: chunk.clone() }, &mut events);
        }

        if self.adapter.is_none() {
            if self.options.auto_detect_adapter {
                if chunk.is_empty() {
                    return events;
                }
                match detect_adapter(&chunk) {
                    Some(adapter) => {
                        log::debug!(
                            "stream `{}` auto-detected source adapter `{}`",
                            self.stream_id,
                            adapter.name()
                        );
                        self.adapter = Some(adapter);
                    }
                    None => {
                        let error = SourceError::adapter_detection_failed(
                            "the first non-empty chunk matches no built-in adapter",
                        );
                        events.extend(self.fail(&error));
                        return events;
                    }
                }
            } else {
                self.adapter = Some(Arc::new(IdentityAdapter));
            }
        }
        let Some(adapter) = self.adapter.clone() else {
            return events;
        };

        if adapter.is_complete(&chunk) {
            self.completion_hinted = true;
        }

        if let Some(text) = adapter.extract_text(&chunk) {
            if !text.is_empty() {
                if self.options.emit_text_deltas {
                    let (inside_block, block_id, section) = match self.machine.active_candidate() {
                        Some(candidate) => (
                            true,
                            Some(candidate.block_id.clone()),
                            Some(candidate.current_section),
                        ),
                        None => (false, None, None),
                    };
                    self.push_event(
                        StreamEventPayload::TextDelta {
                            delta: text.clone(),
                            inside_block,
                            block_id,
                            section,
                        },
                        &mut events,
                    );
                }
                for line in self.accumulator.push(&text) {
                    self.handle_line(&line, &mut events);
                }
            }
        }
        events
    }

    /// Flushes trailing state and emits the stream summary.
    ///
    /// Emits the final partial line (if any), rejects every unclosed
    /// candidate, and closes with the stream-finished event. Idempotent;
    /// returns nothing after a fatal error.
    pub fn finalize(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.finished || self.errored {
            return events;
        }
        self.ensure_started(&mut events);

        // A non-empty final partial line still belongs to whatever region it
        // fell in. The empty line left by a dangling newline is free text and
        // is reported after any unclosed rejections, preserving line order.
        let mut trailing_empty = None;
        if let Some(line) = self.accumulator.finalize() {
            if line.text.is_empty() {
                trailing_empty = Some(line);
            } else {
                self.handle_line(&line, &mut events);
            }
        }
        for machine_event in self.machine.finish() {
            self.map_machine_event(machine_event, &mut events);
        }
        if let Some(line) = trailing_empty {
            self.remember_line(&line);
            self.push_event(
                StreamEventPayload::TextContent {
                    line_number: line.line_number,
                    content: line.text,
                },
                &mut events,
            );
        }

        self.finished = true;
        let duration_ms = self
            .started_at
            .map(|at| at.elapsed().as_millis() as u64)
            .unwrap_or(0);
        let payload = StreamEventPayload::StreamFinished {
            stream_id: self.stream_id.clone(),
            blocks_extracted: self.blocks_extracted,
            blocks_rejected: self.blocks_rejected,
            // Includes the stream-finished event itself.
            total_events: self.total_events + 1,
            duration_ms,
        };
        self.push_event(payload, &mut events);
        events
    }

    /// Reports a fatal upstream failure, terminating the stream.
    ///
    /// Open candidates are not flushed; the stream-error event is the last
    /// one emitted.
    pub fn fail(&mut self, error: &SourceError) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.finished || self.errored {
            return events;
        }
        self.ensure_started(&mut events);
        self.errored = true;
        log::warn!("stream `{}` failed: {}", self.stream_id, error);
        log::debug!(
            "stream `{}` recent lines: {:?}",
            self.stream_id,
            self.recent_lines
        );
        self.push_event(
            StreamEventPayload::StreamError {
                stream_id: self.stream_id.clone(),
                error_message: error.to_string(),
                error_code: error.code().to_string(),
            },
            &mut events,
        );
        events
    }

    /// Resets the processor for a fresh stream over the same registry and
    /// options. A new stream id is assigned; a configured adapter is kept,
    /// a detected one is forgotten.
    pub fn reset(&mut self) {
        self.adapter = self.configured_adapter.clone();
        self.accumulator = LineAccumulator::new(self.options.max_line_length);
        self.machine = BlockStateMachine::new(
            Arc::clone(self.registry.syntax()),
            self.options.max_block_size,
        );
        self.recent_lines.clear();
        self.stream_id = format!("stream-{}", Uuid::new_v4());
        self.next_event_id = 1;
        self.total_events = 0;
        self.blocks_extracted = 0;
        self.blocks_rejected = 0;
        self.started = false;
        self.finished = false;
        self.errored = false;
        self.completion_hinted = false;
        self.started_at = None;
    }

    fn ensure_started(&mut self, events: &mut Vec<StreamEvent>) {
        if self.started {
            return;
        }
        self.started = true;
        self.started_at = Some(Instant::now());
        self.accumulator = LineAccumulator::new(self.options.max_line_length);
        self.machine = BlockStateMachine::new(
            Arc::clone(self.registry.syntax()),
            self.options.max_block_size,
        );
        self.push_event(
            StreamEventPayload::StreamStarted {
                stream_id: self.stream_id.clone(),
            },
            events,
        );
    }

    fn push_event(&mut self, payload: StreamEventPayload, events: &mut Vec<StreamEvent>) {
        let event = StreamEvent {
            event_id: self.next_event_id,
            timestamp: Utc::now(),
            payload,
        };
        self.next_event_id += 1;
        self.total_events += 1;
        events.push(event);
    }

    fn handle_line(&mut self, line: &Line, events: &mut Vec<StreamEvent>) {
        self.remember_line(line);
        for machine_event in self.machine.push_line(line) {
            self.map_machine_event(machine_event, events);
        }
    }

    fn remember_line(&mut self, line: &Line) {
        if self.options.lines_buffer == 0 {
            return;
        }
        if self.recent_lines.len() == self.options.lines_buffer {
            self.recent_lines.pop_front();
        }
        self.recent_lines.push_back(line.text.clone());
    }

    fn map_machine_event(&mut self, machine_event: MachineEvent, events: &mut Vec<StreamEvent>) {
        match machine_event {
            MachineEvent::RawLine { line } => {
                self.push_event(
                    StreamEventPayload::TextContent {
                        line_number: line.line_number,
                        content: line.text,
                    },
                    events,
                );
            }
            MachineEvent::BlockOpened {
                block_id,
                syntax_name,
                start_line,
                inline_metadata,
                block_type,
            } => {
                self.push_event(
                    StreamEventPayload::BlockStart {
                        block_id,
                        syntax_name,
                        start_line,
                        inline_metadata,
                        block_type,
                    },
                    events,
                );
            }
            MachineEvent::SectionDelta {
                block_id,
                section,
                delta,
                line_number,
                accumulated_size,
                is_boundary,
                inline_metadata,
            } => {
                let payload = match section {
                    crate::candidate::Section::Header => StreamEventPayload::BlockHeaderDelta {
                        block_id,
                        delta,
                        current_line: line_number,
                        accumulated_size,
                        inline_metadata,
                    },
                    crate::candidate::Section::Metadata => StreamEventPayload::BlockMetadataDelta {
                        block_id,
                        delta,
                        current_line: line_number,
                        accumulated_size,
                        is_boundary,
                    },
                    crate::candidate::Section::Content => StreamEventPayload::BlockContentDelta {
                        block_id,
                        delta,
                        current_line: line_number,
                        accumulated_size,
                    },
                };
                self.push_event(payload, events);
            }
            MachineEvent::BlockClosed { candidate } => {
                self.close_candidate(candidate, events);
            }
            MachineEvent::BlockRejected {
                block_id,
                code,
                reason,
                start_line,
                end_line,
                raw_text,
            } => {
                self.blocks_rejected += 1;
                self.push_event(
                    StreamEventPayload::BlockError {
                        block_id: Some(block_id),
                        error_code: code,
                        reason,
                        start_line,
                        end_line,
                        raw_text,
                    },
                    events,
                );
            }
        }
    }

    fn close_candidate(&mut self, candidate: BlockCandidate, events: &mut Vec<StreamEvent>) {
        let raw_text = candidate.raw_text();
        match self.bind_block(&candidate, &raw_text) {
            Ok(block) => {
                self.blocks_extracted += 1;
                self.push_event(StreamEventPayload::BlockEnd { block }, events);
            }
            Err((error_code, reason)) => {
                self.blocks_rejected += 1;
                log::warn!(
                    "block `{}` rejected with {error_code}: {reason}",
                    candidate.block_id
                );
                log::debug!(
                    "stream `{}` recent lines: {:?}",
                    self.stream_id,
                    self.recent_lines
                );
                self.push_event(
                    StreamEventPayload::BlockError {
                        block_id: Some(candidate.block_id.clone()),
                        error_code,
                        reason,
                        start_line: candidate.start_line,
                        end_line: Some(candidate.last_line),
                        raw_text: Some(raw_text),
                    },
                    events,
                );
            }
        }
    }

    /// Binds a closed candidate through the registry: parse, syntax
    /// invariants, type lookup, schema validation, then user validators.
    fn bind_block(
        &self,
        candidate: &BlockCandidate,
        raw_text: &str,
    ) -> Result<ExtractedBlock, (BlockErrorCode, String)> {
        let syntax = self.registry.syntax();
        let parsed = syntax
            .parse(candidate)
            .map_err(|error| (error.kind.block_error_code(), error.to_string()))?;

        if !syntax.validate(&parsed.metadata, &parsed.content) {
            return Err((
                BlockErrorCode::SyntaxError,
                format!("syntax `{}` rejected the parsed block", syntax.name()),
            ));
        }

        let block_type = candidate
            .inline_value("block_type")
            .map(str::to_string)
            .or_else(|| {
                parsed
                    .metadata
                    .get("block_type")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string)
            });

        let binding = match &block_type {
            Some(block_type) => self.registry.lookup(block_type),
            None => self.registry.lookup_default(),
        }
        .ok_or_else(|| {
            let reason = match &block_type {
                Some(block_type) => format!("no schema registered for block type `{block_type}`"),
                None => "block carries no type and no default schema is registered".to_string(),
            };
            (BlockErrorCode::UnknownType, reason)
        })?;

        let (metadata, content) = binding
            .bind(&parsed.metadata, &parsed.content)
            .map_err(|failure| match failure {
                BindFailure::Metadata(message) => (
                    BlockErrorCode::ValidationFailed,
                    format!("metadata rejected by schema: {message}"),
                ),
                BindFailure::Content(message) => (
                    BlockErrorCode::ValidationFailed,
                    format!("content rejected by schema: {message}"),
                ),
                BindFailure::ContentDecode(message) => (
                    BlockErrorCode::ParseFailed,
                    format!("content decoding failed: {message}"),
                ),
            })?;

        binding
            .run_validators(&metadata, &content)
            .map_err(|message| (BlockErrorCode::ValidationFailed, message))?;

        Ok(ExtractedBlock {
            block_id: candidate.block_id.clone(),
            block_type: block_type.unwrap_or_else(|| WILDCARD_TYPE.to_string()),
            syntax_name: candidate.syntax_name.clone(),
            start_line: candidate.start_line,
            end_line: candidate.last_line,
            metadata,
            content,
            raw_text: raw_text.to_string(),
            hash_id: fingerprint(raw_text),
        })
    }
}
