use std::collections::BTreeMap;
use std::sync::Arc;

use crate::candidate::{BlockCandidate, CandidateState, Section};
use crate::error::BlockErrorCode;
use crate::line_accumulator::Line;
use crate::syntax::Syntax;

/// An event produced by the state machine for one consumed line.
///
/// These are internal to the pipeline: the stream processor maps each of
/// them onto exactly one public event, attaching schema binding to
/// [`BlockClosed`](MachineEvent::BlockClosed) along the way.
#[derive(Debug, Clone, PartialEq)]
pub enum MachineEvent {
    /// The line belongs to no block.
    RawLine {
        /// The free-text line.
        line: Line,
    },

    /// An opening marker created a new candidate.
    BlockOpened {
        /// Id of the new candidate.
        block_id: String,
        /// Name of the detecting syntax.
        syntax_name: String,
        /// Line number of the opening marker.
        start_line: u64,
        /// Metadata embedded in the opening marker.
        inline_metadata: Option<BTreeMap<String, String>>,
        /// The block type, when the opening marker reveals it.
        block_type: Option<String>,
    },

    /// A line was retained in an open candidate's section.
    SectionDelta {
        /// Id of the candidate.
        block_id: String,
        /// The section that retained the line.
        section: Section,
        /// The retained line.
        delta: String,
        /// Line number of the retained line.
        line_number: u64,
        /// The candidate's running byte count.
        accumulated_size: u64,
        /// Whether the line is a section boundary.
        is_boundary: bool,
        /// Inline metadata of the candidate, when present.
        inline_metadata: Option<BTreeMap<String, String>>,
    },

    /// A candidate saw its closing marker; parse and validation are the
    /// processor's job.
    BlockClosed {
        /// The completed candidate, including all accumulated lines.
        candidate: BlockCandidate,
    },

    /// A candidate was rejected by the state machine itself.
    BlockRejected {
        /// Id of the rejected candidate.
        block_id: String,
        /// The rejection class (size exceeded or unclosed).
        code: BlockErrorCode,
        /// Human-readable description.
        reason: String,
        /// Line number of the opening marker.
        start_line: u64,
        /// Line number of the last retained line.
        end_line: Option<u64>,
        /// The candidate's accumulated raw text.
        raw_text: Option<String>,
    },
}

/// Consumes numbered lines and drives the set of in-flight candidates.
///
/// Each line is offered to the active candidates oldest-first; the first
/// matching action wins, with closing taking precedence over section
/// boundaries over interior lines. A line no candidate absorbs is probed for
/// a new opening, and failing that reported as free text. Every consumed
/// byte therefore lands in exactly one place: a raw-line event, a section
/// delta, a closed candidate's raw text, or a rejected candidate's raw text.
///
/// The machine enforces the per-candidate size ceiling (rejecting with
/// [`BlockErrorCode::SizeExceeded`], even when the ceiling is crossed by the
/// closing marker itself) and flushes unclosed candidates on
/// [`finish`](BlockStateMachine::finish).
pub struct BlockStateMachine {
    syntax: Arc<dyn Syntax>,
    max_block_size: u64,
    candidates: Vec<BlockCandidate>,
    opened: u64,
}

impl BlockStateMachine {
    /// Creates a state machine for one stream.
    pub fn new(syntax: Arc<dyn Syntax>, max_block_size: u64) -> Self {
        Self {
            syntax,
            max_block_size,
            candidates: Vec::new(),
            opened: 0,
        }
    }

    /// The number of currently open candidates.
    pub fn active_count(&self) -> usize {
        self.candidates.len()
    }

    /// The oldest open candidate, when any is active.
    pub fn active_candidate(&self) -> Option<&BlockCandidate> {
        self.candidates.first()
    }

    /// Consumes one line and returns the events it produced.
    pub fn push_line(&mut self, line: &Line) -> Vec<MachineEvent> {
        let mut events = Vec::new();
        let syntax = Arc::clone(&self.syntax);

        let mut absorbed = false;
        let mut index = 0;
        while index < self.candidates.len() {
            let candidate = &mut self.candidates[index];
            let section_before = candidate.current_section;
            let detection = syntax.detect(&line.text, Some(candidate));

            if detection.is_closing {
                let mut candidate = self.candidates.remove(index);
                candidate.push_closing(&line.text, line.line_number);
                if candidate.accumulated_size > self.max_block_size {
                    events.push(self.size_rejection(candidate));
                } else {
                    candidate.state = CandidateState::ClosingDetected;
                    events.push(MachineEvent::BlockClosed { candidate });
                }
                absorbed = true;
                break;
            }

            if detection.is_section_boundary || detection.is_interior {
                // A boundary is retained in the section it ends; an interior
                // line belongs to the (possibly just advanced) current one.
                let section = if detection.is_section_boundary {
                    section_before
                } else {
                    candidate.current_section
                };
                candidate.push_line(section, &line.text, line.line_number);
                candidate.state = Self::state_for(candidate.current_section);

                if candidate.accumulated_size > self.max_block_size {
                    let candidate = self.candidates.remove(index);
                    events.push(self.size_rejection(candidate));
                } else {
                    let candidate = &self.candidates[index];
                    events.push(MachineEvent::SectionDelta {
                        block_id: candidate.block_id.clone(),
                        section,
                        delta: line.text.clone(),
                        line_number: line.line_number,
                        accumulated_size: candidate.accumulated_size,
                        is_boundary: detection.is_section_boundary,
                        inline_metadata: candidate.inline_metadata.clone(),
                    });
                }
                absorbed = true;
                break;
            }

            // The candidate declined the line; offer it to the next one.
            index += 1;
        }

        if absorbed {
            return events;
        }

        let detection = syntax.detect(&line.text, None);
        if detection.is_opening {
            self.opened += 1;
            let block_id = format!("{}-{}-{}", syntax.name(), line.line_number, self.opened);
            let candidate = BlockCandidate::new(
                block_id,
                syntax.name(),
                line.line_number,
                &line.text,
                detection.inline_metadata,
            );
            events.push(MachineEvent::BlockOpened {
                block_id: candidate.block_id.clone(),
                syntax_name: candidate.syntax_name.clone(),
                start_line: candidate.start_line,
                inline_metadata: candidate.inline_metadata.clone(),
                block_type: candidate.inline_value("block_type").map(str::to_string),
            });
            if candidate.accumulated_size > self.max_block_size {
                events.push(self.size_rejection(candidate));
            } else {
                self.candidates.push(candidate);
            }
        } else {
            events.push(MachineEvent::RawLine { line: line.clone() });
        }
        events
    }

    /// Rejects every open candidate as unclosed. Called at end of stream.
    pub fn finish(&mut self) -> Vec<MachineEvent> {
        let mut events = Vec::new();
        for mut candidate in self.candidates.drain(..) {
            candidate.state = CandidateState::Rejected;
            log::warn!(
                "block `{}` left unclosed at line {}",
                candidate.block_id,
                candidate.last_line
            );
            events.push(MachineEvent::BlockRejected {
                block_id: candidate.block_id,
                code: BlockErrorCode::UnclosedBlock,
                reason: "stream ended before the closing marker".to_string(),
                start_line: candidate.start_line,
                end_line: Some(candidate.last_line),
                raw_text: Some(candidate.raw_lines.join("\n")),
            });
        }
        events
    }

    fn size_rejection(&self, mut candidate: BlockCandidate) -> MachineEvent {
        candidate.state = CandidateState::Rejected;
        log::warn!(
            "block `{}` exceeded the size limit ({} > {} bytes)",
            candidate.block_id,
            candidate.accumulated_size,
            self.max_block_size
        );
        MachineEvent::BlockRejected {
            block_id: candidate.block_id.clone(),
            code: BlockErrorCode::SizeExceeded,
            reason: format!(
                "accumulated {} bytes, exceeding the {} byte limit",
                candidate.accumulated_size, self.max_block_size
            ),
            start_line: candidate.start_line,
            end_line: Some(candidate.last_line),
            raw_text: Some(candidate.raw_text()),
        }
    }

    fn state_for(section: Section) -> CandidateState {
        match section {
            Section::Header => CandidateState::HeaderDetected,
            Section::Metadata => CandidateState::AccumulatingMetadata,
            Section::Content => CandidateState::AccumulatingContent,
        }
    }
}
