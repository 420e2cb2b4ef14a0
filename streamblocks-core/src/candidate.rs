use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Logical region of a block, assigned to each retained line by the syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    /// The opening marker line(s).
    Header,
    /// The frontmatter region, when the syntax has one.
    Metadata,
    /// The block's payload lines.
    Content,
}

/// Lifecycle state of an in-flight block candidate.
///
/// Transitions are monotonic except for the terminal jump to `Rejected`,
/// which is reachable from any non-terminal state (size limit, stream end,
/// or a failed parse/validation after the closing marker).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CandidateState {
    /// The opening marker was seen; no interior line has arrived yet.
    HeaderDetected,
    /// Interior lines are being collected into the metadata section.
    AccumulatingMetadata,
    /// Interior lines are being collected into the content section.
    AccumulatingContent,
    /// The closing marker was seen; parse and validation are pending.
    ClosingDetected,
    /// The block parsed and validated successfully.
    Completed,
    /// The candidate was rejected and will produce a block error.
    Rejected,
}

/// A mutable record for an in-flight block.
///
/// Created by the state machine when a syntax detects an opening and
/// destroyed on close or rejection. The owning state machine appends lines;
/// the syntax advances [`current_section`](BlockCandidate::current_section)
/// during detection.
///
/// Invariants: every retained line lands in exactly one of the three section
/// stores (the closing marker is retained in the raw text only), and
/// [`accumulated_size`](BlockCandidate::accumulated_size) always equals the
/// byte length of [`raw_text`](BlockCandidate::raw_text).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockCandidate {
    /// Synthetic identifier, unique within a stream.
    pub block_id: String,

    /// Name of the syntax that opened this candidate.
    pub syntax_name: String,

    /// Line number of the opening marker.
    pub start_line: u64,

    /// Current lifecycle state.
    pub state: CandidateState,

    /// The section that the next interior line belongs to. Advanced by the
    /// syntax during detection.
    pub current_section: Section,

    /// Raw text of the header section, line by line.
    pub header_lines: Vec<String>,

    /// Raw text of the metadata section, line by line.
    pub metadata_lines: Vec<String>,

    /// Raw text of the content section, line by line.
    pub content_lines: Vec<String>,

    /// Every retained line in stream order, including the closing marker.
    pub raw_lines: Vec<String>,

    /// Running byte count of all retained lines plus one separator byte per
    /// join. Compared against the configured block size ceiling.
    pub accumulated_size: u64,

    /// Key/value metadata captured from the opening marker, for syntaxes
    /// that embed metadata inline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_metadata: Option<BTreeMap<String, String>>,

    /// Line number of the most recently retained line.
    pub last_line: u64,
}

impl BlockCandidate {
    /// Creates a candidate from a detected opening line.
    pub fn new(
        block_id: impl Into<String>,
        syntax_name: impl Into<String>,
        start_line: u64,
        opening_line: &str,
        inline_metadata: Option<BTreeMap<String, String>>,
    ) -> Self {
        let mut candidate = Self {
            block_id: block_id.into(),
            syntax_name: syntax_name.into(),
            start_line,
            state: CandidateState::HeaderDetected,
            current_section: Section::Header,
            header_lines: Vec::new(),
            metadata_lines: Vec::new(),
            content_lines: Vec::new(),
            raw_lines: Vec::new(),
            accumulated_size: 0,
            inline_metadata,
            last_line: start_line,
        };
        candidate.push_line(Section::Header, opening_line, start_line);
        candidate
    }

    /// Retains a line in the given section and updates the size accounting.
    pub fn push_line(&mut self, section: Section, text: &str, line_number: u64) {
        self.retain_raw(text, line_number);
        match section {
            Section::Header => self.header_lines.push(text.to_string()),
            Section::Metadata => self.metadata_lines.push(text.to_string()),
            Section::Content => self.content_lines.push(text.to_string()),
        }
    }

    /// Retains the closing marker line, which belongs to the raw text but to
    /// none of the three sections.
    pub fn push_closing(&mut self, text: &str, line_number: u64) {
        self.retain_raw(text, line_number);
    }

    /// The block's exact bytes as they appeared in the stream.
    pub fn raw_text(&self) -> String {
        self.raw_lines.join("\n")
    }

    /// The inline-metadata value for `key`, when present.
    pub fn inline_value(&self, key: &str) -> Option<&str> {
        self.inline_metadata
            .as_ref()
            .and_then(|metadata| metadata.get(key))
            .map(String::as_str)
    }

    fn retain_raw(&mut self, text: &str, line_number: u64) {
        if !self.raw_lines.is_empty() {
            self.accumulated_size += 1;
        }
        self.accumulated_size += text.len() as u64;
        self.raw_lines.push(text.to_string());
        self.last_line = line_number;
    }
}
