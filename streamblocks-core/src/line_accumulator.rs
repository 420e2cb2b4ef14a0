use serde::{Deserialize, Serialize};

/// A complete line produced by the [`LineAccumulator`].
///
/// Line numbers start at 1 and are contiguous across a stream. The text
/// never includes the trailing newline; a stream ending in a newline yields
/// a final empty line so that rejoining all lines with `"\n"` reproduces the
/// input exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    /// 1-based position of the line within the stream.
    pub line_number: u64,

    /// The line's text, without its trailing newline.
    pub text: String,

    /// Whether the line was cut at the accumulator's length limit.
    pub truncated: bool,
}

/// Converts an ordered sequence of text fragments into complete lines.
///
/// Fragments may be empty, may cross line boundaries, and — through
/// [`push_bytes`](LineAccumulator::push_bytes) — may even split a multi-byte
/// UTF-8 sequence. The emitted line sequence depends only on the
/// concatenation of the inputs, never on how they were split.
///
/// Lines longer than the configured maximum are emitted truncated (cut at
/// the largest character boundary at or below the limit); the remainder up
/// to the next newline is discarded without affecting line numbering.
///
/// # Examples
///
/// ```
/// use streamblocks_core::LineAccumulator;
///
/// let mut accumulator = LineAccumulator::new(16_384);
/// let lines = accumulator.push("first\nsec");
/// assert_eq!(lines.len(), 1);
/// assert_eq!(lines[0].text, "first");
///
/// let lines = accumulator.push("ond\n");
/// assert_eq!(lines[0].text, "second");
/// assert_eq!(lines[0].line_number, 2);
///
/// // The dangling newline yields a trailing empty line.
/// let last = accumulator.finalize().unwrap();
/// assert_eq!(last.text, "");
/// assert_eq!(last.line_number, 3);
/// ```
#[derive(Debug, Clone)]
pub struct LineAccumulator {
    pending: String,
    utf8_carry: Vec<u8>,
    line_number: u64,
    max_line_length: usize,
    pending_truncated: bool,
    finalized: bool,
}

impl LineAccumulator {
    /// Creates an accumulator that truncates lines longer than
    /// `max_line_length` bytes.
    pub fn new(max_line_length: usize) -> Self {
        Self {
            pending: String::new(),
            utf8_carry: Vec::new(),
            line_number: 0,
            max_line_length,
            pending_truncated: false,
            finalized: false,
        }
    }

    /// The number of lines emitted so far.
    pub fn line_count(&self) -> u64 {
        self.line_number
    }

    /// Appends a text fragment, returning every line it completes.
    ///
    /// Never fails. Fragments pushed after
    /// [`finalize`](LineAccumulator::finalize) are ignored until
    /// [`reset`](LineAccumulator::reset).
    pub fn push(&mut self, text: &str) -> Vec<Line> {
        if self.finalized {
            return Vec::new();
        }

        let mut lines = Vec::new();
        let mut rest = text;
        while let Some(position) = rest.find('\n') {
            let (segment, tail) = rest.split_at(position);
            self.append_segment(segment);
            lines.push(self.complete_line());
            rest = &tail[1..];
        }
        self.append_segment(rest);
        lines
    }

    /// Appends a byte fragment, reassembling UTF-8 sequences split across
    /// fragment boundaries.
    ///
    /// An incomplete trailing sequence is carried into the next call;
    /// definitely-invalid sequences are replaced with U+FFFD.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Vec<Line> {
        if self.finalized {
            return Vec::new();
        }

        self.utf8_carry.extend_from_slice(bytes);
        let data = std::mem::take(&mut self.utf8_carry);

        let mut lines = Vec::new();
        let mut rest: &[u8] = &data;
        while !rest.is_empty() {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    lines.extend(self.push(text));
                    rest = &[];
                }
                Err(error) => {
                    let (valid, remainder) = rest.split_at(error.valid_up_to());
                    lines.extend(self.push(&String::from_utf8_lossy(valid)));
                    match error.error_len() {
                        Some(invalid_len) => {
                            lines.extend(self.push("\u{FFFD}"));
                            rest = &remainder[invalid_len..];
                        }
                        None => {
                            // Incomplete trailing sequence: wait for more bytes.
                            self.utf8_carry = remainder.to_vec();
                            rest = &[];
                        }
                    }
                }
            }
        }
        lines
    }

    /// Flushes the buffered partial line, if any, and becomes terminal.
    ///
    /// Returns the final partial line, or — when the stream ended with a
    /// newline — the trailing empty line that preserves the byte-for-byte
    /// rejoin contract. Returns `None` for an empty stream.
    pub fn finalize(&mut self) -> Option<Line> {
        if self.finalized {
            return None;
        }
        if !self.utf8_carry.is_empty() {
            self.utf8_carry.clear();
            self.append_segment("\u{FFFD}");
        }
        self.finalized = true;

        if !self.pending.is_empty() || self.line_number > 0 {
            Some(self.complete_line())
        } else {
            None
        }
    }

    /// Discards all buffered state and resets the line counter to zero.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.utf8_carry.clear();
        self.line_number = 0;
        self.pending_truncated = false;
        self.finalized = false;
    }

    fn append_segment(&mut self, segment: &str) {
        if self.pending_truncated {
            // The current line already overflowed; drop the remainder.
            return;
        }
        self.pending.push_str(segment);
        if self.pending.len() > self.max_line_length {
            let mut cut = self.max_line_length;
            while !self.pending.is_char_boundary(cut) {
                cut -= 1;
            }
            self.pending.truncate(cut);
            self.pending_truncated = true;
        }
    }

    fn complete_line(&mut self) -> Line {
        self.line_number += 1;
        Line {
            line_number: self.line_number,
            text: std::mem::take(&mut self.pending),
            truncated: std::mem::replace(&mut self.pending_truncated, false),
        }
    }
}
