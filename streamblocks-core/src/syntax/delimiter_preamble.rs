use std::collections::BTreeMap;

use regex::Regex;
use serde_json::{Map, Value};

use crate::candidate::{BlockCandidate, Section};
use crate::error::SyntaxParseError;
use crate::syntax::{DetectionResult, ParsedBlock, Syntax};

/// Pattern for the opening marker's payload, after the delimiter prefix:
/// `id:type` followed by optional `:param` tokens.
const OPENING_PATTERN: &str = r"^([A-Za-z0-9_-]+):([A-Za-z0-9_.-]+)(?::(.*))?$";

/// The `!!id:type` preamble format.
///
/// The opening line carries all metadata inline: a block id, a block type,
/// and optional colon-separated parameters (`key=value` tokens become
/// entries of the inline map, bare tokens are numbered `param<N>`). There is
/// no separate metadata section; every interior line is content. The block
/// closes on `!!end`.
///
/// ```text
/// !!f01:files_operations
/// src/main.rs:C
/// src/lib.rs:U
/// !!end
/// ```
///
/// # Examples
///
/// ```
/// use streamblocks_core::{DelimiterPreamble, Syntax};
///
/// let syntax = DelimiterPreamble::new();
/// let result = syntax.detect("!!f01:files_operations", None);
/// assert!(result.is_opening);
///
/// let metadata = result.inline_metadata.unwrap();
/// assert_eq!(metadata.get("id").map(String::as_str), Some("f01"));
/// assert_eq!(
///     metadata.get("block_type").map(String::as_str),
///     Some("files_operations")
/// );
/// ```
pub struct DelimiterPreamble {
    delimiter: String,
    closing_marker: String,
    opening: Regex,
}

impl DelimiterPreamble {
    /// Creates the format with the default `!!` delimiter.
    pub fn new() -> Self {
        Self::with_delimiter("!!")
    }

    /// Creates the format with a custom delimiter.
    ///
    /// The closing marker becomes `<delimiter>end`.
    pub fn with_delimiter(delimiter: impl Into<String>) -> Self {
        let delimiter = delimiter.into();
        Self {
            closing_marker: format!("{delimiter}end"),
            delimiter,
            opening: Regex::new(OPENING_PATTERN).expect("opening pattern is valid"),
        }
    }

    fn parse_opening(&self, line: &str) -> Option<BTreeMap<String, String>> {
        let rest = line.strip_prefix(&self.delimiter)?;
        let captures = self.opening.captures(rest)?;

        let mut metadata = BTreeMap::new();
        metadata.insert("id".to_string(), captures[1].to_string());
        metadata.insert("block_type".to_string(), captures[2].to_string());

        if let Some(params) = captures.get(3) {
            for (index, token) in params.as_str().split(':').enumerate() {
                if token.is_empty() {
                    continue;
                }
                match token.split_once('=') {
                    Some((key, value)) => {
                        metadata.insert(key.to_string(), value.to_string());
                    }
                    None => {
                        metadata.insert(format!("param{index}"), token.to_string());
                    }
                }
            }
        }
        Some(metadata)
    }
}

impl Default for DelimiterPreamble {
    fn default() -> Self {
        Self::new()
    }
}

impl Syntax for DelimiterPreamble {
    fn name(&self) -> &str {
        "delimiter_preamble"
    }

    fn detect(&self, line: &str, candidate: Option<&mut BlockCandidate>) -> DetectionResult {
        let trimmed = line.trim_end();
        match candidate {
            Some(candidate) => {
                if trimmed == self.closing_marker {
                    return DetectionResult::closing();
                }
                // The opening marker has no metadata section to leave.
                if candidate.current_section == Section::Header {
                    candidate.current_section = Section::Content;
                }
                DetectionResult::interior()
            }
            None => {
                if trimmed == self.closing_marker {
                    return DetectionResult::none();
                }
                match self.parse_opening(trimmed) {
                    Some(metadata) => DetectionResult::opening(Some(metadata)),
                    None => DetectionResult::none(),
                }
            }
        }
    }

    fn parse(&self, candidate: &BlockCandidate) -> Result<ParsedBlock, SyntaxParseError> {
        let inline = candidate
            .inline_metadata
            .as_ref()
            .ok_or_else(|| SyntaxParseError::key("opening marker carried no inline metadata"))?;

        let mut metadata = Map::new();
        for (key, value) in inline {
            metadata.insert(key.clone(), Value::String(value.clone()));
        }

        if candidate.content_lines.iter().all(|line| line.trim().is_empty()) {
            return Err(SyntaxParseError::missing_content());
        }

        Ok(ParsedBlock {
            metadata: Value::Object(metadata),
            content: Value::String(candidate.content_lines.join("\n")),
        })
    }

    fn validate(&self, metadata: &Value, content: &Value) -> bool {
        metadata.get("id").is_some_and(Value::is_string)
            && metadata.get("block_type").is_some_and(Value::is_string)
            && content.as_str().is_some_and(|text| !text.is_empty())
    }
}
