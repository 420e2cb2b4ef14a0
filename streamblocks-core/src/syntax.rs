/// The `!!start` / `!!end` format with YAML frontmatter.
pub mod delimiter_frontmatter;
/// The `!!id:type` preamble format with inline metadata.
pub mod delimiter_preamble;
/// The Markdown fenced-code format with optional YAML frontmatter.
pub mod markdown_frontmatter;

pub use delimiter_frontmatter::DelimiterFrontmatter;
pub use delimiter_preamble::DelimiterPreamble;
pub use markdown_frontmatter::MarkdownFrontmatter;

use std::collections::BTreeMap;

use serde_json::Value;

use crate::candidate::BlockCandidate;
use crate::error::SyntaxParseError;

/// How a syntax classified one line.
///
/// At most one of the flags is set. `none` means the line belongs to no
/// candidate — when probing for openings it is free text, and when offered
/// to an open candidate the line is passed on to the next candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionResult {
    /// The line opens a new block.
    pub is_opening: bool,
    /// The line closes the candidate it was offered to.
    pub is_closing: bool,
    /// The line ends the candidate's current section.
    pub is_section_boundary: bool,
    /// The line is interior to the candidate's current section.
    pub is_interior: bool,
    /// Metadata embedded in an opening marker.
    pub inline_metadata: Option<BTreeMap<String, String>>,
}

impl DetectionResult {
    /// The line matched nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// The line opens a new block, optionally carrying inline metadata.
    pub fn opening(inline_metadata: Option<BTreeMap<String, String>>) -> Self {
        Self {
            is_opening: true,
            inline_metadata,
            ..Self::default()
        }
    }

    /// The line closes the offered candidate.
    pub fn closing() -> Self {
        Self {
            is_closing: true,
            ..Self::default()
        }
    }

    /// The line ends the offered candidate's current section.
    pub fn boundary() -> Self {
        Self {
            is_section_boundary: true,
            ..Self::default()
        }
    }

    /// The line is interior to the offered candidate.
    pub fn interior() -> Self {
        Self {
            is_interior: true,
            ..Self::default()
        }
    }
}

/// A completed candidate's parsed metadata and content.
///
/// Both values are dictionary-shaped JSON; binding to typed schemas happens
/// at the registry, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBlock {
    /// The block's metadata as a JSON object.
    pub metadata: Value,
    /// The block's content — a raw string for the built-in syntaxes, before
    /// any registered content decoder runs.
    pub content: Value,
}

/// A pluggable block format.
///
/// A syntax answers three questions: does this line open, close, or
/// subdivide a block ([`detect`](Syntax::detect)); what are the metadata and
/// content of a completed candidate ([`parse`](Syntax::parse)); and does a
/// parsed pair satisfy the format's own invariants
/// ([`validate`](Syntax::validate)).
///
/// `detect` must be side-effect-free on everything except the offered
/// candidate's `current_section`, which the syntax owns and advances. The
/// candidate is lent to the syntax only for the duration of one call.
///
/// Opening and closing markers are matched against the full line after
/// stripping trailing whitespace. The built-in syntaxes never classify a
/// line inside an open candidate as an opening, so their openings cannot
/// overlap and nesting is unsupported; custom syntaxes that relax this must
/// document it.
pub trait Syntax: Send + Sync {
    /// The syntax's stable name, used in block ids and events.
    fn name(&self) -> &str;

    /// Classifies a line.
    ///
    /// Without a candidate, only openings are probed. With a candidate, the
    /// line is classified against that candidate's state: closing, section
    /// boundary, or interior — and the syntax may advance the candidate's
    /// `current_section`.
    fn detect(&self, line: &str, candidate: Option<&mut BlockCandidate>) -> DetectionResult;

    /// Parses a completed candidate's accumulated lines into
    /// dictionary-shaped metadata and content.
    fn parse(&self, candidate: &BlockCandidate) -> Result<ParsedBlock, SyntaxParseError>;

    /// Checks the syntax's own invariants over a parsed pair.
    fn validate(&self, metadata: &Value, content: &Value) -> bool {
        metadata.is_object() && !content.is_null()
    }
}

/// Parses a frontmatter section into a JSON object, skipping boundary lines.
///
/// Shared by the two frontmatter syntaxes. The section must deserialize to
/// a YAML mapping with string keys.
pub(crate) fn parse_yaml_mapping(
    lines: &[String],
    boundary: &str,
) -> Result<Value, SyntaxParseError> {
    let source = lines
        .iter()
        .filter(|line| line.trim_end() != boundary)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n");

    let value: Value =
        serde_yaml::from_str(&source).map_err(|error| SyntaxParseError::yaml(error.to_string()))?;

    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Ok(Value::Object(serde_json::Map::new())),
        other => Err(SyntaxParseError::type_error(format!(
            "frontmatter must be a YAML mapping, got {}",
            match other {
                Value::Array(_) => "a sequence",
                Value::String(_) => "a scalar",
                _ => "a non-mapping value",
            }
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_result_constructors_are_exclusive() {
        assert_eq!(DetectionResult::none(), DetectionResult::default());
        assert!(DetectionResult::opening(None).is_opening);
        assert!(DetectionResult::closing().is_closing);
        assert!(DetectionResult::boundary().is_section_boundary);
        assert!(DetectionResult::interior().is_interior);

        let closing = DetectionResult::closing();
        assert!(!closing.is_opening && !closing.is_section_boundary && !closing.is_interior);
    }
}
