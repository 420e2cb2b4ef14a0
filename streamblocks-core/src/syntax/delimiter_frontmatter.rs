use serde_json::Value;

use crate::candidate::{BlockCandidate, Section};
use crate::error::SyntaxParseError;
use crate::syntax::{DetectionResult, ParsedBlock, Syntax, parse_yaml_mapping};

/// The `!!start` / `!!end` format with YAML frontmatter.
///
/// After the opening marker, a `---` on the first interior line enters the
/// metadata section; the next `---` ends it and everything after is content.
/// Metadata is mandatory for this format and parses as a YAML mapping; the
/// block type is taken from its `block_type` key.
///
/// ```text
/// !!start
/// ---
/// id: cfg01
/// block_type: config
/// ---
/// {"k": 1}
/// !!end
/// ```
pub struct DelimiterFrontmatter {
    start_marker: String,
    end_marker: String,
    boundary: String,
}

impl DelimiterFrontmatter {
    /// Creates the format with the default `!!` delimiter and `---` boundary.
    pub fn new() -> Self {
        Self::with_delimiter("!!")
    }

    /// Creates the format with a custom delimiter.
    ///
    /// The markers become `<delimiter>start` and `<delimiter>end`.
    pub fn with_delimiter(delimiter: impl Into<String>) -> Self {
        let delimiter = delimiter.into();
        Self {
            start_marker: format!("{delimiter}start"),
            end_marker: format!("{delimiter}end"),
            boundary: "---".to_string(),
        }
    }
}

impl Default for DelimiterFrontmatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Syntax for DelimiterFrontmatter {
    fn name(&self) -> &str {
        "delimiter_frontmatter"
    }

    fn detect(&self, line: &str, candidate: Option<&mut BlockCandidate>) -> DetectionResult {
        let trimmed = line.trim_end();
        match candidate {
            Some(candidate) => {
                if trimmed == self.end_marker {
                    return DetectionResult::closing();
                }
                if trimmed == self.boundary {
                    match candidate.current_section {
                        Section::Header => {
                            candidate.current_section = Section::Metadata;
                            return DetectionResult::boundary();
                        }
                        Section::Metadata => {
                            candidate.current_section = Section::Content;
                            return DetectionResult::boundary();
                        }
                        // Inside content a `---` is just content.
                        Section::Content => return DetectionResult::interior(),
                    }
                }
                if candidate.current_section == Section::Header {
                    // No frontmatter: everything is content.
                    candidate.current_section = Section::Content;
                }
                DetectionResult::interior()
            }
            None => {
                if trimmed == self.start_marker {
                    DetectionResult::opening(None)
                } else {
                    DetectionResult::none()
                }
            }
        }
    }

    fn parse(&self, candidate: &BlockCandidate) -> Result<ParsedBlock, SyntaxParseError> {
        if candidate.metadata_lines.is_empty() {
            return Err(SyntaxParseError::missing_metadata());
        }
        let metadata = parse_yaml_mapping(&candidate.metadata_lines, &self.boundary)?;

        if candidate.content_lines.iter().all(|line| line.trim().is_empty()) {
            return Err(SyntaxParseError::missing_content());
        }

        Ok(ParsedBlock {
            metadata,
            content: Value::String(candidate.content_lines.join("\n")),
        })
    }
}
