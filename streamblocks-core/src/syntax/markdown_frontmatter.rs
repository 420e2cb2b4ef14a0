use std::collections::BTreeMap;

use serde_json::Value;

use crate::candidate::{BlockCandidate, Section};
use crate::error::SyntaxParseError;
use crate::syntax::{DetectionResult, ParsedBlock, Syntax, parse_yaml_mapping};

/// The Markdown fenced-code format with optional YAML frontmatter.
///
/// A block opens on a fence line (default triple backtick), optionally
/// followed by an info string that is captured as inline metadata under the
/// `info` key. The block closes on the bare fence. Frontmatter between `---`
/// markers is optional — when the first interior line is not a `---`, every
/// interior line is content.
///
/// ````text
/// ```json
/// ---
/// id: cfg01
/// block_type: config
/// ---
/// {"k": 1}
/// ```
/// ````
///
/// Nested fences are not supported: a fence-with-info-string inside an open
/// block is content, and a bare fence always closes the block.
pub struct MarkdownFrontmatter {
    fence: String,
    boundary: String,
}

impl MarkdownFrontmatter {
    /// Creates the format with the default triple-backtick fence.
    pub fn new() -> Self {
        Self::with_fence("```")
    }

    /// Creates the format with a custom fence marker.
    pub fn with_fence(fence: impl Into<String>) -> Self {
        Self {
            fence: fence.into(),
            boundary: "---".to_string(),
        }
    }
}

impl Default for MarkdownFrontmatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Syntax for MarkdownFrontmatter {
    fn name(&self) -> &str {
        "markdown_frontmatter"
    }

    fn detect(&self, line: &str, candidate: Option<&mut BlockCandidate>) -> DetectionResult {
        let trimmed = line.trim_end();
        match candidate {
            Some(candidate) => {
                if trimmed == self.fence {
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
                        Section::Content => return DetectionResult::interior(),
                    }
                }
                if candidate.current_section == Section::Header {
                    candidate.current_section = Section::Content;
                }
                DetectionResult::interior()
            }
            None => match trimmed.strip_prefix(&self.fence) {
                Some(info) => {
                    let info = info.trim();
                    let inline_metadata = if info.is_empty() {
                        None
                    } else {
                        let mut metadata = BTreeMap::new();
                        metadata.insert("info".to_string(), info.to_string());
                        Some(metadata)
                    };
                    DetectionResult::opening(inline_metadata)
                }
                None => DetectionResult::none(),
            },
        }
    }

    fn parse(&self, candidate: &BlockCandidate) -> Result<ParsedBlock, SyntaxParseError> {
        let metadata = if candidate.metadata_lines.is_empty() {
            // Frontmatter is optional for fenced blocks.
            Value::Object(serde_json::Map::new())
        } else {
            parse_yaml_mapping(&candidate.metadata_lines, &self.boundary)?
        };

        if candidate.content_lines.iter().all(|line| line.trim().is_empty()) {
            return Err(SyntaxParseError::missing_content());
        }

        Ok(ParsedBlock {
            metadata,
            content: Value::String(candidate.content_lines.join("\n")),
        })
    }
}
