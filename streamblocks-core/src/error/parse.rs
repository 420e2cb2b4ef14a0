use thiserror::Error;

use crate::error::BlockErrorCode;

/// The failure class of a syntax-level parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Malformed YAML in a frontmatter section.
    Yaml,
    /// The parsed value violates a syntax-level constraint.
    Validation,
    /// A value has the wrong shape (e.g. frontmatter that is not a mapping).
    Type,
    /// A required key is missing or malformed.
    Key,
    /// The raw text does not match the syntax's expected layout.
    Format,
    /// The metadata section is empty but the syntax mandates it.
    MissingMetadata,
    /// The content section is empty but the syntax mandates it.
    MissingContent,
}

impl ParseErrorKind {
    /// Maps the parse failure class onto the public block error taxonomy.
    pub fn block_error_code(&self) -> BlockErrorCode {
        match self {
            Self::Yaml | Self::Type | Self::Key | Self::Format => BlockErrorCode::ParseFailed,
            Self::Validation => BlockErrorCode::ValidationFailed,
            Self::MissingMetadata => BlockErrorCode::MissingMetadata,
            Self::MissingContent => BlockErrorCode::MissingContent,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Validation => "validation",
            Self::Type => "type",
            Self::Key => "key",
            Self::Format => "format",
            Self::MissingMetadata => "missing metadata",
            Self::MissingContent => "missing content",
        }
    }
}

/// A syntax-level parse failure over a completed candidate.
///
/// Produced by [`Syntax::parse`](crate::Syntax::parse) and converted by the
/// processor into a block error event with the matching
/// [`BlockErrorCode`].
#[derive(Debug, Clone, Error)]
#[error("{} error: {message}", .kind.label())]
pub struct SyntaxParseError {
    /// The failure class.
    pub kind: ParseErrorKind,
    /// Human-readable description of the failure.
    pub message: String,
}

impl SyntaxParseError {
    /// Creates a parse error of the given kind.
    pub fn new(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates a YAML parse error.
    pub fn yaml(message: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::Yaml, message)
    }

    /// Creates a wrong-shape error.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::Type, message)
    }

    /// Creates a missing/malformed-key error.
    pub fn key(message: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::Key, message)
    }

    /// Creates a layout error.
    pub fn format(message: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::Format, message)
    }

    /// Creates a missing-metadata error.
    pub fn missing_metadata() -> Self {
        Self::new(ParseErrorKind::MissingMetadata, "metadata section is empty")
    }

    /// Creates a missing-content error.
    pub fn missing_content() -> Self {
        Self::new(ParseErrorKind::MissingContent, "content section is empty")
    }
}
