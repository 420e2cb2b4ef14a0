use serde::{Deserialize, Serialize};
use thiserror::Error;

mod parse;

pub use parse::{ParseErrorKind, SyntaxParseError};

/// The block error taxonomy.
///
/// Every rejected candidate carries one of these codes in its block error
/// event. Block-local errors are recovered in place: the stream continues
/// past a rejected block, and consumers that need diagnostics read the
/// error events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockErrorCode {
    /// Parsed metadata/content were well-formed but rejected by a schema or
    /// a user validator.
    ValidationFailed,
    /// The candidate's accumulated size crossed the configured ceiling.
    SizeExceeded,
    /// The stream ended while the candidate was still open.
    UnclosedBlock,
    /// The block's type has no registered schema and no default.
    UnknownType,
    /// The syntax failed to parse the accumulated lines.
    ParseFailed,
    /// A section the syntax mandates was empty: metadata.
    MissingMetadata,
    /// A section the syntax mandates was empty: content.
    MissingContent,
    /// A syntax-internal invariant was violated.
    SyntaxError,
}

impl BlockErrorCode {
    /// The code's wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::SizeExceeded => "SIZE_EXCEEDED",
            Self::UnclosedBlock => "UNCLOSED_BLOCK",
            Self::UnknownType => "UNKNOWN_TYPE",
            Self::ParseFailed => "PARSE_FAILED",
            Self::MissingMetadata => "MISSING_METADATA",
            Self::MissingContent => "MISSING_CONTENT",
            Self::SyntaxError => "SYNTAX_ERROR",
        }
    }
}

impl std::fmt::Display for BlockErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur when configuring or operating the engine.
///
/// These are API-level errors (registration mistakes, schema compilation
/// failures) — distinct from the per-block [`BlockErrorCode`] taxonomy,
/// which flows through the event stream instead of `Result`s.
///
/// # Examples
///
/// ```
/// use streamblocks_core::StreamBlocksError;
///
/// let error = StreamBlocksError::reserved_block_type("bad*name");
/// match &error {
///     StreamBlocksError::ReservedBlockType { block_type } => {
///         assert_eq!(block_type, "bad*name");
///     }
///     _ => panic!("Expected ReservedBlockType"),
/// }
/// ```
#[derive(Debug, Clone, Error)]
pub enum StreamBlocksError {
    /// A block type name contains the reserved wildcard sentinel.
    #[error("block type `{block_type}` contains the reserved `*` sentinel")]
    ReservedBlockType {
        /// The offending block type name.
        block_type: String,
    },

    /// A metadata or content schema failed to compile.
    #[error("the {schema} schema failed to compile: {message}")]
    SchemaCompile {
        /// Which schema failed: `metadata` or `content`.
        schema: String,
        /// The compiler's diagnostic.
        message: String,
    },

    /// No schema is registered for a block type (and no default exists).
    #[error("no schema registered for block type `{block_type}`")]
    UnknownBlockType {
        /// The block type that failed lookup.
        block_type: String,
    },

    /// A registered validator rejected a block.
    #[error("validation failed for block type `{block_type}`: {message}")]
    ValidationFailed {
        /// The block type being validated.
        block_type: String,
        /// The validator's diagnostic.
        message: String,
    },
}

impl StreamBlocksError {
    /// Creates a reserved-block-type error.
    pub fn reserved_block_type(block_type: impl Into<String>) -> Self {
        Self::ReservedBlockType {
            block_type: block_type.into(),
        }
    }

    /// Creates a schema-compilation error.
    pub fn schema_compile(schema: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaCompile {
            schema: schema.into(),
            message: message.into(),
        }
    }

    /// Creates an unknown-block-type error.
    pub fn unknown_block_type(block_type: impl Into<String>) -> Self {
        Self::UnknownBlockType {
            block_type: block_type.into(),
        }
    }

    /// Creates a validation-failure error.
    pub fn validation_failed(block_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            block_type: block_type.into(),
            message: message.into(),
        }
    }
}
