use thiserror::Error;

/// Errors produced by an upstream chunk source.
///
/// Source errors are fatal: the processor surfaces them as a stream-level
/// error event and terminates processing, unlike block-local errors which
/// are recovered in place.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// The upstream transport failed (connection dropped, read error, …).
    #[error("upstream source failed: {message}")]
    Upstream {
        /// Description of the transport failure.
        message: String,
    },

    /// No adapter could extract text from the stream's chunks.
    #[error("no source adapter matches the stream's chunk shape: {message}")]
    AdapterDetectionFailed {
        /// Description of the probe chunk that defeated detection.
        message: String,
    },
}

impl SourceError {
    /// Creates an upstream transport error.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    /// Creates an adapter-detection failure.
    pub fn adapter_detection_failed(message: impl Into<String>) -> Self {
        Self::AdapterDetectionFailed {
            message: message.into(),
        }
    }

    /// A short machine-readable code identifying the error class.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Upstream { .. } => "upstream_error",
            Self::AdapterDetectionFailed { .. } => "adapter_detection_failed",
        }
    }
}
