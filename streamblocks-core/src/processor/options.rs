/// Configuration for a [`StreamProcessor`](crate::StreamProcessor).
///
/// All knobs have working defaults; the processor exposes builder-style
/// setters so most callers never construct this directly.
#[derive(Debug, Clone)]
pub struct ProcessorOptions {
    /// How many recent lines to retain for debugging context. Default: 5.
    pub lines_buffer: usize,

    /// Byte limit above which lines are truncated. Default: 16 384.
    pub max_line_length: usize,

    /// Per-candidate byte ceiling; a block crossing it is rejected with a
    /// size-exceeded error. Default: 1 048 576.
    pub max_block_size: u64,

    /// Forward upstream chunks untouched, interleaved with engine events.
    /// Default: `true`.
    pub emit_original_events: bool,

    /// Emit a chunk-level text delta per chunk, independent of line events.
    ///
    /// Default: `false` — chunk deltas cover the same bytes that line-level
    /// events already report, which confuses consumers accumulating both.
    /// Opt in explicitly when chunk granularity is needed.
    pub emit_text_deltas: bool,

    /// Run adapter detection on the first non-empty chunk when no explicit
    /// adapter was provided. Default: `true`.
    pub auto_detect_adapter: bool,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            lines_buffer: 5,
            max_line_length: 16_384,
            max_block_size: 1_048_576,
            emit_original_events: true,
            emit_text_deltas: false,
            auto_detect_adapter: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ProcessorOptions::default();
        assert_eq!(options.lines_buffer, 5);
        assert_eq!(options.max_line_length, 16_384);
        assert_eq!(options.max_block_size, 1 << 20);
        assert!(options.emit_original_events);
        assert!(!options.emit_text_deltas);
        assert!(options.auto_detect_adapter);
    }
}
