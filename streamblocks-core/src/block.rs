use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Number of leading raw bytes covered by a block fingerprint.
const FINGERPRINT_PREFIX_LEN: usize = 64;

/// An immutable, validated block extracted from the stream.
///
/// Produced when a candidate's closing marker is followed by a successful
/// parse, schema validation, and validator run. Ownership passes to the
/// emitted event and from there to the consumer.
///
/// # Examples
///
/// Typed access to the validated metadata:
///
/// ```
/// use serde::Deserialize;
/// use serde_json::json;
/// use streamblocks_core::{ExtractedBlock, fingerprint};
///
/// #[derive(Deserialize)]
/// struct NoteMeta {
///     id: String,
/// }
///
/// let raw_text = "!!n1:note\nhello\n!!end".to_string();
/// let block = ExtractedBlock {
///     block_id: "delimiter_preamble-1-1".to_string(),
///     block_type: "note".to_string(),
///     syntax_name: "delimiter_preamble".to_string(),
///     start_line: 1,
///     end_line: 3,
///     metadata: json!({"id": "n1", "block_type": "note"}),
///     content: json!("hello"),
///     hash_id: fingerprint(&raw_text),
///     raw_text,
/// };
///
/// let meta: NoteMeta = block.metadata_as().unwrap();
/// assert_eq!(meta.id, "n1");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedBlock {
    /// Synthetic identifier, unique within the stream.
    pub block_id: String,

    /// The resolved block type.
    pub block_type: String,

    /// Name of the syntax that extracted the block.
    pub syntax_name: String,

    /// Line number of the opening marker (1-based, inclusive).
    pub start_line: u64,

    /// Line number of the closing marker (inclusive).
    pub end_line: u64,

    /// Validated metadata, shaped by the registered metadata schema.
    pub metadata: Value,

    /// Validated content, shaped by the registered content schema (after any
    /// content decoding).
    pub content: Value,

    /// The block's exact bytes as they appeared in the stream.
    pub raw_text: String,

    /// Stable 8-hex-character fingerprint over the leading raw bytes, used
    /// for deduplication and correlation.
    pub hash_id: String,
}

impl ExtractedBlock {
    /// Deserializes the metadata into a typed value.
    pub fn metadata_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.metadata.clone())
    }

    /// Deserializes the content into a typed value.
    pub fn content_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.content.clone())
    }
}

/// Computes the stable fingerprint of a block's raw text.
///
/// Hashes the first 64 bytes with seahash and renders the upper 32 bits as
/// 8 lowercase hex characters. Stable across platforms and releases, so
/// fingerprints can be persisted and compared between runs.
///
/// # Examples
///
/// ```
/// use streamblocks_core::fingerprint;
///
/// let a = fingerprint("!!f01:files_operations\nsrc/main.rs:C\n!!end");
/// let b = fingerprint("!!f01:files_operations\nsrc/main.rs:C\n!!end");
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 8);
/// ```
pub fn fingerprint(raw_text: &str) -> String {
    let bytes = raw_text.as_bytes();
    let prefix = &bytes[..bytes.len().min(FINGERPRINT_PREFIX_LEN)];
    let hash = seahash::hash(prefix);
    format!("{:08x}", (hash >> 32) as u32)
}
