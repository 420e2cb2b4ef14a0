use std::sync::Arc;

use schemars::JsonSchema;
use serde_json::Value;

use crate::error::StreamBlocksError;

/// A user-supplied block validator.
///
/// Receives the bound metadata and content; an `Err` rejects the block with
/// a validation failure carrying the returned message.
pub type BlockValidator = Arc<dyn Fn(&Value, &Value) -> Result<(), String> + Send + Sync>;

/// A content decoder: turns a syntax's raw content value into the typed
/// shape the content schema expects.
///
/// The built-in syntaxes parse content as a raw string; a decoder is where a
/// registration gives that string structure (splitting operation lines,
/// parsing embedded JSON, …) before schema validation runs.
pub type ContentDecoder = Arc<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;

/// Why a parsed block failed to bind to its registered schemas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindFailure {
    /// The metadata did not satisfy the metadata schema.
    Metadata(String),
    /// The content decoder rejected the raw content.
    ContentDecode(String),
    /// The (decoded) content did not satisfy the content schema.
    Content(String),
}

/// The schemas, decoder, and validators registered for one block type.
///
/// Binding a parsed block means: validate the metadata against the metadata
/// schema, run the content decoder (when present), validate the result
/// against the content schema, then run the user validators in registration
/// order. Schemas are compiled once at registration time.
///
/// # Examples
///
/// Typed registration from `JsonSchema` types:
///
/// ```
/// use schemars::JsonSchema;
/// use serde::Deserialize;
/// use streamblocks_core::TypeBinding;
///
/// #[derive(Deserialize, JsonSchema)]
/// struct NoteMeta {
///     id: String,
/// }
///
/// #[derive(Deserialize, JsonSchema)]
/// struct NoteContent(String);
///
/// let binding = TypeBinding::of::<NoteMeta, NoteContent>().unwrap();
/// assert!(binding
///     .bind(&serde_json::json!({"id": "n1"}), &serde_json::json!("text"))
///     .is_ok());
/// ```
pub struct TypeBinding {
    metadata_schema: Value,
    content_schema: Value,
    metadata_validator: jsonschema::Validator,
    content_validator: jsonschema::Validator,
    content_decoder: Option<ContentDecoder>,
    validators: Vec<BlockValidator>,
}

impl std::fmt::Debug for TypeBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeBinding")
            .field("metadata_schema", &self.metadata_schema)
            .field("content_schema", &self.content_schema)
            .field("content_decoder", &self.content_decoder.is_some())
            .field("validators", &self.validators.len())
            .finish()
    }
}

impl TypeBinding {
    /// Creates a binding from two JSON Schemas, compiling them eagerly.
    ///
    /// # Errors
    ///
    /// Fails when either schema is itself invalid.
    pub fn new(metadata_schema: Value, content_schema: Value) -> Result<Self, StreamBlocksError> {
        let metadata_validator = jsonschema::validator_for(&metadata_schema)
            .map_err(|error| StreamBlocksError::schema_compile("metadata", error.to_string()))?;
        let content_validator = jsonschema::validator_for(&content_schema)
            .map_err(|error| StreamBlocksError::schema_compile("content", error.to_string()))?;
        Ok(Self {
            metadata_schema,
            content_schema,
            metadata_validator,
            content_validator,
            content_decoder: None,
            validators: Vec::new(),
        })
    }

    /// Creates a binding whose schemas are generated from `JsonSchema`
    /// types.
    pub fn of<M: JsonSchema, C: JsonSchema>() -> Result<Self, StreamBlocksError> {
        let metadata_schema = serde_json::to_value(schemars::schema_for!(M))
            .map_err(|error| StreamBlocksError::schema_compile("metadata", error.to_string()))?;
        let content_schema = serde_json::to_value(schemars::schema_for!(C))
            .map_err(|error| StreamBlocksError::schema_compile("content", error.to_string()))?;
        Self::new(metadata_schema, content_schema)
    }

    /// Attaches a content decoder, replacing any previous one.
    pub fn with_content_decoder(
        mut self,
        decoder: impl Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        self.content_decoder = Some(Arc::new(decoder));
        self
    }

    /// Appends a user validator. Validators run in registration order.
    pub fn with_validator(
        mut self,
        validator: impl Fn(&Value, &Value) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// The metadata schema as registered.
    pub fn metadata_schema(&self) -> &Value {
        &self.metadata_schema
    }

    /// The content schema as registered.
    pub fn content_schema(&self) -> &Value {
        &self.content_schema
    }

    /// Binds a parsed metadata/content pair to the registered schemas.
    ///
    /// Returns the validated pair — with the content decoded when a decoder
    /// is attached — or the first failure encountered.
    pub fn bind(&self, metadata: &Value, content: &Value) -> Result<(Value, Value), BindFailure> {
        if !self.metadata_validator.is_valid(metadata) {
            return Err(BindFailure::Metadata(self.describe_errors(
                &self.metadata_validator,
                metadata,
            )));
        }

        let content = match &self.content_decoder {
            Some(decoder) => decoder(content).map_err(BindFailure::ContentDecode)?,
            None => content.clone(),
        };

        if !self.content_validator.is_valid(&content) {
            return Err(BindFailure::Content(
                self.describe_errors(&self.content_validator, &content),
            ));
        }

        Ok((metadata.clone(), content))
    }

    /// Runs the user validators in registration order; the first failure
    /// short-circuits.
    pub fn run_validators(&self, metadata: &Value, content: &Value) -> Result<(), String> {
        for validator in &self.validators {
            validator(metadata, content)?;
        }
        Ok(())
    }

    fn describe_errors(&self, validator: &jsonschema::Validator, instance: &Value) -> String {
        let messages: Vec<String> = validator
            .iter_errors(instance)
            .map(|error| format!("{} at {}", error, error.instance_path))
            .collect();
        messages.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::JsonSchema;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_bind_validates_metadata() {
        let binding = TypeBinding::new(
            json!({"type": "object", "required": ["id"]}),
            json!({"type": "string"}),
        )
        .unwrap();

        assert!(binding.bind(&json!({"id": "x"}), &json!("body")).is_ok());
        let failure = binding.bind(&json!({}), &json!("body")).unwrap_err();
        match failure {
            BindFailure::Metadata(message) => assert!(message.contains("required")),
            other => panic!("expected Metadata failure, got {other:?}"),
        }
    }

    #[test]
    fn test_bind_validates_content() {
        let binding =
            TypeBinding::new(json!({"type": "object"}), json!({"type": "string"})).unwrap();
        let failure = binding.bind(&json!({}), &json!(42)).unwrap_err();
        assert!(matches!(failure, BindFailure::Content(_)));
    }

    #[test]
    fn test_content_decoder_runs_before_content_schema() {
        let binding = TypeBinding::new(
            json!({"type": "object"}),
            json!({
                "type": "object",
                "properties": {"lines": {"type": "array"}},
                "required": ["lines"]
            }),
        )
        .unwrap()
        .with_content_decoder(|raw| {
            let text = raw.as_str().ok_or("content must be a string")?;
            Ok(json!({"lines": text.lines().collect::<Vec<_>>()}))
        });

        let (_, content) = binding.bind(&json!({}), &json!("a\nb")).unwrap();
        assert_eq!(content, json!({"lines": ["a", "b"]}));
    }

    #[test]
    fn test_content_decoder_failure() {
        let binding = TypeBinding::new(json!({"type": "object"}), json!({}))
            .unwrap()
            .with_content_decoder(|_| Err("nope".to_string()));
        let failure = binding.bind(&json!({}), &json!("x")).unwrap_err();
        assert_eq!(failure, BindFailure::ContentDecode("nope".to_string()));
    }

    #[test]
    fn test_of_generates_schemas_from_types() {
        #[derive(Deserialize, JsonSchema)]
        struct Meta {
            #[allow(dead_code)]
            id: String,
        }

        #[derive(Deserialize, JsonSchema)]
        struct Content {
            #[allow(dead_code)]
            body: String,
        }

        let binding = TypeBinding::of::<Meta, Content>().unwrap();
        assert!(binding
            .bind(&json!({"id": "x"}), &json!({"body": "y"}))
            .is_ok());
        // `id` is required by the generated schema.
        assert!(binding.bind(&json!({}), &json!({"body": "y"})).is_err());
    }

    #[test]
    fn test_invalid_schema_fails_to_compile() {
        let error = TypeBinding::new(json!({"type": "not-a-type"}), json!({})).unwrap_err();
        assert!(matches!(error, StreamBlocksError::SchemaCompile { .. }));
    }
}
