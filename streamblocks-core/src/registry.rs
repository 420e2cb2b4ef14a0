mod binding;

pub use binding::{BindFailure, BlockValidator, ContentDecoder, TypeBinding};

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::StreamBlocksError;
use crate::syntax::Syntax;

/// The reserved block type under which the default binding is registered.
pub const WILDCARD_TYPE: &str = "*";

/// Maps block types to schema bindings and holds the stream's active syntax.
///
/// A registry is built before processing begins and is read-only while any
/// stream references it; share it behind an [`Arc`] across sequential
/// streams. A binding registered under the wildcard (`"*"`, via
/// [`register_default`](Registry::register_default)) catches block types
/// with no exact entry.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use serde_json::json;
/// use streamblocks_core::{DelimiterPreamble, Registry, TypeBinding};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut registry = Registry::new(Arc::new(DelimiterPreamble::new()));
/// registry.register(
///     "note",
///     TypeBinding::new(json!({"type": "object"}), json!({"type": "string"}))?,
/// )?;
///
/// assert!(registry.lookup("note").is_some());
/// assert!(registry.lookup("unknown").is_none());
/// # Ok(())
/// # }
/// ```
pub struct Registry {
    syntax: Arc<dyn Syntax>,
    bindings: HashMap<String, TypeBinding>,
}

impl Registry {
    /// Creates a registry around the given syntax.
    pub fn new(syntax: Arc<dyn Syntax>) -> Self {
        Self {
            syntax,
            bindings: HashMap::new(),
        }
    }

    /// The registry's active syntax.
    pub fn syntax(&self) -> &Arc<dyn Syntax> {
        &self.syntax
    }

    /// Registers (or replaces) the binding for a block type.
    ///
    /// # Errors
    ///
    /// Fails when the name contains the reserved `*` sentinel; use
    /// [`register_default`](Registry::register_default) for the wildcard.
    pub fn register(
        &mut self,
        block_type: impl Into<String>,
        binding: TypeBinding,
    ) -> Result<(), StreamBlocksError> {
        let block_type = block_type.into();
        if block_type.contains(WILDCARD_TYPE) {
            return Err(StreamBlocksError::reserved_block_type(block_type));
        }
        self.bindings.insert(block_type, binding);
        Ok(())
    }

    /// Installs the wildcard binding used when no exact entry matches.
    pub fn register_default(&mut self, binding: TypeBinding) {
        self.bindings.insert(WILDCARD_TYPE.to_string(), binding);
    }

    /// Looks up the binding for a block type: exact match first, then the
    /// wildcard default.
    pub fn lookup(&self, block_type: &str) -> Option<&TypeBinding> {
        self.bindings
            .get(block_type)
            .or_else(|| self.bindings.get(WILDCARD_TYPE))
    }

    /// The wildcard binding, when one is installed.
    pub fn lookup_default(&self) -> Option<&TypeBinding> {
        self.bindings.get(WILDCARD_TYPE)
    }

    /// Whether an exact (non-wildcard) entry exists for a block type.
    pub fn contains(&self, block_type: &str) -> bool {
        self.bindings.contains_key(block_type)
    }

    /// The number of registered bindings, including any wildcard.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether the registry has no bindings at all.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Runs the user validators registered for a block type, in
    /// registration order. The first failure short-circuits.
    ///
    /// # Errors
    ///
    /// [`StreamBlocksError::UnknownBlockType`] when no binding matches,
    /// [`StreamBlocksError::ValidationFailed`] when a validator rejects.
    pub fn validate(
        &self,
        block_type: &str,
        metadata: &Value,
        content: &Value,
    ) -> Result<(), StreamBlocksError> {
        let binding = self
            .lookup(block_type)
            .ok_or_else(|| StreamBlocksError::unknown_block_type(block_type))?;
        binding
            .run_validators(metadata, content)
            .map_err(|message| StreamBlocksError::validation_failed(block_type, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::DelimiterPreamble;
    use serde_json::json;

    fn registry() -> Registry {
        Registry::new(Arc::new(DelimiterPreamble::new()))
    }

    fn permissive_binding() -> TypeBinding {
        TypeBinding::new(json!({"type": "object"}), json!({"type": "string"})).unwrap()
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = registry();
        registry.register("note", permissive_binding()).unwrap();
        assert!(registry.lookup("note").is_some());
        assert!(registry.lookup("other").is_none());
        assert!(registry.contains("note"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_rejects_wildcard_names() {
        let mut registry = registry();
        let error = registry.register("bad*name", permissive_binding()).unwrap_err();
        assert!(matches!(error, StreamBlocksError::ReservedBlockType { .. }));
        let error = registry.register("*", permissive_binding()).unwrap_err();
        assert!(matches!(error, StreamBlocksError::ReservedBlockType { .. }));
    }

    #[test]
    fn test_wildcard_catches_unknown_types() {
        let mut registry = registry();
        registry.register_default(permissive_binding());
        assert!(registry.lookup("anything").is_some());
        assert!(registry.lookup_default().is_some());
    }

    #[test]
    fn test_exact_match_wins_over_wildcard() {
        let mut registry = registry();
        registry.register_default(permissive_binding());
        let strict =
            TypeBinding::new(json!({"type": "object", "required": ["id"]}), json!({})).unwrap();
        registry.register("strict", strict).unwrap();

        let binding = registry.lookup("strict").unwrap();
        assert!(binding.bind(&json!({}), &json!("x")).is_err());
        // The wildcard still serves other types.
        assert!(registry.lookup("loose").unwrap().bind(&json!({}), &json!("x")).is_ok());
    }

    #[test]
    fn test_validate_runs_validators_in_order() {
        let mut registry = registry();
        let binding = permissive_binding()
            .with_validator(|_, _| Err("first".to_string()))
            .with_validator(|_, _| Err("second".to_string()));
        registry.register("note", binding).unwrap();

        let error = registry
            .validate("note", &json!({}), &json!("x"))
            .unwrap_err();
        match error {
            StreamBlocksError::ValidationFailed { message, .. } => assert_eq!(message, "first"),
            other => panic!("expected ValidationFailed, got {other}"),
        }
    }

    #[test]
    fn test_validate_unknown_type() {
        let registry = registry();
        let error = registry
            .validate("missing", &json!({}), &json!("x"))
            .unwrap_err();
        assert!(matches!(error, StreamBlocksError::UnknownBlockType { .. }));
    }
}
