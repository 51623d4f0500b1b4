//! # Schema Evaluation
//!
//! Runtime validation of JSON values (usually converted from YAML) against
//! stack schema nodes (Draft 7).
//!
//! ## Modes
//!
//! [`ValidationMode::CollectAll`] reports every violation and is what the
//! engine uses. [`ValidationMode::FailFast`] stops at the first one, for
//! callers that only need a verdict.
//!
//! ## Reference Resolution
//!
//! Internal `#/definitions/...` references are resolved by the jsonschema
//! crate natively. Any other URI is looked up among the registered
//! documents by `$id`; nothing is fetched over the network.

use std::collections::HashMap;
use std::fmt;

use jsonschema::{Retrieve, Uri, ValidationOptions, Validator};
use serde_json::Value;
use stackgate_core::StackError;

use crate::registry::{SchemaDocument, SchemaRegistry};

/// Whether evaluation stops at the first violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    FailFast,
    CollectAll,
}

/// Local retriever that resolves `$ref` URIs to registered schema documents.
struct LocalSchemaRetriever {
    /// Map from `$id` URI to schema value.
    schemas_by_uri: HashMap<String, Value>,
}

impl Retrieve for LocalSchemaRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let uri_str = uri.as_str();

        if let Some(value) = self.schemas_by_uri.get(uri_str) {
            return Ok(value.clone());
        }

        // Draft metaschemas and anything else unknown: accept anything
        // rather than going to the network.
        Ok(serde_json::json!({}))
    }
}

/// A single validation violation with structured context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON Pointer path to the violating field in the instance.
    pub instance_path: String,
    /// JSON Pointer path within the schema that triggered the error.
    pub schema_path: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.instance_path, self.message)
        }
    }
}

/// Compiles schema nodes and evaluates instances against them.
///
/// Holds every registered document by `$id` so cross-document references
/// stay local.
#[derive(Debug)]
pub struct SchemaEvaluator {
    schemas_by_uri: HashMap<String, Value>,
}

impl SchemaEvaluator {
    /// Evaluator that can resolve references into any document of `registry`.
    pub fn new(registry: &SchemaRegistry) -> Self {
        let mut schemas_by_uri = HashMap::new();
        for document in registry.documents() {
            if let Some(id) = document.root().get("$id").and_then(Value::as_str) {
                schemas_by_uri.insert(id.to_string(), document.root().clone());
            }
        }
        Self { schemas_by_uri }
    }

    fn build_options(&self) -> ValidationOptions {
        let mut opts = jsonschema::options();
        opts.with_draft(jsonschema::Draft::Draft7);
        opts.with_retriever(LocalSchemaRetriever {
            schemas_by_uri: self.schemas_by_uri.clone(),
        });
        opts
    }

    /// Compile `schema` into a reusable validator.
    ///
    /// # Errors
    ///
    /// Returns `StackError::ValidatorBuild` if the schema is itself invalid.
    pub fn compile(&self, schema: &Value, schema_name: &str) -> Result<Validator, StackError> {
        self.build_options()
            .build(schema)
            .map_err(|e| StackError::ValidatorBuild {
                schema: schema_name.to_string(),
                reason: e.to_string(),
            })
    }

    /// Validate `instance` against the whole of `document`.
    pub fn validate_document(
        &self,
        instance: &Value,
        document: &SchemaDocument,
        mode: ValidationMode,
    ) -> Result<Vec<Violation>, StackError> {
        self.validate(instance, document.root(), document.version(), mode)
    }

    /// Validate `instance` against one node of `document`, keeping the
    /// document's definitions in scope for internal references.
    pub fn validate_node(
        &self,
        instance: &Value,
        document: &SchemaDocument,
        node: &Value,
        mode: ValidationMode,
    ) -> Result<Vec<Violation>, StackError> {
        let rooted = document.rooted(node);
        self.validate(instance, &rooted, document.version(), mode)
    }

    /// Validate `instance` against a standalone `schema`.
    ///
    /// Returns the violations found: at most one in
    /// [`ValidationMode::FailFast`], all of them in
    /// [`ValidationMode::CollectAll`]. An empty vector means the instance
    /// is valid.
    ///
    /// # Errors
    ///
    /// Returns `StackError::ValidatorBuild` if the schema cannot be compiled.
    pub fn validate(
        &self,
        instance: &Value,
        schema: &Value,
        schema_name: &str,
        mode: ValidationMode,
    ) -> Result<Vec<Violation>, StackError> {
        let validator = self.compile(schema, schema_name)?;

        let errors = validator.iter_errors(instance).map(|e| Violation {
            instance_path: e.instance_path.to_string(),
            schema_path: e.schema_path.to_string(),
            message: e.to_string(),
        });

        let violations: Vec<Violation> = match mode {
            ValidationMode::FailFast => errors.take(1).collect(),
            ValidationMode::CollectAll => errors.collect(),
        };

        tracing::debug!(
            schema = schema_name,
            violations = violations.len(),
            ?mode,
            "schema evaluation finished"
        );
        Ok(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bundled() -> (SchemaRegistry, SchemaEvaluator) {
        let registry = SchemaRegistry::bundled().unwrap();
        let evaluator = SchemaEvaluator::new(&registry);
        (registry, evaluator)
    }

    #[test]
    fn test_valid_minimal_stack() {
        let (registry, evaluator) = bundled();
        let document = registry.resolve("0.1.0").unwrap();
        let violations = evaluator
            .validate_document(&json!({ "name": "web" }), document, ValidationMode::CollectAll)
            .unwrap();
        assert!(violations.is_empty(), "{violations:?}");
    }

    #[test]
    fn test_collect_all_reports_every_violation() {
        let (registry, evaluator) = bundled();
        let document = registry.resolve("0.1.0").unwrap();
        let instance = json!({
            "description": 42,
            "repository": { "visibility": "secret" }
        });
        let violations = evaluator
            .validate_document(&instance, document, ValidationMode::CollectAll)
            .unwrap();
        // missing name, wrong description type, bad enum
        assert!(violations.len() >= 3, "{violations:?}");
    }

    #[test]
    fn test_fail_fast_reports_one() {
        let (registry, evaluator) = bundled();
        let document = registry.resolve("0.1.0").unwrap();
        let instance = json!({
            "description": 42,
            "repository": { "visibility": "secret" }
        });
        let violations = evaluator
            .validate_document(&instance, document, ValidationMode::FailFast)
            .unwrap();
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn test_additional_properties_rejected() {
        let (registry, evaluator) = bundled();
        let document = registry.resolve("0.1.0").unwrap();
        let instance = json!({ "name": "web", "colour": "blue" });
        let violations = evaluator
            .validate_document(&instance, document, ValidationMode::CollectAll)
            .unwrap();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("colour"), "{violations:?}");
    }

    #[test]
    fn test_validate_node_resolves_internal_refs() {
        let (registry, evaluator) = bundled();
        let document = registry.resolve("0.1.0").unwrap();
        let inputs_schema = document.schema_for(document.root(), &["inputs"]).unwrap();

        let good = json!([{ "name": "port", "type": "integer", "default": 80 }]);
        assert!(evaluator
            .validate_node(&good, document, inputs_schema, ValidationMode::CollectAll)
            .unwrap()
            .is_empty());

        let bad = json!([{ "name": "port", "type": "float" }]);
        let violations = evaluator
            .validate_node(&bad, document, inputs_schema, ValidationMode::CollectAll)
            .unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].instance_path, "/0/type");
    }

    #[test]
    fn test_invalid_schema_is_build_error() {
        let (_, evaluator) = bundled();
        let err = evaluator
            .validate(&json!(1), &json!({ "type": 12 }), "broken", ValidationMode::CollectAll)
            .unwrap_err();
        assert!(matches!(err, StackError::ValidatorBuild { .. }));
    }

    #[test]
    fn test_violation_display_format() {
        let v = Violation {
            instance_path: "/workflows/0/path".to_string(),
            schema_path: "/properties/workflows/items/properties/path/pattern".to_string(),
            message: r#""ci.yml" does not match "^\\.github/workflows/.+\\.ya?ml$""#.to_string(),
        };
        let display = v.to_string();
        assert!(display.starts_with("/workflows/0/path: "));
        assert!(display.contains("does not match"));
    }

    #[test]
    fn test_violation_display_root() {
        let v = Violation {
            instance_path: String::new(),
            schema_path: "/required".to_string(),
            message: r#""name" is a required property"#.to_string(),
        };
        assert!(v.to_string().starts_with("(root): "));
    }
}
