//! # Template and Values Loading
//!
//! Turns raw text into the documents a run works on, and picks the schema
//! the template declares. Every failure here is terminal: the engine cannot
//! reason about a document it cannot read.
//!
//! Check order: empty template, template size, values size, values safety,
//! template parse, values parse, schema version.

use serde_json::{Map, Value};
use stackgate_core::{DocumentKind, EngineConfig, StackError};
use stackgate_schema::{parse_yaml, SchemaDocument, SchemaRegistry};

use crate::sanitize::sanitize;

/// Top-level template key holding input definitions.
pub const INPUTS_KEY: &str = "inputs";
/// Top-level template key holding GitHub App declarations.
pub const GITHUB_APPS_KEY: &str = "github-apps";
/// Top-level template key naming the schema version.
pub const SCHEMA_VERSION_KEY: &str = "stack_schema_version";

/// A parsed stack template.
///
/// `sanitized` and `tree` are both derived from `source` at construction
/// and never change afterwards.
#[derive(Debug, Clone)]
pub struct StackTemplate {
    source: String,
    sanitized: String,
    tree: Value,
}

impl StackTemplate {
    /// Raw template text as supplied.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Template text with comments stripped; this is what gets rendered.
    pub fn sanitized(&self) -> &str {
        &self.sanitized
    }

    /// Parsed template.
    pub fn tree(&self) -> &Value {
        &self.tree
    }

    /// The `inputs` section, if present.
    pub fn inputs(&self) -> Option<&Value> {
        self.tree.get(INPUTS_KEY)
    }

    /// The `github-apps` section, if present.
    pub fn github_apps(&self) -> Option<&Value> {
        self.tree.get(GITHUB_APPS_KEY)
    }

    /// Declared schema version, or `None` when the key is absent.
    ///
    /// Non-string versions are stringified so they fail the registry lookup
    /// with a readable name instead of being ignored.
    pub fn schema_version(&self) -> Option<String> {
        self.tree.get(SCHEMA_VERSION_KEY).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// A parsed values document: input overrides nested under `inputs`.
#[derive(Debug, Clone, Default)]
pub struct ValuesDocument {
    inputs: Map<String, Value>,
}

impl ValuesDocument {
    /// Override values keyed by input name.
    pub fn inputs(&self) -> &Map<String, Value> {
        &self.inputs
    }

    fn from_tree(tree: Value) -> Result<Self, StackError> {
        let shape_error = |reason: &str| StackError::Parse {
            document: DocumentKind::Values,
            reason: reason.to_string(),
        };

        let mut root = match tree {
            Value::Null => return Ok(Self::default()),
            Value::Object(map) => map,
            _ => return Err(shape_error("document root must be a mapping")),
        };

        match root.remove(INPUTS_KEY) {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(Value::Object(inputs)) => Ok(Self { inputs }),
            Some(_) => Err(shape_error("'inputs' must be a mapping of input names to values")),
        }
    }
}

/// Everything a run needs after loading.
#[derive(Debug)]
pub struct LoadedStack<'r> {
    pub template: StackTemplate,
    pub values: Option<ValuesDocument>,
    pub schema: &'r SchemaDocument,
}

impl LoadedStack<'_> {
    /// Override values, empty when there is no values document.
    pub fn overrides(&self) -> Map<String, Value> {
        self.values
            .as_ref()
            .map(|v| v.inputs().clone())
            .unwrap_or_default()
    }
}

/// Load a template and optional values document.
///
/// # Errors
///
/// - `StackError::EmptyTemplate` if the template is absent or blank.
/// - `StackError::SizeExceeded` if either document is over its ceiling.
/// - `StackError::UnsafeValues` if the values text contains the placeholder
///   opening token.
/// - `StackError::Parse` if either document is not well-formed YAML, or the
///   values document is not shaped as `inputs: {name: value}`.
/// - `StackError::SchemaVersion` if the declared (or default) schema version
///   is not registered.
pub fn load<'r>(
    template_text: Option<&str>,
    values_text: Option<&str>,
    registry: &'r SchemaRegistry,
    config: &EngineConfig,
) -> Result<LoadedStack<'r>, StackError> {
    let template_text = template_text
        .filter(|t| !t.trim().is_empty())
        .ok_or(StackError::EmptyTemplate)?;

    check_size(template_text, DocumentKind::Template, config.max_template_bytes)?;
    if let Some(values_text) = values_text {
        check_size(values_text, DocumentKind::Values, config.max_values_bytes)?;
        if values_text.contains(config.placeholder_open.as_str()) {
            return Err(StackError::UnsafeValues {
                token: config.placeholder_open.clone(),
            });
        }
    }

    let tree = parse_yaml(template_text, DocumentKind::Template)?;
    let template = StackTemplate {
        source: template_text.to_string(),
        sanitized: sanitize(template_text),
        tree,
    };

    let values = values_text
        .map(|text| parse_yaml(text, DocumentKind::Values).and_then(ValuesDocument::from_tree))
        .transpose()?;

    let version = template
        .schema_version()
        .unwrap_or_else(|| config.default_schema_version.clone());
    let schema = registry.resolve(&version)?;

    tracing::debug!(
        schema_version = %version,
        template_bytes = template_text.len(),
        overrides = values.as_ref().map_or(0, |v| v.inputs().len()),
        "stack documents loaded"
    );

    Ok(LoadedStack {
        template,
        values,
        schema,
    })
}

fn check_size(text: &str, document: DocumentKind, limit: usize) -> Result<(), StackError> {
    if text.len() > limit {
        return Err(StackError::SizeExceeded {
            document,
            limit,
            actual: text.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::bundled().unwrap()
    }

    #[test]
    fn test_missing_template_is_empty() {
        let err = load(None, None, &registry(), &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, StackError::EmptyTemplate));
    }

    #[test]
    fn test_blank_template_is_empty() {
        let err = load(Some("  \n"), None, &registry(), &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, StackError::EmptyTemplate));
    }

    #[test]
    fn test_oversize_template() {
        let text = format!("name: {}\n", "x".repeat(100 * 1024));
        let err = load(Some(&text), None, &registry(), &EngineConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            StackError::SizeExceeded { document: DocumentKind::Template, .. }
        ));
    }

    #[test]
    fn test_oversize_values() {
        let values = format!("inputs:\n  a: {}\n", "x".repeat(10 * 1024));
        let err = load(Some("name: web\n"), Some(&values), &registry(), &EngineConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            StackError::SizeExceeded { document: DocumentKind::Values, .. }
        ));
    }

    #[test]
    fn test_values_with_placeholder_rejected_before_parsing() {
        // Not valid YAML either; the safety rule fires first.
        let values = "inputs: [ ${{ inputs.other }}";
        let err = load(Some("name: web\n"), Some(values), &registry(), &EngineConfig::default())
            .unwrap_err();
        assert!(matches!(err, StackError::UnsafeValues { .. }));
    }

    #[test]
    fn test_invalid_template_yaml() {
        let err = load(Some("name: [web\n"), None, &registry(), &EngineConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            StackError::Parse { document: DocumentKind::Template, .. }
        ));
    }

    #[test]
    fn test_values_inputs_must_be_mapping() {
        let err = load(
            Some("name: web\n"),
            Some("inputs:\n  - port\n"),
            &registry(),
            &EngineConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            StackError::Parse { document: DocumentKind::Values, .. }
        ));
    }

    #[test]
    fn test_unknown_schema_version() {
        let err = load(
            Some("stack_schema_version: \"2.0.0\"\nname: web\n"),
            None,
            &registry(),
            &EngineConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, StackError::SchemaVersion { ref version } if version == "2.0.0"));
    }

    #[test]
    fn test_default_schema_version_applies() {
        let registry = registry();
        let loaded = load(Some("name: web\n"), None, &registry, &EngineConfig::default()).unwrap();
        assert_eq!(loaded.schema.version(), "0.1.0");
        assert!(loaded.values.is_none());
    }

    #[test]
    fn test_sections_and_overrides() {
        let registry = registry();
        let template = "name: web # comment\ninputs:\n  - name: port\ngithub-apps:\n  - name: bot\n";
        let loaded = load(
            Some(template),
            Some("inputs:\n  port: 8080\n"),
            &registry,
            &EngineConfig::default(),
        )
        .unwrap();

        assert_eq!(loaded.template.inputs(), Some(&json!([{ "name": "port" }])));
        assert_eq!(loaded.template.github_apps(), Some(&json!([{ "name": "bot" }])));
        assert_eq!(loaded.template.sanitized(), "name: web\ninputs:\n  - name: port\ngithub-apps:\n  - name: bot\n");
        assert_eq!(loaded.template.source(), template);
        assert_eq!(loaded.overrides().get("port"), Some(&json!(8080)));
    }

    #[test]
    fn test_empty_values_document_has_no_overrides() {
        let registry = registry();
        let loaded = load(Some("name: web\n"), Some(""), &registry, &EngineConfig::default()).unwrap();
        assert!(loaded.overrides().is_empty());
    }
}
