//! # Validation Pipeline
//!
//! [`StackValidator`] owns the read-only pieces a run needs (schema
//! registry, evaluator, renderer, configuration) and runs the stages in
//! order for each template.
//!
//! ## Thread Safety
//!
//! `StackValidator` is `Send + Sync`. Every run owns its documents and
//! working maps; the registry is shared behind an `Arc` and never written.

use std::sync::Arc;

use serde_json::{json, Value};
use stackgate_core::{EngineConfig, ErrorKind, StackError, ValidationError};
use stackgate_schema::{SchemaEvaluator, SchemaRegistry};

use crate::finalize::validate_rendered;
use crate::inference::infer_references;
use crate::inputs::validate_inputs;
use crate::loader::{load, LoadedStack, INPUTS_KEY};
use crate::render::{PlaceholderSyntax, TemplateRenderer};
use crate::synthesize::synthesize_defaults;

/// Validates stack templates against a registry of stack schemas.
#[derive(Debug)]
pub struct StackValidator {
    registry: Arc<SchemaRegistry>,
    evaluator: SchemaEvaluator,
    renderer: TemplateRenderer,
    syntax: PlaceholderSyntax,
    config: EngineConfig,
}

impl StackValidator {
    /// Build a validator.
    ///
    /// # Errors
    ///
    /// Returns `StackError::Config` if the configured placeholder delimiters
    /// are unusable.
    pub fn new(registry: Arc<SchemaRegistry>, config: EngineConfig) -> Result<Self, StackError> {
        let syntax = PlaceholderSyntax::from_config(&config);
        let renderer = TemplateRenderer::new(&syntax, config.strict_render)?;
        let evaluator = SchemaEvaluator::new(&registry);
        Ok(Self {
            registry,
            evaluator,
            renderer,
            syntax,
            config,
        })
    }

    /// Schema versions this validator can check templates against.
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Configuration the validator was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate a template and optional values document.
    ///
    /// Returns the findings, in the order the stages produced them; an empty
    /// vector means the template passed.
    ///
    /// # Errors
    ///
    /// Returns a terminal `StackError` when the documents cannot be
    /// validated at all: empty or oversize input, malformed YAML, unsafe
    /// values, unknown schema version, or a schema reference that cannot be
    /// followed.
    pub fn validate(
        &self,
        template: Option<&str>,
        values: Option<&str>,
    ) -> Result<Vec<ValidationError>, StackError> {
        match self.run(template, values) {
            Ok(errors) => {
                tracing::info!(
                    errors = errors.len(),
                    passed = errors.is_empty(),
                    "stack validation finished"
                );
                Ok(errors)
            }
            Err(e) => {
                tracing::warn!(error = %e, "stack validation aborted");
                Err(e)
            }
        }
    }

    fn run(
        &self,
        template: Option<&str>,
        values: Option<&str>,
    ) -> Result<Vec<ValidationError>, StackError> {
        let loaded = load(template, values, &self.registry, &self.config)?;
        let LoadedStack { template, schema, .. } = &loaded;

        let github_apps = template
            .github_apps()
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        tracing::debug!(github_apps, "checking input definitions");
        let mut resolution = validate_inputs(
            template.inputs(),
            &loaded.overrides(),
            schema,
            &self.evaluator,
            &self.config,
        )?;
        if !resolution.errors.is_empty() {
            return Ok(resolution.errors);
        }

        let inference = infer_references(template.tree(), schema, &self.syntax)?;
        let mut errors = inference.errors.clone();
        errors.extend(synthesize_defaults(&mut resolution, &inference, &self.config));
        if !errors.is_empty() {
            return Ok(errors);
        }

        let context = json!({ INPUTS_KEY: resolution.resolved });
        let rendered = match self.renderer.render(template.sanitized(), &context) {
            Ok(rendered) => rendered,
            Err(e) => return Ok(vec![ValidationError::new(ErrorKind::Render, e.to_string())]),
        };

        validate_rendered(&rendered, schema, &self.evaluator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> StackValidator {
        StackValidator::new(
            Arc::new(SchemaRegistry::bundled().unwrap()),
            EngineConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_minimal_template_passes() {
        assert!(validator().validate(Some("name: web\n"), None).unwrap().is_empty());
    }

    #[test]
    fn test_validator_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StackValidator>();
    }

    #[test]
    fn test_accessors_reflect_construction() {
        let config = EngineConfig {
            strict_render: false,
            ..EngineConfig::default()
        };
        let validator = StackValidator::new(Arc::new(SchemaRegistry::bundled().unwrap()), config).unwrap();
        assert!(!validator.config().strict_render);
        assert!(validator.registry().versions().contains(&validator.config().default_schema_version.as_str()));
    }

    #[test]
    fn test_empty_template_is_terminal() {
        assert!(matches!(
            validator().validate(None, None),
            Err(StackError::EmptyTemplate)
        ));
    }
}
