//! # Input Definition Validation
//!
//! Checks the template's `inputs` section and works out a value for each
//! input where one can be known without looking at how it is used.
//!
//! ## Value Priority
//!
//! Lowest to highest, each only replacing the previous when present:
//!
//! 1. the canonical value for the declared `type` (none for `array`),
//! 2. the first `validvalues` entry,
//! 3. the `default` field,
//! 4. the override from the values document.
//!
//! Every source present is type-checked against the declared `type`
//! independently, so a mismatching `default` is reported even when an
//! override shadows it.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use stackgate_core::{class_name, EngineConfig, ErrorKind, InputType, StackError, ValidationError};
use stackgate_schema::{SchemaDocument, SchemaEvaluator, ValidationMode};

use crate::loader::INPUTS_KEY;

const INPUT_MULTIPLE_DECLARATION_ERROR: &str = "Input has multiple declarations";
const VALID_VALUES_MATCH_ERROR: &str = "Valid value type doesn't match input type";
const DEFAULT_VALUE_MATCH_ERROR: &str = "Default value type doesn't match input type";
const VALUES_MATCH_ERROR: &str = "values.yml value doesn't match input type";
const INPUT_SCHEMA_ERROR: &str = "Invalid input definition";

/// One entry of the `inputs` section.
///
/// Built leniently from the raw tree after the section has passed the
/// schema check. `default` distinguishes an explicit `null` (`Some(Null)`)
/// from an absent key (`None`).
#[derive(Debug, Clone, PartialEq)]
pub struct InputDefinition {
    pub name: String,
    pub declared_type: Option<String>,
    pub default: Option<Value>,
    pub valid_values: Option<Vec<Value>>,
}

impl InputDefinition {
    pub fn from_value(value: &Value) -> Self {
        let name = match value.get("name") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        Self {
            name,
            declared_type: value.get("type").and_then(Value::as_str).map(str::to_string),
            default: value.get("default").cloned(),
            valid_values: value.get("validvalues").and_then(Value::as_array).cloned(),
        }
    }

    /// Canonical value for the declared type, if it has one.
    fn type_default(&self, string_sentinel: &str) -> Option<Value> {
        self.declared_type
            .as_deref()
            .and_then(|t| t.parse::<InputType>().ok())
            .and_then(|t| t.placeholder(string_sentinel))
    }

    /// `Some((received, expected))` when `value` does not match the
    /// declared type. Always `None` for untyped inputs.
    fn mismatch(&self, value: &Value) -> Option<(&'static str, &str)> {
        let expected = self.declared_type.as_deref()?;
        let received = class_name(value);
        (received != expected).then_some((received, expected))
    }
}

/// Outcome of [`validate_inputs`].
#[derive(Debug, Clone, Default)]
pub struct InputResolution {
    /// Findings, in declaration order.
    pub errors: Vec<ValidationError>,
    /// Every declared input name.
    pub declared: BTreeSet<String>,
    /// Render context for `inputs`: every override, plus every input whose
    /// value could be established.
    pub resolved: Map<String, Value>,
    /// Declared inputs with no value from any source.
    pub unresolved: BTreeSet<String>,
}

/// Validate the `inputs` section and resolve input values.
///
/// `section` is the raw `inputs` node (`None` or `null` means no inputs).
/// When the section violates the schema, only those violations are
/// returned and no per-input checks run.
///
/// # Errors
///
/// Returns a terminal `StackError` if the schema has no usable `inputs`
/// node or it cannot be compiled.
pub fn validate_inputs(
    section: Option<&Value>,
    overrides: &Map<String, Value>,
    schema: &SchemaDocument,
    evaluator: &SchemaEvaluator,
    config: &EngineConfig,
) -> Result<InputResolution, StackError> {
    let empty = Value::Array(Vec::new());
    let section = match section {
        None | Some(Value::Null) => &empty,
        Some(value) => value,
    };

    let mut resolution = InputResolution {
        resolved: overrides.clone(),
        ..InputResolution::default()
    };

    let inputs_schema = schema.schema_for(schema.root(), &[INPUTS_KEY])?;
    let violations = evaluator.validate_node(section, schema, inputs_schema, ValidationMode::CollectAll)?;
    if !violations.is_empty() {
        resolution.errors = violations
            .into_iter()
            .map(|v| ValidationError::new(ErrorKind::SchemaViolation, format!("{INPUT_SCHEMA_ERROR}: {v}")))
            .collect();
        tracing::debug!(errors = resolution.errors.len(), "inputs section violates schema");
        return Ok(resolution);
    }

    let definitions = section.as_array().map(Vec::as_slice).unwrap_or_default();
    for raw in definitions {
        resolve_one(&InputDefinition::from_value(raw), overrides, config, &mut resolution);
    }

    tracing::debug!(
        declared = resolution.declared.len(),
        unresolved = resolution.unresolved.len(),
        errors = resolution.errors.len(),
        "input definitions checked"
    );
    Ok(resolution)
}

fn resolve_one(
    input: &InputDefinition,
    overrides: &Map<String, Value>,
    config: &EngineConfig,
    resolution: &mut InputResolution,
) {
    let name = &input.name;
    if !resolution.declared.insert(name.clone()) {
        resolution.errors.push(ValidationError::new(
            ErrorKind::DuplicateInput,
            format!("{INPUT_MULTIPLE_DECLARATION_ERROR} - {name}"),
        ));
    }

    let mut value = input.type_default(&config.string_sentinel);

    if let Some(valid_values) = &input.valid_values {
        for valid_value in valid_values {
            if let Some((received, expected)) = input.mismatch(valid_value) {
                resolution.errors.push(ValidationError::new(
                    ErrorKind::ValidValuesType,
                    format!(
                        "{VALID_VALUES_MATCH_ERROR}: input => {name}, valid_value => {valid_value}, \
                         received_type => {received}, expected_type => {expected}"
                    ),
                ));
            }
        }
        if let Some(first) = valid_values.first().filter(|v| !v.is_null()) {
            value = Some(first.clone());
        }
    }

    if let Some(default) = &input.default {
        if let Some((received, expected)) = input.mismatch(default) {
            resolution.errors.push(ValidationError::new(
                ErrorKind::DefaultType,
                format!(
                    "{DEFAULT_VALUE_MATCH_ERROR}: input => {name}, \
                     received_type => {received}, expected_type => {expected}"
                ),
            ));
        }
        if !default.is_null() {
            value = Some(default.clone());
        }
    }

    if let Some(override_value) = overrides.get(name) {
        if let Some((received, expected)) = input.mismatch(override_value) {
            resolution.errors.push(ValidationError::new(
                ErrorKind::ValuesOverrideType,
                format!(
                    "{VALUES_MATCH_ERROR}: input => {name}, \
                     received_type => {received}, expected_type => {expected}"
                ),
            ));
        }
        if !override_value.is_null() {
            value = Some(override_value.clone());
        }
    }

    match value {
        Some(value) => {
            resolution.unresolved.remove(name);
            resolution.resolved.insert(name.clone(), value);
        }
        // An earlier declaration of the same name may already have a value.
        None if !resolution.resolved.get(name).is_some_and(|v| !v.is_null()) => {
            resolution.unresolved.insert(name.clone());
        }
        None => {}
    }
}
