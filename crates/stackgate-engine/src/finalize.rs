//! Whole-document schema validation of the rendered template.

use stackgate_core::{DocumentKind, ErrorKind, StackError, ValidationError};
use stackgate_schema::{parse_yaml, SchemaDocument, SchemaEvaluator, ValidationMode};

/// Parse `rendered` and check it against the whole schema, collecting
/// every violation.
///
/// Rendered text that no longer parses (a substituted value broke the
/// YAML) is a finding, not a terminal failure.
///
/// # Errors
///
/// Returns `StackError::ValidatorBuild` if the schema cannot be compiled.
pub fn validate_rendered(
    rendered: &str,
    schema: &SchemaDocument,
    evaluator: &SchemaEvaluator,
) -> Result<Vec<ValidationError>, StackError> {
    let document = match parse_yaml(rendered, DocumentKind::Rendered) {
        Ok(document) => document,
        Err(StackError::Parse { reason, .. }) => {
            return Ok(vec![ValidationError::new(
                ErrorKind::SchemaViolation,
                format!("rendered template is not valid YAML: {reason}"),
            )]);
        }
        Err(other) => return Err(other),
    };

    let violations = evaluator.validate_document(&document, schema, ValidationMode::CollectAll)?;
    Ok(violations
        .into_iter()
        .map(|v| ValidationError::new(ErrorKind::SchemaViolation, v.to_string()))
        .collect())
}
