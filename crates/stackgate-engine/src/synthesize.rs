//! Stand-in values for inputs known only by usage.

use stackgate_core::{EngineConfig, ErrorKind, InputType, ValidationError};

use crate::inference::ReferenceInference;
use crate::inputs::InputResolution;

const UNDEFINED_INPUT_ERROR: &str = "Undefined input referenced";

/// Give every unresolved, referenced input the canonical value of its
/// inferred type, and report references to undeclared inputs.
///
/// `array` and non-input schema types (`number`, unions) get no value;
/// such inputs stay unresolved and fail the strict render.
pub fn synthesize_defaults(
    resolution: &mut InputResolution,
    inference: &ReferenceInference,
    config: &EngineConfig,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for name in &inference.referenced {
        if !resolution.declared.contains(name) {
            errors.push(ValidationError::new(
                ErrorKind::UndefinedInputReference,
                format!("{UNDEFINED_INPUT_ERROR} - {name}"),
            ));
        }

        if !resolution.unresolved.contains(name) {
            continue;
        }
        let placeholder = inference
            .types
            .get(name)
            .and_then(|t| t.parse::<InputType>().ok())
            .and_then(|t| t.placeholder(&config.string_sentinel));
        if let Some(value) = placeholder {
            tracing::debug!(input = %name, %value, "synthesized input value");
            resolution.unresolved.remove(name);
            resolution.resolved.insert(name.clone(), value);
        }
    }

    errors
}
