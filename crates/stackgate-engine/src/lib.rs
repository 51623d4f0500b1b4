//! # stackgate-engine: Stack Template Validation
//!
//! Validates a stack template, and optionally a values document, against
//! the versioned stack schema. A run is a fixed pipeline:
//!
//! 1. **Load** ([`loader`]): size ceilings, values safety, YAML parsing,
//!    schema version selection. All failures here are terminal.
//! 2. **Input definitions** ([`inputs`]): schema-check the `inputs`
//!    section, detect duplicates and type mismatches, merge each input's
//!    value from type default, `validvalues`, `default` and overrides.
//! 3. **Reference inference** ([`inference`]): walk the template and the
//!    schema together, inferring the expected type of every
//!    `${{ inputs.NAME }}` reference from the schema node it sits under.
//! 4. **Default synthesis** ([`synthesize`]): give still-unvalued inputs a
//!    stand-in value of their inferred type; flag undeclared references.
//! 5. **Render** ([`render`]): substitute placeholders in the
//!    comment-stripped ([`sanitize`]) template text.
//! 6. **Final validation** ([`finalize`]): re-parse the rendered text and
//!    check the whole document against the schema, collecting every
//!    violation.
//!
//! A stage that reports findings stops the pipeline before the next one.
//! [`StackValidator`] composes the stages.
//!
//! ## Crate Policy
//!
//! - Terminal failures are `Err(StackError)`; findings are the `Ok` vector.
//! - Nothing is global: the schema registry and configuration are passed
//!   in at construction and only read afterwards.

pub mod finalize;
pub mod inference;
pub mod inputs;
pub mod loader;
pub mod pipeline;
pub mod render;
pub mod sanitize;
pub mod synthesize;

pub use inference::{infer_references, ReferenceInference};
pub use inputs::{validate_inputs, InputDefinition, InputResolution};
pub use loader::{load, LoadedStack, StackTemplate, ValuesDocument};
pub use pipeline::StackValidator;
pub use render::{PlaceholderSyntax, RenderError, TemplateRenderer};
pub use sanitize::sanitize;
pub use synthesize::synthesize_defaults;
