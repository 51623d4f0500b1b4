//! # Error Types: Terminal and Collected
//!
//! Defines the error types used throughout stackgate. All terminal errors
//! use `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - [`StackError`] aborts a run. No partial error list accompanies it.
//! - [`ValidationError`] is a finding. Findings accumulate in order and the
//!   run continues wherever the remaining stages can still reason about
//!   the document.
//! - The two never travel through the same channel: a function that can
//!   produce findings returns them in its `Ok` value.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;

/// Which of the two input documents a terminal error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// The stack template under validation.
    Template,
    /// The optional values document overriding input values.
    Values,
    /// The template after placeholder substitution.
    Rendered,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Template => f.write_str("stack template"),
            Self::Values => f.write_str("values document"),
            Self::Rendered => f.write_str("rendered template"),
        }
    }
}

/// A failure that prevents the engine from validating at all.
#[derive(Error, Debug)]
pub enum StackError {
    /// No template text was supplied.
    #[error("empty template given")]
    EmptyTemplate,

    /// A document is larger than its configured ceiling.
    #[error("{document} too big: {actual} bytes, should be at most {limit} bytes")]
    SizeExceeded {
        /// Which document was oversize.
        document: DocumentKind,
        /// Configured ceiling in bytes.
        limit: usize,
        /// Actual size in bytes.
        actual: usize,
    },

    /// The values document contains placeholder syntax.
    #[error("values document must not contain template expressions ('{token}')")]
    UnsafeValues {
        /// The placeholder-opening token that was found.
        token: String,
    },

    /// A document is not well-formed YAML, or has the wrong overall shape.
    #[error("invalid {document}: {reason}")]
    Parse {
        /// Which document failed to parse.
        document: DocumentKind,
        /// Parser message.
        reason: String,
    },

    /// The template names a schema version the registry does not hold.
    #[error("invalid schema version '{version}'")]
    SchemaVersion {
        /// The requested version string.
        version: String,
    },

    /// A `$ref` or property path inside the schema could not be followed.
    #[error("invalid schema reference '{pointer}': {reason}")]
    InvalidSchemaReference {
        /// The pointer or property path that failed.
        pointer: String,
        /// What was missing.
        reason: String,
    },

    /// The JSON Schema evaluator rejected the schema itself.
    #[error("validator build error for schema '{schema}': {reason}")]
    ValidatorBuild {
        /// Schema version or identifier.
        schema: String,
        /// Evaluator message.
        reason: String,
    },

    /// Engine configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Classification of a collected finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// JSON Schema violation, from the inputs check or the final check.
    SchemaViolation,
    /// The same input name is declared more than once.
    DuplicateInput,
    /// A `validvalues` entry does not match the declared input type.
    ValidValuesType,
    /// The `default` does not match the declared input type.
    DefaultType,
    /// The values-document override does not match the declared input type.
    ValuesOverrideType,
    /// A template node has the wrong shape for its schema position.
    WrongType,
    /// A placeholder references an input that is never declared.
    UndefinedInputReference,
    /// One input is referenced at positions expecting different types.
    InconsistentReferenceType,
    /// Placeholder substitution failed.
    Render,
}

impl ErrorKind {
    /// Stable identifier, used in logs and JSON output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SchemaViolation => "schema_violation",
            Self::DuplicateInput => "duplicate_input",
            Self::ValidValuesType => "valid_values_type",
            Self::DefaultType => "default_type",
            Self::ValuesOverrideType => "values_override_type",
            Self::WrongType => "wrong_type",
            Self::UndefinedInputReference => "undefined_input_reference",
            Self::InconsistentReferenceType => "inconsistent_reference_type",
            Self::Render => "render",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single reported finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// What kind of defect this is.
    pub kind: ErrorKind,
    /// Human-readable description, written to the error log verbatim.
    pub message: String,
}

impl ValidationError {
    /// Build a finding of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
