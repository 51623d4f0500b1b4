//! # Input Types: Canonical Value Classification
//!
//! Inputs declare one of four types. Concrete values (defaults, valid
//! values, overrides) are checked against the declaration by running them
//! through [`classify`], a closed mapping from JSON value shape to
//! [`InputType`].
//!
//! ## Coercion Rule
//!
//! Floating-point numbers classify as [`InputType::Integer`]. There is no
//! separate number type for inputs, so `3.5` passes an `integer` check.
//! Null and mappings have no input type and classify as `None`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The declared type of a stack input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Integer,
    String,
    Boolean,
    Array,
}

impl InputType {
    /// The spelling used in templates and schemas.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Array => "array",
        }
    }

    /// Canonical stand-in value used to render an input whose value is
    /// otherwise unknown. Arrays have none.
    pub fn placeholder(&self, string_sentinel: &str) -> Option<Value> {
        match self {
            Self::Integer => Some(Value::from(0)),
            Self::String => Some(Value::String(string_sentinel.to_string())),
            Self::Boolean => Some(Value::Bool(false)),
            Self::Array => None,
        }
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "integer" => Ok(Self::Integer),
            "string" => Ok(Self::String),
            "boolean" => Ok(Self::Boolean),
            "array" => Ok(Self::Array),
            other => Err(format!("unknown input type '{other}'")),
        }
    }
}

/// Classify a concrete value. Floats classify as integers.
pub fn classify(value: &Value) -> Option<InputType> {
    match value {
        Value::Number(_) => Some(InputType::Integer),
        Value::String(_) => Some(InputType::String),
        Value::Bool(_) => Some(InputType::Boolean),
        Value::Array(_) => Some(InputType::Array),
        Value::Null | Value::Object(_) => None,
    }
}

/// Name of a value's class for error messages; `"invalid"` when it has none.
pub fn class_name(value: &Value) -> &'static str {
    classify(value).map_or("invalid", |t| t.as_str())
}
