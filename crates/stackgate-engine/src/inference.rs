//! # Reference Type Inference
//!
//! Walks the template tree and the schema tree in lockstep. Wherever a
//! template leaf is exactly one `${{ inputs.NAME }}` placeholder, the schema
//! node at that position says what type `NAME` must have.
//!
//! ## Traversal
//!
//! The expected type of a schema node is its `type`, or `object` when it
//! has none.
//!
//! - `object`: the template node must be a mapping; each key is visited
//!   with [`SchemaDocument::schema_for`] of that key.
//! - `array`: the template node must be a sequence; each element is
//!   visited with the resolved `items` schema.
//! - anything else is a leaf.
//!
//! A shape mismatch is reported and that subtree is skipped; siblings are
//! still visited. The top-level `inputs` section is not walked.
//!
//! Placeholders with any other path shape (`${{ github.sha }}`,
//! `${{ inputs.a.b }}`) are ignored here and left to rendering and final
//! validation.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde_json::Value;
use stackgate_core::{class_name, ErrorKind, StackError, ValidationError};
use stackgate_schema::SchemaDocument;

use crate::loader::INPUTS_KEY;
use crate::render::PlaceholderSyntax;

const WRONG_TYPE_ERROR: &str = "Wrong type received";
const INCONSISTENT_REFERENCE_ERROR: &str = "Input referenced in multiple places with different types expected";

/// Outcome of [`infer_references`].
#[derive(Debug, Clone, Default)]
pub struct ReferenceInference {
    /// Findings, in traversal order.
    pub errors: Vec<ValidationError>,
    /// Inferred schema type per referenced input. Inputs referenced with
    /// conflicting types are absent.
    pub types: BTreeMap<String, String>,
    /// Every referenced input name, in first-seen order.
    pub referenced: Vec<String>,
}

/// Infer the expected type of every input reference in `template`.
///
/// # Errors
///
/// Returns `StackError::InvalidSchemaReference` if the template uses a key
/// the schema has no node for, or the schema itself has a broken `$ref` or
/// an `array` node without `items`.
pub fn infer_references(
    template: &Value,
    schema: &SchemaDocument,
    syntax: &PlaceholderSyntax,
) -> Result<ReferenceInference, StackError> {
    let mut walker = Walker {
        schema,
        syntax,
        path: Vec::new(),
        seen: HashSet::new(),
        conflicted: BTreeSet::new(),
        out: ReferenceInference::default(),
    };

    let root = schema.resolve_ref(schema.root())?;
    walker.visit(template, root, Some(INPUTS_KEY))?;

    let mut out = walker.out;
    for name in &walker.conflicted {
        out.types.remove(name);
    }
    tracing::debug!(
        referenced = out.referenced.len(),
        errors = out.errors.len(),
        "input references inferred"
    );
    Ok(out)
}

/// Name of the input a leaf refers to, if the leaf is exactly one
/// `inputs.NAME` placeholder.
pub fn input_reference<'t>(text: &'t str, syntax: &PlaceholderSyntax) -> Option<&'t str> {
    let inner = text
        .trim()
        .strip_prefix(syntax.open.as_str())?
        .strip_suffix(syntax.close.as_str())?
        .trim();

    let mut segments = inner.split('.');
    match (segments.next(), segments.next(), segments.next()) {
        (Some(INPUTS_KEY), Some(name), None) if !name.is_empty() => Some(name),
        _ => None,
    }
}

struct Walker<'a> {
    schema: &'a SchemaDocument,
    syntax: &'a PlaceholderSyntax,
    path: Vec<String>,
    seen: HashSet<String>,
    conflicted: BTreeSet<String>,
    out: ReferenceInference,
}

impl<'a> Walker<'a> {
    fn visit(&mut self, node: &Value, schema: &'a Value, skip_key: Option<&str>) -> Result<(), StackError> {
        match expected_type(schema).as_ref() {
            "object" => {
                let Value::Object(map) = node else {
                    self.wrong_type(node, "object");
                    return Ok(());
                };
                for (key, value) in map {
                    if skip_key == Some(key.as_str()) {
                        continue;
                    }
                    let child = self.schema.schema_for(schema, &[key.as_str()])?;
                    self.path.push(key.clone());
                    let visited = self.visit(value, child, None);
                    self.path.pop();
                    visited?;
                }
            }
            "array" => {
                let Value::Array(items) = node else {
                    self.wrong_type(node, "array");
                    return Ok(());
                };
                let item_schema = schema.get("items").ok_or_else(|| StackError::InvalidSchemaReference {
                    pointer: self.display_path(),
                    reason: "array schema has no 'items'".to_string(),
                })?;
                let item_schema = self.schema.resolve_ref(item_schema)?;
                for (index, item) in items.iter().enumerate() {
                    self.path.push(index.to_string());
                    let visited = self.visit(item, item_schema, None);
                    self.path.pop();
                    visited?;
                }
            }
            leaf_type => {
                if let Some(name) = node.as_str().and_then(|s| input_reference(s, self.syntax)) {
                    self.record(name, leaf_type);
                }
            }
        }
        Ok(())
    }

    fn record(&mut self, name: &str, leaf_type: &str) {
        if self.seen.insert(name.to_string()) {
            self.out.referenced.push(name.to_string());
        }
        if self.conflicted.contains(name) {
            return;
        }

        match self.out.types.get(name).cloned() {
            Some(previous) if previous != leaf_type => {
                self.out.errors.push(ValidationError::new(
                    ErrorKind::InconsistentReferenceType,
                    format!(
                        "{INCONSISTENT_REFERENCE_ERROR}: input => {name}, types => [{leaf_type}, {previous}]"
                    ),
                ));
                self.conflicted.insert(name.to_string());
            }
            _ => {
                self.out.types.insert(name.to_string(), leaf_type.to_string());
            }
        }
    }

    fn wrong_type(&mut self, node: &Value, expected: &str) {
        let received = match node {
            Value::Object(_) => "object",
            Value::Null => "null",
            other => class_name(other),
        };
        self.out.errors.push(ValidationError::new(
            ErrorKind::WrongType,
            format!(
                "{WRONG_TYPE_ERROR}: path => {}, received_type => {received}, expected_type => {expected}",
                self.display_path()
            ),
        ));
    }

    fn display_path(&self) -> String {
        if self.path.is_empty() {
            "(root)".to_string()
        } else {
            self.path.join(".")
        }
    }
}

/// The node's `type`, `object` when absent. Union types (`["a", "b"]`)
/// are leaves and are named by their JSON text.
fn expected_type(schema: &Value) -> Cow<'_, str> {
    match schema.get("type") {
        None => Cow::Borrowed("object"),
        Some(Value::String(s)) => Cow::Borrowed(s.as_str()),
        Some(other) => Cow::Owned(other.to_string()),
    }
}
