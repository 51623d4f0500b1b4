//! # stackgate-schema: Schema Registry & Evaluation
//!
//! Holds the versioned stack schemas and everything that reads them.
//!
//! ## Registry (`registry`)
//!
//! [`SchemaRegistry`] maps exact version strings to immutable
//! [`SchemaDocument`]s. It is built once, then shared read-only across any
//! number of validation runs. [`SchemaDocument::resolve_ref`] follows
//! internal `#/...` pointers, and [`SchemaDocument::schema_for`] walks a
//! property path down the schema the way a template is walked down its
//! keys.
//!
//! ## Evaluation (`validate`)
//!
//! [`SchemaEvaluator`] compiles a schema node with the `jsonschema` crate
//! and checks an instance against it, either stopping at the first
//! violation or collecting every one.
//!
//! ## YAML (`yaml`)
//!
//! Stack templates are YAML; schemas and evaluation are JSON. [`parse_yaml`]
//! parses text and converts it into the equivalent `serde_json::Value` tree.
//!
//! ## Crate Policy
//!
//! - Depends only on `stackgate-core` internally.
//! - Schema documents are never mutated after registration.
//! - The evaluator never touches the network: unknown `$ref` URIs resolve
//!   against registered documents only.

pub mod registry;
pub mod validate;
pub mod yaml;

pub use registry::{SchemaDocument, SchemaLoadError, SchemaRegistry, BUNDLED_VERSIONS};
pub use validate::{SchemaEvaluator, ValidationMode, Violation};
pub use yaml::{parse_yaml, yaml_to_json_value};
