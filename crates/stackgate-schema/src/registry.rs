//! # Schema Registry
//!
//! Immutable stack schema documents keyed by exact version string.
//!
//! ## Schema Resolution
//!
//! Schemas are named `stack_schema-<version>.json`. The bundled registry
//! embeds every version shipped in the repository's `schemas/` directory;
//! [`SchemaRegistry::from_dir`] loads the same naming scheme from disk.
//!
//! Only internal references are understood here: a `$ref` must be a JSON
//! Pointer rooted at the document (`#/definitions/input`). Chained
//! references are followed, and a reference cycle is an error rather than
//! a hang.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde_json::Value;
use stackgate_core::StackError;
use thiserror::Error;

/// File name prefix of a versioned stack schema.
pub const SCHEMA_FILE_PREFIX: &str = "stack_schema-";
/// File name suffix of a versioned stack schema.
pub const SCHEMA_FILE_SUFFIX: &str = ".json";

/// Schema documents compiled into the binary, as `(version, source)`.
pub const BUNDLED_VERSIONS: &[(&str, &str)] = &[(
    "0.1.0",
    include_str!("../../../schemas/stack_schema-0.1.0.json"),
)];

/// Object keywords that belong to the document root and must not leak into
/// a sub-schema re-rooted by [`SchemaDocument::rooted`].
const ROOT_ASSERTION_KEYWORDS: &[&str] = &[
    "type",
    "properties",
    "required",
    "additionalProperties",
    "patternProperties",
    "propertyNames",
    "minProperties",
    "maxProperties",
    "dependencies",
    "allOf",
    "anyOf",
    "oneOf",
    "not",
    "if",
    "then",
    "else",
    "enum",
    "const",
];

/// Error while building a registry.
#[derive(Error, Debug)]
pub enum SchemaLoadError {
    /// A schema file or embedded source could not be parsed.
    #[error("schema load error for '{schema_name}': {reason}")]
    Load {
        /// Version or file name.
        schema_name: String,
        /// Reason the schema could not be loaded.
        reason: String,
    },

    /// IO error reading the schema directory.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One immutable, versioned schema tree.
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    version: String,
    root: Value,
}

impl SchemaDocument {
    pub fn new(version: impl Into<String>, root: Value) -> Self {
        Self {
            version: version.into(),
            root,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Follow an internal JSON Pointer (`#/a/b`) from the document root.
    ///
    /// # Errors
    ///
    /// Returns `StackError::InvalidSchemaReference` if the pointer does not
    /// start at the document root or any segment is absent.
    pub fn lookup(&self, pointer: &str) -> Result<&Value, StackError> {
        let mut segments = pointer.split('/');
        if segments.next() != Some("#") {
            return Err(invalid_ref(pointer, "pointer must start at the document root ('#')"));
        }

        let mut node = &self.root;
        for raw in segments {
            let segment = raw.replace("~1", "/").replace("~0", "~");
            node = match node {
                Value::Object(map) => map.get(&segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            }
            .ok_or_else(|| invalid_ref(pointer, &format!("segment '{segment}' not found")))?;
        }
        Ok(node)
    }

    /// Replace a `$ref` node by its target. Nodes without `$ref` are returned
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns `StackError::InvalidSchemaReference` for a non-internal or
    /// dangling pointer, or a reference cycle.
    pub fn resolve_ref<'a>(&'a self, node: &'a Value) -> Result<&'a Value, StackError> {
        let mut current = node;
        let mut visited: HashSet<&str> = HashSet::new();

        while let Some(reference) = current.get("$ref") {
            let pointer = reference
                .as_str()
                .ok_or_else(|| invalid_ref(&reference.to_string(), "$ref must be a string"))?;
            if !visited.insert(pointer) {
                return Err(invalid_ref(pointer, "reference cycle"));
            }
            current = self.lookup(pointer)?;
        }
        Ok(current)
    }

    /// Schema node for a property path below `parent`.
    ///
    /// Each step unwraps an `array` node through its `items`, resolves any
    /// `$ref`, then indexes `properties` by the next segment. A key absent
    /// from `properties` falls back to an object-valued
    /// `additionalProperties`. An empty path returns `parent` as given.
    ///
    /// # Errors
    ///
    /// Returns `StackError::InvalidSchemaReference` if an intermediate node
    /// is absent.
    pub fn schema_for<'a>(&'a self, parent: &'a Value, path: &[&str]) -> Result<&'a Value, StackError> {
        let mut current = parent;

        for (depth, segment) in path.iter().enumerate() {
            let walked = || path[..=depth].join(".");

            let container = if current.get("type").and_then(Value::as_str) == Some("array") {
                current
                    .get("items")
                    .ok_or_else(|| invalid_ref(&walked(), "array schema has no 'items'"))?
            } else {
                current
            };
            let container = self.resolve_ref(container)?;

            let child = container
                .get("properties")
                .and_then(|props| props.get(*segment))
                .or_else(|| container.get("additionalProperties").filter(|a| a.is_object()))
                .ok_or_else(|| invalid_ref(&walked(), &format!("undefined key '{segment}'")))?;

            current = self.resolve_ref(child)?;
        }

        Ok(current)
    }

    /// A standalone schema equal to `node`, but carrying this document's
    /// identity and definitions, so internal `$ref`s inside `node` still
    /// resolve when it is compiled on its own.
    pub fn rooted(&self, node: &Value) -> Value {
        let Value::Object(root) = &self.root else {
            return node.clone();
        };

        let mut rooted = root.clone();
        for keyword in ROOT_ASSERTION_KEYWORDS {
            rooted.remove(*keyword);
        }
        match node {
            Value::Object(sub) => {
                for (key, value) in sub {
                    rooted.insert(key.clone(), value.clone());
                }
            }
            // Boolean schemas: `true` accepts anything, `false` nothing.
            Value::Bool(false) => {
                rooted.insert("not".to_string(), Value::Object(Default::default()));
            }
            _ => {}
        }
        Value::Object(rooted)
    }
}

fn invalid_ref(pointer: &str, reason: &str) -> StackError {
    StackError::InvalidSchemaReference {
        pointer: pointer.to_string(),
        reason: reason.to_string(),
    }
}

/// Version-keyed collection of [`SchemaDocument`]s.
///
/// Built once and never mutated afterwards; share it behind an `Arc`
/// across concurrent validation runs.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    documents: BTreeMap<String, SchemaDocument>,
}

impl SchemaRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every schema version compiled into the binary.
    ///
    /// # Errors
    ///
    /// Returns `SchemaLoadError::Load` if an embedded schema is not valid JSON.
    pub fn bundled() -> Result<Self, SchemaLoadError> {
        let mut registry = Self::new();
        for (version, source) in BUNDLED_VERSIONS {
            let root: Value = serde_json::from_str(source).map_err(|e| SchemaLoadError::Load {
                schema_name: (*version).to_string(),
                reason: format!("invalid JSON: {e}"),
            })?;
            registry.register(*version, root);
        }
        Ok(registry)
    }

    /// Load every `stack_schema-<version>.json` file in `dir`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaLoadError::Load` if the directory cannot be read or a
    /// schema file is not valid JSON.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, SchemaLoadError> {
        let dir = dir.as_ref();
        let mut registry = Self::new();

        let entries = std::fs::read_dir(dir).map_err(|e| SchemaLoadError::Load {
            schema_name: dir.display().to_string(),
            reason: format!("cannot read schema directory: {e}"),
        })?;

        for entry in entries {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(version) = name
                .strip_prefix(SCHEMA_FILE_PREFIX)
                .and_then(|rest| rest.strip_suffix(SCHEMA_FILE_SUFFIX))
            else {
                continue;
            };

            let content = std::fs::read_to_string(&path)?;
            let root: Value = serde_json::from_str(&content).map_err(|e| SchemaLoadError::Load {
                schema_name: name.to_string(),
                reason: format!("invalid JSON: {e}"),
            })?;
            tracing::debug!(version, path = %path.display(), "loaded stack schema");
            registry.register(version, root);
        }

        Ok(registry)
    }

    /// Add or replace the document for `version`.
    pub fn register(&mut self, version: impl Into<String>, root: Value) {
        let version = version.into();
        self.documents
            .insert(version.clone(), SchemaDocument::new(version, root));
    }

    /// Exact-match lookup.
    ///
    /// # Errors
    ///
    /// Returns `StackError::SchemaVersion` if no document is registered
    /// under `version`.
    pub fn resolve(&self, version: &str) -> Result<&SchemaDocument, StackError> {
        self.documents
            .get(version)
            .ok_or_else(|| StackError::SchemaVersion {
                version: version.to_string(),
            })
    }

    /// Registered versions, sorted.
    pub fn versions(&self) -> Vec<&str> {
        self.documents.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub(crate) fn documents(&self) -> impl Iterator<Item = &SchemaDocument> {
        self.documents.values()
    }
}
