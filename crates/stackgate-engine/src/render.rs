//! # Placeholder Rendering
//!
//! Substitutes `${{ path }}` placeholders in template text using a
//! minijinja environment whose delimiters are reconfigured, so plain
//! `{{ ... }}` elsewhere in the document (workflow snippets, other
//! templating) is left alone.
//!
//! Block and comment tags are moved behind the same `$` prefix for the
//! same reason.
//!
//! ## Paths and Output
//!
//! Placeholder paths are dotted key lookups. Keys may contain `-`
//! (`inputs.team-name`), which the expression parser would read as a
//! subtraction, so such paths are rewritten to subscript form
//! (`inputs["team-name"]`) before rendering.
//!
//! Values are written as YAML scalars: `true`/`false`, numbers as-is,
//! strings verbatim, sequences and mappings as JSON flow collections, and
//! null as empty text.

use std::borrow::Cow;
use std::fmt::Write as _;

use minijinja::syntax::SyntaxConfig;
use minijinja::{Environment, Output, State, UndefinedBehavior};
use serde_json::Value;
use stackgate_core::{ConfigError, EngineConfig, StackError};
use thiserror::Error;

/// Open/close delimiter pair for placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderSyntax {
    pub open: String,
    pub close: String,
}

impl Default for PlaceholderSyntax {
    fn default() -> Self {
        let config = EngineConfig::default();
        Self::from_config(&config)
    }
}

impl PlaceholderSyntax {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            open: config.placeholder_open.clone(),
            close: config.placeholder_close.clone(),
        }
    }
}

/// Why a render failed.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Strict mode: a placeholder path is not in the context.
    #[error("undefined placeholder value: {0}")]
    ContextMiss(String),

    /// Malformed placeholder expression or other engine error.
    #[error("template render failed: {0}")]
    Template(String),
}

/// Renders template text against a JSON context.
pub struct TemplateRenderer {
    env: Environment<'static>,
    syntax: PlaceholderSyntax,
}

impl std::fmt::Debug for TemplateRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRenderer").finish_non_exhaustive()
    }
}

impl TemplateRenderer {
    /// Build a renderer for `syntax`.
    ///
    /// In `strict` mode a missing context path fails the render; otherwise it
    /// renders as empty text.
    ///
    /// # Errors
    ///
    /// Returns `StackError::Config` if the delimiters are rejected by the
    /// template engine (empty, or clashing with each other).
    pub fn new(syntax: &PlaceholderSyntax, strict: bool) -> Result<Self, StackError> {
        let prefix = syntax.open.chars().next().map(String::from).unwrap_or_default();
        let syntax_config = SyntaxConfig::builder()
            .variable_delimiters(
                Cow::Owned(syntax.open.clone()),
                Cow::Owned(syntax.close.clone()),
            )
            .block_delimiters(Cow::Owned(format!("{prefix}{{%")), Cow::Borrowed("%}"))
            .comment_delimiters(Cow::Owned(format!("{prefix}{{#")), Cow::Borrowed("#}"))
            .build()
            .map_err(|e| {
                StackError::Config(ConfigError::InvalidValue {
                    var: "placeholder delimiters".to_string(),
                    value: format!("{} {}: {e}", syntax.open, syntax.close),
                })
            })?;

        let mut env = Environment::new();
        env.set_syntax(syntax_config);
        env.set_keep_trailing_newline(true);
        env.set_formatter(write_yaml_scalar);
        env.set_undefined_behavior(if strict {
            UndefinedBehavior::Strict
        } else {
            UndefinedBehavior::Chainable
        });

        Ok(Self {
            env,
            syntax: syntax.clone(),
        })
    }

    /// Render `text` with `context` as the root scope.
    pub fn render(&self, text: &str, context: &Value) -> Result<String, RenderError> {
        let text = subscript_keys(text, &self.syntax);
        self.env.render_str(&text, context).map_err(|e| match e.kind() {
            minijinja::ErrorKind::UndefinedError => RenderError::ContextMiss(e.to_string()),
            _ => RenderError::Template(e.to_string()),
        })
    }
}

/// Rewrite every placeholder whose dotted path has a key containing `-`
/// into subscript form. Other text is copied unchanged.
fn subscript_keys<'t>(text: &'t str, syntax: &PlaceholderSyntax) -> Cow<'t, str> {
    let (open, close) = (syntax.open.as_str(), syntax.close.as_str());
    if !text.contains(open) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(open) {
        let inner_start = start + open.len();
        let Some(inner_len) = rest[inner_start..].find(close) else {
            break;
        };
        let inner = &rest[inner_start..inner_start + inner_len];
        out.push_str(&rest[..inner_start]);
        match subscript_path(inner.trim()) {
            Some(path) => {
                out.push(' ');
                out.push_str(&path);
                out.push(' ');
            }
            None => out.push_str(inner),
        }
        rest = &rest[inner_start + inner_len..];
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// `root["a-b"]["c"]` for `root.a-b.c`; `None` when the path needs no
/// rewrite or is not a plain dotted path.
fn subscript_path(path: &str) -> Option<String> {
    let mut segments = path.split('.');
    let root = segments.next().filter(|r| is_identifier(r))?;
    let keys: Vec<&str> = segments.collect();

    let plain_key = |k: &&str| !k.is_empty() && k.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !keys.iter().all(plain_key) || !keys.iter().any(|k| k.contains('-')) {
        return None;
    }

    let mut out = root.to_string();
    for key in keys {
        let _ = write!(out, "[\"{key}\"]");
    }
    Some(out)
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Formatter writing values the way they read back from YAML.
///
/// Strict-mode undefined values never reach the formatter; lenient-mode
/// ones render empty, like null.
fn write_yaml_scalar(
    out: &mut Output<'_>,
    _state: &State<'_, '_>,
    value: &minijinja::Value,
) -> Result<(), minijinja::Error> {
    let write_failure = |e: std::fmt::Error| minijinja::Error::new(minijinja::ErrorKind::WriteFailure, e.to_string());

    if value.is_undefined() || value.is_none() {
        return Ok(());
    }
    if let Some(text) = value.as_str() {
        return out.write_str(text).map_err(write_failure);
    }
    let text = serde_json::to_string(value)
        .map_err(|e| minijinja::Error::new(minijinja::ErrorKind::BadSerialization, e.to_string()))?;
    out.write_str(&text).map_err(write_failure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn strict() -> TemplateRenderer {
        TemplateRenderer::new(&PlaceholderSyntax::default(), true).unwrap()
    }

    #[test]
    fn test_substitutes_inputs() {
        let out = strict()
            .render(
                "port: ${{ inputs.port }}\nname: ${{ inputs.name }}\n",
                &json!({ "inputs": { "port": 0, "name": "web" } }),
            )
            .unwrap();
        assert_eq!(out, "port: 0\nname: web\n");
    }

    #[test]
    fn test_default_delimiters_untouched() {
        let text = "run: echo {{ matrix.os }} {% raw %}\n";
        let out = strict().render(text, &json!({ "inputs": {} })).unwrap();
        assert_eq!(out, text);
    }

    #[test]
    fn test_booleans_render_as_yaml_booleans() {
        let out = strict()
            .render("flag: ${{ inputs.flag }}", &json!({ "inputs": { "flag": false } }))
            .unwrap();
        assert_eq!(out, "flag: false");
    }

    #[test]
    fn test_null_renders_empty_and_collections_as_flow() {
        let out = strict()
            .render(
                "description: Owned by ${{ inputs.owner }}\ntopics: ${{ inputs.topics }}\n",
                &json!({ "inputs": { "owner": null, "topics": ["a", true, null] } }),
            )
            .unwrap();
        assert_eq!(out, "description: Owned by \ntopics: [\"a\",true,null]\n");
    }

    #[test]
    fn test_hyphenated_keys_are_looked_up() {
        let out = strict()
            .render(
                "team: ${{ inputs.team-name }}\nport: ${{inputs.port}}\n",
                &json!({ "inputs": { "team-name": "payments", "port": 8080 } }),
            )
            .unwrap();
        assert_eq!(out, "team: payments\nport: 8080\n");
    }

    #[test]
    fn test_hyphenated_missing_key_is_context_miss() {
        let err = strict()
            .render("team: ${{ inputs.team-name }}\n", &json!({ "inputs": {} }))
            .unwrap_err();
        assert!(matches!(err, RenderError::ContextMiss(_)), "{err}");
    }

    #[test]
    fn test_subscript_path_rewrites_only_hyphenated_keys() {
        assert_eq!(subscript_path("inputs.team-name").as_deref(), Some("inputs[\"team-name\"]"));
        assert_eq!(subscript_path("a.b-c.d").as_deref(), Some("a[\"b-c\"][\"d\"]"));
        assert_eq!(subscript_path("inputs.port"), None);
        assert_eq!(subscript_path("inputs.a - b"), None);
        assert_eq!(subscript_path("x-y.z"), None);
    }

    #[test]
    fn test_strict_missing_path_is_context_miss() {
        let err = strict()
            .render("port: ${{ inputs.port }}\n", &json!({ "inputs": {} }))
            .unwrap_err();
        assert!(matches!(err, RenderError::ContextMiss(_)), "{err}");
    }

    #[test]
    fn test_strict_unknown_root_is_context_miss() {
        let err = strict()
            .render("sha: ${{ github.sha }}\n", &json!({ "inputs": {} }))
            .unwrap_err();
        assert!(matches!(err, RenderError::ContextMiss(_)), "{err}");
    }

    #[test]
    fn test_lenient_missing_path_renders_empty() {
        let renderer = TemplateRenderer::new(&PlaceholderSyntax::default(), false).unwrap();
        let out = renderer
            .render("a: '${{ inputs.missing }}'\nb: '${{ github.sha }}'\n", &json!({ "inputs": {} }))
            .unwrap();
        assert_eq!(out, "a: ''\nb: ''\n");
    }

    #[test]
    fn test_malformed_expression_is_template_error() {
        let err = strict()
            .render("a: ${{ inputs. }}\n", &json!({ "inputs": {} }))
            .unwrap_err();
        assert!(matches!(err, RenderError::Template(_)), "{err}");
    }
}
