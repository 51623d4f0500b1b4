//! Engine configuration.
//!
//! Size ceilings, the fallback schema version, placeholder delimiters and
//! the synthesized string value. Defaults match the published stack
//! tooling. Override via environment variables or explicit construction.

use serde::{Deserialize, Serialize};

/// 100 KB.
pub const DEFAULT_MAX_TEMPLATE_BYTES: usize = 100 * 1024;
/// 10 KB.
pub const DEFAULT_MAX_VALUES_BYTES: usize = 10 * 1024;
pub const DEFAULT_SCHEMA_VERSION: &str = "0.1.0";
pub const DEFAULT_PLACEHOLDER_OPEN: &str = "${{";
pub const DEFAULT_PLACEHOLDER_CLOSE: &str = "}}";
pub const DEFAULT_STRING_SENTINEL: &str = "sample_string";

/// Configuration for one validation engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Largest accepted template, in bytes.
    pub max_template_bytes: usize,
    /// Largest accepted values document, in bytes.
    pub max_values_bytes: usize,
    /// Schema version used when the template has no `stack_schema_version`.
    pub default_schema_version: String,
    /// Placeholder opening token. Also the token forbidden in values documents.
    pub placeholder_open: String,
    /// Placeholder closing token.
    pub placeholder_close: String,
    /// Value synthesized for string inputs that have no other value.
    pub string_sentinel: String,
    /// Fail the render when a placeholder path is missing from the context.
    pub strict_render: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_template_bytes: DEFAULT_MAX_TEMPLATE_BYTES,
            max_values_bytes: DEFAULT_MAX_VALUES_BYTES,
            default_schema_version: DEFAULT_SCHEMA_VERSION.to_string(),
            placeholder_open: DEFAULT_PLACEHOLDER_OPEN.to_string(),
            placeholder_close: DEFAULT_PLACEHOLDER_CLOSE.to_string(),
            string_sentinel: DEFAULT_STRING_SENTINEL.to_string(),
            strict_render: true,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `STACKGATE_MAX_TEMPLATE_BYTES` (default: 102400)
    /// - `STACKGATE_MAX_VALUES_BYTES` (default: 10240)
    /// - `STACKGATE_DEFAULT_SCHEMA_VERSION` (default: `0.1.0`)
    /// - `STACKGATE_STRING_SENTINEL` (default: `sample_string`)
    /// - `STACKGATE_STRICT_RENDER` (default: true)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("STACKGATE_MAX_TEMPLATE_BYTES") {
            config.max_template_bytes = parse_var("STACKGATE_MAX_TEMPLATE_BYTES", &raw)?;
        }
        if let Some(raw) = lookup("STACKGATE_MAX_VALUES_BYTES") {
            config.max_values_bytes = parse_var("STACKGATE_MAX_VALUES_BYTES", &raw)?;
        }
        if let Some(raw) = lookup("STACKGATE_DEFAULT_SCHEMA_VERSION") {
            config.default_schema_version = raw;
        }
        if let Some(raw) = lookup("STACKGATE_STRING_SENTINEL") {
            config.string_sentinel = raw;
        }
        if let Some(raw) = lookup("STACKGATE_STRICT_RENDER") {
            config.strict_render = parse_var("STACKGATE_STRICT_RENDER", &raw)?;
        }

        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(var: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var: var.to_string(),
        value: raw.to_string(),
    })
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: '{value}'")]
    InvalidValue { var: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_template_bytes, 102_400);
        assert_eq!(config.max_values_bytes, 10_240);
        assert_eq!(config.default_schema_version, "0.1.0");
        assert_eq!(config.placeholder_open, "${{");
        assert!(config.strict_render);
    }

    #[test]
    fn test_empty_environment_yields_defaults() {
        let config = EngineConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_overrides_from_environment() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("STACKGATE_MAX_VALUES_BYTES", "2048"),
            ("STACKGATE_STRING_SENTINEL", "placeholder"),
            ("STACKGATE_STRICT_RENDER", "false"),
        ]))
        .unwrap();
        assert_eq!(config.max_values_bytes, 2048);
        assert_eq!(config.string_sentinel, "placeholder");
        assert!(!config.strict_render);
        assert_eq!(config.max_template_bytes, DEFAULT_MAX_TEMPLATE_BYTES);
    }

    #[test]
    fn test_malformed_number_rejected() {
        let err = EngineConfig::from_lookup(lookup_from(&[("STACKGATE_MAX_TEMPLATE_BYTES", "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains("STACKGATE_MAX_TEMPLATE_BYTES"));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"string_sentinel": "x"}"#).unwrap();
        assert_eq!(config.string_sentinel, "x");
        assert_eq!(config.max_values_bytes, DEFAULT_MAX_VALUES_BYTES);
    }
}
