//! YAML parsing into JSON value trees.

use serde_json::Value;
use stackgate_core::error::DocumentKind;
use stackgate_core::StackError;

/// Parse YAML text and convert it to a `serde_json::Value`.
///
/// Empty or comment-only text parses to `Value::Null`.
///
/// # Errors
///
/// Returns `StackError::Parse` naming `document` if the text is not
/// well-formed YAML or uses a construct with no JSON equivalent.
pub fn parse_yaml(text: &str, document: DocumentKind) -> Result<Value, StackError> {
    let yaml_value: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| StackError::Parse {
            document,
            reason: format!("invalid YAML: {e}"),
        })?;

    yaml_to_json_value(&yaml_value).map_err(|reason| StackError::Parse { document, reason })
}

/// Convert a `serde_yaml::Value` to a `serde_json::Value`.
///
/// Stack documents use only the JSON-compatible subset of YAML. Tags are
/// dropped; scalar mapping keys are stringified. Errors name the dotted
/// key path of the offending node (`(root)` for the document itself).
pub fn yaml_to_json_value(yaml: &serde_yaml::Value) -> Result<Value, String> {
    convert(yaml, &mut Vec::new())
}

fn convert(yaml: &serde_yaml::Value, path: &mut Vec<String>) -> Result<Value, String> {
    use serde_yaml::Value as Yaml;

    match yaml {
        Yaml::Null => Ok(Value::Null),
        Yaml::Bool(b) => Ok(Value::Bool(*b)),
        Yaml::Number(n) => json_number(n).ok_or_else(|| {
            format!("number {n} at {} has no JSON representation", display_path(path))
        }),
        Yaml::String(s) => Ok(Value::String(s.clone())),
        Yaml::Sequence(seq) => {
            let mut items = Vec::with_capacity(seq.len());
            for (index, item) in seq.iter().enumerate() {
                path.push(index.to_string());
                items.push(convert(item, path)?);
                path.pop();
            }
            Ok(Value::Array(items))
        }
        Yaml::Mapping(map) => {
            let mut object = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                let key = scalar_key(k).ok_or_else(|| {
                    format!(
                        "unsupported mapping key under {}: keys must be scalars, found {}",
                        display_path(path),
                        kind_name(k)
                    )
                })?;
                path.push(key.clone());
                let value = convert(v, path)?;
                path.pop();
                object.insert(key, value);
            }
            Ok(Value::Object(object))
        }
        Yaml::Tagged(tagged) => convert(&tagged.value, path),
    }
}

fn json_number(n: &serde_yaml::Number) -> Option<Value> {
    if let Some(i) = n.as_i64() {
        return Some(Value::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(Value::from(u));
    }
    n.as_f64()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
}

fn scalar_key(key: &serde_yaml::Value) -> Option<String> {
    match key {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Tagged(tagged) => scalar_key(&tagged.value),
        _ => None,
    }
}

fn kind_name(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Sequence(_) => "a sequence",
        serde_yaml::Value::Mapping(_) => "a mapping",
        _ => "a scalar",
    }
}

fn display_path(path: &[String]) -> String {
    if path.is_empty() {
        "(root)".to_string()
    } else {
        path.join(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_to_json_conversion() {
        let yaml_str = r#"
name: web
stack_schema_version: "0.1.0"
count: 42
ratio: 0.5
enabled: true
items:
  - one
  - two
"#;
        let json_value = parse_yaml(yaml_str, DocumentKind::Template).unwrap();

        assert_eq!(json_value["name"], "web");
        assert_eq!(json_value["stack_schema_version"], "0.1.0");
        assert_eq!(json_value["count"], 42);
        assert_eq!(json_value["ratio"], 0.5);
        assert_eq!(json_value["enabled"], true);
        assert_eq!(json_value["items"][0], "one");
    }

    #[test]
    fn test_placeholder_scalar_is_plain_string() {
        let value = parse_yaml("port: ${{ inputs.port }}\n", DocumentKind::Template).unwrap();
        assert_eq!(value["port"], "${{ inputs.port }}");
    }

    #[test]
    fn test_empty_text_is_null() {
        assert_eq!(parse_yaml("", DocumentKind::Values).unwrap(), Value::Null);
    }

    #[test]
    fn test_numeric_keys_are_stringified() {
        let value = parse_yaml("1: one\ntrue: yes\n", DocumentKind::Template).unwrap();
        assert_eq!(value["1"], "one");
        assert_eq!(value["true"], "yes");
    }

    #[test]
    fn test_unsupported_key_names_its_path() {
        let text = "repository:\n  topics:\n    ? [a, b]\n    : pair\n";
        let err = parse_yaml(text, DocumentKind::Template).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("under repository.topics"), "{message}");
        assert!(message.contains("a sequence"), "{message}");
    }

    #[test]
    fn test_unrepresentable_float_names_its_path() {
        let err = yaml_to_json_value(&serde_yaml::from_str("workflows:\n  - timeout: .nan\n").unwrap())
            .unwrap_err();
        assert_eq!(err, "number .nan at workflows.0.timeout has no JSON representation");
    }

    #[test]
    fn test_null_key_at_root() {
        let err = yaml_to_json_value(&serde_yaml::from_str("~: x\n").unwrap()).unwrap_err();
        assert!(err.contains("under (root)"), "{err}");
        assert!(err.contains("found null"), "{err}");
    }

    #[test]
    fn test_malformed_yaml_is_parse_error() {
        let err = parse_yaml("name: [unclosed\n", DocumentKind::Values).unwrap_err();
        match err {
            StackError::Parse { document, .. } => assert_eq!(document, DocumentKind::Values),
            other => panic!("expected Parse, got: {other}"),
        }
    }
}
