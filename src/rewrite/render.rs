//! Per-format literal rendering of scalar values.

use crate::model::FileFormat;
use crate::tree::Value;

/// Render a scalar in the format's native lexical form.
///
/// # Errors
///
/// Returns a reason string when the value has no inline rendering in
/// the format (containers everywhere, null in TOML).
pub fn render_scalar(format: FileFormat, value: &Value) -> Result<String, String> {
    if !value.is_scalar() {
        return Err(format!("cannot render a {} inline", value.type_name()));
    }

    match format {
        FileFormat::Yaml => render_yaml(value),
        FileFormat::Toml => render_toml(value),
        FileFormat::Env => render_env(value),
        FileFormat::Json => serde_json::to_string(&value.to_json()).map_err(|e| e.to_string()),
    }
}

fn render_yaml(value: &Value) -> Result<String, String> {
    Ok(match value {
        Value::String(s) => {
            let needs_quotes = s.is_empty() || s.chars().any(|c| " :{}[]\"".contains(c));
            if needs_quotes {
                format!("\"{}\"", s.replace('"', "\\\""))
            } else {
                s.clone()
            }
        }
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(x) => x.to_string(),
        Value::Null => "null".to_string(),
        other => return Err(format!("cannot render a {} inline", other.type_name())),
    })
}

fn render_toml(value: &Value) -> Result<String, String> {
    Ok(match value {
        Value::String(s) => format!("\"{}\"", s.replace('"', "\\\"")),
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(x) => x.to_string(),
        Value::Null => return Err("toml has no null literal".to_string()),
        other => return Err(format!("cannot render a {} inline", other.type_name())),
    })
}

fn render_env(value: &Value) -> Result<String, String> {
    Ok(match value {
        Value::String(s) => {
            let needs_quotes = s.is_empty()
                || s.chars()
                    .any(|c| c.is_whitespace() || c == '#' || c == '"' || c == '\'');
            if needs_quotes {
                format!("\"{}\"", s.replace('"', "\\\""))
            } else {
                s.clone()
            }
        }
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(x) => x.to_string(),
        Value::Null => String::new(),
        other => return Err(format!("cannot render a {} inline", other.type_name())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_bare_string() {
        assert_eq!(
            render_scalar(FileFormat::Yaml, &Value::from("prod")).unwrap(),
            "prod"
        );
    }

    #[test]
    fn test_yaml_quoted_string() {
        assert_eq!(
            render_scalar(FileFormat::Yaml, &Value::from("a b")).unwrap(),
            "\"a b\""
        );
        assert_eq!(
            render_scalar(FileFormat::Yaml, &Value::from("x:y")).unwrap(),
            "\"x:y\""
        );
        assert_eq!(
            render_scalar(FileFormat::Yaml, &Value::from("")).unwrap(),
            "\"\""
        );
        assert_eq!(
            render_scalar(FileFormat::Yaml, &Value::from("he said \"hi\"")).unwrap(),
            "\"he said \\\"hi\\\"\""
        );
    }

    #[test]
    fn test_yaml_scalars() {
        assert_eq!(
            render_scalar(FileFormat::Yaml, &Value::Bool(true)).unwrap(),
            "true"
        );
        assert_eq!(
            render_scalar(FileFormat::Yaml, &Value::Int(-5)).unwrap(),
            "-5"
        );
        assert_eq!(
            render_scalar(FileFormat::Yaml, &Value::Float(2.5)).unwrap(),
            "2.5"
        );
    }

    #[test]
    fn test_toml_strings_always_quoted() {
        assert_eq!(
            render_scalar(FileFormat::Toml, &Value::from("prod")).unwrap(),
            "\"prod\""
        );
        assert_eq!(
            render_scalar(FileFormat::Toml, &Value::from("a\"b")).unwrap(),
            "\"a\\\"b\""
        );
    }

    #[test]
    fn test_toml_null_rejected() {
        assert!(render_scalar(FileFormat::Toml, &Value::Null).is_err());
    }

    #[test]
    fn test_env_quoting() {
        assert_eq!(
            render_scalar(FileFormat::Env, &Value::from("plain")).unwrap(),
            "plain"
        );
        assert_eq!(
            render_scalar(FileFormat::Env, &Value::from("two words")).unwrap(),
            "\"two words\""
        );
        assert_eq!(
            render_scalar(FileFormat::Env, &Value::from("a#b")).unwrap(),
            "\"a#b\""
        );
        assert_eq!(
            render_scalar(FileFormat::Env, &Value::Int(42)).unwrap(),
            "42"
        );
        assert_eq!(
            render_scalar(FileFormat::Env, &Value::Bool(false)).unwrap(),
            "false"
        );
    }

    #[test]
    fn test_containers_rejected() {
        let seq = Value::Seq(vec![Value::Int(1)]);
        assert!(render_scalar(FileFormat::Yaml, &seq).is_err());
        assert!(render_scalar(FileFormat::Toml, &seq).is_err());
        assert!(render_scalar(FileFormat::Env, &seq).is_err());
    }
}
