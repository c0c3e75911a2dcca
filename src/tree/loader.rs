//! Whole-file structural loading and saving.
//!
//! The loader parses a file's entire content into a [`Value`] tree.
//! It is used for source-file snapshots, best-effort old-value reads,
//! and the JSON reformat fallback. Saving reformats the whole file and
//! is meant for creating new files only; updates to existing files go
//! through the surgical rewriter.

use std::path::Path;

use indexmap::IndexMap;

use super::Value;
use crate::error::{Error, LoadError, Result};
use crate::model::FileFormat;
use crate::rewrite::render_scalar;

/// Load a file into a tree, detecting the format from the path suffix.
///
/// # Errors
///
/// Returns [`LoadError`] on IO or parse failure.
pub fn load_file(path: &Path) -> Result<Value> {
    let format = FileFormat::detect(path);
    let content = std::fs::read_to_string(path)
        .map_err(|e| LoadError::new(path, format, e))?;
    parse_str(format, &content).map_err(|cause| LoadError::new(path, format, cause).into())
}

/// Parse content in the given format. Errors are returned as the
/// parser's message text; [`load_file`] attaches the path.
///
/// # Errors
///
/// Returns the underlying parser's message on failure.
pub fn parse_str(format: FileFormat, content: &str) -> std::result::Result<Value, String> {
    match format {
        FileFormat::Json => serde_json::from_str::<serde_json::Value>(content)
            .map(Value::from)
            .map_err(|e| e.to_string()),
        FileFormat::Yaml => serde_yaml::from_str::<serde_yaml::Value>(content)
            .map(Value::from)
            .map_err(|e| e.to_string()),
        FileFormat::Toml => toml::from_str::<toml::Value>(content)
            .map(Value::from)
            .map_err(|e| e.to_string()),
        FileFormat::Env => Ok(parse_env(content)),
    }
}

/// Write a tree to a file, reformatting entirely.
///
/// JSON is written with two-space indentation. This loses original
/// formatting and must not be used to update existing files.
///
/// # Errors
///
/// Returns an error if the tree cannot be rendered in the target
/// format or the file cannot be written.
pub fn save_file(path: &Path, value: &Value) -> Result<()> {
    let format = FileFormat::detect(path);
    let content = render_tree(format, value)
        .map_err(|cause| Error::Load(LoadError::new(path, format, cause)))?;
    std::fs::write(path, content)?;
    Ok(())
}

fn render_tree(format: FileFormat, value: &Value) -> std::result::Result<String, String> {
    match format {
        FileFormat::Json => serde_json::to_string_pretty(value).map_err(|e| e.to_string()),
        FileFormat::Yaml => serde_yaml::to_string(value).map_err(|e| e.to_string()),
        FileFormat::Toml => toml::to_string(value).map_err(|e| e.to_string()),
        FileFormat::Env => render_env(value),
    }
}

/// Parse dotenv content: one record per non-empty non-comment
/// `KEY=VALUE` line. Lines without `=` are skipped.
fn parse_env(content: &str) -> Value {
    let mut map = IndexMap::new();

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some((key, raw_value)) = trimmed.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        map.insert(key.to_string(), parse_env_value(raw_value.trim()));
    }

    Value::Map(map)
}

/// Quoted values stay strings; bare literals are coerced to integer,
/// float, or boolean when they match those forms exactly.
fn parse_env_value(raw: &str) -> Value {
    if raw.len() >= 2 {
        if raw.starts_with('"') && raw.ends_with('"') {
            return Value::String(unescape_double_quoted(&raw[1..raw.len() - 1]));
        }
        if raw.starts_with('\'') && raw.ends_with('\'') {
            return Value::String(raw[1..raw.len() - 1].to_string());
        }
    }

    if is_int_literal(raw) {
        if let Ok(n) = raw.parse::<i64>() {
            return Value::Int(n);
        }
    }
    if is_float_literal(raw) {
        if let Ok(f) = raw.parse::<f64>() {
            return Value::Float(f);
        }
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

/// `^-?\d+$`
fn is_int_literal(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// `^-?\d+\.\d+$`
fn is_float_literal(s: &str) -> bool {
    let body = s.strip_prefix('-').unwrap_or(s);
    let Some((whole, frac)) = body.split_once('.') else {
        return false;
    };
    !whole.is_empty()
        && !frac.is_empty()
        && whole.bytes().all(|b| b.is_ascii_digit())
        && frac.bytes().all(|b| b.is_ascii_digit())
}

/// Double-quoted values accept `\"` and `\\` escapes.
fn unescape_double_quoted(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn render_env(value: &Value) -> std::result::Result<String, String> {
    let Value::Map(map) = value else {
        return Err(format!("env files require a mapping, got {}", value.type_name()));
    };

    let mut out = String::new();
    for (key, item) in map {
        if !item.is_scalar() {
            return Err(format!("env value for '{key}' is a {}", item.type_name()));
        }
        out.push_str(key);
        out.push('=');
        out.push_str(&render_scalar(FileFormat::Env, item)?);
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_env_basic() {
        let v = parse_env("DB_HOST=localhost\nDB_PORT=5432\nDB_NAME=myapp\n");
        let Value::Map(map) = v else { panic!() };
        assert_eq!(map["DB_HOST"], Value::from("localhost"));
        assert_eq!(map["DB_PORT"], Value::Int(5432));
        assert_eq!(map["DB_NAME"], Value::from("myapp"));
    }

    #[test]
    fn test_parse_env_quoted() {
        let v = parse_env(
            "DB_PASSWORD=\"password with spaces\"\nAPI_KEY='single quoted'\nEMPTY_VALUE=\"\"\n",
        );
        let Value::Map(map) = v else { panic!() };
        assert_eq!(map["DB_PASSWORD"], Value::from("password with spaces"));
        assert_eq!(map["API_KEY"], Value::from("single quoted"));
        assert_eq!(map["EMPTY_VALUE"], Value::from(""));
    }

    #[test]
    fn test_parse_env_coercion() {
        let v = parse_env("DEBUG=true\nENABLED=false\nCOUNT=42\nRATIO=3.14\nNEG=-7\n");
        let Value::Map(map) = v else { panic!() };
        assert_eq!(map["DEBUG"], Value::Bool(true));
        assert_eq!(map["ENABLED"], Value::Bool(false));
        assert_eq!(map["COUNT"], Value::Int(42));
        assert_eq!(map["RATIO"], Value::Float(3.14));
        assert_eq!(map["NEG"], Value::Int(-7));
    }

    #[test]
    fn test_parse_env_quoted_numbers_stay_strings() {
        let v = parse_env("PORT=\"5432\"\n");
        let Value::Map(map) = v else { panic!() };
        assert_eq!(map["PORT"], Value::from("5432"));
    }

    #[test]
    fn test_parse_env_comments_and_blanks() {
        let v = parse_env("# Database\nDB_HOST=localhost\n\n# more\nSERVER_PORT=8080\n");
        let Value::Map(map) = v else { panic!() };
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_parse_env_spaces_around_equals() {
        let v = parse_env("KEY1 = value1\nKEY2= value2\nKEY3 =value3\nKEY4=value4\n");
        let Value::Map(map) = v else { panic!() };
        for key in ["KEY1", "KEY2", "KEY3", "KEY4"] {
            assert!(map[key].as_str().unwrap().starts_with("value"));
        }
    }

    #[test]
    fn test_parse_env_escaped_quote() {
        let v = parse_env(r#"MSG="say \"hi\"""#);
        let Value::Map(map) = v else { panic!() };
        assert_eq!(map["MSG"], Value::from(r#"say "hi""#));
    }

    #[test]
    fn test_load_file_json() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("app.json");
        fs::write(&path, r#"{"server": {"port": 8080}}"#).unwrap();

        let v = load_file(&path).unwrap();
        let Value::Map(map) = v else { panic!() };
        assert!(map.contains_key("server"));
    }

    #[test]
    fn test_load_file_yaml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("app.yaml");
        fs::write(&path, "database:\n  host: localhost\n  port: 5432\n").unwrap();

        let v = load_file(&path).unwrap();
        let Value::Map(map) = v else { panic!() };
        let Some(Value::Map(db)) = map.get("database") else {
            panic!()
        };
        assert_eq!(db["port"], Value::Int(5432));
    }

    #[test]
    fn test_load_file_parse_failure() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();

        let err = load_file(&path).unwrap_err();
        assert!(matches!(err, Error::Load(_)));
    }

    #[test]
    fn test_load_file_missing() {
        let err = load_file(Path::new("/nonexistent/app.toml")).unwrap_err();
        let Error::Load(load) = err else { panic!() };
        assert_eq!(load.format, FileFormat::Toml);
    }

    #[test]
    fn test_save_file_json_pretty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.json");
        let v: Value = serde_json::from_str(r#"{"a": 1}"#).unwrap();
        save_file(&path, &v).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("  \"a\": 1"));
    }

    #[test]
    fn test_save_file_env() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.env");
        let v = parse_env("A=1\nB=two words\n");
        save_file(&path, &v).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, "A=1\nB=\"two words\"\n");
    }

    #[test]
    fn test_env_roundtrip_coerces_literals() {
        // A textual "42" written unquoted comes back as an integer.
        let v = parse_env("COUNT=42\n");
        let Value::Map(map) = &v else { panic!() };
        assert_eq!(map["COUNT"], Value::Int(42));
        let rendered = render_env(&v).unwrap();
        assert_eq!(rendered, "COUNT=42\n");
    }
}
