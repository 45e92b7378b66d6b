// src/resolver/data_file.rs

//! YAML data files as SCSS variables.
//!
//! A data file like
//!
//! ```yaml
//! colors:
//!   primary: "#111"
//! spacing: [4px, 8px]
//! ```
//!
//! is imported as
//!
//! ```scss
//! $colors: (primary: #111);
//! $spacing: (4px, 8px);
//! ```
//!
//! Key order follows the file. Strings are emitted verbatim (so colors,
//! lengths and keywords keep their SCSS meaning) unless they would break the
//! map syntax, in which case they are emitted as quoted strings.

use std::fs;

use serde_yaml::Value;
use tracing::debug;

use crate::errors::ResolveError;
use crate::paths;
use crate::resolver::{ImportReference, ImportStrategy, ResolvedImport};

#[derive(Debug, Clone)]
pub struct DataFileStrategy {
    extensions: Vec<String>,
}

impl Default for DataFileStrategy {
    fn default() -> Self {
        Self {
            extensions: vec!["yml".to_string(), "yaml".to_string()],
        }
    }
}

impl ImportStrategy for DataFileStrategy {
    fn can_resolve(&self, url: &str) -> bool {
        paths::extension(url).is_some_and(|ext| self.extensions.contains(&ext))
    }

    fn resolve(&self, import: &ImportReference) -> Result<ResolvedImport, ResolveError> {
        let path = import.resolved_path();
        let text = fs::read_to_string(&path).map_err(|source| ResolveError::Read {
            path: path.clone(),
            source,
        })?;

        let doc: Value = serde_yaml::from_str(&text).map_err(|source| ResolveError::Parse {
            path: path.clone(),
            source,
        })?;

        let scss = yaml_to_scss(&doc).map_err(|message| ResolveError::Shape {
            path: path.clone(),
            message,
        })?;

        debug!(path = ?path, bytes = scss.len(), "inlined data file");
        Ok(ResolvedImport::InlineContent(scss))
    }
}

/// Translate a parsed data document into SCSS variable declarations, one
/// `$key: value;` line per top-level key.
///
/// An empty document yields no declarations. Any other non-mapping document
/// is rejected, as are top-level keys that are not SCSS identifiers.
pub fn yaml_to_scss(doc: &Value) -> Result<String, String> {
    let mapping = match untag(doc) {
        Value::Null => return Ok(String::new()),
        Value::Mapping(m) => m,
        other => {
            return Err(format!(
                "top level must be a mapping, found {}",
                describe(other)
            ));
        }
    };

    let mut out = String::new();
    for (key, value) in mapping {
        let name = match untag(key) {
            Value::String(s) if is_identifier(s) => s.as_str(),
            Value::String(s) => return Err(format!("`{s}` is not a valid variable name")),
            other => {
                return Err(format!(
                    "top-level keys must be strings, found {}",
                    describe(other)
                ));
            }
        };
        out.push('$');
        out.push_str(name);
        out.push_str(": ");
        write_value(&mut out, value)?;
        out.push_str(";\n");
    }
    Ok(out)
}

fn write_value(out: &mut String, value: &Value) -> Result<(), String> {
    match untag(value) {
        Value::Mapping(map) => {
            out.push('(');
            for (i, (k, v)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_key(out, k)?;
                out.push_str(": ");
                write_value(out, v)?;
            }
            out.push(')');
        }
        Value::Sequence(items) => {
            out.push('(');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, item)?;
            }
            // `(x)` is just `x` in SCSS; a trailing comma keeps it a list.
            if items.len() == 1 {
                out.push(',');
            }
            out.push(')');
        }
        scalar => write_scalar(out, scalar)?,
    }
    Ok(())
}

fn write_key(out: &mut String, key: &Value) -> Result<(), String> {
    match untag(key) {
        Value::Mapping(_) | Value::Sequence(_) => {
            Err(format!("map keys must be scalars, found {}", describe(key)))
        }
        scalar => write_scalar(out, scalar),
    }
}

fn write_scalar(out: &mut String, value: &Value) -> Result<(), String> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            if n.as_f64().is_some_and(|f| !f.is_finite()) {
                return Err(format!("number `{n}` has no SCSS equivalent"));
            }
            out.push_str(&n.to_string());
        }
        Value::String(s) => {
            if needs_quotes(s) {
                push_quoted(out, s);
            } else {
                out.push_str(s);
            }
        }
        other => return Err(format!("unexpected {}", describe(other))),
    }
    Ok(())
}

fn untag(value: &Value) -> &Value {
    match value {
        Value::Tagged(tagged) => untag(&tagged.value),
        other => other,
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

fn is_identifier(s: &str) -> bool {
    let body = s.strip_prefix('-').unwrap_or(s);
    let mut chars = body.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '-' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

/// Anything but a space-separated run of colors, numbers (with an optional
/// unit) and plain identifiers is quoted.
fn needs_quotes(s: &str) -> bool {
    !s.split(' ').all(is_bare_token)
}

fn is_bare_token(token: &str) -> bool {
    is_hex_color(token)
        || is_dimension(token)
        || (is_identifier(token) && !SCSS_KEYWORDS.contains(&token))
}

/// Identifiers Sass would read as something other than a string.
const SCSS_KEYWORDS: &[&str] = &["true", "false", "null", "and", "or", "not"];

fn is_hex_color(token: &str) -> bool {
    token.strip_prefix('#').is_some_and(|hex| {
        matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit())
    })
}

fn is_dimension(token: &str) -> bool {
    let unsigned = token.strip_prefix(['-', '+']).unwrap_or(token);
    let digits_end = unsigned
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(unsigned.len());
    let (number, unit) = unsigned.split_at(digits_end);
    let valid_number = number.chars().any(|c| c.is_ascii_digit())
        && number.matches('.').count() <= 1
        && !number.ends_with('.');
    valid_number && (unit.is_empty() || unit == "%" || unit.chars().all(|c| c.is_ascii_alphabetic()))
}

fn push_quoted(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            // CSS escape for a line feed; the trailing space ends the escape.
            '\n' => out.push_str("\\a "),
            '\r' => {}
            other => out.push(other),
        }
    }
    out.push('"');
}
