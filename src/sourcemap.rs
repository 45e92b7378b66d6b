// src/sourcemap.rs

//! Minimal source map (revision 3) writer.
//!
//! Only what the pipelines need: a list of sources with their contents and
//! line-granular mappings (every mapped generated line points at column 0 of
//! an original line).

use serde::Serialize;

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Append `value` to `out` as a base64 VLQ.
pub fn encode_vlq(out: &mut String, value: i64) {
    let mut vlq: u64 = if value < 0 {
        ((value.unsigned_abs()) << 1) | 1
    } else {
        (value as u64) << 1
    };

    loop {
        let mut digit = (vlq & 0b11111) as usize;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0b100000;
        }
        out.push(BASE64[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineMapping {
    source: usize,
    original_line: usize,
}

#[derive(Debug, Default)]
pub struct SourceMapBuilder {
    file: String,
    sources: Vec<String>,
    sources_content: Vec<String>,
    lines: Vec<Option<LineMapping>>,
}

impl SourceMapBuilder {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            ..Self::default()
        }
    }

    /// Register a source and return its index.
    pub fn add_source(&mut self, name: impl Into<String>, content: impl Into<String>) -> usize {
        self.sources.push(name.into());
        self.sources_content.push(content.into());
        self.sources.len() - 1
    }

    /// Map generated line `generated_line` (0-based) to `original_line`
    /// (0-based) of `source`.
    pub fn map_line(&mut self, generated_line: usize, source: usize, original_line: usize) {
        if self.lines.len() <= generated_line {
            self.lines.resize(generated_line + 1, None);
        }
        self.lines[generated_line] = Some(LineMapping {
            source,
            original_line,
        });
    }

    pub fn mappings(&self) -> String {
        let mut out = String::new();
        let mut prev_source = 0i64;
        let mut prev_line = 0i64;

        for (idx, line) in self.lines.iter().enumerate() {
            if idx > 0 {
                out.push(';');
            }
            if let Some(m) = line {
                let source = m.source as i64;
                let original_line = m.original_line as i64;
                // generated column, source delta, original line delta, original column
                encode_vlq(&mut out, 0);
                encode_vlq(&mut out, source - prev_source);
                encode_vlq(&mut out, original_line - prev_line);
                encode_vlq(&mut out, 0);
                prev_source = source;
                prev_line = original_line;
            }
        }

        out
    }

    pub fn to_json(&self) -> String {
        let map = SourceMapJson {
            version: 3,
            file: &self.file,
            sources: &self.sources,
            sources_content: &self.sources_content,
            names: &[],
            mappings: self.mappings(),
        };
        // Serializing plain strings and vectors cannot fail.
        serde_json::to_string(&map).unwrap_or_default()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceMapJson<'a> {
    version: u8,
    file: &'a str,
    sources: &'a [String],
    sources_content: &'a [String],
    names: &'a [String],
    mappings: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vlq(value: i64) -> String {
        let mut s = String::new();
        encode_vlq(&mut s, value);
        s
    }

    #[test]
    fn vlq_known_values() {
        assert_eq!(vlq(0), "A");
        assert_eq!(vlq(1), "C");
        assert_eq!(vlq(-1), "D");
        assert_eq!(vlq(15), "e");
        assert_eq!(vlq(16), "gB");
        assert_eq!(vlq(123), "2H");
    }

    #[test]
    fn unmapped_lines_stay_empty() {
        let mut b = SourceMapBuilder::new("bundle.js");
        let a = b.add_source("a.js", "x\ny\n");
        b.map_line(1, a, 0);
        b.map_line(2, a, 1);
        assert_eq!(b.mappings(), ";AAAA;AACA");
    }

    #[test]
    fn json_uses_camel_case_keys() {
        let mut b = SourceMapBuilder::new("styles.css");
        b.add_source("../src/main.scss", "a { b: c }");
        let json: serde_json::Value = serde_json::from_str(&b.to_json()).unwrap();
        assert_eq!(json["version"], 3);
        assert_eq!(json["file"], "styles.css");
        assert_eq!(json["sourcesContent"][0], "a { b: c }");
        assert_eq!(json["mappings"], "");
    }
}
