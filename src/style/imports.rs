// src/style/imports.rs

//! Rewriting `@import` statements before the style compiler sees them.
//!
//! grass loads imports by url and has no hook for synthesizing content, so
//! data file imports are replaced in the importing stylesheet's text: each
//! `@import` statement is split into its arguments, every quoted url goes
//! through the [`ImportResolver`], inline results are spliced in and the
//! remaining urls are re-emitted as `@import` statements in their original
//! order. Statements without any inline result are left untouched.
//!
//! A statement may start anywhere a new statement can: at the top of the
//! file or after `{`, `}` or `;`. Text inside comments and strings is never
//! treated as a statement.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::errors::ResolveError;
use crate::resolver::{ImportReference, ImportResolver, ResolvedImport};

#[derive(Debug, Clone)]
pub struct ImportRewriter {
    statement: Regex,
    load_paths: Vec<PathBuf>,
}

impl ImportRewriter {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            statement: Regex::new(r#"@import\s+((?:"[^"]*"|'[^']*'|[^;"'{}])+);"#)?,
            load_paths: Vec::new(),
        })
    }

    /// Directories data file imports fall back to.
    pub fn with_load_paths(mut self, load_paths: Vec<PathBuf>) -> Self {
        self.load_paths = load_paths;
        self
    }

    /// Returns the rewritten stylesheet, or `None` if nothing was inlined.
    pub fn rewrite(
        &self,
        source: &str,
        current: &Path,
        resolver: &ImportResolver,
    ) -> Result<Option<String>, ResolveError> {
        let code = code_mask(source);
        let mut out = String::with_capacity(source.len());
        let mut cursor = 0usize;
        let mut search = 0usize;
        let mut changed = false;

        while let Some(caps) = self.statement.captures_at(source, search) {
            let (Some(whole), Some(args)) = (caps.get(0), caps.get(1)) else {
                break;
            };
            if !code[whole.start()] || !starts_statement(source.as_bytes(), &code, whole.start())
            {
                search = whole.start() + 1;
                continue;
            }
            search = whole.end();

            let import = ImportReference::new("", current).with_load_paths(&self.load_paths);
            let Some(replacement) = rewrite_statement(args.as_str(), &import, resolver)? else {
                continue;
            };

            out.push_str(&source[cursor..whole.start()]);
            out.push_str(&replacement);
            cursor = whole.end();
            changed = true;
        }

        if !changed {
            return Ok(None);
        }
        out.push_str(&source[cursor..]);
        Ok(Some(out))
    }
}

/// Per byte of `source`: `true` outside comments, strings and unquoted
/// `url(...)` bodies.
fn code_mask(source: &str) -> Vec<bool> {
    let bytes = source.as_bytes();
    let len = bytes.len();
    let mut mask = vec![true; len];
    let mut i = 0usize;

    while i < len {
        let end = match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'/') => bytes[i..]
                .iter()
                .position(|&b| b == b'\n')
                .map_or(len, |n| i + n),
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                source[i + 2..].find("*/").map_or(len, |n| i + 2 + n + 2)
            }
            quote @ (b'"' | b'\'') => {
                let mut j = i + 1;
                while j < len && bytes[j] != quote {
                    if bytes[j] == b'\\' {
                        j += 1;
                    }
                    j += 1;
                }
                (j + 1).min(len)
            }
            b'u' | b'U' if bytes[i..].len() >= 4 && bytes[i..i + 4].eq_ignore_ascii_case(b"url(") => {
                let body = i + 4;
                match bytes.get(body) {
                    Some(b'"' | b'\'') | None => {
                        i = body;
                        continue;
                    }
                    Some(_) => bytes[body..]
                        .iter()
                        .position(|&b| b == b')')
                        .map_or(len, |n| body + n),
                }
            }
            _ => {
                i += 1;
                continue;
            }
        };
        mask[i..end].fill(false);
        i = end;
    }
    mask
}

/// Whether the last code byte before `at` ends a statement or opens a block.
fn starts_statement(bytes: &[u8], code: &[bool], at: usize) -> bool {
    bytes[..at]
        .iter()
        .zip(&code[..at])
        .rev()
        .find(|(b, in_code)| **in_code && !b.is_ascii_whitespace())
        .is_none_or(|(b, _)| matches!(b, b';' | b'{' | b'}'))
}

/// `importer` carries the importing stylesheet and load paths; its url is
/// replaced by each argument in turn.
fn rewrite_statement(
    args: &str,
    importer: &ImportReference,
    resolver: &ImportResolver,
) -> Result<Option<String>, ResolveError> {
    let mut out = String::new();
    let mut pending: Vec<String> = Vec::new();
    let mut inlined = false;

    for arg in split_args(args) {
        let Some(url) = unquote(arg) else {
            // `url(...)`, media queries and the like stay plain CSS imports.
            pending.push(arg.to_string());
            continue;
        };

        let import = ImportReference {
            url: url.to_string(),
            ..importer.clone()
        };
        match resolver.resolve(&import)? {
            ResolvedImport::InlineContent(content) => {
                flush(&mut out, &mut pending);
                out.push_str(&content);
                inlined = true;
            }
            ResolvedImport::FilePath(path) if path == url => pending.push(arg.to_string()),
            ResolvedImport::FilePath(path) => pending.push(format!("\"{path}\"")),
        }
    }

    if !inlined {
        return Ok(None);
    }
    flush(&mut out, &mut pending);
    Ok(Some(out))
}

fn flush(out: &mut String, pending: &mut Vec<String>) {
    if pending.is_empty() {
        return;
    }
    out.push_str("@import ");
    out.push_str(&pending.join(", "));
    out.push_str(";\n");
    pending.clear();
}

/// Split on commas that are outside quotes and parentheses.
fn split_args(args: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0usize;

    for (idx, c) in args.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(args[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(args[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

fn unquote(arg: &str) -> Option<&str> {
    let first = arg.chars().next()?;
    if (first == '"' || first == '\'') && arg.len() >= 2 && arg.ends_with(first) {
        Some(&arg[1..arg.len() - 1])
    } else {
        None
    }
}
