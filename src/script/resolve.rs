// src/script/resolve.rs

//! Mapping module specifiers to files.
//!
//! Relative and absolute specifiers resolve against the importing module.
//! Bare specifiers are looked up in `node_modules` directories, walking up
//! from the importer, with `package.json` `module`/`main` entry points.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::trace;

use crate::errors::CompileError;
use crate::paths::normalize;

/// Extensions always tried when a specifier does not name a file.
pub const DEFAULT_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "json"];

/// Extensions tried, in order, for extensionless specifiers and directory
/// indexes: the defaults, then `[scripts.compiler].extensions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extensions(Vec<String>);

impl Default for Extensions {
    fn default() -> Self {
        Self(DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect())
    }
}

impl Extensions {
    /// Defaults plus `extra`. Leading dots are dropped (`.es6` and `es6` are
    /// the same) and duplicates are ignored.
    pub fn with_extra<S: AsRef<str>>(extra: &[S]) -> Self {
        let mut list = Self::default().0;
        for ext in extra {
            let ext = ext.as_ref().trim().trim_start_matches('.');
            if !ext.is_empty() && !list.iter().any(|e| e == ext) {
                list.push(ext.to_string());
            }
        }
        Self(list)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

pub fn resolve_specifier(
    importer: &Path,
    specifier: &str,
    extensions: &Extensions,
) -> Result<PathBuf, CompileError> {
    let base = importer.parent().unwrap_or_else(|| Path::new(""));

    let found = if is_path_like(specifier) {
        let target = if Path::new(specifier).is_absolute() {
            PathBuf::from(specifier)
        } else {
            base.join(specifier)
        };
        resolve_path(&target, extensions)
    } else {
        resolve_package(base, specifier, extensions)
    };

    match found {
        Some(path) => {
            let path = normalize(&path);
            trace!(importer = ?importer, specifier, resolved = ?path, "resolved module");
            Ok(path)
        }
        None => Err(CompileError::resolution(format!(
            "cannot resolve '{specifier}' from {}",
            importer.display()
        ))),
    }
}

fn is_path_like(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || Path::new(specifier).is_absolute()
}

/// File, file + extension, then directory index.
fn resolve_path(target: &Path, extensions: &Extensions) -> Option<PathBuf> {
    if target.is_file() {
        return Some(target.to_path_buf());
    }

    for ext in extensions.iter() {
        let mut candidate = target.as_os_str().to_os_string();
        candidate.push(".");
        candidate.push(ext);
        let candidate = PathBuf::from(candidate);
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    if target.is_dir() {
        return resolve_index(target, extensions);
    }

    None
}

fn resolve_index(dir: &Path, extensions: &Extensions) -> Option<PathBuf> {
    extensions
        .iter()
        .map(|ext| dir.join(format!("index.{ext}")))
        .find(|candidate| candidate.is_file())
}

#[derive(Debug, Default, Deserialize)]
struct PackageManifest {
    module: Option<String>,
    main: Option<String>,
}

fn resolve_package(start: &Path, specifier: &str, extensions: &Extensions) -> Option<PathBuf> {
    let (name, subpath) = split_package_specifier(specifier);

    for dir in start.ancestors() {
        let package_dir = dir.join("node_modules").join(name);
        if !package_dir.is_dir() {
            continue;
        }

        if let Some(subpath) = subpath {
            return resolve_path(&package_dir.join(subpath), extensions);
        }

        let manifest = read_manifest(&package_dir.join("package.json"));
        let entry = manifest.module.or(manifest.main);
        if let Some(entry) = entry {
            if let Some(path) = resolve_path(&package_dir.join(entry), extensions) {
                return Some(path);
            }
        }
        return resolve_index(&package_dir, extensions);
    }

    None
}

/// `@scope/pkg/sub` -> (`@scope/pkg`, `sub`); `pkg` -> (`pkg`, None).
fn split_package_specifier(specifier: &str) -> (&str, Option<&str>) {
    let name_segments = if specifier.starts_with('@') { 2 } else { 1 };
    let mut split_at = None;
    let mut seen = 0;
    for (idx, c) in specifier.char_indices() {
        if c == '/' {
            seen += 1;
            if seen == name_segments {
                split_at = Some(idx);
                break;
            }
        }
    }
    match split_at {
        Some(idx) => (&specifier[..idx], Some(&specifier[idx + 1..])),
        None => (specifier, None),
    }
}

fn read_manifest(path: &Path) -> PackageManifest {
    fs::read_to_string(path)
        .ok()
        .and_then(|text| serde_json::from_str(&text).ok())
        .unwrap_or_default()
}
