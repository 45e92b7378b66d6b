// src/paths.rs

//! Path helpers shared by both pipelines and the watcher.
//!
//! Everything here is stateless apart from the project root held by
//! [`ProjectPaths`]. Artifact writes are staged: every artifact of a compile
//! is written to a temporary file next to its destination first and only
//! renamed into place once all of them were written successfully.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::errors::CompileError;

/// Project root against which all configured relative paths resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    root: PathBuf,
}

impl ProjectPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `rel` against the root. Absolute paths are returned unchanged.
    pub fn resolve(&self, rel: impl AsRef<Path>) -> PathBuf {
        let rel = rel.as_ref();
        if rel.is_absolute() {
            rel.to_path_buf()
        } else {
            self.root.join(rel)
        }
    }

    /// Path of `path` relative to the root, with forward slashes.
    pub fn relative_str(&self, path: &Path) -> Option<String> {
        relative_str(&self.root, path)
    }
}

/// Lower-cased extension of `path`, without the dot.
pub fn extension(path: impl AsRef<Path>) -> Option<String> {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Companion source map path: `output + ".map"`.
pub fn map_path_for(output: &Path) -> PathBuf {
    let mut s = output.as_os_str().to_os_string();
    s.push(".map");
    PathBuf::from(s)
}

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// Falls back to comparing canonicalized paths, which matters on platforms
/// where the watcher reports a different absolute prefix for the same
/// directory (e.g. `/private/var` on macOS). Returns `None` if `path` does
/// not live under `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(rel.to_string_lossy().replace('\\', "/"));
    }

    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return Some(rel.to_string_lossy().replace('\\', "/"));
        }
    }

    None
}

/// Relative reference from directory `from_dir` to `to`, with forward
/// slashes, as used in source map `sources` and map comments.
///
/// Both paths are normalized lexically first. If they share no common
/// prefix (different drives, one relative and one absolute) the normalized
/// target is returned as is.
pub fn relative_between(from_dir: &Path, to: &Path) -> String {
    let from = normalize(from_dir);
    let to = normalize(to);

    if from.is_absolute() != to.is_absolute() {
        return to.to_string_lossy().replace('\\', "/");
    }

    let from_parts: Vec<Component<'_>> = from.components().collect();
    let to_parts: Vec<Component<'_>> = to.components().collect();
    let common = from_parts
        .iter()
        .zip(to_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    if common == 0 && from.is_absolute() {
        return to.to_string_lossy().replace('\\', "/");
    }

    let mut out: Vec<String> = Vec::new();
    for _ in common..from_parts.len() {
        out.push("..".to_string());
    }
    for part in &to_parts[common..] {
        out.push(part.as_os_str().to_string_lossy().into_owned());
    }
    out.join("/")
}

/// Lexically remove `.` and resolve `..` components.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                ) && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// One file produced by a compile.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// Write all `artifacts` or none of them.
///
/// Each artifact is first written to a temporary file in its destination
/// directory (so the final rename never crosses filesystems). Destinations
/// are only replaced after every temporary file was written and flushed.
///
/// The first artifact is the primary output and is replaced last, after its
/// sidecars. If a replacement fails, the destinations already replaced get
/// their previous contents back (or are removed if they did not exist).
pub fn write_artifacts(artifacts: &[Artifact]) -> Result<(), CompileError> {
    let mut staged: Vec<(NamedTempFile, &Path)> = Vec::with_capacity(artifacts.len());

    for artifact in artifacts {
        let dir = match artifact.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)
            .map_err(|e| CompileError::io(format!("creating directory {:?}", dir), e))?;

        let mut tmp = NamedTempFile::new_in(&dir)
            .map_err(|e| CompileError::io(format!("staging {:?}", artifact.path), e))?;
        tmp.write_all(&artifact.contents)
            .and_then(|_| tmp.flush())
            .map_err(|e| CompileError::io(format!("writing {:?}", artifact.path), e))?;

        staged.push((tmp, artifact.path.as_path()));
    }

    // Nothing on disk has changed until here; dropping `staged` on an early
    // return removes the temporary files.
    let mut committed: Vec<(&Path, Option<Vec<u8>>)> = Vec::with_capacity(staged.len());
    for (tmp, dest) in staged.into_iter().rev() {
        let previous = if dest.is_file() {
            Some(
                std::fs::read(dest)
                    .map_err(|e| CompileError::io(format!("reading {:?}", dest), e))?,
            )
        } else {
            None
        };
        if let Err(e) = tmp.persist(dest) {
            roll_back(&committed);
            return Err(CompileError::io(format!("replacing {:?}", dest), e.error));
        }
        debug!(path = ?dest, "artifact written");
        committed.push((dest, previous));
    }

    Ok(())
}

fn roll_back(committed: &[(&Path, Option<Vec<u8>>)]) {
    for (dest, previous) in committed.iter().rev() {
        let restored = match previous {
            Some(bytes) => std::fs::write(dest, bytes),
            None => std::fs::remove_file(dest),
        };
        match restored {
            Ok(()) => debug!(path = ?dest, "artifact rolled back"),
            Err(err) => warn!(path = ?dest, %err, "could not roll back artifact"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(extension("a/b/Tokens.YML").as_deref(), Some("yml"));
        assert_eq!(extension("a/b/main.scss").as_deref(), Some("scss"));
        assert_eq!(extension("a/b/Makefile"), None);
    }

    #[test]
    fn resolve_keeps_absolute_paths() {
        let paths = ProjectPaths::new("/project");
        assert_eq!(paths.resolve("src/main.js"), PathBuf::from("/project/src/main.js"));
        assert_eq!(paths.resolve("/abs/x.js"), PathBuf::from("/abs/x.js"));
    }

    #[test]
    fn map_path_appends_suffix() {
        assert_eq!(
            map_path_for(Path::new("build/js/bundle.js")),
            PathBuf::from("build/js/bundle.js.map")
        );
    }

    #[test]
    fn relative_between_walks_up_and_down() {
        assert_eq!(
            relative_between(Path::new("/p/build/css"), Path::new("/p/src/styles/main.scss")),
            "../../src/styles/main.scss"
        );
        assert_eq!(
            relative_between(Path::new("/p/build"), Path::new("/p/build/app.js")),
            "app.js"
        );
        assert_eq!(
            relative_between(Path::new("/p/./build/../out"), Path::new("/p/src/a.js")),
            "../src/a.js"
        );
    }

    #[test]
    fn write_artifacts_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let css = dir.path().join("build/css/styles.css");
        let map = map_path_for(&css);

        write_artifacts(&[
            Artifact::new(&css, "a{}"),
            Artifact::new(&map, "{}"),
        ])
        .unwrap();

        assert_eq!(std::fs::read_to_string(&css).unwrap(), "a{}");
        assert_eq!(std::fs::read_to_string(&map).unwrap(), "{}");

        // No temporary files remain next to the artifacts.
        let entries = std::fs::read_dir(css.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 2);
    }

    #[test]
    fn failed_primary_write_restores_sidecars() {
        let dir = tempfile::tempdir().unwrap();
        let css = dir.path().join("styles.css");
        let map = map_path_for(&css);
        std::fs::write(&map, "old").unwrap();
        // A directory in the way makes the final rename fail.
        std::fs::create_dir(&css).unwrap();

        let err = write_artifacts(&[
            Artifact::new(&css, "a{}"),
            Artifact::new(&map, "{}"),
        ]);

        assert!(err.is_err());
        assert_eq!(std::fs::read_to_string(&map).unwrap(), "old");
        assert!(css.is_dir());
    }

    #[test]
    fn failed_primary_write_removes_new_sidecars() {
        let dir = tempfile::tempdir().unwrap();
        let js = dir.path().join("app.js");
        let map = map_path_for(&js);
        std::fs::create_dir(&js).unwrap();

        assert!(write_artifacts(&[
            Artifact::new(&js, "x"),
            Artifact::new(&map, "{}"),
        ])
        .is_err());
        assert!(!map.exists());
    }
}
