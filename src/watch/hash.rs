// src/watch/hash.rs

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

/// Compute the hash of a single file.
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file =
        File::open(path).with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Last seen content hash per watched file.
///
/// Used to drop change notifications that did not alter a file's bytes
/// (editors touching mtime, save-without-change, duplicate notify events).
#[derive(Debug, Default)]
pub struct ContentCache {
    hashes: HashMap<PathBuf, String>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current contents of `path` and report whether they differ
    /// from what was last recorded.
    ///
    /// Unknown files count as changed. A file that can no longer be read is
    /// forgotten and counts as changed too.
    pub fn refresh(&mut self, path: &Path) -> bool {
        let hash = match compute_file_hash(path) {
            Ok(hash) => hash,
            Err(err) => {
                debug!(?path, "cannot hash, treating as changed: {err:#}");
                self.hashes.remove(path);
                return true;
            }
        };

        if self.hashes.get(path) == Some(&hash) {
            debug!(?path, "content unchanged");
            return false;
        }
        self.hashes.insert(path.to_path_buf(), hash);
        true
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    type TestResult = std::result::Result<(), Box<dyn Error>>;

    #[test]
    fn same_bytes_hash_the_same() -> TestResult {
        let dir = tempfile::tempdir()?;
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, "hello")?;
        std::fs::write(&b, "hello")?;
        assert_eq!(compute_file_hash(&a)?, compute_file_hash(&b)?);
        Ok(())
    }

    #[test]
    fn cache_reports_only_real_changes() -> TestResult {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("main.scss");
        std::fs::write(&file, "a {}")?;

        let mut cache = ContentCache::new();
        assert!(cache.refresh(&file), "first sighting counts as a change");
        assert!(!cache.refresh(&file));

        std::fs::write(&file, "b {}")?;
        assert!(cache.refresh(&file));
        assert_eq!(cache.len(), 1);
        Ok(())
    }

    #[test]
    fn removed_file_is_forgotten() -> TestResult {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("gone.js");
        std::fs::write(&file, "x")?;

        let mut cache = ContentCache::new();
        cache.refresh(&file);
        std::fs::remove_file(&file)?;
        assert!(cache.refresh(&file));
        assert!(cache.is_empty());
        Ok(())
    }
}
