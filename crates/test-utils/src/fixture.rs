use std::path::{Path, PathBuf};

use tempfile::TempDir;

use assetforge::paths::ProjectPaths;

/// A throwaway project directory.
#[derive(Debug)]
pub struct ProjectFixture {
    dir: TempDir,
}

impl ProjectFixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("creating temp project dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn paths(&self) -> ProjectPaths {
        ProjectPaths::new(self.dir.path())
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Write `contents` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("creating fixture dirs");
        }
        std::fs::write(&path, contents).expect("writing fixture file");
        path
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.path(rel)).expect("reading fixture file")
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }
}

impl Default for ProjectFixture {
    fn default() -> Self {
        Self::new()
    }
}
