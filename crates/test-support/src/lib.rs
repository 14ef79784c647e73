//! Small helpers shared by integration tests across the workspace: building
//! throwaway directory trees and listing what landed where.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A directory tree built under a [`TempDir`] from a declarative list of
/// entries, kept alive for the duration of a test.
pub struct TreeFixture {
    dir: TempDir,
}

/// One entry to materialize under a [`TreeFixture`].
pub enum Entry<'a> {
    /// A regular file at `path` (relative to the tree root) with `contents`.
    File {
        /// Path relative to the tree root.
        path: &'a str,
        /// File contents.
        contents: &'a [u8],
    },
    /// An empty directory at `path`.
    Dir {
        /// Path relative to the tree root.
        path: &'a str,
    },
}

impl TreeFixture {
    /// Creates a new temporary directory tree from `entries`.
    ///
    /// # Panics
    ///
    /// Panics if the temp directory or any entry cannot be created; this is
    /// test-only scaffolding, not production code.
    #[must_use]
    pub fn new(entries: &[Entry<'_>]) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        for entry in entries {
            match entry {
                Entry::File { path, contents } => {
                    let full = dir.path().join(path);
                    if let Some(parent) = full.parent() {
                        fs::create_dir_all(parent).expect("create parent dirs");
                    }
                    fs::write(&full, contents).expect("write fixture file");
                }
                Entry::Dir { path } => {
                    fs::create_dir_all(dir.path().join(path)).expect("create fixture dir");
                }
            }
        }
        Self { dir }
    }

    /// Root of the materialized tree.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Resolves `relative` against the tree root.
    #[must_use]
    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Lists every regular file under the tree, as paths relative to the
    /// root, sorted for deterministic assertions.
    #[must_use]
    pub fn list_files(&self) -> Vec<String> {
        let mut found = Vec::new();
        collect_files(self.dir.path(), self.dir.path(), &mut found);
        found.sort();
        found
    }
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, out);
        } else if let Ok(relative) = path.strip_prefix(root) {
            out.push(relative.to_string_lossy().replace('\\', "/"));
        }
    }
}
