//! Finding expected files in a suite output tree.
//!
//! Archived suite output is laid out either by stream
//! (`<suite>/<stream>/<file>`) or by cycle
//! (`<suite>/<YYYYMMDDT0000Z>/<file>`), and may be deeper still. Files
//! are therefore matched by name anywhere at least one directory below
//! the suite root.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use suite_common::{SuiteError, SuiteResult};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::observer::{FileEvent, FileObserver};

/// Filename to path index of a suite output tree.
#[derive(Debug, Clone, Default)]
pub struct FileIndex {
    root: PathBuf,
    entries: HashMap<String, Vec<PathBuf>>,
}

impl FileIndex {
    /// Walk `suite_root` once, following symlinks.
    ///
    /// Unreadable entries are skipped with a warning; a missing root is
    /// an error.
    pub fn build(suite_root: &Path) -> SuiteResult<Self> {
        if !suite_root.is_dir() {
            return Err(SuiteError::MissingRoot(suite_root.to_path_buf()));
        }

        let mut entries: HashMap<String, Vec<PathBuf>> = HashMap::new();
        let walker = WalkDir::new(suite_root)
            .min_depth(2)
            .follow_links(true)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(root = %suite_root.display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                entries
                    .entry(name.to_string())
                    .or_default()
                    .push(entry.into_path());
            }
        }

        for candidates in entries.values_mut() {
            candidates.sort();
        }
        debug!(root = %suite_root.display(), files = entries.len(), "Indexed suite output");

        Ok(Self {
            root: suite_root.to_path_buf(),
            entries,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every path named `filename`, lexicographically sorted.
    pub fn candidates(&self, filename: &str) -> &[PathBuf] {
        self.entries.get(filename).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Path of `filename`, or `None` if it has not been produced.
    ///
    /// When several directories hold a file of that name the
    /// lexicographically smallest path wins and `observer` is told.
    pub fn locate(&self, filename: &str, observer: &dyn FileObserver) -> Option<&Path> {
        let candidates = self.candidates(filename);
        if candidates.len() > 1 {
            observer.notify(FileEvent::AmbiguousMatch {
                name: filename.to_string(),
                candidates: candidates.to_vec(),
            });
        }
        candidates.first().map(PathBuf::as_path)
    }
}

/// Locate a single file under `suite_root`.
///
/// Builds a throwaway [`FileIndex`]; build one index and reuse it when
/// locating many files.
pub fn locate(
    filename: &str,
    suite_root: &Path,
    observer: &dyn FileObserver,
) -> SuiteResult<Option<PathBuf>> {
    Ok(FileIndex::build(suite_root)?
        .locate(filename, observer)
        .map(Path::to_path_buf))
}
