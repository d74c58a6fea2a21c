//! Path and filesystem helpers for tests.

use std::fs;
use std::path::{Path, PathBuf};

/// Creates a temporary directory for test output.
///
/// The directory is automatically cleaned up when the returned `TempDir` is dropped.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary test directory")
}

/// Create `root/relative` (and its parents) containing a few bytes.
pub fn touch(root: &Path, relative: &str) -> PathBuf {
    write_file(root, relative, b"data")
}

/// Create `root/relative` (and its parents) with the given contents.
pub fn write_file(root: &Path, relative: &str, contents: &[u8]) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    fs::write(&path, contents).expect("Failed to write test file");
    path
}

/// Create `root/relative` as a directory.
pub fn mkdir(root: &Path, relative: &str) -> PathBuf {
    let path = root.join(relative);
    fs::create_dir_all(&path).expect("Failed to create test directory");
    path
}

/// Sorted names of the entries directly inside `dir`; empty if `dir`
/// does not exist.
pub fn entry_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_creates_parents() {
        let dir = temp_test_dir();
        let path = touch(dir.path(), "a/b/c.nc");
        assert!(path.is_file());
        assert_eq!(entry_names(&dir.path().join("a")), vec!["b".to_string()]);
    }

    #[test]
    fn test_entry_names_missing_dir() {
        assert!(entry_names(Path::new("/no/such/dir")).is_empty());
    }
}
