//! Shared test utilities for the suite-staging workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Temporary directory and file helpers
//! - Builders for archived suite output and converted output trees
//! - Filesystem assertion macros
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{assert_symlink_to, SuiteOutputTree};
//! ```

pub mod fixtures;
pub mod paths;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use paths::*;

/// Assert that `link` is a symlink pointing at `target`.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_symlink_to;
///
/// assert_symlink_to!(work_dir.join("file.pp"), archive.join("ap4/file.pp"));
/// ```
#[macro_export]
macro_rules! assert_symlink_to {
    ($link:expr, $target:expr) => {{
        let link = &$link;
        let target = &$target;
        let link: &std::path::Path = ::std::convert::AsRef::<std::path::Path>::as_ref(link);
        let target: &std::path::Path = ::std::convert::AsRef::<std::path::Path>::as_ref(target);
        let meta = std::fs::symlink_metadata(link)
            .unwrap_or_else(|e| panic!("no entry at {:?}: {}", link, e));
        assert!(meta.file_type().is_symlink(), "{:?} is not a symlink", link);
        let actual = std::fs::read_link(link).unwrap();
        assert_eq!(actual, target, "symlink {:?} points at the wrong file", link);
    }};
}

/// Assert the number of entries directly inside a directory.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_entry_count;
///
/// assert_entry_count!(staging_dir, 14);
/// ```
#[macro_export]
macro_rules! assert_entry_count {
    ($dir:expr, $expected:expr) => {{
        let dir = &$dir;
        let dir: &std::path::Path = ::std::convert::AsRef::<std::path::Path>::as_ref(dir);
        let names = $crate::entry_names(dir);
        assert_eq!(
            names.len(),
            $expected,
            "unexpected entries in {:?}: {:?}",
            dir,
            names
        );
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_entry_count_passes() {
        let dir = temp_test_dir();
        touch(dir.path(), "a/one.pp");
        touch(dir.path(), "two.pp");
        assert_entry_count!(dir.path(), 2);
    }

    #[test]
    #[should_panic(expected = "unexpected entries")]
    fn test_assert_entry_count_fails() {
        let dir = temp_test_dir();
        touch(dir.path(), "one.pp");
        assert_entry_count!(dir.path(), 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_assert_symlink_to_passes() {
        let dir = temp_test_dir();
        let target = touch(dir.path(), "src/file.pp");
        let link = dir.path().join("file.pp");
        std::os::unix::fs::symlink(&target, &link).unwrap();
        assert_symlink_to!(link, target);
    }
}
