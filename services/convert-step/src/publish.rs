//! Copying converted output from the staging area to the output directory.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;
use walkdir::WalkDir;

fn copy_tree(src: &Path, dest: &Path) -> Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", src.display()))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .with_context(|| format!("{} is outside {}", entry.path().display(), src.display()))?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
        } else {
            fs::copy(entry.path(), &target).with_context(|| {
                format!("Failed to copy {} to {}", entry.path().display(), target.display())
            })?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Replace each component directory under `output_dir` with the one of
/// the same name under `staging_output`.
///
/// Returns the number of files copied.
pub fn publish_components(staging_output: &Path, output_dir: &Path) -> Result<usize> {
    let mut components: Vec<_> = fs::read_dir(staging_output)
        .with_context(|| format!("Failed to list {}", staging_output.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    components.sort();

    let mut copied = 0;
    for component in components {
        let Some(name) = component.file_name() else {
            continue;
        };
        let target = output_dir.join(name);
        if target.is_dir() {
            info!(dir = %target.display(), "Deleting old output directory");
            fs::remove_dir_all(&target)
                .with_context(|| format!("Failed to delete {}", target.display()))?;
        }
        info!(src = %component.display(), dest = %target.display(), "Copying component directory");
        copied += copy_tree(&component, &target)?;
    }
    Ok(copied)
}
