//! Reorganising converted output for concatenation.
//!
//! The conversion tool writes `<root>/<YYYY-MM-DD>/<component>/*.nc`.
//! Concatenation wants `<dest>/<mip table>/<variable>/*.nc`. Converted
//! filenames start `<variable>_<mip table>_`, which is all that is needed
//! to route each file.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use suite_common::{CalendarDate, SuiteError, SuiteResult, TimeWindow};
use tracing::{debug, error, info};

use crate::observer::{FileEvent, FileObserver};

/// Files to move, by MIP table then variable.
pub type MoveManifest = BTreeMap<String, BTreeMap<String, Vec<PathBuf>>>;

/// Directories to delete once emptied, children before their parents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovalSet {
    paths: Vec<PathBuf>,
}

impl RemovalSet {
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl From<Vec<PathBuf>> for RemovalSet {
    fn from(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

/// How many failed directory removals are tolerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovalPolicy {
    /// Removal stops with an error once this many failures accumulate.
    pub max_failures: usize,
}

impl RemovalPolicy {
    pub fn new(max_failures: usize) -> Self {
        Self {
            max_failures: max_failures.max(1),
        }
    }
}

impl Default for RemovalPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Directory removal tally when the failure threshold was not reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemovalReport {
    pub removed: usize,
    pub failures: usize,
}

/// Split a converted filename into `(table, variable)`.
///
/// `tas_Amon_UKESM1_185001-185912.nc` gives `("Amon", "tas")`.
pub fn decode_table_variable(filename: &str) -> Option<(String, String)> {
    let mut tokens = filename.split('_');
    let variable = tokens.next().filter(|t| !t.is_empty())?;
    let table = tokens.next().filter(|t| !t.is_empty())?;
    Some((table.to_string(), variable.to_string()))
}

/// Sorted entries of `dir` that satisfy `keep`.
fn sorted_entries(dir: &Path, keep: impl Fn(&Path) -> bool) -> SuiteResult<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| SuiteError::io(dir, e))? {
        let path = entry.map_err(|e| SuiteError::io(dir, e))?.path();
        if keep(&path) {
            entries.push(path);
        }
    }
    entries.sort();
    Ok(entries)
}

fn cycle_date(path: &Path) -> Option<CalendarDate> {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| CalendarDate::parse_iso(name).ok())
}

/// Scan `output_root` for cycle directories dated within `window`
/// (inclusive at both ends) and plan the moves.
///
/// Files whose names do not decode are left in place and reported to
/// `observer`.
pub fn reorganize(
    output_root: &Path,
    window: &TimeWindow,
    observer: &dyn FileObserver,
) -> SuiteResult<(RemovalSet, MoveManifest)> {
    if !output_root.exists() {
        return Err(SuiteError::MissingRoot(output_root.to_path_buf()));
    }

    let mut manifest = MoveManifest::new();
    let mut component_dirs = Vec::new();
    let mut cycle_dirs = Vec::new();

    let cycles = sorted_entries(output_root, |path| {
        path.is_dir() && cycle_date(path).is_some_and(|date| window.contains_inclusive(&date))
    })?;

    for cycle_dir in cycles {
        info!(path = %cycle_dir.display(), "Cycle directory included in this window");
        for component_dir in sorted_entries(&cycle_dir, Path::is_dir)? {
            let files = sorted_entries(&component_dir, |path| {
                path.is_file() && path.extension().is_some_and(|ext| ext == "nc")
            })?;
            for file in files {
                let name = file
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or_default()
                    .to_string();
                match decode_table_variable(&name) {
                    Some((table, variable)) => manifest
                        .entry(table)
                        .or_default()
                        .entry(variable)
                        .or_default()
                        .push(file),
                    None => observer.notify(FileEvent::Undecodable { path: file }),
                }
            }
            component_dirs.push(component_dir);
        }
        cycle_dirs.push(cycle_dir);
    }

    for (table, variables) in &manifest {
        let counts: Vec<String> = variables
            .iter()
            .map(|(variable, files)| format!("{} ({})", variable, files.len()))
            .collect();
        info!(table = %table, variables = %counts.join(", "), "Found files to move");
    }

    component_dirs.extend(cycle_dirs);
    Ok((RemovalSet::from(component_dirs), manifest))
}

/// Rename `src` to `dest`, or copy then delete when rename fails.
///
/// A failed copy leaves no destination file behind.
fn move_file(src: &Path, dest: &Path) -> io::Result<()> {
    match fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            // rename cannot cross filesystems
            debug!(src = %src.display(), error = %rename_err, "Rename failed, copying instead");
            if let Err(copy_err) = fs::copy(src, dest) {
                if fs::symlink_metadata(dest).is_ok_and(|meta| meta.is_file()) {
                    let _ = fs::remove_file(dest);
                }
                return Err(copy_err);
            }
            fs::remove_file(src)
        }
    }
}

/// Move every file in `manifest` to `dest_root/<table>/<variable>/`,
/// replacing files of the same name left by an earlier run.
pub fn apply_moves(
    manifest: &MoveManifest,
    dest_root: &Path,
    observer: &dyn FileObserver,
) -> SuiteResult<usize> {
    let mut moved = 0;
    for (table, variables) in manifest {
        for (variable, files) in variables {
            let variable_dir = dest_root.join(table).join(variable);
            if !variable_dir.is_dir() {
                fs::create_dir_all(&variable_dir).map_err(|e| SuiteError::io(&variable_dir, e))?;
                observer.notify(FileEvent::DirectoryCreated {
                    path: variable_dir.clone(),
                });
            }

            for src in files {
                let Some(name) = src.file_name() else {
                    continue;
                };
                let dest = variable_dir.join(name);
                if fs::symlink_metadata(&dest).is_ok() {
                    fs::remove_file(&dest).map_err(|e| SuiteError::io(&dest, e))?;
                }
                move_file(src, &dest).map_err(|e| SuiteError::io(src, e))?;
                observer.notify(FileEvent::Moved {
                    source: src.clone(),
                    destination: dest,
                });
                moved += 1;
            }
        }
    }
    Ok(moved)
}

/// Remove each (expected empty) directory in order.
///
/// Failures are reported and counted; reaching `policy.max_failures`
/// stops removal with [`SuiteError::RemovalThreshold`].
pub fn remove_directories(
    removal_set: &RemovalSet,
    policy: RemovalPolicy,
    observer: &dyn FileObserver,
) -> SuiteResult<RemovalReport> {
    let mut report = RemovalReport::default();
    for path in removal_set.paths() {
        match fs::remove_dir(path) {
            Ok(()) => {
                report.removed += 1;
                observer.notify(FileEvent::DirectoryRemoved { path: path.clone() });
            }
            Err(e) => {
                report.failures += 1;
                observer.notify(FileEvent::RemovalFailed {
                    path: path.clone(),
                    message: e.to_string(),
                });
                if report.failures >= policy.max_failures {
                    error!(failures = report.failures, "Failed to remove directories, giving up");
                    return Err(SuiteError::RemovalThreshold {
                        failures: report.failures,
                    });
                }
            }
        }
    }
    Ok(report)
}

/// Outcome of a full [`transpose`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransposeReport {
    pub files_moved: usize,
    pub removal: RemovalReport,
}

/// Reorganise, move, then clear emptied directories.
pub fn transpose(
    output_root: &Path,
    dest_root: &Path,
    window: &TimeWindow,
    policy: RemovalPolicy,
    observer: &dyn FileObserver,
) -> SuiteResult<TransposeReport> {
    info!(
        src = %output_root.display(),
        dest = %dest_root.display(),
        window = %window,
        "Transposing directory structure"
    );
    let (removal_set, manifest) = reorganize(output_root, window, observer)?;
    let files_moved = apply_moves(&manifest, dest_root, observer)?;
    let removal = remove_directories(&removal_set, policy, observer)?;
    Ok(TransposeReport {
        files_moved,
        removal,
    })
}
