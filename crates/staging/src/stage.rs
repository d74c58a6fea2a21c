//! Materialising located files in a job step's working directory.
//!
//! Two modes: copy (for an isolated staging area) and symlink (for the
//! task work directory). Both are idempotent: re-running with the same
//! inputs leaves at most one file or link per basename.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use suite_common::{SuiteError, SuiteResult};
use tracing::info;

use crate::expected::ExpectedFile;
use crate::locate::FileIndex;
use crate::observer::{FileEvent, FileObserver};

/// How located files are made visible to the conversion tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageMode {
    Copy,
    Link,
}

/// Result of staging one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Copied(PathBuf),
    Linked(PathBuf),
    /// The copy failed; the step carries on without the file.
    CopyFailed,
    /// The source does not exist, so no link was made.
    SourceMissing,
}

impl StageOutcome {
    pub fn is_staged(&self) -> bool {
        matches!(self, StageOutcome::Copied(_) | StageOutcome::Linked(_))
    }
}

fn ensure_dir(dir: &Path, observer: &dyn FileObserver) -> SuiteResult<()> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|e| SuiteError::io(dir, e))?;
    observer.notify(FileEvent::DirectoryCreated {
        path: dir.to_path_buf(),
    });
    Ok(())
}

fn destination_for(src: &Path, dest_dir: &Path) -> SuiteResult<PathBuf> {
    let name = src.file_name().ok_or_else(|| {
        SuiteError::Configuration(format!("{} has no file name", src.display()))
    })?;
    Ok(dest_dir.join(name))
}

fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|meta| meta.file_type().is_symlink())
        .unwrap_or(false)
}

/// `src` made absolute against the current directory, so a link to it
/// resolves wherever the link lives.
fn absolute_source(src: &Path) -> SuiteResult<PathBuf> {
    if src.is_absolute() {
        return Ok(src.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| SuiteError::io(src, e))?;
    Ok(cwd.join(src))
}

#[cfg(unix)]
fn make_symlink(src: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, link)
}

#[cfg(windows)]
fn make_symlink(src: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(src, link)
}

/// Copy `src` into `dest_dir`, keeping its name.
///
/// Only failing to create `dest_dir` is an error; a failed copy is
/// reported and returned as [`StageOutcome::CopyFailed`].
pub fn stage_copy(
    src: &Path,
    dest_dir: &Path,
    observer: &dyn FileObserver,
) -> SuiteResult<StageOutcome> {
    ensure_dir(dest_dir, observer)?;
    let destination = destination_for(src, dest_dir)?;

    // A link left by an earlier link-mode run would make the copy write
    // through to the archived source.
    if is_symlink(&destination) {
        fs::remove_file(&destination).map_err(|e| SuiteError::io(&destination, e))?;
        observer.notify(FileEvent::LinkRemoved {
            link: destination.clone(),
        });
    }

    match fs::copy(src, &destination) {
        Ok(_) => {
            observer.notify(FileEvent::Copied {
                source: src.to_path_buf(),
                destination: destination.clone(),
            });
            Ok(StageOutcome::Copied(destination))
        }
        Err(e) => {
            observer.notify(FileEvent::CopyFailed {
                source: src.to_path_buf(),
                message: e.to_string(),
            });
            Ok(StageOutcome::CopyFailed)
        }
    }
}

/// Symlink `src` into `dest_dir`, replacing any existing link of the
/// same name (including dangling ones). The link target is always
/// absolute.
pub fn stage_link(
    src: &Path,
    dest_dir: &Path,
    observer: &dyn FileObserver,
) -> SuiteResult<StageOutcome> {
    ensure_dir(dest_dir, observer)?;
    let link = destination_for(src, dest_dir)?;
    let src = absolute_source(src)?;

    if fs::symlink_metadata(&link).is_ok() {
        fs::remove_file(&link).map_err(|e| SuiteError::io(&link, e))?;
        observer.notify(FileEvent::LinkRemoved { link: link.clone() });
    }

    if !src.exists() {
        observer.notify(FileEvent::SourceMissing { source: src });
        return Ok(StageOutcome::SourceMissing);
    }

    make_symlink(&src, &link).map_err(|e| SuiteError::io(&link, e))?;
    observer.notify(FileEvent::Linked {
        source: src,
        link: link.clone(),
    });
    Ok(StageOutcome::Linked(link))
}

/// What a staging run achieved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StagingSummary {
    /// Files the stream should have for the window.
    pub expected: usize,
    /// Of those, files found in the suite output.
    pub located: usize,
    /// Of those, files copied or linked.
    pub staged: usize,
}

impl StagingSummary {
    pub fn missing(&self) -> usize {
        self.expected - self.located
    }

    pub fn work_status(&self) -> WorkStatus {
        if self.expected == 0 {
            WorkStatus::NoExpectedFiles
        } else if self.located == 0 {
            WorkStatus::NothingFound
        } else if self.staged == 0 {
            WorkStatus::NothingStaged
        } else {
            WorkStatus::Staged(self.staged)
        }
    }
}

/// Whether a staging run left the conversion tool anything to do.
///
/// Only [`WorkStatus::Staged`] lets a job step continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkStatus {
    /// The window produced no expected filenames at all.
    NoExpectedFiles,
    /// Files were expected but none exist in the suite output.
    NothingFound,
    /// Files were found but every copy failed.
    NothingStaged,
    Staged(usize),
}

impl WorkStatus {
    pub fn has_work(&self) -> bool {
        matches!(self, WorkStatus::Staged(_))
    }
}

/// Stages files into one destination directory in a fixed mode.
pub struct Stager<'a> {
    mode: StageMode,
    dest_dir: PathBuf,
    observer: &'a dyn FileObserver,
}

impl<'a> Stager<'a> {
    pub fn new(mode: StageMode, dest_dir: impl Into<PathBuf>, observer: &'a dyn FileObserver) -> Self {
        Self {
            mode,
            dest_dir: dest_dir.into(),
            observer,
        }
    }

    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }

    pub fn stage(&self, src: &Path) -> SuiteResult<StageOutcome> {
        match self.mode {
            StageMode::Copy => stage_copy(src, &self.dest_dir, self.observer),
            StageMode::Link => stage_link(src, &self.dest_dir, self.observer),
        }
    }

    /// Locate each expected file in `index` and stage the ones found.
    ///
    /// Files are independent and target distinct destinations, so they
    /// are staged in parallel.
    pub fn stage_all(&self, index: &FileIndex, expected: &[ExpectedFile]) -> SuiteResult<StagingSummary> {
        ensure_dir(&self.dest_dir, self.observer)?;

        let outcomes = expected
            .par_iter()
            .map(|file| match index.locate(&file.name, self.observer) {
                Some(src) => self.stage(src).map(Some),
                None => {
                    self.observer.notify(FileEvent::NotLocated {
                        name: file.name.clone(),
                    });
                    Ok(None)
                }
            })
            .collect::<SuiteResult<Vec<_>>>()?;

        let summary = StagingSummary {
            expected: expected.len(),
            located: outcomes.iter().filter(|o| o.is_some()).count(),
            staged: outcomes
                .iter()
                .flatten()
                .filter(|outcome| outcome.is_staged())
                .count(),
        };
        info!(
            dest = %self.dest_dir.display(),
            expected = summary.expected,
            located = summary.located,
            staged = summary.staged,
            "Staging complete"
        );
        Ok(summary)
    }
}
