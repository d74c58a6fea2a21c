//! Per-file event reporting.
//!
//! Staging and reorganisation report what they do to an observer handed
//! in by the caller. Services use [`TracingObserver`]; tests use
//! [`RecordingObserver`] to assert on the exact sequence of events.

use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{info, warn};

/// Something that happened to a single file or directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    DirectoryCreated { path: PathBuf },
    NotLocated { name: String },
    /// Several files share the name; `candidates` is sorted and the first is used.
    AmbiguousMatch { name: String, candidates: Vec<PathBuf> },
    Copied { source: PathBuf, destination: PathBuf },
    CopyFailed { source: PathBuf, message: String },
    LinkRemoved { link: PathBuf },
    Linked { source: PathBuf, link: PathBuf },
    SourceMissing { source: PathBuf },
    Moved { source: PathBuf, destination: PathBuf },
    DirectoryRemoved { path: PathBuf },
    RemovalFailed { path: PathBuf, message: String },
    /// A converted file whose name gives no MIP table and variable.
    Undecodable { path: PathBuf },
}

/// Receiver of [`FileEvent`]s. Shared across worker threads while staging.
pub trait FileObserver: Send + Sync {
    fn notify(&self, event: FileEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl FileObserver for TracingObserver {
    fn notify(&self, event: FileEvent) {
        match event {
            FileEvent::DirectoryCreated { path } => {
                info!(path = %path.display(), "Created directory")
            }
            FileEvent::NotLocated { name } => {
                warn!(file = %name, "Expected file not found in suite output")
            }
            FileEvent::AmbiguousMatch { name, candidates } => warn!(
                file = %name,
                candidates = ?candidates,
                "Multiple candidates found, using the first in path order"
            ),
            FileEvent::Copied { source, destination } => info!(
                src = %source.display(),
                dest = %destination.display(),
                "Copied file"
            ),
            FileEvent::CopyFailed { source, message } => {
                warn!(src = %source.display(), error = %message, "Unable to copy file")
            }
            FileEvent::LinkRemoved { link } => {
                info!(link = %link.display(), "Removed existing symlink")
            }
            FileEvent::Linked { source, link } => info!(
                src = %source.display(),
                link = %link.display(),
                "Linked file"
            ),
            FileEvent::SourceMissing { source } => warn!(
                src = %source.display(),
                "Could not create symlink: file not found"
            ),
            FileEvent::Moved { source, destination } => info!(
                src = %source.display(),
                dest = %destination.display(),
                "Moved file"
            ),
            FileEvent::DirectoryRemoved { path } => {
                info!(path = %path.display(), "Removed directory")
            }
            FileEvent::RemovalFailed { path, message } => warn!(
                path = %path.display(),
                error = %message,
                "Failed to remove directory, attempting to continue"
            ),
            FileEvent::Undecodable { path } => warn!(
                file = %path.display(),
                "Cannot determine MIP table and variable, skipping"
            ),
        }
    }
}

/// Keeps every event in arrival order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<FileEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<FileEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Number of recorded events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&FileEvent) -> bool) -> usize {
        self.events().iter().filter(|e| predicate(e)).count()
    }
}

impl FileObserver for RecordingObserver {
    fn notify(&self, event: FileEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
