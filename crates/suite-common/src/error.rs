//! Error types for suite staging.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias using SuiteError.
pub type SuiteResult<T> = Result<T, SuiteError>;

/// Primary error type for staging and reorganisation.
///
/// A file that is expected but not yet on disk is never an error; see
/// the staging outcomes for that case.
#[derive(Debug, Error)]
pub enum SuiteError {
    // === Configuration Errors ===
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Stream \"{0}\" not recognised")]
    UnrecognizedStream(String),

    #[error("Invalid offset '{offset}': {message}")]
    InvalidOffset { offset: String, message: String },

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    // === Calendar Errors ===
    #[error("Calendar '{0}' is not supported for stream override clamping")]
    UnsupportedCalendar(String),

    // === Filesystem Errors ===
    #[error("Directory not found: {}", .0.display())]
    MissingRoot(PathBuf),

    #[error("Giving up after {failures} failed directory removals")]
    RemovalThreshold { failures: usize },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SuiteError {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        SuiteError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Category name used in logs by the step services.
    pub fn kind(&self) -> &'static str {
        match self {
            SuiteError::Configuration(_)
            | SuiteError::UnrecognizedStream(_)
            | SuiteError::InvalidOffset { .. }
            | SuiteError::InvalidDate(_) => "ConfigurationError",
            SuiteError::UnsupportedCalendar(_) => "CalendarError",
            SuiteError::MissingRoot(_) => "NotFoundError",
            SuiteError::RemovalThreshold { .. } => "PartialFailure",
            SuiteError::Io { .. } => "IoError",
        }
    }
}
