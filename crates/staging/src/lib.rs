//! Staging library for climate model output.
//!
//! Restricts what a conversion job step can see to exactly the files it
//! needs, and rearranges converted output ready for concatenation.
//!
//! # Pipeline
//!
//! - [`bounds`]: the date window a job step processes
//! - [`expected`]: filenames a stream should have produced in that window
//! - [`locate`]: where those files actually are in the suite output tree
//! - [`stage`]: copy or symlink them into the step's working directory
//! - [`organise`]: move converted output from `<cycle>/<component>` to
//!   `<table>/<variable>` and clear the emptied directories
//!
//! Per-file activity is reported through a [`FileObserver`] supplied by
//! the caller rather than a process-wide logger.

pub mod bounds;
pub mod expected;
pub mod locate;
pub mod observer;
pub mod organise;
pub mod stage;
pub mod streams;

// Re-exports
pub use bounds::{compute_bounds, RunBounds};
pub use expected::{expected_files, ExpectedFile};
pub use locate::{locate, FileIndex};
pub use observer::{FileEvent, FileObserver, RecordingObserver, TracingObserver};
pub use organise::{
    apply_moves, decode_table_variable, remove_directories, reorganize, transpose,
    MoveManifest, RemovalPolicy, RemovalReport, RemovalSet, TransposeReport,
};
pub use stage::{stage_copy, stage_link, StageMode, StageOutcome, Stager, StagingSummary, WorkStatus};
pub use streams::{run_id, StreamFamily, StreamSpec, StreamTable, OCEAN_SUBSTREAMS};
pub use suite_common::{SuiteError, SuiteResult};
