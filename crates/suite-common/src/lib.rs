//! Common types shared by the staging library and the suite step services.
//!
//! - [`calendar`]: dates in the fixed 360-day model calendar and the
//!   Gregorian calendar, with day ordinals relative to 1850-01-01
//! - [`offset`]: signed year/month/day durations and their application
//! - [`window`]: half-open processing windows, stream overrides and
//!   cycle-point parsing
//! - [`error`]: the error taxonomy shared by every component

pub mod calendar;
pub mod error;
pub mod offset;
pub mod window;

pub use calendar::{Calendar, CalendarDate, EPOCH_YEAR};
pub use error::{SuiteError, SuiteResult};
pub use offset::{apply_offsets, Offset};
pub use window::{parse_cycle_point, StreamOverride, TimeWindow};
