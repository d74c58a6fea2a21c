//! Processing windows and the strings that define them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::calendar::CalendarDate;
use crate::error::{SuiteError, SuiteResult};

/// Half-open date window `[start, end)`.
///
/// A window with `end <= start` is representable and means there is no
/// work to do; callers check [`TimeWindow::has_work`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: CalendarDate,
    pub end: CalendarDate,
}

impl TimeWindow {
    pub fn new(start: CalendarDate, end: CalendarDate) -> Self {
        Self { start, end }
    }

    pub fn has_work(&self) -> bool {
        self.end > self.start
    }

    /// Length in 360-day calendar days; negative for inverted windows.
    pub fn length_days(&self) -> i64 {
        self.end.to_ordinal() - self.start.to_ordinal()
    }

    /// Inclusive containment, `start <= date <= end`.
    pub fn contains_inclusive(&self, date: &CalendarDate) -> bool {
        date >= &self.start && date <= &self.end
    }

    /// Window covering whole years `[Jan 1 start_year, Jan 1 end_year)`.
    pub fn from_years(start_year: i32, end_year: i32) -> Self {
        Self::new(CalendarDate::jan1(start_year), CalendarDate::jan1(end_year))
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Per-stream restriction to an inclusive range of years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamOverride {
    pub start_year: i32,
    pub end_year: i32,
}

impl StreamOverride {
    /// Parse `"[1852, 1857]"`; the literal `None` means no override.
    pub fn parse(s: &str) -> SuiteResult<Option<Self>> {
        let trimmed = s.trim();
        if trimmed == "None" || trimmed.is_empty() {
            return Ok(None);
        }

        let invalid = || {
            SuiteError::Configuration(format!(
                "stream override '{}' is not of the form [<start year>, <end year>]",
                s
            ))
        };
        let inner = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(invalid)?;
        let years: Vec<i32> = inner
            .split(',')
            .map(|part| part.trim().parse::<i32>())
            .collect::<Result<_, _>>()
            .map_err(|_| invalid())?;

        match years.as_slice() {
            [start_year, end_year] => Ok(Some(Self {
                start_year: *start_year,
                end_year: *end_year,
            })),
            _ => Err(invalid()),
        }
    }

    /// `[Jan 1 start_year, Jan 1 (end_year + 1))`.
    pub fn window(&self) -> TimeWindow {
        TimeWindow::from_years(self.start_year, self.end_year + 1)
    }
}

/// Parse a scheduler cycle point such as `18500101T0000Z`.
///
/// Only the date part is kept; cycles always start at midnight.
pub fn parse_cycle_point(s: &str) -> SuiteResult<CalendarDate> {
    let trimmed = s.trim();
    let invalid = || SuiteError::Configuration(format!("invalid cycle point '{}'", s));

    let date_part = trimmed.get(..8).ok_or_else(invalid)?;
    if !date_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let rest = &trimmed[8..];
    if !(rest.is_empty() || rest.starts_with('T')) {
        return Err(invalid());
    }

    let year = date_part[0..4].parse::<i32>().map_err(|_| invalid())?;
    let month = date_part[4..6].parse::<u32>().map_err(|_| invalid())?;
    let day = date_part[6..8].parse::<u32>().map_err(|_| invalid())?;
    Ok(CalendarDate::new(year, month, day))
}
