//! Model calendar dates.
//!
//! Climate model output is labelled with dates in a fixed 360-day calendar
//! (twelve months of thirty days). Day ordinals count days since
//! 1850-01-01 in that calendar, so ordinal arithmetic is exact and
//! reversible. The Gregorian calendar is supported for offset arithmetic
//! only, via [`chrono`].

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{SuiteError, SuiteResult};

/// Year of ordinal day zero.
pub const EPOCH_YEAR: i32 = 1850;

pub const DAYS_PER_MONTH: i64 = 30;
pub const DAYS_PER_YEAR: i64 = 360;

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Calendar used for date arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Calendar {
    /// Twelve 30-day months.
    Day360,
    /// Proleptic Gregorian.
    Gregorian,
}

impl Calendar {
    pub fn name(&self) -> &'static str {
        match self {
            Calendar::Day360 => "360day",
            Calendar::Gregorian => "gregorian",
        }
    }

    fn days_in_month(&self, year: i32, month: u32) -> u32 {
        match self {
            Calendar::Day360 => DAYS_PER_MONTH as u32,
            Calendar::Gregorian => {
                let (next_year, next_month) = if month == 12 {
                    (year + 1, 1)
                } else {
                    (year, month + 1)
                };
                NaiveDate::from_ymd_opt(next_year, next_month, 1)
                    .and_then(|d| d.pred_opt())
                    .map(|d| d.day())
                    .unwrap_or(31)
            }
        }
    }
}

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Calendar {
    type Err = SuiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "360day" | "360_day" | "360-day" => Ok(Calendar::Day360),
            "gregorian" | "standard" | "proleptic_gregorian" => Ok(Calendar::Gregorian),
            other => Err(SuiteError::Configuration(format!(
                "unknown calendar '{}'",
                other
            ))),
        }
    }
}

/// A calendar date without time of day.
///
/// Field order gives chronological ordering for both calendars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CalendarDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl CalendarDate {
    /// Construct a date without validation.
    pub const fn new(year: i32, month: u32, day: u32) -> Self {
        Self { year, month, day }
    }

    /// Construct a date, checking it exists in `calendar`.
    pub fn checked(year: i32, month: u32, day: u32, calendar: Calendar) -> SuiteResult<Self> {
        let date = Self::new(year, month, day);
        date.validate(calendar)?;
        Ok(date)
    }

    /// First of January of `year`.
    pub const fn jan1(year: i32) -> Self {
        Self::new(year, 1, 1)
    }

    pub fn validate(&self, calendar: Calendar) -> SuiteResult<()> {
        if !(1..=12).contains(&self.month) {
            return Err(SuiteError::InvalidDate(format!(
                "{}: month out of range",
                self
            )));
        }
        if self.day == 0 || self.day > calendar.days_in_month(self.year, self.month) {
            return Err(SuiteError::InvalidDate(format!(
                "{}: day out of range for {} calendar",
                self, calendar
            )));
        }
        Ok(())
    }

    /// Days since 1850-01-01 in the 360-day calendar.
    pub fn to_ordinal(&self) -> i64 {
        (self.year as i64 - EPOCH_YEAR as i64) * DAYS_PER_YEAR
            + (self.month as i64 - 1) * DAYS_PER_MONTH
            + (self.day as i64 - 1)
    }

    /// Inverse of [`CalendarDate::to_ordinal`]; negative ordinals fall before 1850.
    pub fn from_ordinal(ordinal: i64) -> Self {
        let year = EPOCH_YEAR as i64 + ordinal.div_euclid(DAYS_PER_YEAR);
        let day_of_year = ordinal.rem_euclid(DAYS_PER_YEAR);
        Self {
            year: year as i32,
            month: (day_of_year / DAYS_PER_MONTH) as u32 + 1,
            day: (day_of_year % DAYS_PER_MONTH) as u32 + 1,
        }
    }

    /// [`CalendarDate::from_ordinal`], or `None` when the year does not fit.
    pub fn checked_from_ordinal(ordinal: i64) -> Option<Self> {
        i32::try_from(EPOCH_YEAR as i64 + ordinal.div_euclid(DAYS_PER_YEAR)).ok()?;
        Some(Self::from_ordinal(ordinal))
    }

    /// Lowercase three-letter month name, e.g. `jan`.
    pub fn month_abbrev(&self) -> &'static str {
        MONTH_ABBREVIATIONS[(self.month.clamp(1, 12) - 1) as usize]
    }

    /// `YYYYMMDD`, as used in model output filenames.
    pub fn compact(&self) -> String {
        format!("{:04}{:02}{:02}", self.year, self.month, self.day)
    }

    /// Parse a `YYYY-MM-DD` label such as a cycle directory name.
    ///
    /// Only the shape and generic month/day ranges are checked, since
    /// labels may come from either calendar.
    pub fn parse_iso(s: &str) -> SuiteResult<Self> {
        let bytes = s.as_bytes();
        let shaped = bytes.len() == 10
            && bytes[4] == b'-'
            && bytes[7] == b'-'
            && bytes
                .iter()
                .enumerate()
                .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
        if !shaped {
            return Err(SuiteError::InvalidDate(format!("'{}' is not YYYY-MM-DD", s)));
        }

        let number = |range: std::ops::Range<usize>| -> SuiteResult<u32> {
            s[range]
                .parse::<u32>()
                .map_err(|e| SuiteError::InvalidDate(format!("'{}': {}", s, e)))
        };
        let date = Self::new(number(0..4)? as i32, number(5..7)?, number(8..10)?);
        if !(1..=12).contains(&date.month) || !(1..=31).contains(&date.day) {
            return Err(SuiteError::InvalidDate(format!("'{}' is out of range", s)));
        }
        Ok(date)
    }

    pub(crate) fn to_naive(self) -> SuiteResult<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day).ok_or_else(|| {
            SuiteError::InvalidDate(format!("{} does not exist in the gregorian calendar", self))
        })
    }

    pub(crate) fn from_naive(date: NaiveDate) -> Self {
        Self::new(date.year(), date.month(), date.day())
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}
