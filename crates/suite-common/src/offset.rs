//! Signed calendar offsets.
//!
//! Accepts the ISO 8601 durations used by the workflow scheduler
//! (`P1Y`, `-P1D`, `P1Y6M`, `P2W`) as well as the readable form
//! (`+1 year`, `-1 day`, `+10 years`).

use std::fmt;
use std::str::FromStr;

use chrono::{Days, Months};

use crate::calendar::{Calendar, CalendarDate};
use crate::error::{SuiteError, SuiteResult};

#[derive(Debug, Clone, Copy)]
enum Unit {
    Year,
    Month,
    Week,
    Day,
}

/// A signed duration in years, months and days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Offset {
    pub years: i32,
    pub months: i32,
    pub days: i64,
}

impl Offset {
    pub const fn years(years: i32) -> Self {
        Self { years, months: 0, days: 0 }
    }

    pub const fn months(months: i32) -> Self {
        Self { years: 0, months, days: 0 }
    }

    pub const fn days(days: i64) -> Self {
        Self { years: 0, months: 0, days }
    }

    fn total_months(&self) -> i64 {
        self.years as i64 * 12 + self.months as i64
    }

    /// Add `value` of `unit`; `None` when the total no longer fits.
    fn accumulate(&mut self, unit: Unit, value: i64) -> Option<()> {
        match unit {
            Unit::Year => self.years = self.years.checked_add(i32::try_from(value).ok()?)?,
            Unit::Month => self.months = self.months.checked_add(i32::try_from(value).ok()?)?,
            Unit::Week => self.days = self.days.checked_add(value.checked_mul(7)?)?,
            Unit::Day => self.days = self.days.checked_add(value)?,
        }
        Some(())
    }

    /// Apply this offset to `date`: years and months first, then days.
    pub fn apply(&self, date: CalendarDate, calendar: Calendar) -> SuiteResult<CalendarDate> {
        date.validate(calendar)?;
        let overflow =
            || SuiteError::InvalidDate(format!("{} {} overflows the calendar", date, self));
        match calendar {
            Calendar::Day360 => {
                let month_index =
                    date.year as i64 * 12 + (date.month as i64 - 1) + self.total_months();
                let year = i32::try_from(month_index.div_euclid(12)).map_err(|_| overflow())?;
                let shifted =
                    CalendarDate::new(year, month_index.rem_euclid(12) as u32 + 1, date.day);
                let ordinal = shifted.to_ordinal().checked_add(self.days).ok_or_else(overflow)?;
                CalendarDate::checked_from_ordinal(ordinal).ok_or_else(overflow)
            }
            Calendar::Gregorian => {
                let mut naive = date.to_naive()?;
                let months = self.total_months();
                let span = u32::try_from(months.unsigned_abs()).map_err(|_| overflow())?;
                naive = if months >= 0 {
                    naive.checked_add_months(Months::new(span))
                } else {
                    naive.checked_sub_months(Months::new(span))
                }
                .ok_or_else(overflow)?;
                naive = if self.days >= 0 {
                    naive.checked_add_days(Days::new(self.days as u64))
                } else {
                    naive.checked_sub_days(Days::new(self.days.unsigned_abs()))
                }
                .ok_or_else(overflow)?;
                Ok(CalendarDate::from_naive(naive))
            }
        }
    }

    fn parse_iso(offset: &str, body: &str, sign: i64) -> SuiteResult<Self> {
        let invalid = |message: &str| SuiteError::InvalidOffset {
            offset: offset.to_string(),
            message: message.to_string(),
        };

        let mut result = Offset::default();
        let mut digits = String::new();
        let mut seen_component = false;
        for c in body.chars() {
            match c {
                '0'..='9' => digits.push(c),
                'Y' | 'M' | 'W' | 'D' => {
                    let value: i64 = digits
                        .parse()
                        .map_err(|_| invalid("missing number before designator"))?;
                    digits.clear();
                    seen_component = true;
                    let unit = match c {
                        'Y' => Unit::Year,
                        'M' => Unit::Month,
                        'W' => Unit::Week,
                        _ => Unit::Day,
                    };
                    result
                        .accumulate(unit, sign * value)
                        .ok_or_else(|| invalid("value out of range"))?;
                }
                'T' => return Err(invalid("time components are not supported")),
                _ => return Err(invalid("unexpected character")),
            }
        }
        if !digits.is_empty() {
            return Err(invalid("trailing number without designator"));
        }
        if !seen_component {
            return Err(invalid("empty duration"));
        }
        Ok(result)
    }

    fn parse_words(offset: &str) -> SuiteResult<Self> {
        let invalid = |message: String| SuiteError::InvalidOffset {
            offset: offset.to_string(),
            message,
        };

        let tokens: Vec<&str> = offset.split_whitespace().collect();
        if tokens.is_empty() || tokens.len() % 2 != 0 {
            return Err(invalid("expected '<number> <unit>' pairs".to_string()));
        }

        let mut result = Offset::default();
        for pair in tokens.chunks(2) {
            let value: i64 = pair[0]
                .trim_start_matches('+')
                .parse()
                .map_err(|_| invalid(format!("'{}' is not a number", pair[0])))?;
            let unit = match pair[1].to_lowercase().trim_end_matches('s') {
                "year" => Unit::Year,
                "month" => Unit::Month,
                "week" => Unit::Week,
                "day" => Unit::Day,
                unit => return Err(invalid(format!("unknown unit '{}'", unit))),
            };
            result
                .accumulate(unit, value)
                .ok_or_else(|| invalid(format!("'{}' is out of range", pair[0])))?;
        }
        Ok(result)
    }
}

impl FromStr for Offset {
    type Err = SuiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (sign, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (-1, rest),
            None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        match unsigned.strip_prefix('P') {
            Some(body) => Self::parse_iso(trimmed, body, sign),
            None => Self::parse_words(trimmed),
        }
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}y{:+}m{:+}d", self.years, self.months, self.days)
    }
}

/// Apply `offsets` to `date` left to right.
pub fn apply_offsets(
    date: CalendarDate,
    offsets: &[Offset],
    calendar: Calendar,
) -> SuiteResult<CalendarDate> {
    offsets
        .iter()
        .try_fold(date, |current, offset| offset.apply(current, calendar))
}
