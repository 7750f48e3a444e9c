//! Date parsing and spin-up window arithmetic

use crate::types::{StarsError, StarsResult};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

/// Anything that can stand in for an acquisition date: a date value or an ISO-8601 string
pub trait DateArg {
    fn to_date(&self) -> StarsResult<NaiveDate>;
}

impl DateArg for NaiveDate {
    fn to_date(&self) -> StarsResult<NaiveDate> {
        Ok(*self)
    }
}

impl DateArg for NaiveDateTime {
    fn to_date(&self) -> StarsResult<NaiveDate> {
        Ok(self.date())
    }
}

impl DateArg for DateTime<Utc> {
    fn to_date(&self) -> StarsResult<NaiveDate> {
        Ok(self.date_naive())
    }
}

impl DateArg for str {
    fn to_date(&self) -> StarsResult<NaiveDate> {
        parse_date(self)
    }
}

impl DateArg for String {
    fn to_date(&self) -> StarsResult<NaiveDate> {
        parse_date(self)
    }
}

impl<T: DateArg + ?Sized> DateArg for &T {
    fn to_date(&self) -> StarsResult<NaiveDate> {
        (**self).to_date()
    }
}

/// Resolve a date argument to a calendar date
pub fn get_date<D: DateArg>(date: D) -> StarsResult<NaiveDate> {
    date.to_date()
}

/// Parse an ISO-8601 date or date-time string, keeping only the UTC date
pub fn parse_date(input: &str) -> StarsResult<NaiveDate> {
    let trimmed = input.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y%m%d") {
        return Ok(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc).date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y%m%dT%H%M%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(dt.date());
        }
    }

    Err(StarsError::InvalidDate {
        input: input.to_string(),
        reason: "expected an ISO-8601 date such as 2024-10-30".to_string(),
    })
}

/// Inclusive window of source observations ending on the target date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinupWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SpinupWindow {
    /// Window covering `days` days before `target` up to and including `target`
    pub fn ending_on<D: DateArg>(target: D, days: i64) -> StarsResult<Self> {
        if days < 0 {
            return Err(StarsError::InvalidArgument(format!(
                "spin-up length must not be negative, got {}",
                days
            )));
        }
        let end = target.to_date()?;
        let start = Duration::try_days(days)
            .and_then(|span| end.checked_sub_signed(span))
            .ok_or_else(|| {
                StarsError::InvalidArgument(format!(
                    "spin-up of {} days before {} is outside the supported date range",
                    days, end
                ))
            })?;
        Ok(Self { start, end })
    }

    /// Days between start and end
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Every date in the window, both ends included
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        date_range(self.start, self.end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl std::fmt::Display for SpinupWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Daily iteration from `start` to `end`, inclusive
pub fn date_range(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |date| *date <= end)
}
