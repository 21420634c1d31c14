#![forbid(unsafe_code)]

use chrono::{Datelike, Months, NaiveDate};

use aditivo_kernel_contracts::FormatError;

use crate::locale_text::DateText;

/// Whole calendar months from `start` to `end`.
///
/// A month only counts once `end` reaches the same day-of-month as `start`;
/// spans running backwards are clamped to zero.
pub fn months_between(start: NaiveDate, end: NaiveDate) -> u32 {
    let mut months = i64::from(end.year() - start.year()) * 12
        + (i64::from(end.month()) - i64::from(start.month()));
    if end.day() < start.day() {
        months -= 1;
    }
    u32::try_from(months.max(0)).unwrap_or(u32::MAX)
}

/// Text entry point: both dates go through the locale codec first.
pub fn months_between_text(
    codec: &dyn DateText,
    start: &str,
    end: &str,
) -> Result<u32, FormatError> {
    let start = codec.parse_date(start)?;
    let end = codec.parse_date(end)?;
    Ok(months_between(start, end))
}

/// Calendar month arithmetic; day-of-month clamps to the end of shorter months.
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(months))
}
