//! Block timestamp handling.
//!
//! The fills API reports `block_timestamp` as an HTTP-style date such as
//! `"Mon, 02 Jan 2023 10:00:00 GMT"`. Pagination needs it as a Unix epoch and
//! the daily reports group on the calendar-date slice of the raw string.

use chrono::{NaiveDateTime, Weekday};

/// 0-based character offset of the calendar date inside a block timestamp.
const CALENDAR_DATE_OFFSET: usize = 5;
/// Width of the calendar date slice (`"02 Jan 2023"`).
const CALENDAR_DATE_LEN: usize = 11;

// The weekday prefix is validated separately and never checked against the date.
const FORMAT_FOUR_DIGIT_YEAR: &str = "%d %b %Y %H:%M:%S";
const FORMAT_TWO_DIGIT_YEAR: &str = "%d %b %y %H:%M:%S";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TimestampError {
    #[error("Invalid block timestamp {value:?}: expected \"<Dow>, <DD> <Mon> <YYYY> <HH:MM:SS> <TZ>\"")]
    Format { value: String },

    #[error("Invalid block timestamp {value:?}: {reason}")]
    Parse { value: String, reason: String },
}

/// Parse a block timestamp into a Unix timestamp (seconds).
///
/// The trailing timezone label is ignored and the wall-clock time is taken
/// as UTC. Both four- and two-digit years are accepted. The weekday must be a
/// valid abbreviation but need not agree with the date.
///
/// ```
/// use fillbook::timestamp::parse_block_timestamp;
///
/// assert_eq!(parse_block_timestamp("Mon, 02 Jan 2023 10:00:00 GMT").unwrap(), 1_672_653_600);
/// assert_eq!(parse_block_timestamp("Mon, 02 Jan 23 10:00:00 UTC").unwrap(), 1_672_653_600);
/// ```
pub fn parse_block_timestamp(value: &str) -> Result<i64, TimestampError> {
    let format_error = || TimestampError::Format {
        value: value.to_string(),
    };

    let (wall_clock, zone) = value.trim().rsplit_once(' ').ok_or_else(format_error)?;
    if zone.is_empty() || zone.contains(':') {
        return Err(format_error());
    }

    let (weekday, date_time) = wall_clock.split_once(", ").ok_or_else(format_error)?;
    if weekday.len() != 3 || weekday.parse::<Weekday>().is_err() {
        return Err(format_error());
    }

    let year = date_time
        .split_whitespace()
        .nth(2)
        .ok_or_else(format_error)?;
    let format = match year.len() {
        2 => FORMAT_TWO_DIGIT_YEAR,
        4 => FORMAT_FOUR_DIGIT_YEAR,
        _ => return Err(format_error()),
    };

    let parsed =
        NaiveDateTime::parse_from_str(date_time, format).map_err(|e| TimestampError::Parse {
            value: value.to_string(),
            reason: e.to_string(),
        })?;

    Ok(parsed.and_utc().timestamp())
}

/// Calendar-date slice of a block timestamp, used as the daily grouping key.
///
/// Takes the 11 characters starting at character offset 5, so
/// `"Mon, 02 Jan 2023 10:00:00 GMT"` yields `"02 Jan 2023"`. Shorter strings
/// are clamped rather than rejected.
pub fn calendar_date(block_timestamp: &str) -> &str {
    let len = block_timestamp.len();
    let mut boundaries = block_timestamp
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(len));

    let start = boundaries.nth(CALENDAR_DATE_OFFSET).unwrap_or(len);
    let end = boundaries.nth(CALENDAR_DATE_LEN - 1).unwrap_or(len);
    &block_timestamp[start..end]
}
