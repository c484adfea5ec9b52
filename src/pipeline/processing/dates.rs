//! Month-first calendar date parsing for the `day` column.
//!
//! Numeric forms are always read month before day; `03/04/2024` is March 4th
//! and `13/04/2024` is rejected rather than reinterpreted.

use chrono::{DateTime, NaiveDate, NaiveTime};

const NAMED_FORMATS: &[&str] = &[
    "%b %d %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%a %b %d %Y",
];

const TIME_FORMATS: &[&str] = &[
    "%H:%M:%S%.f",
    "%H:%M:%S",
    "%H:%M",
    "%I:%M:%S %p",
    "%I:%M %p",
    "%I:%M%p",
];

/// Parse a `day` cell; time-of-day and offsets are dropped.
pub fn parse_day(value: &str) -> Option<NaiveDate> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }

    let date = strip_time(value);
    for fmt in NAMED_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(date, fmt) {
            return Some(parsed);
        }
    }

    parse_numeric(date)
}

/// `2024-03-01 10:15:00`, `3/4/2024 10:15 AM` and `Mar 1 2024 10:00` lose
/// everything from the first separator that starts a time of day
fn strip_time(value: &str) -> &str {
    value
        .match_indices([' ', 'T'])
        .map(|(idx, _)| idx)
        .find(|&idx| idx > 0 && is_time(value[idx + 1..].trim()))
        .map_or(value, |idx| value[..idx].trim_end())
}

fn is_time(value: &str) -> bool {
    TIME_FORMATS
        .iter()
        .any(|fmt| NaiveTime::parse_from_str(value, fmt).is_ok())
}

fn parse_numeric(value: &str) -> Option<NaiveDate> {
    if value.len() == 8 && value.chars().all(|c| c.is_ascii_digit()) {
        return NaiveDate::parse_from_str(value, "%Y%m%d").ok();
    }

    let sep = value.chars().find(|c| matches!(c, '-' | '/' | '.'))?;
    let parts: Vec<&str> = value.split(sep).collect();
    let numeric = |p: &&str| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit());
    if parts.len() != 3 || !parts.iter().all(numeric) {
        return None;
    }

    let (year, month, day) = if parts[0].len() == 4 {
        (parts[0], parts[1], parts[2])
    } else {
        (parts[2], parts[0], parts[1])
    };
    if month.len() > 2 || day.len() > 2 {
        return None;
    }

    let year: i32 = match year.len() {
        4 => year.parse().ok()?,
        2 => expand_two_digit_year(year.parse().ok()?),
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
}

/// Same pivot as `%y`: 69-99 is the 1900s, 00-68 the 2000s
fn expand_two_digit_year(yy: i32) -> i32 {
    if yy >= 69 {
        1900 + yy
    } else {
        2000 + yy
    }
}
