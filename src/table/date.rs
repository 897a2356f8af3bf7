//! Calendar date recognition for the date columns.
//!
//! Accepted: ISO 8601 dates and date-times, `YYYY/MM/DD`, `YYYY.MM.DD`,
//! month-name forms (`January 15, 2024`, `15 Jan 2024`, `15-Jan-2024`) and
//! numeric day/month forms (`15/01/2024`, `01/15/2024`) when one component
//! exceeds 12. Ambiguous values such as `03/04/2024` are rejected.

use crate::table::Value;
use chrono::DateTime;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::LazyLock;

const DATE_FORMATS: [&str; 10] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %B, %Y",
    "%d-%B-%Y",
    "%A, %B %d, %Y",
    "%a, %d %b %Y",
];

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

static DAY_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{4})(?:[ T]\d{1,2}:\d{2}(?::\d{2})?)?$").expect("Hardcode regex pattern")
});

/// Parses text as a calendar date, dropping any time of day.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
    {
        return Some(date);
    }
    if let Some(datetime) = DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
    {
        return Some(datetime.date());
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Some(datetime.date_naive());
    }
    parse_day_month(text)
}

fn parse_day_month(text: &str) -> Option<NaiveDate> {
    let captures = DAY_MONTH.captures(text)?;
    let first = captures.get(1)?.as_str().parse::<u32>().ok()?;
    let second = captures.get(2)?.as_str().parse::<u32>().ok()?;
    let year = captures.get(3)?.as_str().parse::<i32>().ok()?;
    let (day, month) = if first == second || (first > 12 && second <= 12) {
        (first, second)
    } else if second > 12 && first <= 12 {
        (second, first)
    } else {
        return None;
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Date carried by a cell: date cells directly, text cells when they parse.
/// Numbers are never read as dates.
pub(crate) fn date_of(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(date) => Some(*date),
        Value::DateTime(datetime) => Some(datetime.date()),
        Value::Text(text) => parse_date(text),
        Value::Empty | Value::Number(_) => None,
    }
}
