//! Value coercion: date/time part splitting and option matching.
//!
//! Date and time values are gated by a format regex only: months 01-12,
//! days 01-31, hours 00-23, minutes 00-59. Calendar validity is never
//! checked, so `2025-02-31` passes while `2025-13-40` does not.

use std::sync::LazyLock;

use regex::Regex;

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| {
        Regex::new(r"^(\d{4})-(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])$").expect("valid date regex")
    });

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01]\d|2[0-3]):([0-5]\d)$").expect("valid time regex"));

/// A `YYYY-MM-DD` value split into the parts a composite date control
/// expects. Month and day carry no leading zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateParts {
    pub year: String,
    pub month: String,
    pub day: String,
}

impl DateParts {
    /// `(suffix, value)` pairs for the `entry.<id>_<suffix>` sub-controls.
    pub fn parts(&self) -> [(&'static str, &str); 3] {
        [
            ("year", self.year.as_str()),
            ("month", self.month.as_str()),
            ("day", self.day.as_str()),
        ]
    }
}

/// An `HH:MM` value split into an un-padded hour and a zero-padded minute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeParts {
    pub hour: String,
    pub minute: String,
}

impl TimeParts {
    pub fn parts(&self) -> [(&'static str, &str); 2] {
        [("hour", self.hour.as_str()), ("minute", self.minute.as_str())]
    }
}

fn unpad(digits: &str) -> String {
    digits
        .parse::<u32>()
        .map(|n| n.to_string())
        .unwrap_or_else(|_| digits.to_string())
}

/// Split a `YYYY-MM-DD` value. Returns `None` when the format does not match.
pub fn parse_date(value: &str) -> Option<DateParts> {
    let caps = DATE_RE.captures(value.trim())?;
    Some(DateParts {
        year: caps[1].to_string(),
        month: unpad(&caps[2]),
        day: unpad(&caps[3]),
    })
}

/// Split a 24-hour `HH:MM` value. Single-digit hours are rejected.
pub fn parse_time(value: &str) -> Option<TimeParts> {
    let caps = TIME_RE.captures(value.trim())?;
    let minute: u32 = caps[2].parse().ok()?;
    Some(TimeParts {
        hour: unpad(&caps[1]),
        minute: format!("{minute:02}"),
    })
}

/// Whether a value passes the date shape check.
pub fn is_date(value: &str) -> bool {
    DATE_RE.is_match(value.trim())
}

/// Whether a value passes the time shape check.
pub fn is_time(value: &str) -> bool {
    TIME_RE.is_match(value.trim())
}

/// Pick the option a wanted value refers to: case-insensitive exact match
/// first, then the first option starting with the wanted text.
pub fn match_option<'a, S: AsRef<str>>(options: &'a [S], wanted: &str) -> Option<&'a str> {
    let wanted = wanted.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    options
        .iter()
        .map(AsRef::as_ref)
        .find(|o| o.trim().to_lowercase() == wanted)
        .or_else(|| {
            options
                .iter()
                .map(AsRef::as_ref)
                .find(|o| o.trim().to_lowercase().starts_with(&wanted))
        })
}
