//! Chat-export timestamp recognition.
//!
//! Exports stamp each message with tokens such as `[3/15/24, 10:15:32 PM]`
//! or `15/03/2024, 22:15 -`. Every regex that recognizes a timestamp lives in
//! this module so the sanitizer and the recency filter agree on what a
//! timestamp is.

use std::borrow::Cow;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::{Captures, Regex};

/// Output format of [`canonicalize`], e.g. `2024-03-15T22:15:00.000Z`.
pub const CANONICAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Export timestamp fields. Without a meridiem the hour is read as 24-hour.
static EXPORT_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"([0-9]{1,2})/([0-9]{1,2})/([0-9]{2,4}),\s([0-9]{1,2}):([0-9]{2}):?([0-9]{2})?\s?(?:([AaPp][Mm])\b)?",
    )
    .expect("valid export timestamp pattern")
});

/// Export-style timestamp embedded anywhere in a line, brackets included.
static EMBEDDED_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\[?[0-9]{1,2}[/.\-][0-9]{1,2}[/.\-][0-9]{2,4},\s[0-9]{1,2}:[0-9]{2}(?::[0-9]{2})?(?:\s?[AaPp][Mm]\b)?\]?",
    )
    .expect("valid embedded token pattern")
});

/// Token already rewritten by [`canonicalize`].
static CANONICAL_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}(?:\.[0-9]+)?Z?")
        .expect("valid canonical token pattern")
});

/// Parse one export timestamp token. Returns `None` when the token does not match
/// or the fields do not form a real date (month 13, Feb 30, hour 25).
pub fn parse(token: &str) -> Option<DateTime<Utc>> {
    let cleaned: String = token.chars().filter(|c| *c != '[' && *c != ']').collect();

    let caps = EXPORT_TIMESTAMP.captures(&cleaned)?;
    let parsed = from_fields(&caps);
    if parsed.is_none() {
        tracing::debug!(token, "timestamp fields out of range");
    }
    parsed.map(|naive| naive.and_utc())
}

pub fn canonicalize(instant: &DateTime<Utc>) -> String {
    instant.format(CANONICAL_FORMAT).to_string()
}

/// Canonical form of `token`, or the token itself when it does not parse.
pub fn standardize(token: &str) -> Cow<'_, str> {
    match parse(token) {
        Some(instant) => Cow::Owned(canonicalize(&instant)),
        None => Cow::Borrowed(token),
    }
}

/// Rewrite every embedded export timestamp in `text` to canonical form.
pub fn standardize_all(text: &str) -> Cow<'_, str> {
    EMBEDDED_TOKEN.replace_all(text, |caps: &Captures<'_>| standardize(&caps[0]).into_owned())
}

/// First timestamp carried by `line`, whether canonical or export-style.
pub fn find_in_line(line: &str) -> Option<DateTime<Utc>> {
    let mut candidates: Vec<(usize, Option<DateTime<Utc>>)> = Vec::with_capacity(2);
    if let Some(m) = CANONICAL_TOKEN.find(line) {
        candidates.push((m.start(), parse_canonical(m.as_str())));
    }
    if let Some(m) = EMBEDDED_TOKEN.find(line) {
        candidates.push((m.start(), parse(m.as_str())));
    }
    candidates.sort_by_key(|(start, _)| *start);
    candidates.into_iter().find_map(|(_, parsed)| parsed)
}

fn parse_canonical(token: &str) -> Option<DateTime<Utc>> {
    let trimmed = token.trim_end_matches('Z');
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn from_fields(caps: &Captures<'_>) -> Option<NaiveDateTime> {
    let month = number(caps, 1)?;
    let day = number(caps, 2)?;
    let year = full_year(caps.get(3)?.as_str())?;
    let mut hour = number(caps, 4)?;
    let minute = number(caps, 5)?;
    let second = caps.get(6).map_or(Some(0), |m| m.as_str().parse().ok())?;

    if let Some(period) = caps.get(7) {
        let pm = period.as_str().eq_ignore_ascii_case("pm");
        hour = match (pm, hour) {
            (true, 12) => 12,
            (true, h) => h + 12,
            (false, 12) => 0,
            (false, h) => h,
        };
    }

    build(year, month, day, hour, minute, second)
}

fn number(caps: &Captures<'_>, idx: usize) -> Option<u32> {
    caps.get(idx)?.as_str().parse().ok()
}

/// Two-digit years are 2000+YY; three-digit years are rejected.
fn full_year(raw: &str) -> Option<i32> {
    let value: i32 = raw.parse().ok()?;
    match raw.len() {
        2 => Some(2000 + value),
        4 => Some(value),
        _ => None,
    }
}

fn build(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)
}
