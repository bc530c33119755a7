//! Recency filtering of a transcript.

use chrono::{DateTime, Months, Utc};

use crate::timestamp;

/// Latest timestamp in `content`, scanning from the last line backward.
pub fn latest_instant(content: &str) -> Option<DateTime<Utc>> {
    content.split('\n').rev().find_map(timestamp::find_in_line)
}

/// Keep the lines that fall within `months` calendar months before
/// `reference`.
///
/// Without a reference the latest timestamp in the transcript is used, and
/// the wall clock when there is none. Lines without their own timestamp
/// inherit the last one seen; leading lines with no context are kept. When
/// nothing would survive, the original content is returned.
pub fn filter_to_window(content: &str, reference: Option<DateTime<Utc>>, months: u32) -> String {
    let reference = reference
        .or_else(|| latest_instant(content))
        .unwrap_or_else(Utc::now);
    let lower_bound = reference
        .checked_sub_months(Months::new(months))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let mut current: Option<DateTime<Utc>> = None;
    let mut kept: Vec<&str> = Vec::new();
    let mut dropped = 0usize;

    for line in content.split('\n') {
        if let Some(instant) = timestamp::find_in_line(line) {
            current = Some(instant);
        }
        match current {
            Some(instant) if instant < lower_bound => dropped += 1,
            _ => kept.push(line),
        }
    }

    if kept.iter().all(|line| line.trim().is_empty()) {
        tracing::debug!(dropped, "recency window would empty transcript, keeping original");
        return content.to_string();
    }

    tracing::debug!(
        kept = kept.len(),
        dropped,
        lower_bound = %timestamp::canonicalize(&lower_bound),
        "recency window applied"
    );
    kept.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn drops_lines_older_than_window() {
        let content = "2024-01-10T09:00:00.000Z Dana: old\n2024-02-20T09:00:00.000Z Lee: recent\n2024-03-15T09:00:00.000Z Dana: newest";
        let out = filter_to_window(content, None, 1);
        assert_eq!(
            out,
            "2024-02-20T09:00:00.000Z Lee: recent\n2024-03-15T09:00:00.000Z Dana: newest"
        );
    }

    #[test]
    fn continuation_lines_follow_their_message() {
        let content = "2024-01-10T09:00:00.000Z Dana: old\nstill old\n2024-03-10T09:00:00.000Z Lee: new\nstill new";
        let out = filter_to_window(content, Some(utc(2024, 3, 15)), 1);
        assert_eq!(out, "2024-03-10T09:00:00.000Z Lee: new\nstill new");
    }

    #[test]
    fn leading_lines_without_context_are_kept() {
        let content = "Messages are end-to-end encrypted.\n2024-01-01T00:00:00.000Z Dana: old\n2024-03-14T00:00:00.000Z Lee: new";
        let out = filter_to_window(content, Some(utc(2024, 3, 15)), 1);
        assert_eq!(
            out,
            "Messages are end-to-end encrypted.\n2024-03-14T00:00:00.000Z Lee: new"
        );
    }

    #[test]
    fn raw_export_tokens_are_recognized() {
        let content = "[1/5/24, 9:00 AM] Dana: old\n[3/14/24, 9:00 PM] Lee: new";
        let out = filter_to_window(content, Some(utc(2024, 3, 15)), 1);
        assert_eq!(out, "[3/14/24, 9:00 PM] Lee: new");
    }

    #[test]
    fn reference_defaults_to_latest_timestamp() {
        let content = "2023-05-01T00:00:00.000Z a\n2023-06-20T00:00:00.000Z b\ntrailing note";
        assert_eq!(latest_instant(content), Some(utc(2023, 6, 20) - chrono::Duration::hours(12)));
        let out = filter_to_window(content, None, 1);
        assert_eq!(out, "2023-06-20T00:00:00.000Z b\ntrailing note");
    }

    #[test]
    fn never_collapses_to_nothing() {
        let content = "2020-01-01T00:00:00.000Z Dana: ancient\n2020-01-02T00:00:00.000Z Lee: also ancient";
        let out = filter_to_window(content, Some(utc(2024, 3, 15)), 1);
        assert_eq!(out, content);
    }

    #[test]
    fn content_without_timestamps_is_unchanged() {
        let content = "no stamps\nat all";
        assert_eq!(filter_to_window(content, None, 1), content);
    }

    #[test]
    fn month_subtraction_clamps_day() {
        let reference = Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap();
        let content = "2024-02-28T23:59:59.000Z a\n2024-02-29T00:00:00.000Z b";
        assert_eq!(filter_to_window(content, Some(reference), 1), "2024-02-29T00:00:00.000Z b");
    }
}
