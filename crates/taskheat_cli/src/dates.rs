//! Deadline parsing and timestamp display in local time.

use anyhow::{anyhow, Context};
use chrono::{DateTime, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Parses a deadline into epoch milliseconds.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM` (local) and `YYYY-MM-DD`, which means
/// 23:59 local time on that day.
pub fn parse_deadline(input: &str) -> anyhow::Result<i64> {
    let input = input.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(input) {
        return Ok(instant.timestamp_millis());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, DATE_TIME_FORMAT) {
        return local_millis(naive);
    }
    let date = NaiveDate::parse_from_str(input, DATE_FORMAT).with_context(|| {
        format!("invalid deadline `{input}`; expected YYYY-MM-DD, \"YYYY-MM-DD HH:MM\" or RFC 3339")
    })?;
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 0).ok_or_else(|| anyhow!("invalid time"))?;
    local_millis(date.and_time(end_of_day))
}

/// Formats epoch milliseconds as `YYYY-MM-DD HH:MM` in local time.
pub fn format_millis(ms: i64) -> String {
    match Local.timestamp_millis_opt(ms) {
        LocalResult::Single(instant) | LocalResult::Ambiguous(instant, _) => {
            instant.format(DATE_TIME_FORMAT).to_string()
        }
        LocalResult::None => format!("@{ms}"),
    }
}

fn local_millis(naive: NaiveDateTime) -> anyhow::Result<i64> {
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(instant) | LocalResult::Ambiguous(instant, _) => {
            Ok(instant.timestamp_millis())
        }
        // Skipped by a DST jump.
        LocalResult::None => Err(anyhow!("`{naive}` does not exist in the local time zone")),
    }
}
