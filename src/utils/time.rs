use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, TimeZone, Utc};

/// This is the standard way timekeep writes timestamps into the activities
/// table. Times are always UTC on disk.
pub const TABLE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.format(TABLE_TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value.trim(), TABLE_TIMESTAMP_FORMAT).map(|v| v.and_utc())
}

/// Returns start of the next day.
pub fn next_day_start<Tz: TimeZone>(date: DateTime<Tz>) -> DateTime<Tz> {
    (date + Duration::days(1)).with_time(NaiveTime::MIN).unwrap()
}

/// Formats a duration as `H:MM:SS`. Negative durations render as `0:00:00`.
pub fn pretty_duration(duration: Duration) -> String {
    let seconds = duration.num_seconds().max(0);
    format!(
        "{}:{:02}:{:02}",
        seconds / 3600,
        seconds % 3600 / 60,
        seconds % 60
    )
}
