//! Time-of-day and local calendar helpers.
//!
//! Schedules are written as `"HH:MM"` strings and evaluated against the local
//! wall clock. Parsing is fail-soft: anything malformed degrades to midnight
//! instead of aborting an evaluation.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, TimeZone, Timelike};

/// Minutes in a calendar day.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// One minute in epoch milliseconds.
pub const MINUTE_MS: i64 = 60 * 1000;

/// Short weekday names indexed by weekday number (0 = Sunday).
pub const WEEKDAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Converts `"HH:MM"` to minutes since midnight.
///
/// Returns 0 when either part is not a non-negative integer. Values past the
/// end of the day wrap, so the result is always in `0..1440`.
pub fn parse_time_to_minutes(value: &str) -> u32 {
    let mut parts = value.split(':');
    let hours = parts.next().and_then(parse_component);
    let minutes = parts.next().and_then(parse_component);

    match (hours, minutes) {
        (Some(h), Some(m)) => (h.saturating_mul(60).saturating_add(m)) % MINUTES_PER_DAY,
        _ => 0,
    }
}

fn parse_component(part: &str) -> Option<u32> {
    let part = part.trim();
    if part.is_empty() {
        // An empty component reads as zero, same as the stored data expects.
        return Some(0);
    }
    part.parse::<u32>().ok()
}

/// Converts minutes since midnight to zero-padded `"HH:MM"`, modulo one day.
pub fn minutes_to_time(minutes: i64) -> String {
    let minutes = minutes.rem_euclid(MINUTES_PER_DAY as i64);
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Returns true for a strictly well-formed `"HH:MM"` (00:00 through 23:59).
pub fn is_valid_time(value: &str) -> bool {
    let Some((h, m)) = value.split_once(':') else {
        return false;
    };
    if h.len() != 2 || m.len() != 2 {
        return false;
    }
    match (h.parse::<u32>(), m.parse::<u32>()) {
        (Ok(h), Ok(m)) => h < 24 && m < 60,
        _ => false,
    }
}

/// Weekday number with 0 = Sunday through 6 = Saturday.
pub fn weekday_index<T: Datelike>(value: &T) -> u8 {
    value.weekday().num_days_from_sunday() as u8
}

/// The weekday before `day` (Sunday wraps to Saturday).
pub fn previous_weekday(day: u8) -> u8 {
    (day % 7 + 6) % 7
}

/// Minutes since local midnight.
pub fn minute_of_day<T: Timelike>(value: &T) -> u32 {
    value.hour() * 60 + value.minute()
}

/// Converts epoch milliseconds to a wall-clock time in `tz`.
///
/// Returns `None` for timestamps chrono cannot represent.
pub fn local_datetime<Tz: TimeZone>(now_ms: i64, tz: &Tz) -> Option<DateTime<Tz>> {
    DateTime::from_timestamp_millis(now_ms).map(|utc| utc.with_timezone(tz))
}

/// Epoch milliseconds of local `date` at midnight plus `minutes`.
///
/// Ambiguous local times (clock set back) resolve to the earlier instant.
/// Non-existent local times (clock set forward) are pushed past the gap.
pub fn local_timestamp_ms<Tz: TimeZone>(date: NaiveDate, minutes: u32, tz: &Tz) -> Option<i64> {
    let naive = date.and_hms_opt(0, 0, 0)? + Duration::minutes(minutes as i64);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.timestamp_millis()),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.timestamp_millis()),
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .map(|dt| dt.timestamp_millis()),
    }
}

/// Local calendar day key `YYYY-MM-DD`.
pub fn day_key<T: Datelike>(value: &T) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        value.year(),
        value.month(),
        value.day()
    )
}
