//! Weekly bonus session.
//!
//! A weekly session is a one-shot free window for domains tagged
//! `por_semana`. It may be started on one of the allowed weekdays, once per
//! period. The period key is the local calendar day (`YYYY-MM-DD`), so a
//! session can be used once on each allowed day.

use chrono::{Local, TimeZone};

use crate::error::{CoreError, Result};
use crate::settings::Settings;
use crate::time::{day_key, local_datetime, weekday_index, MINUTE_MS};

/// Returns true while a started weekly session has not yet expired.
pub fn is_weekly_session_active(settings: &Settings, now_ms: i64) -> bool {
    settings.weekly_unblock_enabled
        && settings
            .weekly_unblock_until
            .is_some_and(|until| now_ms < until)
}

/// Length of a weekly session, never less than one minute.
pub fn weekly_session_duration_ms(settings: &Settings) -> i64 {
    i64::from(settings.weekly_unblock_duration_minutes.max(1)) * MINUTE_MS
}

/// Period key for `now_ms` in the host time zone.
pub fn period_key(now_ms: i64) -> Option<String> {
    period_key_in(now_ms, &Local)
}

/// Period key for `now_ms` in `tz`: the local day `YYYY-MM-DD`.
pub fn period_key_in<Tz: TimeZone>(now_ms: i64, tz: &Tz) -> Option<String> {
    local_datetime(now_ms, tz).map(|dt| day_key(&dt))
}

/// Whether a new weekly session may start at `now_ms` (host time zone).
pub fn can_start_weekly_session(settings: &Settings, now_ms: i64) -> bool {
    can_start_weekly_session_in(settings, now_ms, &Local)
}

/// Whether a new weekly session may start at `now_ms` in `tz`.
pub fn can_start_weekly_session_in<Tz: TimeZone>(settings: &Settings, now_ms: i64, tz: &Tz) -> bool {
    weekly_session_blocker(settings, now_ms, tz).is_none()
}

/// Explains why a weekly session cannot start, or `None` if it can.
fn weekly_session_blocker<Tz: TimeZone>(
    settings: &Settings,
    now_ms: i64,
    tz: &Tz,
) -> Option<&'static str> {
    if !settings.weekly_unblock_enabled {
        return Some("weekly sessions are disabled");
    }
    let Some(now) = local_datetime(now_ms, tz) else {
        return Some("current time is out of range");
    };
    if !settings.weekly_unblock_days.contains(&weekday_index(&now)) {
        return Some("today is not an allowed day");
    }
    if settings.weekly_unblock_last_week.as_deref() == Some(day_key(&now).as_str()) {
        return Some("already used in this period");
    }
    None
}

/// Starts a weekly session at `now_ms` (host time zone); returns its expiry.
pub fn start_weekly_session(settings: &mut Settings, now_ms: i64) -> Result<i64> {
    start_weekly_session_in(settings, now_ms, &Local)
}

/// Starts a weekly session at `now_ms` in `tz` and marks the period as used.
pub fn start_weekly_session_in<Tz: TimeZone>(
    settings: &mut Settings,
    now_ms: i64,
    tz: &Tz,
) -> Result<i64> {
    if let Some(reason) = weekly_session_blocker(settings, now_ms, tz) {
        return Err(CoreError::WeeklySessionUnavailable(reason.to_string()));
    }
    let until = now_ms + weekly_session_duration_ms(settings);
    settings.weekly_unblock_until = Some(until);
    settings.weekly_unblock_last_week = period_key_in(now_ms, tz);
    Ok(until)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn ms(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> i64 {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0)
            .unwrap()
            .timestamp_millis()
    }

    fn enabled() -> Settings {
        Settings {
            weekly_unblock_enabled: true,
            weekly_unblock_days: vec![1],
            weekly_unblock_duration_minutes: 30,
            ..Default::default()
        }
    }

    // ==================== Activity Tests ====================

    #[test]
    fn active_only_before_expiry() {
        let mut settings = enabled();
        assert!(!is_weekly_session_active(&settings, 0));
        settings.weekly_unblock_until = Some(1_000);
        assert!(is_weekly_session_active(&settings, 999));
        assert!(!is_weekly_session_active(&settings, 1_000));
        settings.weekly_unblock_enabled = false;
        assert!(!is_weekly_session_active(&settings, 0));
    }

    #[test]
    fn duration_has_floor() {
        let mut settings = enabled();
        assert_eq!(weekly_session_duration_ms(&settings), 30 * 60_000);
        settings.weekly_unblock_duration_minutes = 0;
        assert_eq!(weekly_session_duration_ms(&settings), 60_000);
    }

    // ==================== Start Gating Tests ====================

    #[test]
    fn can_start_on_allowed_day() {
        // 2024-01-01 is a Monday
        assert!(can_start_weekly_session_in(&enabled(), ms(2024, 1, 1, 10, 0), &Utc));
    }

    #[test]
    fn cannot_start_when_disabled() {
        let settings = Settings {
            weekly_unblock_enabled: false,
            ..enabled()
        };
        assert!(!can_start_weekly_session_in(&settings, ms(2024, 1, 1, 10, 0), &Utc));
    }

    #[test]
    fn cannot_start_on_other_day() {
        assert!(!can_start_weekly_session_in(&enabled(), ms(2024, 1, 2, 10, 0), &Utc));
    }

    #[test]
    fn cannot_start_twice_in_period() {
        let settings = Settings {
            weekly_unblock_last_week: Some("2024-01-01".into()),
            ..enabled()
        };
        assert!(!can_start_weekly_session_in(&settings, ms(2024, 1, 1, 10, 0), &Utc));
        // The following allowed day is a new period
        assert!(can_start_weekly_session_in(&settings, ms(2024, 1, 8, 10, 0), &Utc));
    }

    #[test]
    fn weekday_follows_time_zone() {
        // Monday 23:30 UTC is Tuesday 01:30 at UTC+2
        let now = ms(2024, 1, 1, 23, 30);
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert!(can_start_weekly_session_in(&enabled(), now, &Utc));
        assert!(!can_start_weekly_session_in(&enabled(), now, &plus_two));
        assert_eq!(period_key_in(now, &plus_two).as_deref(), Some("2024-01-02"));
    }

    // ==================== Session Start Tests ====================

    #[test]
    fn start_sets_expiry_and_marker() {
        let mut settings = enabled();
        let now = ms(2024, 1, 1, 10, 0);
        let until = start_weekly_session_in(&mut settings, now, &Utc).unwrap();
        assert_eq!(until, now + 30 * 60_000);
        assert_eq!(settings.weekly_unblock_until, Some(until));
        assert_eq!(settings.weekly_unblock_last_week.as_deref(), Some("2024-01-01"));
        assert!(is_weekly_session_active(&settings, now + 1));

        let again = start_weekly_session_in(&mut settings, now + 60_000, &Utc);
        assert!(matches!(again, Err(CoreError::WeeklySessionUnavailable(_))));
    }
}
