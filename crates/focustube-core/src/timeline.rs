//! Schedule timeline for countdown displays.
//!
//! Projects the current blocking state forward: when the current state ends
//! and where the next scheduled block starts and ends. Timestamps are epoch
//! milliseconds. Weekday intervals are materialized into absolute windows in
//! the caller's time zone, so daylight-saving shifts are honored.

use chrono::{Duration, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::schedule::{blocked_intervals_for_day, IntervalWeek};
use crate::settings::{Language, Settings};
use crate::time::{local_datetime, local_timestamp_ms, weekday_index};
use crate::weekly::is_weekly_session_active;

/// Days scanned when looking for the next blocked window.
const LOOKAHEAD_DAYS: i64 = 8;

/// Whether access is currently blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelineState {
    Blocked,
    Free,
}

/// Why the timeline is in its current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineReason {
    /// Global manual block, no end.
    Manual,
    /// Inside a scheduled block window.
    Schedule,
    /// Temporary unblock inside a scheduled block window.
    TemporaryUnblock,
    /// Between scheduled block windows.
    ScheduleFree,
    /// Weekly session during a manual block.
    WeeklyUnblock,
}

impl TimelineReason {
    /// Returns the reason code.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimelineReason::Manual => "manual",
            TimelineReason::Schedule => "schedule",
            TimelineReason::TemporaryUnblock => "temporary_unblock",
            TimelineReason::ScheduleFree => "schedule_free",
            TimelineReason::WeeklyUnblock => "weekly_unblock",
        }
    }

    /// User-facing label.
    pub fn label(&self, lang: Language) -> &'static str {
        match (self, lang) {
            (TimelineReason::Manual, Language::En) => "Blocked manually",
            (TimelineReason::Manual, Language::Es) => "Bloqueado manualmente",
            (TimelineReason::Manual, Language::Pt) => "Bloqueado manualmente",
            (TimelineReason::Manual, Language::Fr) => "Bloqué manuellement",
            (TimelineReason::Schedule, Language::En) => "Blocked by schedule",
            (TimelineReason::Schedule, Language::Es) => "Bloqueado por horario",
            (TimelineReason::Schedule, Language::Pt) => "Bloqueado por horário",
            (TimelineReason::Schedule, Language::Fr) => "Bloqué par le planning",
            (TimelineReason::TemporaryUnblock, Language::En) => "Temporarily unblocked",
            (TimelineReason::TemporaryUnblock, Language::Es) => "Desbloqueo temporal",
            (TimelineReason::TemporaryUnblock, Language::Pt) => "Desbloqueio temporário",
            (TimelineReason::TemporaryUnblock, Language::Fr) => "Déblocage temporaire",
            (TimelineReason::ScheduleFree, Language::En) => "Free time",
            (TimelineReason::ScheduleFree, Language::Es) => "Tiempo libre",
            (TimelineReason::ScheduleFree, Language::Pt) => "Tempo livre",
            (TimelineReason::ScheduleFree, Language::Fr) => "Temps libre",
            (TimelineReason::WeeklyUnblock, Language::En) => "Weekly session",
            (TimelineReason::WeeklyUnblock, Language::Es) => "Sesión semanal",
            (TimelineReason::WeeklyUnblock, Language::Pt) => "Sessão semanal",
            (TimelineReason::WeeklyUnblock, Language::Fr) => "Session hebdomadaire",
        }
    }
}

/// Current state and upcoming boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleTimeline {
    pub state: TimelineState,
    pub reason: TimelineReason,
    /// When the current state ends; `None` when indefinite.
    pub current_until: Option<i64>,
    pub next_change_at: Option<i64>,
    pub next_block_start: Option<i64>,
    pub next_block_end: Option<i64>,
}

impl ScheduleTimeline {
    fn manual() -> Self {
        Self {
            state: TimelineState::Blocked,
            reason: TimelineReason::Manual,
            current_until: None,
            next_change_at: None,
            next_block_start: None,
            next_block_end: None,
        }
    }

    fn schedule_free(next: Option<BlockWindow>) -> Self {
        let start = next.map(|w| w.start);
        Self {
            state: TimelineState::Free,
            reason: TimelineReason::ScheduleFree,
            current_until: start,
            next_change_at: start,
            next_block_start: start,
            next_block_end: next.map(|w| w.end),
        }
    }

    /// Milliseconds until the current state ends, if it ends.
    pub fn remaining_ms(&self, now_ms: i64) -> Option<i64> {
        self.current_until.map(|until| (until - now_ms).max(0))
    }
}

/// An absolute blocked window `[start, end)` in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockWindow {
    pub start: i64,
    pub end: i64,
}

impl BlockWindow {
    /// Returns true if `now_ms` falls inside the window.
    pub fn contains(&self, now_ms: i64) -> bool {
        now_ms >= self.start && now_ms < self.end
    }
}

/// Materializes the blocked intervals declared on local `date`.
///
/// An overnight interval ends on the following calendar day. Windows are
/// sorted by start.
pub fn day_windows<Tz: TimeZone>(date: NaiveDate, week: &IntervalWeek, tz: &Tz) -> Vec<BlockWindow> {
    let mut windows: Vec<BlockWindow> = blocked_intervals_for_day(week, weekday_index(&date))
        .filter(|interval| !interval.is_degenerate())
        .filter_map(|interval| {
            let start = local_timestamp_ms(date, interval.start_minutes(), tz)?;
            let end_date = if interval.is_overnight() {
                date.succ_opt()?
            } else {
                date
            };
            let end = local_timestamp_ms(end_date, interval.end_minutes(), tz)?;
            Some(BlockWindow { start, end })
        })
        .collect();
    windows.sort();
    windows
}

/// The blocked window containing `now_ms`, checking yesterday's overnight
/// spill before today's windows.
pub fn current_window<Tz: TimeZone>(now_ms: i64, week: &IntervalWeek, tz: &Tz) -> Option<BlockWindow> {
    let today = local_datetime(now_ms, tz)?.date_naive();
    let yesterday = today.pred_opt()?;

    let mut windows = day_windows(yesterday, week, tz);
    windows.extend(day_windows(today, week, tz));
    windows.sort();
    windows.into_iter().find(|w| w.contains(now_ms))
}

/// The earliest blocked window starting after `now_ms`, within the lookahead.
pub fn next_window<Tz: TimeZone>(now_ms: i64, week: &IntervalWeek, tz: &Tz) -> Option<BlockWindow> {
    let today = local_datetime(now_ms, tz)?.date_naive();
    (0..LOOKAHEAD_DAYS)
        .filter_map(|offset| today.checked_add_signed(Duration::days(offset)))
        .find_map(|date| {
            day_windows(date, week, tz)
                .into_iter()
                .find(|w| w.start > now_ms)
        })
}

/// Computes the timeline at `now_ms` in the host time zone.
pub fn compute_schedule_timeline(settings: &Settings, now_ms: i64) -> ScheduleTimeline {
    compute_schedule_timeline_in(settings, now_ms, &Local)
}

/// Computes the timeline at `now_ms`, materializing the schedule in `tz`.
pub fn compute_schedule_timeline_in<Tz: TimeZone>(
    settings: &Settings,
    now_ms: i64,
    tz: &Tz,
) -> ScheduleTimeline {
    if settings.block_enabled {
        if is_weekly_session_active(settings, now_ms) {
            let until = settings.weekly_unblock_until;
            return ScheduleTimeline {
                state: TimelineState::Free,
                reason: TimelineReason::WeeklyUnblock,
                current_until: until,
                next_change_at: until,
                next_block_start: until,
                next_block_end: None,
            };
        }
        return ScheduleTimeline::manual();
    }

    let week = &settings.intervals_by_day;
    if let Some(current) = current_window(now_ms, week, tz) {
        if let Some(unblock_until) = settings
            .unblock_until
            .filter(|_| settings.is_temporarily_unblocked(now_ms))
        {
            // A temporary unblock never outlasts the block window
            let free_until = unblock_until.min(current.end);
            return ScheduleTimeline {
                state: TimelineState::Free,
                reason: TimelineReason::TemporaryUnblock,
                current_until: Some(free_until),
                next_change_at: Some(free_until),
                next_block_start: Some(free_until),
                next_block_end: Some(current.end),
            };
        }
        return ScheduleTimeline {
            state: TimelineState::Blocked,
            reason: TimelineReason::Schedule,
            current_until: Some(current.end),
            next_change_at: Some(current.end),
            next_block_start: None,
            next_block_end: None,
        };
    }

    ScheduleTimeline::schedule_free(next_window(now_ms, week, tz))
}

/// Formats a countdown as `H:MM:SS` from one hour up, else `M:SS`.
/// Negative durations read as zero.
pub fn format_duration(ms: i64) -> String {
    let total = ms.max(0) / 1000;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
