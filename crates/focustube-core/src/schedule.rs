//! Weekly blocking schedule.
//!
//! Each weekday (0 = Sunday .. 6 = Saturday) carries an ordered list of
//! intervals. An interval whose end is not after its start crosses midnight:
//! it is declared once, on the day it starts, and blocks the tail of that day
//! plus the head of the following day.

use std::collections::BTreeMap;

use chrono::{Datelike, Timelike};
use serde::{Deserialize, Serialize};

use crate::time::{minute_of_day, parse_time_to_minutes, previous_weekday, weekday_index};

/// Whether an interval blocks access or marks free time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalMode {
    /// Access is blocked during the interval.
    #[default]
    Blocked,
    /// Informational free time; never blocks.
    Free,
}

impl IntervalMode {
    /// Returns the mode as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            IntervalMode::Blocked => "blocked",
            IntervalMode::Free => "free",
        }
    }

    /// Parses a mode from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "blocked" => Some(IntervalMode::Blocked),
            "free" => Some(IntervalMode::Free),
            _ => None,
        }
    }
}

/// A time-of-day range on one weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    /// Unique identifier for the interval.
    pub id: String,
    /// Start time, `"HH:MM"`.
    pub start: String,
    /// End time, `"HH:MM"`. Not after `start` means the range crosses midnight.
    pub end: String,
    /// Blocked or free.
    pub mode: IntervalMode,
    /// Whether this interval is currently enabled.
    pub enabled: bool,
}

impl Interval {
    /// Creates an enabled blocking interval.
    pub fn new(id: impl Into<String>, start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            start: start.into(),
            end: end.into(),
            mode: IntervalMode::Blocked,
            enabled: true,
        }
    }

    /// Sets the mode.
    pub fn with_mode(mut self, mode: IntervalMode) -> Self {
        self.mode = mode;
        self
    }

    /// Disables this interval.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Enables this interval.
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Start as minutes since midnight.
    pub fn start_minutes(&self) -> u32 {
        parse_time_to_minutes(&self.start)
    }

    /// End as minutes since midnight.
    pub fn end_minutes(&self) -> u32 {
        parse_time_to_minutes(&self.end)
    }

    /// Start equals end: the interval has no effect.
    pub fn is_degenerate(&self) -> bool {
        self.start_minutes() == self.end_minutes()
    }

    /// Returns true if this range crosses midnight.
    pub fn is_overnight(&self) -> bool {
        self.end_minutes() < self.start_minutes()
    }

    /// Enabled and in blocking mode.
    pub fn is_active_block(&self) -> bool {
        self.enabled && self.mode == IntervalMode::Blocked
    }

    /// Checks `minutes` against the part of the range on its own weekday.
    pub fn covers_same_day(&self, minutes: u32) -> bool {
        let (start, end) = (self.start_minutes(), self.end_minutes());
        if start == end {
            return false;
        }
        if end > start {
            minutes >= start && minutes < end
        } else {
            // Overnight: from start until midnight
            minutes >= start
        }
    }

    /// Checks `minutes` against the part of an overnight range that spills
    /// into the following weekday.
    pub fn covers_spillover(&self, minutes: u32) -> bool {
        self.is_overnight() && minutes < self.end_minutes()
    }
}

/// Intervals keyed by weekday number (0 = Sunday).
pub type IntervalWeek = BTreeMap<u8, Vec<Interval>>;

/// A week with an empty list for every day.
pub fn empty_week() -> IntervalWeek {
    (0..7).map(|day| (day, Vec::new())).collect()
}

/// Enabled blocking intervals declared on `day`.
pub fn blocked_intervals_for_day(week: &IntervalWeek, day: u8) -> impl Iterator<Item = &Interval> {
    week.get(&day)
        .into_iter()
        .flatten()
        .filter(|interval| interval.is_active_block())
}

/// Returns the intervals blocking the wall-clock instant `at`.
///
/// Checks the current weekday's ranges first, then the previous weekday's
/// overnight ranges for their spill into today.
pub fn blocking_intervals<'a, T: Datelike + Timelike>(
    at: &T,
    week: &'a IntervalWeek,
) -> Vec<&'a Interval> {
    let day = weekday_index(at);
    let minutes = minute_of_day(at);

    let today = blocked_intervals_for_day(week, day).filter(|i| i.covers_same_day(minutes));
    let spill = blocked_intervals_for_day(week, previous_weekday(day))
        .filter(|i| i.covers_spillover(minutes));

    today.chain(spill).collect()
}

/// Returns true if the wall-clock instant `at` falls in a blocked interval.
pub fn is_within_blocked_schedule<T: Datelike + Timelike>(at: &T, week: &IntervalWeek) -> bool {
    let day = weekday_index(at);
    let minutes = minute_of_day(at);

    if blocked_intervals_for_day(week, day).any(|i| i.covers_same_day(minutes)) {
        return true;
    }

    blocked_intervals_for_day(week, previous_weekday(day)).any(|i| i.covers_spillover(minutes))
}
