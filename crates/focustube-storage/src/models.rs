//! Database row types.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Kind of usage event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A navigation to a blocked page.
    Attempt,
    /// Seconds spent on a target domain.
    Time,
    /// Seconds spent on a block screen.
    BlockedTime,
    /// A browsing session started on a target domain.
    SessionStart,
}

impl EventKind {
    /// Returns the stored name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Attempt => "attempt",
            EventKind::Time => "time",
            EventKind::BlockedTime => "blocked_time",
            EventKind::SessionStart => "session_start",
        }
    }

    /// Parses a stored name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "attempt" => Some(EventKind::Attempt),
            "time" => Some(EventKind::Time),
            "blocked_time" => Some(EventKind::BlockedTime),
            "session_start" => Some(EventKind::SessionStart),
            _ => None,
        }
    }
}

/// A stored usage event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    /// Epoch milliseconds.
    pub ts: i64,
    /// UTC day of `ts`.
    pub day: NaiveDate,
    pub kind: EventKind,
    pub domain: Option<String>,
    pub url: Option<String>,
    pub delta_sec: Option<i64>,
}

/// An event to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub ts: i64,
    pub kind: EventKind,
    pub domain: Option<String>,
    pub url: Option<String>,
    pub delta_sec: Option<i64>,
}

impl NewEvent {
    /// A blocked navigation to `url`.
    pub fn attempt(ts: i64, domain: Option<String>, url: impl Into<String>) -> Self {
        Self {
            ts,
            kind: EventKind::Attempt,
            domain,
            url: Some(url.into()),
            delta_sec: None,
        }
    }

    /// Time spent on `domain`.
    pub fn time(ts: i64, domain: impl Into<String>, delta_sec: i64) -> Self {
        Self {
            ts,
            kind: EventKind::Time,
            domain: Some(domain.into()),
            url: None,
            delta_sec: Some(delta_sec),
        }
    }

    /// Time spent on a block screen.
    pub fn blocked_time(ts: i64, delta_sec: i64) -> Self {
        Self {
            ts,
            kind: EventKind::BlockedTime,
            domain: None,
            url: None,
            delta_sec: Some(delta_sec),
        }
    }

    /// A new browsing session.
    pub fn session_start(ts: i64, domain: Option<String>) -> Self {
        Self {
            ts,
            kind: EventKind::SessionStart,
            domain,
            url: None,
            delta_sec: None,
        }
    }

    /// Change this event applies to its day's aggregate.
    pub fn daily_delta(&self) -> DailyDelta {
        let seconds = self.delta_sec.unwrap_or(0).max(0);
        let mut delta = DailyDelta {
            updated_at: self.ts,
            ..Default::default()
        };
        match self.kind {
            EventKind::Attempt => delta.attempts = 1,
            EventKind::SessionStart => delta.sessions = 1,
            EventKind::BlockedTime => delta.blocked_time_sec = seconds,
            EventKind::Time => {
                delta.time_sec = seconds;
                if let Some(domain) = &self.domain {
                    delta.time_by_domain.insert(domain.clone(), seconds);
                }
            }
        }
        delta
    }
}

/// Increments applied to one `daily_stats` row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailyDelta {
    pub attempts: i64,
    pub time_sec: i64,
    pub blocked_time_sec: i64,
    pub sessions: i64,
    pub time_by_domain: BTreeMap<String, i64>,
    pub updated_at: i64,
}

/// Aggregated usage for one UTC day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub day: NaiveDate,
    /// Blocked navigation attempts.
    pub attempts: i64,
    /// Seconds on target domains.
    pub time_sec: i64,
    /// Seconds on block screens.
    pub blocked_time_sec: i64,
    /// Sessions started.
    pub sessions: i64,
    /// Seconds per target domain.
    pub time_by_domain: BTreeMap<String, i64>,
    /// Epoch ms of the last update.
    pub updated_at: i64,
}

impl DailyStats {
    /// An empty row for `day`.
    pub fn empty(day: NaiveDate) -> Self {
        Self {
            day,
            attempts: 0,
            time_sec: 0,
            blocked_time_sec: 0,
            sessions: 0,
            time_by_domain: BTreeMap::new(),
            updated_at: 0,
        }
    }

    /// Adds `delta` to this row.
    pub fn apply(&mut self, delta: &DailyDelta) {
        self.attempts += delta.attempts;
        self.time_sec += delta.time_sec;
        self.blocked_time_sec += delta.blocked_time_sec;
        self.sessions += delta.sessions;
        for (domain, seconds) in &delta.time_by_domain {
            *self.time_by_domain.entry(domain.clone()).or_insert(0) += seconds;
        }
        self.updated_at = delta.updated_at;
    }
}

/// Sums over every stored day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsTotals {
    pub days: i64,
    pub attempts: i64,
    pub time_sec: i64,
    pub blocked_time_sec: i64,
    pub sessions: i64,
}

/// A configuration entry.
#[derive(Debug, Clone)]
pub struct Config {
    /// Configuration key.
    pub key: String,
    /// Configuration value (JSON).
    pub value: serde_json::Value,
    /// Epoch ms of the last write.
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_names() {
        for kind in [
            EventKind::Attempt,
            EventKind::Time,
            EventKind::BlockedTime,
            EventKind::SessionStart,
        ] {
            assert_eq!(EventKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(EventKind::parse("click"), None);
    }

    #[test]
    fn deltas_per_kind() {
        let attempt = NewEvent::attempt(5, None, "https://youtube.com").daily_delta();
        assert_eq!(attempt.attempts, 1);
        assert_eq!(attempt.updated_at, 5);

        let time = NewEvent::time(5, "youtube.com", 30).daily_delta();
        assert_eq!(time.time_sec, 30);
        assert_eq!(time.time_by_domain["youtube.com"], 30);

        let negative = NewEvent::blocked_time(5, -3).daily_delta();
        assert_eq!(negative.blocked_time_sec, 0);
    }

    #[test]
    fn apply_accumulates() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut stats = DailyStats::empty(day);
        stats.apply(&NewEvent::time(1, "a.com", 10).daily_delta());
        stats.apply(&NewEvent::time(2, "a.com", 5).daily_delta());
        stats.apply(&NewEvent::session_start(3, None).daily_delta());
        assert_eq!(stats.time_sec, 15);
        assert_eq!(stats.time_by_domain["a.com"], 15);
        assert_eq!(stats.sessions, 1);
        assert_eq!(stats.updated_at, 3);
    }
}
