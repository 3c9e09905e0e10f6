//! High-level database interface.

use std::path::PathBuf;

use chrono::{Local, NaiveDate, TimeZone, Utc};
use directories::ProjectDirs;
use focustube_core::{
    domain, strict, weekly, DomainTag, Interval, IntervalMode, Settings, WhitelistEntry,
};
use tracing::{debug, info};

use crate::error::{Result, StorageError};
use crate::models::{DailyStats, Event, MetricsTotals, NewEvent};
use crate::pool::ConnectionPool;
use crate::repository::{utc_day, EventsRepo, SettingsRepo, StatsRepo};

/// Minimum gap between two recorded attempts for the same URL.
pub const ATTEMPT_COOLDOWN_MS: i64 = 5_000;

/// High-level database interface for FocusTube.
#[derive(Clone)]
pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    /// Create a new database in the default app data directory.
    pub fn new() -> Result<Self> {
        Self::with_path(Self::default_db_path()?)
    }

    /// Create a new database at a specific path.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Opening database at: {:?}", path);
        let pool = ConnectionPool::new(&path)?;

        Ok(Self { pool })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let pool = ConnectionPool::in_memory()?;
        Ok(Self { pool })
    }

    /// Get the default database path.
    pub fn default_db_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "focustube", "focustube")
            .ok_or_else(|| StorageError::Config("Could not determine app data directory".into()))?;

        Ok(proj_dirs.data_dir().join("focustube.db"))
    }

    // === Settings ===

    /// Load the stored settings, repaired, or defaults when none are stored.
    pub fn load_settings(&self) -> Result<Settings> {
        let conn = self.pool.get()?;
        SettingsRepo::load(&conn)
    }

    /// Replace the stored settings.
    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        let conn = self.pool.get()?;
        SettingsRepo::save(&conn, settings, now_ms())
    }

    /// Replace the stored settings with a JSON snapshot, repaired on the way in.
    pub fn import_settings(&self, json: &str) -> Result<Settings> {
        let settings = Settings::from_json_str(json)?;
        self.save_settings(&settings)?;
        info!(
            domains = settings.blocked_domains.len(),
            whitelist = settings.whitelist.len(),
            "Settings imported"
        );
        Ok(settings)
    }

    /// The stored settings as pretty-printed JSON.
    pub fn export_settings_json(&self) -> Result<String> {
        let settings = self.load_settings()?;
        Ok(serde_json::to_string_pretty(&settings)?)
    }

    /// Loads, mutates and saves under one connection guard. Nothing is
    /// written when `f` fails.
    fn update_settings<T>(
        &self,
        now_ms: i64,
        f: impl FnOnce(&mut Settings) -> focustube_core::Result<T>,
    ) -> Result<T> {
        let conn = self.pool.get()?;
        let mut settings = SettingsRepo::load(&conn)?;
        let out = f(&mut settings)?;
        SettingsRepo::save(&conn, &settings, now_ms)?;
        Ok(out)
    }

    // === Unblocking ===

    /// Grant a temporary unblock starting at `now_ms`; returns its expiry.
    pub fn grant_temporary_unblock(&self, now_ms: i64) -> Result<i64> {
        self.update_settings(now_ms, |s| s.grant_temporary_unblock(now_ms))
    }

    /// Start this period's weekly session (host time zone).
    pub fn start_weekly_session(&self, now_ms: i64) -> Result<i64> {
        self.start_weekly_session_in(now_ms, &Local)
    }

    /// Start this period's weekly session in `tz`; returns its expiry.
    pub fn start_weekly_session_in<Tz: TimeZone>(&self, now_ms: i64, tz: &Tz) -> Result<i64> {
        let until =
            self.update_settings(now_ms, |s| weekly::start_weekly_session_in(s, now_ms, tz))?;
        info!(until, "Weekly session started");
        Ok(until)
    }

    // === Strict mode ===

    pub fn enable_strict_mode(&self, pin: &str) -> Result<()> {
        self.update_settings(now_ms(), |s| strict::enable_strict_mode(s, pin))
    }

    pub fn disable_strict_mode(&self, pin: &str) -> Result<()> {
        self.update_settings(now_ms(), |s| strict::disable_strict_mode(s, pin))
    }

    pub fn change_pin(&self, current: &str, new_pin: &str) -> Result<()> {
        self.update_settings(now_ms(), |s| strict::change_pin(s, current, new_pin))
    }

    // === Blocked domains ===

    /// Add (or retag) a blocked domain; returns the normalized domain.
    pub fn add_blocked_domain(&self, input: &str, tags: &[DomainTag]) -> Result<String> {
        self.update_settings(now_ms(), |s| s.add_blocked_domain(input, tags))
    }

    pub fn remove_blocked_domain(&self, input: &str) -> Result<bool> {
        self.update_settings(now_ms(), |s| Ok(s.remove_blocked_domain(input)))
    }

    // === Whitelist ===

    pub fn add_whitelist_entry(&self, raw: &str) -> Result<WhitelistEntry> {
        self.update_settings(now_ms(), |s| s.add_whitelist_entry(raw))
    }

    pub fn remove_whitelist_entry(&self, raw: &str) -> Result<bool> {
        self.update_settings(now_ms(), |s| Ok(s.remove_whitelist_entry(raw)))
    }

    // === Intervals ===

    pub fn add_interval(
        &self,
        day: u8,
        start: &str,
        end: &str,
        mode: IntervalMode,
    ) -> Result<Interval> {
        self.update_settings(now_ms(), |s| s.add_interval(day, start, end, mode))
    }

    pub fn remove_interval(&self, id: &str) -> Result<bool> {
        self.update_settings(now_ms(), |s| Ok(s.remove_interval(id)))
    }

    // === Metrics ===

    /// Append an event and fold it into its day's aggregate.
    pub fn record_event(&self, event: &NewEvent) -> Result<i64> {
        let conn = self.pool.get()?;
        let tx = conn.unchecked_transaction()?;
        let id = EventsRepo::insert(&tx, event)?;
        StatsRepo::apply(&tx, utc_day(event.ts), &event.daily_delta())?;
        tx.commit()?;

        debug!(id, kind = event.kind.as_str(), "Event recorded");
        Ok(id)
    }

    /// Record a blocked navigation. Returns `false` when the same URL was
    /// recorded less than [`ATTEMPT_COOLDOWN_MS`] ago.
    pub fn record_attempt(&self, url: &str, now_ms: i64) -> Result<bool> {
        let conn = self.pool.get()?;
        let tx = conn.unchecked_transaction()?;

        if let Some(last) = EventsRepo::last_attempt_at(&tx, url)? {
            if (now_ms - last).abs() < ATTEMPT_COOLDOWN_MS {
                debug!(url, "Attempt within cooldown, skipped");
                return Ok(false);
            }
        }

        let event = NewEvent::attempt(now_ms, domain::normalize_domain(url), url);
        EventsRepo::insert(&tx, &event)?;
        StatsRepo::apply(&tx, utc_day(now_ms), &event.daily_delta())?;
        tx.commit()?;
        Ok(true)
    }

    /// Record `delta_sec` seconds spent on `domain`.
    pub fn record_time(&self, domain: &str, delta_sec: i64, now_ms: i64) -> Result<i64> {
        self.record_event(&NewEvent::time(now_ms, domain, delta_sec))
    }

    /// Record `delta_sec` seconds spent on a block screen.
    pub fn record_blocked_time(&self, delta_sec: i64, now_ms: i64) -> Result<i64> {
        self.record_event(&NewEvent::blocked_time(now_ms, delta_sec))
    }

    pub fn record_session_start(&self, domain: Option<&str>, now_ms: i64) -> Result<i64> {
        self.record_event(&NewEvent::session_start(
            now_ms,
            domain.map(str::to_string),
        ))
    }

    pub fn get_daily_stats(&self, day: NaiveDate) -> Result<Option<DailyStats>> {
        let conn = self.pool.get()?;
        StatsRepo::get_by_day(&conn, day)
    }

    pub fn get_stats_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyStats>> {
        let conn = self.pool.get()?;
        StatsRepo::get_range(&conn, start, end)
    }

    pub fn get_totals(&self) -> Result<MetricsTotals> {
        let conn = self.pool.get()?;
        StatsRepo::get_totals(&conn)
    }

    pub fn get_recent_events(&self, limit: i64, offset: i64) -> Result<Vec<Event>> {
        let conn = self.pool.get()?;
        EventsRepo::get_recent(&conn, limit, offset)
    }

    /// Clear the event log and every daily aggregate.
    pub fn reset_metrics(&self) -> Result<()> {
        let conn = self.pool.get()?;
        let tx = conn.unchecked_transaction()?;
        let events = EventsRepo::delete_all(&tx)?;
        let days = StatsRepo::delete_all(&tx)?;
        tx.commit()?;

        info!(events, days, "Metrics reset");
        Ok(())
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
