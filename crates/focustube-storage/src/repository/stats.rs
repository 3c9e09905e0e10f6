//! Daily statistics repository.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::Result;
use crate::models::{DailyDelta, DailyStats, MetricsTotals};

const STATS_COLUMNS: &str =
    "day, attempts, time_sec, blocked_time_sec, sessions, time_by_domain, updated_at";

/// Repository for daily statistics operations.
pub struct StatsRepo;

impl StatsRepo {
    /// Get stats for a specific day.
    pub fn get_by_day(conn: &Connection, day: NaiveDate) -> Result<Option<DailyStats>> {
        let stats = conn
            .query_row(
                &format!("SELECT {} FROM daily_stats WHERE day = ?1", STATS_COLUMNS),
                [day.format("%Y-%m-%d").to_string()],
                |row| row_to_stats(row, day),
            )
            .optional()?;

        Ok(stats)
    }

    /// Get stats for an inclusive day range.
    pub fn get_range(
        conn: &Connection,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyStats>> {
        let start_str = start.format("%Y-%m-%d").to_string();
        let end_str = end.format("%Y-%m-%d").to_string();

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM daily_stats WHERE day >= ?1 AND day <= ?2 ORDER BY day ASC",
            STATS_COLUMNS
        ))?;

        let stats = stmt
            .query_map([&start_str, &end_str], |row| {
                let day: String = row.get(0)?;
                match NaiveDate::parse_from_str(&day, "%Y-%m-%d") {
                    Ok(day) => row_to_stats(row, day).map(Some),
                    Err(_) => Ok(None),
                }
            })?
            .filter_map(|r| r.ok())
            .flatten()
            .collect();

        Ok(stats)
    }

    /// Adds `delta` to the row for `day`, creating it if needed.
    pub fn apply(conn: &Connection, day: NaiveDate, delta: &DailyDelta) -> Result<DailyStats> {
        let mut stats = Self::get_by_day(conn, day)?.unwrap_or_else(|| DailyStats::empty(day));
        stats.apply(delta);

        let time_by_domain = serde_json::to_string(&stats.time_by_domain)?;
        conn.execute(
            "INSERT INTO daily_stats (day, attempts, time_sec, blocked_time_sec, sessions, time_by_domain, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(day) DO UPDATE SET
               attempts = excluded.attempts,
               time_sec = excluded.time_sec,
               blocked_time_sec = excluded.blocked_time_sec,
               sessions = excluded.sessions,
               time_by_domain = excluded.time_by_domain,
               updated_at = excluded.updated_at",
            params![
                day.format("%Y-%m-%d").to_string(),
                stats.attempts,
                stats.time_sec,
                stats.blocked_time_sec,
                stats.sessions,
                time_by_domain,
                stats.updated_at,
            ],
        )?;

        Ok(stats)
    }

    /// Get total stats (sum of all days).
    pub fn get_totals(conn: &Connection) -> Result<MetricsTotals> {
        let totals = conn.query_row(
            "SELECT
                COUNT(*),
                COALESCE(SUM(attempts), 0),
                COALESCE(SUM(time_sec), 0),
                COALESCE(SUM(blocked_time_sec), 0),
                COALESCE(SUM(sessions), 0)
             FROM daily_stats",
            [],
            |row| {
                Ok(MetricsTotals {
                    days: row.get(0)?,
                    attempts: row.get(1)?,
                    time_sec: row.get(2)?,
                    blocked_time_sec: row.get(3)?,
                    sessions: row.get(4)?,
                })
            },
        )?;

        Ok(totals)
    }

    /// Delete every row.
    pub fn delete_all(conn: &Connection) -> Result<i64> {
        let deleted = conn.execute("DELETE FROM daily_stats", [])?;
        Ok(deleted as i64)
    }
}

fn row_to_stats(row: &Row<'_>, day: NaiveDate) -> rusqlite::Result<DailyStats> {
    let time_by_domain: String = row.get(5)?;
    Ok(DailyStats {
        day,
        attempts: row.get(1)?,
        time_sec: row.get(2)?,
        blocked_time_sec: row.get(3)?,
        sessions: row.get(4)?,
        time_by_domain: serde_json::from_str::<BTreeMap<String, i64>>(&time_by_domain)
            .unwrap_or_default(),
        updated_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewEvent;
    use crate::schema::run_migrations;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_apply_creates_then_accumulates() {
        let conn = setup_db();

        StatsRepo::apply(&conn, day(1), &NewEvent::attempt(1, None, "u").daily_delta()).unwrap();
        StatsRepo::apply(&conn, day(1), &NewEvent::attempt(2, None, "u").daily_delta()).unwrap();
        StatsRepo::apply(&conn, day(1), &NewEvent::time(3, "a.com", 40).daily_delta()).unwrap();

        let stats = StatsRepo::get_by_day(&conn, day(1)).unwrap().unwrap();
        assert_eq!(stats.attempts, 2);
        assert_eq!(stats.time_sec, 40);
        assert_eq!(stats.time_by_domain["a.com"], 40);
        assert_eq!(stats.updated_at, 3);
    }

    #[test]
    fn test_get_missing_day() {
        let conn = setup_db();
        assert!(StatsRepo::get_by_day(&conn, day(5)).unwrap().is_none());
    }

    #[test]
    fn test_get_range() {
        let conn = setup_db();
        for d in [1, 2, 4] {
            StatsRepo::apply(&conn, day(d), &NewEvent::session_start(0, None).daily_delta())
                .unwrap();
        }

        let range = StatsRepo::get_range(&conn, day(2), day(4)).unwrap();
        let days: Vec<_> = range.iter().map(|s| s.day).collect();
        assert_eq!(days, vec![day(2), day(4)]);
    }

    #[test]
    fn test_totals_and_delete() {
        let conn = setup_db();
        StatsRepo::apply(&conn, day(1), &NewEvent::attempt(0, None, "u").daily_delta()).unwrap();
        StatsRepo::apply(&conn, day(2), &NewEvent::blocked_time(0, 12).daily_delta()).unwrap();

        let totals = StatsRepo::get_totals(&conn).unwrap();
        assert_eq!(totals.days, 2);
        assert_eq!(totals.attempts, 1);
        assert_eq!(totals.blocked_time_sec, 12);

        assert_eq!(StatsRepo::delete_all(&conn).unwrap(), 2);
        assert_eq!(StatsRepo::get_totals(&conn).unwrap(), MetricsTotals::default());
    }
}
