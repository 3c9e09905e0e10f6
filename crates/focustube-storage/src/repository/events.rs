//! Events repository.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::Result;
use crate::models::{Event, EventKind, NewEvent};

const EVENT_COLUMNS: &str = "id, ts, day, kind, domain, url, delta_sec";

/// UTC day of an epoch-ms timestamp.
pub fn utc_day(ts: i64) -> NaiveDate {
    DateTime::<Utc>::from_timestamp_millis(ts)
        .map(|dt| dt.date_naive())
        .unwrap_or(NaiveDate::MIN)
}

fn format_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Repository for event operations.
pub struct EventsRepo;

impl EventsRepo {
    /// Insert a new event.
    pub fn insert(conn: &Connection, event: &NewEvent) -> Result<i64> {
        conn.execute(
            "INSERT INTO events (ts, day, kind, domain, url, delta_sec)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                event.ts,
                format_day(utc_day(event.ts)),
                event.kind.as_str(),
                event.domain,
                event.url,
                event.delta_sec,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Get recent events, newest first.
    pub fn get_recent(conn: &Connection, limit: i64, offset: i64) -> Result<Vec<Event>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM events ORDER BY ts DESC, id DESC LIMIT ?1 OFFSET ?2",
            EVENT_COLUMNS
        ))?;

        let events = stmt
            .query_map([limit, offset], row_to_event)?
            .filter_map(|r| r.ok())
            .flatten()
            .collect();

        Ok(events)
    }

    /// Get all events recorded on a UTC day, oldest first.
    pub fn get_by_day(conn: &Connection, day: NaiveDate) -> Result<Vec<Event>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM events WHERE day = ?1 ORDER BY ts ASC, id ASC",
            EVENT_COLUMNS
        ))?;

        let events = stmt
            .query_map([format_day(day)], row_to_event)?
            .filter_map(|r| r.ok())
            .flatten()
            .collect();

        Ok(events)
    }

    /// Timestamp of the latest attempt recorded for `url`.
    pub fn last_attempt_at(conn: &Connection, url: &str) -> Result<Option<i64>> {
        let ts = conn
            .query_row(
                "SELECT MAX(ts) FROM events WHERE kind = ?1 AND url = ?2",
                params![EventKind::Attempt.as_str(), url],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()?
            .flatten();
        Ok(ts)
    }

    /// Count total events.
    pub fn count(conn: &Connection) -> Result<i64> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Delete every event.
    pub fn delete_all(conn: &Connection) -> Result<i64> {
        let deleted = conn.execute("DELETE FROM events", [])?;
        Ok(deleted as i64)
    }
}

/// Maps a row to an event. Rows with an unknown kind or day are skipped.
fn row_to_event(row: &Row<'_>) -> rusqlite::Result<Option<Event>> {
    let day: String = row.get(2)?;
    let kind: String = row.get(3)?;
    let (Ok(day), Some(kind)) = (
        NaiveDate::parse_from_str(&day, "%Y-%m-%d"),
        EventKind::parse(&kind),
    ) else {
        return Ok(None);
    };

    Ok(Some(Event {
        id: row.get(0)?,
        ts: row.get(1)?,
        day,
        kind,
        domain: row.get(4)?,
        url: row.get(5)?,
        delta_sec: row.get(6)?,
    }))
}
