//! Configuration repository.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::models::Config;

/// Repository for key-value configuration.
pub struct ConfigRepo;

impl ConfigRepo {
    /// Get a configuration value. Unparseable stored JSON reads as `null`.
    pub fn get(conn: &Connection, key: &str) -> Result<Option<Config>> {
        let config = conn
            .query_row(
                "SELECT key, value, updated_at FROM config WHERE key = ?1",
                [key],
                |row| {
                    let value_str: String = row.get(1)?;
                    Ok(Config {
                        key: row.get(0)?,
                        value: serde_json::from_str(&value_str)
                            .unwrap_or(serde_json::Value::Null),
                        updated_at: row.get(2)?,
                    })
                },
            )
            .optional()?;

        Ok(config)
    }

    /// Set a configuration value (insert or update).
    pub fn set(conn: &Connection, key: &str, value: &serde_json::Value, now_ms: i64) -> Result<()> {
        let value_json = serde_json::to_string(value)?;

        conn.execute(
            "INSERT INTO config (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
            params![key, value_json, now_ms],
        )?;

        Ok(())
    }

    /// Delete a configuration value.
    pub fn delete(conn: &Connection, key: &str) -> Result<bool> {
        let deleted = conn.execute("DELETE FROM config WHERE key = ?1", [key])?;
        Ok(deleted > 0)
    }

    /// Get a typed configuration value with a default.
    pub fn get_or_default<T: serde::de::DeserializeOwned>(
        conn: &Connection,
        key: &str,
        default: T,
    ) -> Result<T> {
        match Self::get(conn, key)? {
            Some(config) => Ok(serde_json::from_value(config.value).unwrap_or(default)),
            None => Ok(default),
        }
    }
}
