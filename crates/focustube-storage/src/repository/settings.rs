//! Settings snapshot repository.

use focustube_core::Settings;
use rusqlite::Connection;
use tracing::warn;

use crate::error::Result;
use crate::repository::ConfigRepo;

/// Config key holding the settings snapshot.
pub const SETTINGS_KEY: &str = "settings";

/// Repository for the settings snapshot.
pub struct SettingsRepo;

impl SettingsRepo {
    /// Loads the stored snapshot, repaired. Missing settings yield defaults.
    pub fn load(conn: &Connection) -> Result<Settings> {
        match ConfigRepo::get(conn, SETTINGS_KEY)? {
            Some(config) => {
                if config.value.is_null() {
                    warn!("Stored settings are unreadable, falling back to defaults");
                }
                Ok(Settings::from_json(&config.value))
            }
            None => Ok(Settings::default()),
        }
    }

    /// Stores the snapshot.
    pub fn save(conn: &Connection, settings: &Settings, now_ms: i64) -> Result<()> {
        let value = serde_json::to_value(settings)?;
        ConfigRepo::set(conn, SETTINGS_KEY, &value, now_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::run_migrations;
    use focustube_core::DomainTag;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn test_load_defaults_when_empty() {
        let conn = setup_db();
        assert_eq!(SettingsRepo::load(&conn).unwrap(), Settings::default());
    }

    #[test]
    fn test_save_and_load() {
        let conn = setup_db();
        let mut settings = Settings::default();
        settings
            .add_blocked_domain("youtube.com", &[DomainTag::Intervals])
            .unwrap();
        settings.strict_mode = true;

        SettingsRepo::save(&conn, &settings, 1).unwrap();
        assert_eq!(SettingsRepo::load(&conn).unwrap(), settings);
    }

    #[test]
    fn test_load_repairs_legacy_snapshot() {
        let conn = setup_db();
        conn.execute(
            "INSERT INTO config (key, value) VALUES ('settings', ?1)",
            [r#"{"blockEnabled":true,"blockedDomains":["youtube.com"],"schedules":{"1":[{"start":"08:00","end":"09:00"}]}}"#],
        )
        .unwrap();

        let settings = SettingsRepo::load(&conn).unwrap();
        assert!(settings.block_enabled);
        assert!(settings.blocked_domain_tags.is_empty());
        assert_eq!(
            settings.domain_policy("youtube.com"),
            focustube_core::DomainPolicy::Untagged
        );
        assert_eq!(settings.intervals_by_day[&1].len(), 1);
    }
}
