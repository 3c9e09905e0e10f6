//! Database repositories for each table.

pub mod config;
pub mod events;
pub mod settings;
pub mod stats;

pub use config::ConfigRepo;
pub use events::{utc_day, EventsRepo};
pub use settings::{SettingsRepo, SETTINGS_KEY};
pub use stats::StatsRepo;
