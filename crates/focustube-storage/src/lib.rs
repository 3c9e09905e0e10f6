//! FocusTube Storage - SQLite persistence layer.
//!
//! This crate provides database storage for the FocusTube blocker.
//! It handles:
//!
//! - The settings snapshot (JSON in the `config` table, repaired on load)
//! - Settings mutations (temporary unblock, weekly session, strict mode, edits)
//! - Usage event logging
//! - Daily statistics aggregation
//!
//! # Example
//!
//! ```no_run
//! use focustube_core::{evaluate_block, DomainTag};
//! use focustube_storage::Database;
//!
//! let db = Database::in_memory().unwrap();
//! db.add_blocked_domain("youtube.com", &[DomainTag::Intervals]).unwrap();
//!
//! let settings = db.load_settings().unwrap();
//! let now = chrono::Utc::now().timestamp_millis();
//! let url = "https://www.youtube.com/watch?v=abc";
//! if evaluate_block(url, &settings, now).blocked {
//!     db.record_attempt(url, now).unwrap();
//! }
//! ```

mod database;
pub mod error;
pub mod models;
mod pool;
pub mod repository;
mod schema;

pub use database::{Database, ATTEMPT_COOLDOWN_MS};
pub use error::{Result, StorageError};
pub use models::{
    Config, DailyDelta, DailyStats, Event, EventKind, MetricsTotals, NewEvent,
};
pub use pool::ConnectionPool;
pub use repository::{utc_day, ConfigRepo, EventsRepo, SettingsRepo, StatsRepo};
