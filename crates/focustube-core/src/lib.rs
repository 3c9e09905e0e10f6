//! FocusTube Core - blocking decisions and schedule timelines.
//!
//! Everything here is pure: functions take a [`Settings`] snapshot and the
//! current time in epoch milliseconds and return plain values. Persistence
//! lives in `focustube-storage`.
//!
//! Time-dependent operations come in two forms. The plain form reads the
//! schedule in the host time zone; the `_in` form takes any
//! [`chrono::TimeZone`].

pub mod decision;
pub mod domain;
pub mod edits;
pub mod error;
pub mod sanitize;
pub mod schedule;
pub mod settings;
pub mod strict;
pub mod time;
pub mod timeline;
pub mod weekly;
pub mod whitelist;

pub use decision::{evaluate_block, evaluate_block_in, BlockDecision, BlockReason};
pub use domain::{
    hostname_matches, is_instagram_reels_url, is_kids_domain, is_shorts_url, is_target_url,
    match_domain, normalize_domain,
};
pub use error::{CoreError, Result};
pub use schedule::{is_within_blocked_schedule, Interval, IntervalMode, IntervalWeek};
pub use settings::{DomainPolicy, DomainTag, Language, Settings, TEMPORARY_UNBLOCK_MS};
pub use time::{minutes_to_time, parse_time_to_minutes};
pub use timeline::{
    compute_schedule_timeline, compute_schedule_timeline_in, format_duration, ScheduleTimeline,
    TimelineReason, TimelineState,
};
pub use weekly::{
    can_start_weekly_session, can_start_weekly_session_in, is_weekly_session_active,
    period_key, period_key_in, weekly_session_duration_ms,
};
pub use whitelist::{is_whitelisted, parse_whitelist_entry, Whitelist, WhitelistEntry};
