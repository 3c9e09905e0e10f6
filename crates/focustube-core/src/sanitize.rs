//! Lenient settings loading.
//!
//! Stored snapshots come from several generations of the extension. Loading
//! never fails: each field is checked on its own and falls back to its
//! default when it has the wrong shape. Older `schedules` tables are
//! converted to intervals. A missing tag table leaves every domain untagged.

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::Result;
use crate::schedule::{empty_week, Interval, IntervalMode, IntervalWeek};
use crate::settings::{DomainTag, DomainTags, Language, Settings};

impl Settings {
    /// Builds settings from an arbitrary JSON value, repairing what it can.
    pub fn from_json(value: &Value) -> Settings {
        let defaults = Settings::default();
        let Some(obj) = value.as_object() else {
            if !value.is_null() {
                warn!("Settings snapshot is not an object, using defaults");
            }
            return defaults;
        };

        let (blocked_domain_tags, mut legacy_manual_domains) =
            domain_tags(obj.get("blockedDomainTags"));
        for domain in string_list(obj, "legacyManualDomains").unwrap_or_default() {
            let tagged = blocked_domain_tags.contains_key(&domain);
            if !tagged && !legacy_manual_domains.contains(&domain) {
                legacy_manual_domains.push(domain);
            }
        }

        Settings {
            block_enabled: flag(obj, "blockEnabled", defaults.block_enabled),
            block_shorts: flag(obj, "blockShorts", defaults.block_shorts),
            block_kids: flag(obj, "blockKids", defaults.block_kids),
            block_instagram_reels: flag(
                obj,
                "blockInstagramReels",
                defaults.block_instagram_reels,
            ),
            language: obj
                .get("language")
                .and_then(Value::as_str)
                .and_then(Language::parse)
                .unwrap_or(defaults.language),
            strict_mode: flag(obj, "strictMode", defaults.strict_mode),
            pin_hash: string(obj, "pinHash"),
            blocked_domains: string_list(obj, "blockedDomains")
                .unwrap_or(defaults.blocked_domains),
            blocked_domain_tags,
            legacy_manual_domains,
            whitelist: string_list(obj, "whitelist").unwrap_or(defaults.whitelist),
            intervals_by_day: intervals(obj),
            time_format_12h: flag(obj, "timeFormat12h", defaults.time_format_12h),
            unblock_until: timestamp(obj, "unblockUntil"),
            weekly_unblock_enabled: truthy(obj.get("weeklyUnblockEnabled")),
            weekly_unblock_days: weekdays(obj.get("weeklyUnblockDays"))
                .unwrap_or(defaults.weekly_unblock_days),
            weekly_unblock_duration_minutes: duration_minutes(
                obj.get("weeklyUnblockDurationMinutes"),
            )
            .unwrap_or(defaults.weekly_unblock_duration_minutes),
            weekly_unblock_until: timestamp(obj, "weeklyUnblockUntil"),
            weekly_unblock_last_week: string(obj, "weeklyUnblockLastWeek"),
        }
    }

    /// Parses a JSON document and repairs it with [`Settings::from_json`].
    pub fn from_json_str(input: &str) -> Result<Settings> {
        let value: Value = serde_json::from_str(input)?;
        Ok(Settings::from_json(&value))
    }
}

/// JavaScript-style truthiness.
fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

fn flag(obj: &Map<String, Value>, key: &str, default: bool) -> bool {
    match obj.get(key) {
        None => default,
        value => truthy(value),
    }
}

fn string(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

fn string_list(obj: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    let items = obj.get(key)?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
    )
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn timestamp(obj: &Map<String, Value>, key: &str) -> Option<i64> {
    match obj.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    }
}

fn weekdays(value: Option<&Value>) -> Option<Vec<u8>> {
    let items = value?.as_array()?;
    let mut days: Vec<u8> = items
        .iter()
        .filter_map(number)
        .filter(|day| day.fract() == 0.0 && (0.0..=6.0).contains(day))
        .map(|day| day as u8)
        .collect();
    days.sort_unstable();
    days.dedup();
    Some(days)
}

fn duration_minutes(value: Option<&Value>) -> Option<u32> {
    let minutes = value?.as_f64()?;
    Some(minutes.floor().clamp(1.0, u32::MAX as f64) as u32)
}

/// Returns the recognized tag table and the domains whose non-empty tag
/// list held no recognized tag.
fn domain_tags(value: Option<&Value>) -> (DomainTags, Vec<String>) {
    let mut table = DomainTags::new();
    let mut unrecognized = Vec::new();
    let Some(obj) = value.and_then(Value::as_object) else {
        return (table, unrecognized);
    };

    for (domain, tags) in obj {
        let Some(tags) = tags.as_array() else {
            continue;
        };
        let mut unique: Vec<DomainTag> = Vec::new();
        for tag in tags.iter().filter_map(Value::as_str).filter_map(DomainTag::parse) {
            if !unique.contains(&tag) {
                unique.push(tag);
            }
        }
        if !unique.is_empty() {
            table.insert(domain.clone(), unique);
        } else if !tags.is_empty() {
            unrecognized.push(domain.clone());
        }
    }
    (table, unrecognized)
}

fn day_index(key: &str) -> Option<u8> {
    key.trim().parse::<u8>().ok().filter(|day| *day < 7)
}

fn generated_id(day: u8, idx: usize, start: &str, end: &str) -> String {
    format!("day-{}-{}-{}-{}", day, idx, start, end)
}

fn intervals(obj: &Map<String, Value>) -> IntervalWeek {
    if let Some(days) = obj.get("intervalsByDay").and_then(Value::as_object) {
        return merge_intervals(days);
    }
    if let Some(days) = obj.get("schedules").and_then(Value::as_object) {
        return schedules_to_intervals(days);
    }
    empty_week()
}

fn merge_intervals(days: &Map<String, Value>) -> IntervalWeek {
    let mut week = empty_week();
    for (key, ranges) in days {
        let (Some(day), Some(ranges)) = (day_index(key), ranges.as_array()) else {
            continue;
        };
        let parsed = ranges
            .iter()
            .filter_map(Value::as_object)
            .enumerate()
            .map(|(idx, range)| {
                let start = string(range, "start").unwrap_or_default();
                let end = string(range, "end").unwrap_or_default();
                let id = string(range, "id")
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| generated_id(day, idx, &start, &end));
                let mode = match range.get("mode").and_then(Value::as_str) {
                    Some("free") => IntervalMode::Free,
                    _ => IntervalMode::Blocked,
                };
                Interval {
                    id,
                    start,
                    end,
                    mode,
                    enabled: truthy(range.get("enabled")),
                }
            })
            .collect();
        week.insert(day, parsed);
    }
    week
}

fn schedules_to_intervals(days: &Map<String, Value>) -> IntervalWeek {
    let mut week = empty_week();
    for (key, ranges) in days {
        let (Some(day), Some(ranges)) = (day_index(key), ranges.as_array()) else {
            continue;
        };
        let parsed = ranges
            .iter()
            .filter_map(Value::as_object)
            .enumerate()
            .map(|(idx, range)| {
                let start = string(range, "start")
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| "00:00".to_string());
                let end = string(range, "end")
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| "00:00".to_string());
                Interval::new(generated_id(day, idx, &start, &end), start, end)
            })
            .collect();
        week.insert(day, parsed);
    }
    week
}
