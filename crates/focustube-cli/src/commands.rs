//! Subcommands and their output.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Duration, Local, TimeZone, Utc};
use clap::Subcommand;
use focustube_core::time::WEEKDAY_NAMES;
use focustube_core::{
    can_start_weekly_session, compute_schedule_timeline, evaluate_block, format_duration,
    is_weekly_session_active, weekly_session_duration_ms, DomainPolicy, DomainTag, IntervalMode,
    ScheduleTimeline, Settings, TimelineState,
};
use focustube_storage::{utc_day, Database};
use serde_json::json;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decide whether a URL is blocked right now
    Check {
        url: String,
        /// Do not record a blocked attempt
        #[arg(long)]
        no_record: bool,
    },
    /// Show the current state and the next schedule boundary
    Timeline,
    /// Unblock for five minutes
    Unblock,
    /// Weekly free session
    Weekly {
        #[command(subcommand)]
        command: WeeklyCommand,
    },
    /// PIN-protected strict mode
    Strict {
        #[command(subcommand)]
        command: StrictCommand,
    },
    /// Blocked domains
    Domains {
        #[command(subcommand)]
        command: DomainsCommand,
    },
    /// Whitelisted channels, videos and pages
    Whitelist {
        #[command(subcommand)]
        command: WhitelistCommand,
    },
    /// Weekly schedule intervals
    Intervals {
        #[command(subcommand)]
        command: IntervalsCommand,
    },
    /// Whole settings snapshot
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
    /// Usage metrics
    Stats {
        #[command(subcommand)]
        command: StatsCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum WeeklyCommand {
    Status,
    Start,
}

#[derive(Subcommand, Debug)]
pub enum StrictCommand {
    Enable {
        #[arg(long)]
        pin: String,
    },
    Disable {
        #[arg(long)]
        pin: String,
    },
    ChangePin {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum DomainsCommand {
    List,
    Add {
        domain: String,
        /// Governing tag: intervals (intervalos) or weekly (por_semana)
        #[arg(long = "tag", value_parser = parse_tag)]
        tags: Vec<DomainTag>,
    },
    Remove {
        domain: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum WhitelistCommand {
    List,
    Add { entry: String },
    Remove { entry: String },
}

#[derive(Subcommand, Debug)]
pub enum IntervalsCommand {
    List,
    Add {
        /// Day of week, 0 = Sunday
        #[arg(value_parser = clap::value_parser!(u8).range(0..=6))]
        day: u8,
        start: String,
        end: String,
        /// Free time instead of a block
        #[arg(long)]
        free: bool,
    },
    Remove {
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    Show,
    /// Replace the settings with a JSON snapshot (`-` reads stdin)
    Import { file: PathBuf },
    Export {
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum StatsCommand {
    Show {
        /// Number of days, ending today (UTC)
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    Reset,
}

/// Accepts the stored tag names and their English aliases.
fn parse_tag(s: &str) -> std::result::Result<DomainTag, String> {
    match s {
        "intervals" => Ok(DomainTag::Intervals),
        "weekly" => Ok(DomainTag::Weekly),
        other => DomainTag::parse(other).ok_or_else(|| format!("unknown tag '{}'", other)),
    }
}

/// Local wall-clock rendering of an epoch-ms timestamp.
fn format_clock(ms: i64, twelve_hour: bool) -> String {
    let pattern = if twelve_hour {
        "%a %I:%M %p"
    } else {
        "%a %H:%M"
    };
    match Local.timestamp_millis_opt(ms).single() {
        Some(dt) => dt.format(pattern).to_string(),
        None => "-".to_string(),
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn run(db: &Database, command: Command, json: bool, now_ms: i64) -> Result<()> {
    match command {
        Command::Check { url, no_record } => check(db, &url, !no_record, json, now_ms),
        Command::Timeline => {
            let settings = db.load_settings()?;
            let timeline = compute_schedule_timeline(&settings, now_ms);
            if json {
                print_json(&timeline)
            } else {
                println!("{}", describe_timeline(&timeline, &settings, now_ms));
                Ok(())
            }
        }
        Command::Unblock => {
            let until = db.grant_temporary_unblock(now_ms)?;
            let settings = db.load_settings()?;
            println!(
                "Unblocked until {}",
                format_clock(until, settings.time_format_12h)
            );
            Ok(())
        }
        Command::Weekly { command } => weekly(db, command, json, now_ms),
        Command::Strict { command } => {
            match command {
                StrictCommand::Enable { pin } => {
                    db.enable_strict_mode(&pin)?;
                    println!("Strict mode enabled");
                }
                StrictCommand::Disable { pin } => {
                    db.disable_strict_mode(&pin)?;
                    println!("Strict mode disabled");
                }
                StrictCommand::ChangePin { current, new } => {
                    db.change_pin(&current, &new)?;
                    println!("PIN changed");
                }
            }
            Ok(())
        }
        Command::Domains { command } => domains(db, command, json),
        Command::Whitelist { command } => whitelist(db, command, json),
        Command::Intervals { command } => intervals(db, command, json),
        Command::Settings { command } => settings(db, command),
        Command::Stats { command } => stats(db, command, json, now_ms),
    }
}

fn check(db: &Database, url: &str, record: bool, json: bool, now_ms: i64) -> Result<()> {
    let settings = db.load_settings()?;
    let decision = evaluate_block(url, &settings, now_ms);

    let recorded = if decision.blocked && record {
        db.record_attempt(url, now_ms)?
    } else {
        false
    };

    if json {
        print_json(&json!({
            "blocked": decision.blocked,
            "reason": decision.reason,
            "label": decision.label(settings.language),
            "recorded": recorded,
        }))
    } else {
        if decision.blocked {
            println!("blocked: {}", decision.label(settings.language));
        } else {
            println!("allowed");
        }
        Ok(())
    }
}

/// One-line summary of the timeline, e.g. `blocked (Blocked by schedule), 0:42:10 left`.
fn describe_timeline(timeline: &ScheduleTimeline, settings: &Settings, now_ms: i64) -> String {
    let state = match timeline.state {
        TimelineState::Blocked => "blocked",
        TimelineState::Free => "free",
    };
    let mut line = format!("{} ({})", state, timeline.reason.label(settings.language));

    if let Some(remaining) = timeline.remaining_ms(now_ms) {
        line.push_str(&format!(", {} left", format_duration(remaining)));
    }
    if let (Some(start), Some(end)) = (timeline.next_block_start, timeline.next_block_end) {
        if timeline.state == TimelineState::Free {
            line.push_str(&format!(
                "; next block {} - {}",
                format_clock(start, settings.time_format_12h),
                format_clock(end, settings.time_format_12h)
            ));
        }
    }
    line
}

fn weekly(db: &Database, command: WeeklyCommand, json: bool, now_ms: i64) -> Result<()> {
    match command {
        WeeklyCommand::Status => {
            let settings = db.load_settings()?;
            let active = is_weekly_session_active(&settings, now_ms);
            let can_start = can_start_weekly_session(&settings, now_ms);
            let duration_ms = weekly_session_duration_ms(&settings);

            if json {
                return print_json(&json!({
                    "enabled": settings.weekly_unblock_enabled,
                    "active": active,
                    "canStart": can_start,
                    "until": settings.weekly_unblock_until,
                    "durationMinutes": settings.weekly_unblock_duration_minutes,
                    "days": settings.weekly_unblock_days,
                }));
            }

            let days: Vec<&str> = settings
                .weekly_unblock_days
                .iter()
                .filter_map(|d| WEEKDAY_NAMES.get(*d as usize).copied())
                .collect();
            println!(
                "enabled: {}, days: {}, duration: {}",
                settings.weekly_unblock_enabled,
                days.join(","),
                format_duration(duration_ms)
            );
            match settings.weekly_unblock_until.filter(|_| active) {
                Some(until) => println!(
                    "active, {} left",
                    format_duration(until - now_ms)
                ),
                None if can_start => println!("available now"),
                None => println!("not available"),
            }
            Ok(())
        }
        WeeklyCommand::Start => {
            let until = db.start_weekly_session(now_ms)?;
            let settings = db.load_settings()?;
            println!(
                "Weekly session running until {}",
                format_clock(until, settings.time_format_12h)
            );
            Ok(())
        }
    }
}

fn domains(db: &Database, command: DomainsCommand, json: bool) -> Result<()> {
    match command {
        DomainsCommand::List => {
            let settings = db.load_settings()?;
            if json {
                return print_json(&json!({
                    "blockedDomains": settings.blocked_domains,
                    "blockedDomainTags": settings.blocked_domain_tags,
                    "legacyManualDomains": settings.legacy_manual_domains,
                }));
            }
            for domain in &settings.blocked_domains {
                let tags: Vec<String> = settings
                    .tags_for(domain)
                    .iter()
                    .map(|t| t.to_string())
                    .collect();
                if settings.domain_policy(domain) == DomainPolicy::LegacyManual {
                    println!("{} [manual]", domain);
                } else if tags.is_empty() {
                    println!("{}", domain);
                } else {
                    println!("{} [{}]", domain, tags.join(", "));
                }
            }
        }
        DomainsCommand::Add { domain, tags } => {
            let domain = db.add_blocked_domain(&domain, &tags)?;
            println!("Blocking {}", domain);
        }
        DomainsCommand::Remove { domain } => {
            if db.remove_blocked_domain(&domain)? {
                println!("Removed {}", domain);
            } else {
                println!("{} was not blocked", domain);
            }
        }
    }
    Ok(())
}

fn whitelist(db: &Database, command: WhitelistCommand, json: bool) -> Result<()> {
    match command {
        WhitelistCommand::List => {
            let settings = db.load_settings()?;
            if json {
                return print_json(&settings.whitelist);
            }
            for raw in &settings.whitelist {
                match focustube_core::parse_whitelist_entry(raw) {
                    Some(entry) => println!("{} ({}: {})", raw, entry.kind(), entry),
                    None => println!("{} (unrecognized)", raw),
                }
            }
        }
        WhitelistCommand::Add { entry } => {
            let parsed = db.add_whitelist_entry(&entry)?;
            println!("Whitelisted {} ({})", parsed, parsed.kind());
        }
        WhitelistCommand::Remove { entry } => {
            if db.remove_whitelist_entry(&entry)? {
                println!("Removed {}", entry);
            } else {
                println!("{} was not whitelisted", entry);
            }
        }
    }
    Ok(())
}

fn intervals(db: &Database, command: IntervalsCommand, json: bool) -> Result<()> {
    match command {
        IntervalsCommand::List => {
            let settings = db.load_settings()?;
            if json {
                return print_json(&settings.intervals_by_day);
            }
            for (day, intervals) in &settings.intervals_by_day {
                let name = WEEKDAY_NAMES.get(*day as usize).copied().unwrap_or("?");
                for interval in intervals {
                    println!(
                        "{} {}-{} {}{}  {}",
                        name,
                        interval.start,
                        interval.end,
                        interval.mode.as_str(),
                        if interval.enabled { "" } else { " (disabled)" },
                        interval.id
                    );
                }
            }
        }
        IntervalsCommand::Add {
            day,
            start,
            end,
            free,
        } => {
            let mode = if free {
                IntervalMode::Free
            } else {
                IntervalMode::Blocked
            };
            let interval = db.add_interval(day, &start, &end, mode)?;
            println!("Added {}", interval.id);
        }
        IntervalsCommand::Remove { id } => {
            if db.remove_interval(&id)? {
                println!("Removed {}", id);
            } else {
                println!("No interval {}", id);
            }
        }
    }
    Ok(())
}

fn settings(db: &Database, command: SettingsCommand) -> Result<()> {
    match command {
        SettingsCommand::Show => println!("{}", db.export_settings_json()?),
        SettingsCommand::Import { file } => {
            let mut input = String::new();
            if file.as_os_str() == "-" {
                std::io::stdin()
                    .read_to_string(&mut input)
                    .context("Failed to read settings from stdin")?;
            } else {
                input = std::fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read {}", file.display()))?;
            }
            let settings = db.import_settings(&input)?;
            println!(
                "Imported {} blocked domains, {} whitelist entries",
                settings.blocked_domains.len(),
                settings.whitelist.len()
            );
        }
        SettingsCommand::Export { output } => {
            let exported = db.export_settings_json()?;
            match output {
                Some(path) => std::fs::write(&path, exported)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{}", exported),
            }
        }
    }
    Ok(())
}

fn reset_notice(now_ms: i64) -> String {
    match Utc.timestamp_millis_opt(now_ms).single() {
        Some(at) => format!("Metrics cleared at {}", at.format("%Y-%m-%d %H:%M UTC")),
        None => "Metrics cleared".to_string(),
    }
}

fn stats(db: &Database, command: StatsCommand, json: bool, now_ms: i64) -> Result<()> {
    match command {
        StatsCommand::Show { days } => {
            let end = utc_day(now_ms);
            let start = end - Duration::days(i64::from(days.max(1)) - 1);
            let range = db.get_stats_range(start, end)?;
            let totals = db.get_totals()?;

            if json {
                return print_json(&json!({ "days": range, "totals": totals }));
            }
            for day in &range {
                println!(
                    "{}  attempts {:>4}  time {:>9}  blocked {:>9}  sessions {:>3}",
                    day.day,
                    day.attempts,
                    format_duration(day.time_sec * 1000),
                    format_duration(day.blocked_time_sec * 1000),
                    day.sessions
                );
            }
            println!(
                "total over {} days: {} attempts, {} on target sites",
                totals.days,
                totals.attempts,
                format_duration(totals.time_sec * 1000)
            );
        }
        StatsCommand::Reset => {
            db.reset_metrics()?;
            println!("{}", reset_notice(now_ms));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use focustube_core::TimelineReason;

    // ==================== Argument Tests ====================

    #[test]
    fn test_parse_tag_accepts_aliases() {
        assert_eq!(parse_tag("intervals"), Ok(DomainTag::Intervals));
        assert_eq!(parse_tag("intervalos"), Ok(DomainTag::Intervals));
        assert_eq!(parse_tag("weekly"), Ok(DomainTag::Weekly));
        assert_eq!(parse_tag("por_semana"), Ok(DomainTag::Weekly));
        assert!(parse_tag("daily").is_err());
    }

    // ==================== Output Tests ====================

    #[test]
    fn test_describe_manual_timeline() {
        let mut settings = Settings::default();
        settings.block_enabled = true;
        let timeline = compute_schedule_timeline(&settings, 0);
        assert_eq!(timeline.reason, TimelineReason::Manual);
        assert_eq!(
            describe_timeline(&timeline, &settings, 0),
            "blocked (Blocked manually)"
        );
    }

    #[test]
    fn test_describe_free_timeline_without_schedule() {
        let settings = Settings::default();
        let timeline = compute_schedule_timeline(&settings, 0);
        assert_eq!(
            describe_timeline(&timeline, &settings, 0),
            "free (Free time)"
        );
    }

    #[test]
    fn test_reset_notice_uses_given_clock() {
        assert_eq!(
            reset_notice(1_704_067_200_000),
            "Metrics cleared at 2024-01-01 00:00 UTC"
        );
        assert_eq!(reset_notice(i64::MAX), "Metrics cleared");
    }

    // ==================== Command Tests ====================

    #[test]
    fn test_check_records_blocked_attempt() {
        let db = Database::in_memory().unwrap();
        db.add_blocked_domain("youtube.com", &[]).unwrap();
        let mut settings = db.load_settings().unwrap();
        settings.block_enabled = true;
        db.save_settings(&settings).unwrap();

        let now = 1_704_067_200_000;
        check(&db, "https://youtube.com/watch?v=a", true, true, now).unwrap();
        check(&db, "https://youtube.com/watch?v=a", false, true, now + 10_000).unwrap();
        check(&db, "https://example.com", true, true, now).unwrap();

        assert_eq!(db.get_totals().unwrap().attempts, 1);
    }

    #[test]
    fn test_run_edits_through_database() {
        let db = Database::in_memory().unwrap();
        run(
            &db,
            Command::Domains {
                command: DomainsCommand::Add {
                    domain: "www.Instagram.com".into(),
                    tags: vec![DomainTag::Weekly],
                },
            },
            false,
            0,
        )
        .unwrap();
        run(
            &db,
            Command::Intervals {
                command: IntervalsCommand::Add {
                    day: 2,
                    start: "22:00".into(),
                    end: "06:00".into(),
                    free: false,
                },
            },
            false,
            0,
        )
        .unwrap();

        let settings = db.load_settings().unwrap();
        assert_eq!(settings.blocked_domains, vec!["instagram.com".to_string()]);
        assert_eq!(settings.tags_for("instagram.com"), &[DomainTag::Weekly]);
        assert!(settings.intervals_by_day[&2][0].is_overnight());
    }

    #[test]
    fn test_import_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"blockKids":true,"language":"es"}"#).unwrap();

        let db = Database::in_memory().unwrap();
        settings(&db, SettingsCommand::Import { file: path }).unwrap();

        let stored = db.load_settings().unwrap();
        assert!(stored.block_kids);
        assert_eq!(stored.language, focustube_core::Language::Es);
    }
}
