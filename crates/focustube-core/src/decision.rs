//! Block decision engine.
//!
//! Combines domain matching, whitelist, per-domain policy, temporary unblock,
//! content categories and the interval schedule into one [`BlockDecision`].
//!
//! ## Evaluation Order
//!
//! 1. Unparseable URL or host outside the blocked list: not a target
//! 2. Whitelisted URL: allowed, before any policy is consulted
//! 3. Domain without tags: blocked (`missing_tag`)
//! 4. Interval-governed: temporary unblock, kids, shorts, reels, schedule
//! 5. Weekly-governed: allowed only while a weekly session is active
//! 6. Domains with only unrecognized tags: temporary unblock, manual switch, kids, shorts
//!
//! The first rule that matches decides.

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::domain::{is_instagram_reels_url, is_kids_domain, is_shorts_url, match_domain};
use crate::schedule::is_within_blocked_schedule;
use crate::settings::{DomainPolicy, Language, Settings};
use crate::time::local_datetime;
use crate::weekly::is_weekly_session_active;
use crate::whitelist::is_whitelisted;

/// Why a URL was (or was not) blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    /// Manual block, weekly-governed domain, or reels.
    Manual,
    /// Inside a blocked schedule interval.
    Schedule,
    /// Short-form video page.
    Shorts,
    /// Kids video site.
    Kids,
    /// Blocked domain with no policy configured.
    MissingTag,
    /// URL is not on a blocked domain.
    NotTarget,
}

impl BlockReason {
    /// Returns the stored reason code.
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockReason::Manual => "manual",
            BlockReason::Schedule => "schedule",
            BlockReason::Shorts => "shorts",
            BlockReason::Kids => "kids",
            BlockReason::MissingTag => "missing_tag",
            BlockReason::NotTarget => "not_target",
        }
    }

    /// User-facing label. Empty for [`BlockReason::NotTarget`].
    pub fn label(&self, lang: Language) -> &'static str {
        match (self, lang) {
            (BlockReason::Manual, Language::En) => "Manual block",
            (BlockReason::Manual, Language::Es) => "Bloqueo manual",
            (BlockReason::Manual, Language::Pt) => "Bloqueio manual",
            (BlockReason::Manual, Language::Fr) => "Blocage manuel",
            (BlockReason::Schedule, Language::En) => "Scheduled block",
            (BlockReason::Schedule, Language::Es) => "Bloqueo por horario",
            (BlockReason::Schedule, Language::Pt) => "Bloqueio por horário",
            (BlockReason::Schedule, Language::Fr) => "Blocage programmé",
            (BlockReason::Shorts, Language::En) => "Shorts blocked",
            (BlockReason::Shorts, Language::Es) => "Shorts bloqueados",
            (BlockReason::Shorts, Language::Pt) => "Shorts bloqueados",
            (BlockReason::Shorts, Language::Fr) => "Shorts bloqués",
            (BlockReason::Kids, Language::En) => "Kids site blocked",
            (BlockReason::Kids, Language::Es) => "Sitio infantil bloqueado",
            (BlockReason::Kids, Language::Pt) => "Site infantil bloqueado",
            (BlockReason::Kids, Language::Fr) => "Site enfants bloqué",
            (BlockReason::MissingTag, Language::En) => "Domain has no blocking mode",
            (BlockReason::MissingTag, Language::Es) => "Dominio sin modo de bloqueo",
            (BlockReason::MissingTag, Language::Pt) => "Domínio sem modo de bloqueio",
            (BlockReason::MissingTag, Language::Fr) => "Domaine sans mode de blocage",
            (BlockReason::NotTarget, _) => "",
        }
    }
}

/// Outcome of evaluating one URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDecision {
    /// Whether access is blocked.
    pub blocked: bool,
    /// Reason, when one applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<BlockReason>,
}

impl BlockDecision {
    /// Allowed with no reason.
    pub fn allow() -> Self {
        Self {
            blocked: false,
            reason: None,
        }
    }

    /// Blocked for `reason`.
    pub fn block(reason: BlockReason) -> Self {
        Self {
            blocked: true,
            reason: Some(reason),
        }
    }

    /// Allowed because the URL is not on a blocked domain.
    pub fn not_target() -> Self {
        Self {
            blocked: false,
            reason: Some(BlockReason::NotTarget),
        }
    }

    /// Label for the reason, empty when there is none.
    pub fn label(&self, lang: Language) -> &'static str {
        self.reason.map(|reason| reason.label(lang)).unwrap_or("")
    }
}

/// Evaluates `url` against `settings` at `now_ms` in the host time zone.
pub fn evaluate_block(url: &str, settings: &Settings, now_ms: i64) -> BlockDecision {
    evaluate_block_in(url, settings, now_ms, &Local)
}

/// Evaluates `url` against `settings` at `now_ms`, reading the schedule in `tz`.
pub fn evaluate_block_in<Tz: TimeZone>(
    url: &str,
    settings: &Settings,
    now_ms: i64,
    tz: &Tz,
) -> BlockDecision {
    let Some(hostname) = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
    else {
        return BlockDecision::not_target();
    };

    let Some(domain) = match_domain(&hostname, &settings.blocked_domains) else {
        return BlockDecision::not_target();
    };

    if is_whitelisted(url, &settings.whitelist) {
        debug!(url, domain, "Whitelisted");
        return BlockDecision::allow();
    }

    let policy = settings.domain_policy(domain);
    let decision = match policy {
        DomainPolicy::Untagged => BlockDecision::block(BlockReason::MissingTag),
        DomainPolicy::IntervalGoverned => evaluate_intervals(url, settings, now_ms, tz),
        DomainPolicy::WeeklyGoverned => {
            if is_weekly_session_active(settings, now_ms) {
                BlockDecision::allow()
            } else {
                BlockDecision::block(BlockReason::Manual)
            }
        }
        DomainPolicy::LegacyManual => evaluate_legacy(url, settings, now_ms),
    };

    debug!(
        url,
        domain,
        ?policy,
        blocked = decision.blocked,
        reason = decision.reason.map(|r| r.as_str()),
        "Evaluated block decision"
    );
    decision
}

fn evaluate_intervals<Tz: TimeZone>(
    url: &str,
    settings: &Settings,
    now_ms: i64,
    tz: &Tz,
) -> BlockDecision {
    if settings.is_temporarily_unblocked(now_ms) {
        return BlockDecision::allow();
    }
    if settings.block_kids && is_kids_domain(url) {
        return BlockDecision::block(BlockReason::Kids);
    }
    if settings.block_shorts && is_shorts_url(url) {
        return BlockDecision::block(BlockReason::Shorts);
    }
    if settings.block_instagram_reels && is_instagram_reels_url(url) {
        return BlockDecision::block(BlockReason::Manual);
    }

    let scheduled = local_datetime(now_ms, tz)
        .is_some_and(|now| is_within_blocked_schedule(&now, &settings.intervals_by_day));
    if scheduled {
        BlockDecision::block(BlockReason::Schedule)
    } else {
        BlockDecision::allow()
    }
}

fn evaluate_legacy(url: &str, settings: &Settings, now_ms: i64) -> BlockDecision {
    if settings.is_temporarily_unblocked(now_ms) {
        return BlockDecision::allow();
    }
    if settings.block_enabled {
        return BlockDecision::block(BlockReason::Manual);
    }
    if settings.block_kids && is_kids_domain(url) {
        return BlockDecision::block(BlockReason::Kids);
    }
    if settings.block_shorts && is_shorts_url(url) {
        return BlockDecision::block(BlockReason::Shorts);
    }
    BlockDecision::allow()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{empty_week, Interval};
    use crate::settings::DomainTag;
    use chrono::Utc;

    fn ms(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> i64 {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0)
            .unwrap()
            .timestamp_millis()
    }

    // Monday 2024-01-01
    fn monday(h: u32, mi: u32) -> i64 {
        ms(2024, 1, 1, h, mi)
    }

    fn settings_with(tags: &[DomainTag]) -> Settings {
        let mut settings = Settings {
            blocked_domains: vec!["youtube.com".into()],
            block_shorts: false,
            ..Default::default()
        };
        settings.set_domain_tags("youtube.com", tags);
        let mut week = empty_week();
        week.insert(1, vec![Interval::new("m", "10:00", "11:00")]);
        settings.intervals_by_day = week;
        settings
    }

    fn eval(url: &str, settings: &Settings, now: i64) -> BlockDecision {
        evaluate_block_in(url, settings, now, &Utc)
    }

    const WATCH: &str = "https://www.youtube.com/watch?v=abc";

    // ==================== Target Tests ====================

    #[test]
    fn unparseable_url_is_not_target() {
        let settings = settings_with(&[DomainTag::Intervals]);
        assert_eq!(eval("not a url", &settings, 0), BlockDecision::not_target());
    }

    #[test]
    fn other_domain_is_not_target() {
        let settings = settings_with(&[DomainTag::Intervals]);
        assert_eq!(
            eval("https://vimeo.com/1", &settings, monday(10, 30)),
            BlockDecision::not_target()
        );
    }

    // ==================== Whitelist Tests ====================

    #[test]
    fn whitelist_overrides_schedule() {
        let mut settings = settings_with(&[DomainTag::Intervals]);
        settings.whitelist = vec!["@goodchannel".into()];
        let decision = eval(
            "https://www.youtube.com/@GoodChannel/videos",
            &settings,
            monday(10, 30),
        );
        assert_eq!(decision, BlockDecision::allow());
    }

    #[test]
    fn whitelist_overrides_missing_tag() {
        let mut settings = settings_with(&[]);
        settings.whitelist = vec!["youtu.be/abc".into()];
        assert_eq!(eval(WATCH, &settings, 0), BlockDecision::allow());
    }

    // ==================== Policy Tests ====================

    #[test]
    fn untagged_domain_always_blocked() {
        let settings = settings_with(&[]);
        let expected = BlockDecision::block(BlockReason::MissingTag);
        assert_eq!(eval(WATCH, &settings, monday(10, 30)), expected);
        assert_eq!(eval(WATCH, &settings, monday(12, 0)), expected);
    }

    #[test]
    fn interval_tag_follows_schedule() {
        let settings = settings_with(&[DomainTag::Intervals]);
        assert_eq!(
            eval(WATCH, &settings, monday(10, 30)),
            BlockDecision::block(BlockReason::Schedule)
        );
        assert_eq!(eval(WATCH, &settings, monday(12, 0)), BlockDecision::allow());
    }

    #[test]
    fn interval_tag_wins_over_weekly_tag() {
        let mut settings = settings_with(&[DomainTag::Intervals, DomainTag::Weekly]);
        settings.weekly_unblock_enabled = true;
        settings.weekly_unblock_until = Some(i64::MAX);
        assert_eq!(
            eval(WATCH, &settings, monday(10, 30)),
            BlockDecision::block(BlockReason::Schedule)
        );
        settings.weekly_unblock_until = None;
        assert_eq!(eval(WATCH, &settings, monday(12, 0)), BlockDecision::allow());
    }

    #[test]
    fn weekly_tag_needs_active_session() {
        let mut settings = settings_with(&[DomainTag::Weekly]);
        settings.weekly_unblock_enabled = true;
        let now = monday(12, 0);
        assert_eq!(
            eval(WATCH, &settings, now),
            BlockDecision::block(BlockReason::Manual)
        );
        settings.weekly_unblock_until = Some(now + 1);
        assert_eq!(eval(WATCH, &settings, now), BlockDecision::allow());
        settings.weekly_unblock_enabled = false;
        assert_eq!(
            eval(WATCH, &settings, now),
            BlockDecision::block(BlockReason::Manual)
        );
    }

    // ==================== Interval Precedence Tests ====================

    #[test]
    fn temporary_unblock_beats_categories_and_schedule() {
        let mut settings = settings_with(&[DomainTag::Intervals]);
        settings.block_shorts = true;
        let now = monday(10, 30);
        settings.unblock_until = Some(now + 1_000);
        assert_eq!(
            eval("https://youtube.com/shorts/x", &settings, now),
            BlockDecision::allow()
        );

        settings.strict_mode = true;
        assert_eq!(
            eval("https://youtube.com/shorts/x", &settings, now),
            BlockDecision::block(BlockReason::Shorts)
        );
        assert_eq!(
            eval(WATCH, &settings, now),
            BlockDecision::block(BlockReason::Schedule)
        );
    }

    #[test]
    fn categories_checked_in_order() {
        let mut settings = Settings {
            blocked_domains: vec![
                "youtube.com".into(),
                "youtubekids.com".into(),
                "instagram.com".into(),
            ],
            block_kids: true,
            block_shorts: true,
            block_instagram_reels: true,
            ..Default::default()
        };
        for domain in ["youtube.com", "youtubekids.com", "instagram.com"] {
            settings.set_domain_tags(domain, &[DomainTag::Intervals]);
        }
        let now = monday(12, 0);

        assert_eq!(
            eval("https://www.youtubekids.com/shorts/x", &settings, now),
            BlockDecision::block(BlockReason::Kids)
        );
        assert_eq!(
            eval("https://m.youtube.com/shorts/x", &settings, now),
            BlockDecision::block(BlockReason::Shorts)
        );
        assert_eq!(
            eval("https://www.instagram.com/reel/x/", &settings, now),
            BlockDecision::block(BlockReason::Manual)
        );
        assert_eq!(
            eval("https://www.instagram.com/p/x/", &settings, now),
            BlockDecision::allow()
        );
    }

    // ==================== Legacy Tests ====================

    #[test]
    fn unrecognized_tags_use_manual_switch() {
        let mut settings = Settings {
            blocked_domains: vec!["youtube.com".into()],
            legacy_manual_domains: vec!["youtube.com".into()],
            block_shorts: true,
            ..Default::default()
        };
        assert_eq!(eval(WATCH, &settings, 0), BlockDecision::allow());
        assert_eq!(
            eval("https://youtube.com/shorts/x", &settings, 0),
            BlockDecision::block(BlockReason::Shorts)
        );

        settings.block_enabled = true;
        assert_eq!(
            eval(WATCH, &settings, 0),
            BlockDecision::block(BlockReason::Manual)
        );

        settings.unblock_until = Some(10);
        assert_eq!(eval(WATCH, &settings, 0), BlockDecision::allow());
    }

    #[test]
    fn snapshot_without_tag_table_blocks_as_missing_tag() {
        let mut settings = Settings::from_json(&serde_json::json!({
            "blockedDomains": ["youtube.com"],
            "blockShorts": false,
        }));
        assert_eq!(
            eval(WATCH, &settings, monday(12, 0)),
            BlockDecision::block(BlockReason::MissingTag)
        );

        settings.unblock_until = Some(monday(12, 5));
        assert_eq!(
            eval(WATCH, &settings, monday(12, 0)),
            BlockDecision::block(BlockReason::MissingTag)
        );
    }

    // ==================== Label Tests ====================

    #[test]
    fn labels() {
        assert_eq!(BlockReason::NotTarget.label(Language::Es), "");
        assert_eq!(BlockReason::Schedule.label(Language::En), "Scheduled block");
        assert_eq!(BlockDecision::allow().label(Language::En), "");
        assert_eq!(
            BlockDecision::block(BlockReason::Kids).label(Language::Fr),
            "Site enfants bloqué"
        );
    }

    #[test]
    fn decision_json_shape() {
        let json = serde_json::to_value(BlockDecision::allow()).unwrap();
        assert_eq!(json, serde_json::json!({ "blocked": false }));
        let json = serde_json::to_value(BlockDecision::block(BlockReason::MissingTag)).unwrap();
        assert_eq!(json, serde_json::json!({ "blocked": true, "reason": "missing_tag" }));
    }
}
