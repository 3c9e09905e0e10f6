//! Settings snapshot and per-domain policy resolution.
//!
//! A [`Settings`] value is the full user configuration consumed by the
//! decision and timeline engines. It serializes with the camelCase field
//! names used by the browser extension, so exported snapshots round-trip
//! through [`Settings::from_json`] unchanged.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::schedule::{empty_week, IntervalWeek};
use crate::time::MINUTE_MS;

/// Length of a temporary unblock grant (5 minutes).
pub const TEMPORARY_UNBLOCK_MS: i64 = 5 * MINUTE_MS;

/// Weekdays on which a weekly session may start by default (Monday).
pub const DEFAULT_WEEKLY_UNBLOCK_DAYS: &[u8] = &[1];

/// Default weekly session length.
pub const DEFAULT_WEEKLY_UNBLOCK_DURATION_MINUTES: u32 = 30;

/// UI language used for reason labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English.
    #[default]
    En,
    /// Spanish.
    Es,
    /// Portuguese.
    Pt,
    /// French.
    Fr,
}

impl Language {
    /// Returns the language code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
            Language::Pt => "pt",
            Language::Fr => "fr",
        }
    }

    /// Parses a language code.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "en" => Some(Language::En),
            "es" => Some(Language::Es),
            "pt" => Some(Language::Pt),
            "fr" => Some(Language::Fr),
            _ => None,
        }
    }
}

/// Per-domain policy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DomainTag {
    /// Governed by the weekly interval schedule.
    #[serde(rename = "intervalos")]
    Intervals,
    /// Blocked except during a weekly session.
    #[serde(rename = "por_semana")]
    Weekly,
}

impl DomainTag {
    /// All known tags.
    pub const ALL: [DomainTag; 2] = [DomainTag::Intervals, DomainTag::Weekly];

    /// Returns the stored tag name.
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainTag::Intervals => "intervalos",
            DomainTag::Weekly => "por_semana",
        }
    }

    /// Parses a stored tag name. Only the exact stored names are accepted.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "intervalos" => Some(DomainTag::Intervals),
            "por_semana" => Some(DomainTag::Weekly),
            _ => None,
        }
    }
}

impl fmt::Display for DomainTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a matched blocked domain is governed.
///
/// Resolved once per evaluation by [`Settings::domain_policy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainPolicy {
    /// Temporary unblock, category switches and the interval schedule apply.
    IntervalGoverned,
    /// Blocked unless a weekly session is active.
    WeeklyGoverned,
    /// Added but never configured: always blocked.
    Untagged,
    /// Stored tags were all unrecognized: manual switch and categories apply.
    LegacyManual,
}

/// Domain tag table keyed by canonical hostname.
pub type DomainTags = BTreeMap<String, Vec<DomainTag>>;

/// Full user configuration snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Global manual block switch.
    pub block_enabled: bool,
    /// Block short-form video pages.
    pub block_shorts: bool,
    /// Block the kids video site.
    pub block_kids: bool,
    /// Block reels on the social-video host.
    pub block_instagram_reels: bool,
    /// Label language.
    pub language: Language,
    /// Disables temporary unblock.
    pub strict_mode: bool,
    /// Argon2 PHC hash of the strict-mode PIN.
    pub pin_hash: Option<String>,
    /// Canonical hostnames subject to blocking, in match order.
    pub blocked_domains: Vec<String>,
    /// Per-domain tags. Domains without an entry are untagged.
    pub blocked_domain_tags: DomainTags,
    /// Domains whose stored tag list held no recognized tag.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub legacy_manual_domains: Vec<String>,
    /// Raw whitelist entries.
    pub whitelist: Vec<String>,
    /// Weekly interval schedule.
    pub intervals_by_day: IntervalWeek,
    /// Display times on a 12-hour clock.
    pub time_format_12h: bool,
    /// Temporary unblock expiry (epoch ms).
    pub unblock_until: Option<i64>,
    /// Weekly session feature switch.
    pub weekly_unblock_enabled: bool,
    /// Weekdays (0 = Sunday) on which a weekly session may start.
    pub weekly_unblock_days: Vec<u8>,
    /// Weekly session length in minutes.
    pub weekly_unblock_duration_minutes: u32,
    /// Weekly session expiry (epoch ms).
    pub weekly_unblock_until: Option<i64>,
    /// Period key of the last consumed weekly session.
    pub weekly_unblock_last_week: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            block_enabled: false,
            block_shorts: true,
            block_kids: false,
            block_instagram_reels: false,
            language: Language::En,
            strict_mode: false,
            pin_hash: None,
            blocked_domains: Vec::new(),
            blocked_domain_tags: DomainTags::new(),
            legacy_manual_domains: Vec::new(),
            whitelist: Vec::new(),
            intervals_by_day: empty_week(),
            time_format_12h: false,
            unblock_until: None,
            weekly_unblock_enabled: false,
            weekly_unblock_days: DEFAULT_WEEKLY_UNBLOCK_DAYS.to_vec(),
            weekly_unblock_duration_minutes: DEFAULT_WEEKLY_UNBLOCK_DURATION_MINUTES,
            weekly_unblock_until: None,
            weekly_unblock_last_week: None,
        }
    }
}

impl Settings {
    /// Tags configured for `domain`; empty when none.
    pub fn tags_for(&self, domain: &str) -> &[DomainTag] {
        self.blocked_domain_tags
            .get(domain)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Resolves how a matched blocked domain is governed.
    ///
    /// Interval tagging wins over weekly tagging when both are present. A
    /// domain with no tag entry is untagged, even when the whole tag table
    /// is missing from the stored snapshot.
    pub fn domain_policy(&self, domain: &str) -> DomainPolicy {
        let tags = self.tags_for(domain);
        if tags.contains(&DomainTag::Intervals) {
            DomainPolicy::IntervalGoverned
        } else if tags.contains(&DomainTag::Weekly) {
            DomainPolicy::WeeklyGoverned
        } else if self.legacy_manual_domains.iter().any(|d| d == domain) {
            DomainPolicy::LegacyManual
        } else {
            DomainPolicy::Untagged
        }
    }

    /// A temporary unblock is in effect at `now_ms` and strict mode is off.
    pub fn is_temporarily_unblocked(&self, now_ms: i64) -> bool {
        !self.strict_mode && self.unblock_until.is_some_and(|until| now_ms < until)
    }

    /// Grants a temporary unblock starting at `now_ms` and returns its expiry.
    pub fn grant_temporary_unblock(&mut self, now_ms: i64) -> Result<i64> {
        if self.strict_mode {
            return Err(CoreError::StrictModeActive);
        }
        let until = now_ms + TEMPORARY_UNBLOCK_MS;
        self.unblock_until = Some(until);
        Ok(until)
    }

    /// Replaces the tags for `domain`. An empty tag list removes the entry,
    /// leaving the domain untagged.
    pub fn set_domain_tags(&mut self, domain: &str, tags: &[DomainTag]) {
        self.legacy_manual_domains.retain(|d| d != domain);
        let table = &mut self.blocked_domain_tags;
        let mut unique: Vec<DomainTag> = Vec::with_capacity(tags.len());
        for tag in tags {
            if !unique.contains(tag) {
                unique.push(*tag);
            }
        }
        if unique.is_empty() {
            table.remove(domain);
        } else {
            table.insert(domain.to_string(), unique);
        }
    }
}
