//! Validated edits to the blocked-domain list, whitelist and schedule.

use tracing::info;

use crate::domain::normalize_domain;
use crate::error::{CoreError, Result};
use crate::schedule::{Interval, IntervalMode};
use crate::settings::{DomainTag, Settings};
use crate::time::is_valid_time;
use crate::whitelist::WhitelistEntry;

impl Settings {
    /// Adds (or re-tags) a blocked domain and returns its canonical form.
    pub fn add_blocked_domain(&mut self, input: &str, tags: &[DomainTag]) -> Result<String> {
        let domain =
            normalize_domain(input).ok_or_else(|| CoreError::InvalidDomain(input.to_string()))?;

        if !self.blocked_domains.contains(&domain) {
            self.blocked_domains.push(domain.clone());
        }
        self.set_domain_tags(&domain, tags);

        info!(domain = %domain, tags = ?tags, "Blocked domain added");
        Ok(domain)
    }

    /// Removes a blocked domain and its tags. Returns false if it was absent.
    pub fn remove_blocked_domain(&mut self, input: &str) -> bool {
        let domain = normalize_domain(input).unwrap_or_else(|| input.trim().to_lowercase());
        let before = self.blocked_domains.len();
        self.blocked_domains.retain(|d| *d != domain);
        self.blocked_domain_tags.remove(&domain);
        self.legacy_manual_domains.retain(|d| *d != domain);
        before != self.blocked_domains.len()
    }

    /// Adds a raw whitelist entry after checking that it can be classified.
    pub fn add_whitelist_entry(&mut self, raw: &str) -> Result<WhitelistEntry> {
        let entry = WhitelistEntry::parse(raw)
            .ok_or_else(|| CoreError::InvalidWhitelistEntry(raw.to_string()))?;

        let raw = raw.trim().to_string();
        if !self.whitelist.contains(&raw) {
            self.whitelist.push(raw);
        }
        info!(entry = %entry, "Whitelist entry added");
        Ok(entry)
    }

    /// Removes a raw whitelist entry. Returns false if it was absent.
    pub fn remove_whitelist_entry(&mut self, raw: &str) -> bool {
        let raw = raw.trim();
        let before = self.whitelist.len();
        self.whitelist.retain(|entry| entry != raw);
        before != self.whitelist.len()
    }

    /// Appends an enabled interval on `day` and returns it.
    pub fn add_interval(
        &mut self,
        day: u8,
        start: &str,
        end: &str,
        mode: IntervalMode,
    ) -> Result<Interval> {
        if day > 6 {
            return Err(CoreError::InvalidInterval(format!("day {} is not 0-6", day)));
        }
        for time in [start, end] {
            if !is_valid_time(time) {
                return Err(CoreError::InvalidInterval(format!(
                    "{} is not a HH:MM time",
                    time
                )));
            }
        }

        let intervals = self.intervals_by_day.entry(day).or_default();
        let mut idx = intervals.len();
        let mut id = format!("day-{}-{}-{}-{}", day, idx, start, end);
        while intervals.iter().any(|i| i.id == id) {
            idx += 1;
            id = format!("day-{}-{}-{}-{}", day, idx, start, end);
        }

        let interval = Interval::new(id, start, end).with_mode(mode);
        intervals.push(interval.clone());
        info!(day, id = %interval.id, start, end, "Interval added");
        Ok(interval)
    }

    /// Removes the interval with `id` from whichever day holds it.
    pub fn remove_interval(&mut self, id: &str) -> bool {
        let mut removed = false;
        for intervals in self.intervals_by_day.values_mut() {
            let before = intervals.len();
            intervals.retain(|i| i.id != id);
            removed |= before != intervals.len();
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Domain Edit Tests ====================

    #[test]
    fn adds_normalized_domain_once() {
        let mut settings = Settings::default();
        let domain = settings
            .add_blocked_domain("https://www.YouTube.com/feed", &[DomainTag::Intervals])
            .unwrap();
        assert_eq!(domain, "youtube.com");
        settings
            .add_blocked_domain("youtube.com", &[DomainTag::Weekly])
            .unwrap();
        assert_eq!(settings.blocked_domains, vec!["youtube.com"]);
        assert_eq!(settings.tags_for("youtube.com"), &[DomainTag::Weekly]);
    }

    #[test]
    fn rejects_invalid_domain() {
        let mut settings = Settings::default();
        assert!(matches!(
            settings.add_blocked_domain("  ", &[]),
            Err(CoreError::InvalidDomain(_))
        ));
    }

    #[test]
    fn removes_domain_and_tags() {
        let mut settings = Settings::default();
        settings
            .add_blocked_domain("vimeo.com", &[DomainTag::Intervals])
            .unwrap();
        assert!(settings.remove_blocked_domain("www.vimeo.com"));
        assert!(settings.blocked_domains.is_empty());
        assert!(settings.tags_for("vimeo.com").is_empty());
        assert!(!settings.remove_blocked_domain("vimeo.com"));
    }

    // ==================== Whitelist Edit Tests ====================

    #[test]
    fn whitelist_add_and_remove() {
        let mut settings = Settings::default();
        let entry = settings.add_whitelist_entry(" @Channel ").unwrap();
        assert_eq!(entry.kind(), "handle");
        settings.add_whitelist_entry("@Channel").unwrap();
        assert_eq!(settings.whitelist, vec!["@Channel"]);
        assert!(settings.remove_whitelist_entry("@Channel"));
        assert!(settings.whitelist.is_empty());
    }

    #[test]
    fn whitelist_rejects_garbage() {
        let mut settings = Settings::default();
        assert!(matches!(
            settings.add_whitelist_entry("@"),
            Err(CoreError::InvalidWhitelistEntry(_))
        ));
    }

    // ==================== Interval Edit Tests ====================

    #[test]
    fn interval_add_and_remove() {
        let mut settings = Settings::default();
        let a = settings
            .add_interval(1, "08:00", "10:00", IntervalMode::Blocked)
            .unwrap();
        let b = settings
            .add_interval(1, "08:00", "10:00", IntervalMode::Free)
            .unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(settings.intervals_by_day[&1].len(), 2);

        assert!(settings.remove_interval(&a.id));
        assert!(!settings.remove_interval(&a.id));
        assert_eq!(settings.intervals_by_day[&1], vec![b]);
    }

    #[test]
    fn interval_validation() {
        let mut settings = Settings::default();
        assert!(settings
            .add_interval(7, "08:00", "10:00", IntervalMode::Blocked)
            .is_err());
        assert!(settings
            .add_interval(1, "8:00", "10:00", IntervalMode::Blocked)
            .is_err());
        assert!(settings
            .add_interval(1, "08:00", "24:00", IntervalMode::Blocked)
            .is_err());
    }
}
