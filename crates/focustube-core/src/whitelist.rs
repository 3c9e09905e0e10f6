//! Whitelist entries that stay reachable on otherwise blocked domains.
//!
//! Raw entries are free text typed by the user. Each one is classified into
//! a channel handle, channel id, video id, or a host plus path prefix. Entries
//! that cannot be classified are dropped silently.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::{canonical_host, is_video_host, parse_lenient, SHORT_LINK_HOST};

/// A classified whitelist entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum WhitelistEntry {
    /// Channel handle, lowercase, without the leading `@`.
    Handle { handle: String },
    /// Channel id from a `/channel/<id>` URL.
    ChannelId { id: String },
    /// Single video id.
    VideoId { id: String },
    /// Any page on `host` whose path starts with `path`.
    Url { host: String, path: String },
}

impl WhitelistEntry {
    /// Classifies a raw entry. Returns `None` for empty or unparseable input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        if let Some(rest) = trimmed.strip_prefix('@') {
            let handle = rest
                .split(['/', '?', '#'])
                .next()
                .unwrap_or_default()
                .trim()
                .to_lowercase();
            return (!handle.is_empty()).then_some(Self::Handle { handle });
        }

        let url = parse_lenient(trimmed)?;
        let host = canonical_host(&url).filter(|h| !h.is_empty())?;

        if is_video_host(&host) {
            let refs = VideoRefs::extract(&url, &host);
            if let Some(handle) = refs.handle {
                return Some(Self::Handle { handle });
            }
            if let Some(id) = refs.channel_id {
                return Some(Self::ChannelId { id });
            }
            if let Some(id) = refs.video_id {
                return Some(Self::VideoId { id });
            }
        }

        Some(Self::Url {
            host,
            path: normalize_path(url.path()),
        })
    }

    /// Returns the entry kind as a string.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Handle { .. } => "handle",
            Self::ChannelId { .. } => "channel",
            Self::VideoId { .. } => "video",
            Self::Url { .. } => "url",
        }
    }

    fn matches(&self, candidate: &Candidate) -> bool {
        match self {
            Self::Handle { handle } => {
                candidate.refs.handle.as_deref() == Some(handle.as_str())
                    || candidate.refs.ab_channel.as_deref() == Some(handle.as_str())
            }
            Self::ChannelId { id } => candidate.refs.channel_id.as_deref() == Some(id.as_str()),
            Self::VideoId { id } => candidate.refs.video_id.as_deref() == Some(id.as_str()),
            Self::Url { host, path } => {
                candidate.host == *host && path_has_prefix(&candidate.path, path)
            }
        }
    }
}

impl fmt::Display for WhitelistEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handle { handle } => write!(f, "@{}", handle),
            Self::ChannelId { id } => write!(f, "channel/{}", id),
            Self::VideoId { id } => write!(f, "video {}", id),
            Self::Url { host, path } => write!(f, "{}{}", host, path),
        }
    }
}

/// Convenience wrapper for [`WhitelistEntry::parse`].
pub fn parse_whitelist_entry(raw: &str) -> Option<WhitelistEntry> {
    WhitelistEntry::parse(raw)
}

/// Channel and video references found in a URL.
///
/// A `/@name` handle is read on any host; channel ids, video ids and
/// `ab_channel` only on video-platform hosts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoRefs {
    /// Handle from a `/@name` path segment, lowercase.
    pub handle: Option<String>,
    /// Channel id from `/channel/<id>`.
    pub channel_id: Option<String>,
    /// Video id from the short-link path, `/watch?v=`, `/shorts/` or `/embed/`.
    pub video_id: Option<String>,
    /// The `ab_channel` query parameter, lowercase.
    pub ab_channel: Option<String>,
}

impl VideoRefs {
    /// Extracts references from `url`.
    pub fn from_url(url: &Url) -> Self {
        let host = canonical_host(url).unwrap_or_default();
        Self::extract(url, &host)
    }

    fn extract(url: &Url, host: &str) -> Self {
        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        let handle = segments
            .iter()
            .find_map(|seg| seg.strip_prefix('@'))
            .filter(|h| !h.is_empty())
            .map(str::to_lowercase);

        if !is_video_host(host) {
            return Self {
                handle,
                ..Self::default()
            };
        }

        let channel_id = segment_after(&segments, "channel");

        let video_id = if host == SHORT_LINK_HOST {
            segments.first().map(|s| s.to_string())
        } else {
            match segments.first().copied() {
                Some("watch") => query_param(url, "v"),
                Some("shorts") | Some("embed") => segments.get(1).map(|s| s.to_string()),
                _ => None,
            }
        };

        let ab_channel = query_param(url, "ab_channel").map(|v| v.trim().to_lowercase());

        Self {
            handle,
            channel_id,
            video_id,
            ab_channel: ab_channel.filter(|v| !v.is_empty()),
        }
    }
}

fn segment_after(segments: &[&str], marker: &str) -> Option<String> {
    let pos = segments.iter().position(|seg| *seg == marker)?;
    segments.get(pos + 1).map(|s| s.to_string())
}

fn query_param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// Lowercases and drops trailing slashes; path matching is case-insensitive.
fn normalize_path(path: &str) -> String {
    let lowered = path.to_lowercase();
    let trimmed = lowered.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn path_has_prefix(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// The parts of a visited URL that whitelist entries compare against.
struct Candidate {
    host: String,
    path: String,
    refs: VideoRefs,
}

impl Candidate {
    fn parse(url: &str) -> Option<Self> {
        let url = Url::parse(url).ok()?;
        let host = canonical_host(&url)?;
        let refs = VideoRefs::from_url(&url);
        Some(Self {
            path: normalize_path(url.path()),
            host,
            refs,
        })
    }
}

/// A parsed whitelist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Whitelist {
    entries: Vec<WhitelistEntry>,
}

impl Whitelist {
    /// Parses raw entries, dropping any that cannot be classified.
    pub fn parse<S: AsRef<str>>(raw: &[S]) -> Self {
        Self {
            entries: raw
                .iter()
                .filter_map(|entry| WhitelistEntry::parse(entry.as_ref()))
                .collect(),
        }
    }

    /// The classified entries in their original order.
    pub fn entries(&self) -> &[WhitelistEntry] {
        &self.entries
    }

    /// Returns true if no usable entries were found.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if any entry allows `url`. Malformed URLs never match.
    pub fn matches(&self, url: &str) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        match Candidate::parse(url) {
            Some(candidate) => self.entries.iter().any(|e| e.matches(&candidate)),
            None => false,
        }
    }
}

/// Returns true if `url` is allowed by any raw whitelist entry.
pub fn is_whitelisted<S: AsRef<str>>(url: &str, whitelist: &[S]) -> bool {
    Whitelist::parse(whitelist).matches(url)
}
