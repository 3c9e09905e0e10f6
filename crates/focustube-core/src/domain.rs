//! Target domain matching and content-category detection.
//!
//! Blocked domains are stored as canonical hostnames: no scheme, no port,
//! no leading `www.`. A hostname matches a blocked domain when it is the same
//! host or any subdomain of it.

use url::Url;

/// Host serving the kids-only video site.
pub const KIDS_HOST: &str = "youtubekids.com";

/// Host serving the social short-video feed.
pub const SOCIAL_VIDEO_HOST: &str = "instagram.com";

/// Short-link host whose first path segment is a video id.
pub const SHORT_LINK_HOST: &str = "youtu.be";

/// Hosts recognized as the video-hosting platform (subdomains included).
pub const VIDEO_HOSTS: &[&str] = &["youtube.com", "youtube-nocookie.com", SHORT_LINK_HOST];

/// Normalizes a raw domain, URL, or host into a canonical hostname.
///
/// Lowercases and trims the input, assumes `https://` when no scheme is
/// given, and strips a leading `www.`. Returns `None` when the input cannot
/// be parsed or yields an empty host.
pub fn normalize_domain(input: &str) -> Option<String> {
    let trimmed = input.trim().to_lowercase();
    if trimmed.is_empty() {
        return None;
    }

    let url = parse_lenient(&trimmed)?;
    let host = url.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);

    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

/// Parses `input` as a URL, assuming `https://` when no scheme is present.
pub(crate) fn parse_lenient(input: &str) -> Option<Url> {
    if input.contains("://") {
        Url::parse(input).ok()
    } else {
        Url::parse(&format!("https://{}", input)).ok()
    }
}

/// Lowercased host of `url` with any leading `www.` removed.
pub(crate) fn canonical_host(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    Some(match host.strip_prefix("www.") {
        Some(stripped) => stripped.to_string(),
        None => host,
    })
}

/// Exact match, or `hostname` is a subdomain of `domain`.
pub fn hostname_matches(hostname: &str, domain: &str) -> bool {
    if domain.is_empty() {
        return false;
    }
    hostname == domain
        || hostname
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Returns the first blocked domain, in list order, that `hostname` matches.
pub fn match_domain<'a, S: AsRef<str>>(
    hostname: &str,
    blocked_domains: &'a [S],
) -> Option<&'a str> {
    blocked_domains
        .iter()
        .map(|domain| domain.as_ref())
        .find(|domain| hostname_matches(hostname, domain))
}

/// Returns true if the URL's host falls under any blocked domain.
pub fn is_target_url<S: AsRef<str>>(url: &str, blocked_domains: &[S]) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .is_some_and(|host| match_domain(&host, blocked_domains).is_some())
}

/// Returns true if `host` belongs to the video-hosting platform.
pub fn is_video_host(host: &str) -> bool {
    VIDEO_HOSTS.iter().any(|domain| hostname_matches(host, domain))
}

/// Kids-site host or one of its subdomains.
pub fn is_kids_domain(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| hostname_matches(h, KIDS_HOST)))
        .unwrap_or(false)
}

/// Any URL whose path contains `/shorts/`.
pub fn is_shorts_url(url: &str) -> bool {
    Url::parse(url)
        .map(|u| u.path().contains("/shorts/"))
        .unwrap_or(false)
}

/// Reels pages on the social-video host.
pub fn is_instagram_reels_url(url: &str) -> bool {
    let Ok(url) = Url::parse(url) else {
        return false;
    };
    let on_host = url
        .host_str()
        .is_some_and(|h| hostname_matches(h, SOCIAL_VIDEO_HOST));
    let path = url.path();
    on_host && (path.starts_with("/reel/") || path.starts_with("/reels/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Normalization Tests ====================

    #[test]
    fn normalizes_bare_domain() {
        assert_eq!(normalize_domain("youtube.com"), Some("youtube.com".into()));
        assert_eq!(normalize_domain("  YouTube.COM "), Some("youtube.com".into()));
    }

    #[test]
    fn normalizes_url_and_strips_www() {
        assert_eq!(
            normalize_domain("https://www.youtube.com/watch?v=abc"),
            Some("youtube.com".into())
        );
        assert_eq!(
            normalize_domain("http://m.youtube.com:8080/"),
            Some("m.youtube.com".into())
        );
    }

    #[test]
    fn normalize_rejects_garbage() {
        assert_eq!(normalize_domain(""), None);
        assert_eq!(normalize_domain("   "), None);
        assert_eq!(normalize_domain("exa mple.com"), None);
        assert_eq!(normalize_domain("https://"), None);
    }

    // ==================== Matching Tests ====================

    #[test]
    fn hostname_matches_exact_and_subdomain() {
        assert!(hostname_matches("youtube.com", "youtube.com"));
        assert!(hostname_matches("www.youtube.com", "youtube.com"));
        assert!(hostname_matches("a.b.youtube.com", "youtube.com"));
    }

    #[test]
    fn hostname_does_not_match_suffix_lookalike() {
        assert!(!hostname_matches("notyoutube.com", "youtube.com"));
        assert!(!hostname_matches("youtube.com.evil.io", "youtube.com"));
        assert!(!hostname_matches("youtube.com", ""));
    }

    #[test]
    fn match_domain_first_wins() {
        let domains = vec!["example.com".to_string(), "youtube.com".to_string()];
        assert_eq!(match_domain("m.youtube.com", &domains), Some("youtube.com"));
        assert_eq!(match_domain("vimeo.com", &domains), None);
    }

    #[test]
    fn target_url_detection() {
        let domains = ["youtube.com"];
        assert!(is_target_url("https://www.youtube.com/watch?v=1", &domains));
        assert!(!is_target_url("https://vimeo.com/1", &domains));
        assert!(!is_target_url("not a url", &domains));
    }

    // ==================== Category Tests ====================

    #[test]
    fn detects_kids_domain() {
        assert!(is_kids_domain("https://youtubekids.com/"));
        assert!(is_kids_domain("https://www.youtubekids.com/watch?v=1"));
        assert!(!is_kids_domain("https://youtube.com/"));
        assert!(!is_kids_domain("::bad::"));
    }

    #[test]
    fn detects_shorts() {
        assert!(is_shorts_url("https://www.youtube.com/shorts/abc123"));
        assert!(!is_shorts_url("https://www.youtube.com/watch?v=abc123"));
        assert!(!is_shorts_url("::bad::"));
    }

    #[test]
    fn detects_reels() {
        assert!(is_instagram_reels_url("https://www.instagram.com/reel/xyz/"));
        assert!(is_instagram_reels_url("https://instagram.com/reels/xyz"));
        assert!(!is_instagram_reels_url("https://instagram.com/p/xyz"));
        assert!(!is_instagram_reels_url("https://example.com/reel/xyz"));
        assert!(!is_instagram_reels_url("::bad::"));
    }

    #[test]
    fn recognizes_video_hosts() {
        assert!(is_video_host("youtube.com"));
        assert!(is_video_host("m.youtube.com"));
        assert!(is_video_host("youtu.be"));
        assert!(!is_video_host("vimeo.com"));
    }
}
