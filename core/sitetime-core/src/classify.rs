//! URL classification against the fixed social-domain list.
//!
//! The daemon and the popup must agree on what counts as a tracked site, so
//! both call through this module instead of re-deriving the rule.

use url::Url;

use crate::config::friendly_name;

/// Known social-media apex domains, matched as substrings of a visited
/// hostname. `twitter.com` redirects to `x.com`; the legacy name survives
/// only as a friendly-name alias.
pub const SOCIAL_DOMAINS: &[&str] = &[
    "facebook.com",
    "x.com",
    "instagram.com",
    "linkedin.com",
    "youtube.com",
    "tiktok.com",
    "reddit.com",
    "snapchat.com",
    "pinterest.com",
    "whatsapp.com",
    "telegram.org",
    "discord.com",
];

/// Site key used when a URL cannot be parsed at all.
pub const UNKNOWN_SITE_KEY: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Canonical identifier: the matching domain-list entry, or the raw
    /// lowercased hostname when nothing matches.
    pub site_key: String,
    pub is_tracked: bool,
}

/// Classifies a URL. Pure and total: malformed input yields an untracked
/// `"unknown"` key, never an error.
pub fn classify(raw_url: &str) -> Classification {
    let hostname = match parse_hostname(raw_url) {
        Some(hostname) => hostname,
        None => {
            return Classification {
                site_key: UNKNOWN_SITE_KEY.to_string(),
                is_tracked: false,
            }
        }
    };

    match SOCIAL_DOMAINS
        .iter()
        .find(|domain| hostname.contains(*domain))
    {
        Some(domain) => Classification {
            site_key: domain.to_string(),
            is_tracked: true,
        },
        None => Classification {
            site_key: hostname,
            is_tracked: false,
        },
    }
}

/// Human-readable site name for display in the popup.
///
/// Tracked sites map through the friendly-name table; other hostnames are
/// shown with a leading `www.` stripped.
pub fn friendly_site_name(raw_url: &str) -> String {
    let hostname = match parse_hostname(raw_url) {
        Some(hostname) => hostname,
        None => return "Unknown Site".to_string(),
    };

    if let Some(domain) = SOCIAL_DOMAINS
        .iter()
        .find(|domain| hostname.contains(*domain))
    {
        return friendly_name(domain).unwrap_or(domain).to_string();
    }

    hostname
        .strip_prefix("www.")
        .unwrap_or(&hostname)
        .to_string()
}

fn parse_hostname(raw_url: &str) -> Option<String> {
    let parsed = Url::parse(raw_url).ok()?;
    parsed.host_str().map(|host| host.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_social_url_with_path() {
        let result = classify("https://www.facebook.com/feed");
        assert_eq!(result.site_key, "facebook.com");
        assert!(result.is_tracked);
    }

    #[test]
    fn classifies_social_url_with_port_and_query() {
        let result = classify("https://youtube.com:8443/watch?v=abc123");
        assert_eq!(result.site_key, "youtube.com");
        assert!(result.is_tracked);
    }

    #[test]
    fn subdomains_match_by_substring() {
        let result = classify("https://m.reddit.com/r/rust");
        assert_eq!(result.site_key, "reddit.com");
        assert!(result.is_tracked);
    }

    #[test]
    fn non_social_hostname_is_its_own_key() {
        let result = classify("https://Example.ORG/page");
        assert_eq!(result.site_key, "example.org");
        assert!(!result.is_tracked);
    }

    #[test]
    fn empty_string_is_unknown() {
        let result = classify("");
        assert_eq!(result.site_key, UNKNOWN_SITE_KEY);
        assert!(!result.is_tracked);
    }

    #[test]
    fn garbage_is_unknown() {
        let result = classify("not a url at all");
        assert_eq!(result.site_key, UNKNOWN_SITE_KEY);
        assert!(!result.is_tracked);
    }

    #[test]
    fn schemeless_hostname_is_unknown() {
        // Bare hostnames have no scheme and do not parse as URLs.
        let result = classify("facebook.com");
        assert_eq!(result.site_key, UNKNOWN_SITE_KEY);
        assert!(!result.is_tracked);
    }

    #[test]
    fn hostless_scheme_is_unknown() {
        let result = classify("data:text/plain,hello");
        assert_eq!(result.site_key, UNKNOWN_SITE_KEY);
        assert!(!result.is_tracked);
    }

    #[test]
    fn classification_is_deterministic() {
        let url = "https://www.instagram.com/explore/";
        assert_eq!(classify(url), classify(url));
    }

    #[test]
    fn friendly_name_for_tracked_site() {
        assert_eq!(
            friendly_site_name("https://www.youtube.com/watch?v=abc"),
            "YouTube"
        );
    }

    #[test]
    fn friendly_name_strips_www_for_untracked() {
        assert_eq!(friendly_site_name("https://www.example.com/"), "example.com");
    }

    #[test]
    fn friendly_name_for_garbage() {
        assert_eq!(friendly_site_name("::::"), "Unknown Site");
    }
}
