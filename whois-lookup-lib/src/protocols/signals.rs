//! Signals embedded in WHOIS response text.
//!
//! Registries tell clients to slow down, to move to RDAP, or to ask the
//! registrar's own WHOIS server, all inside the free-form response body.
//! This module pulls those signals out so the orchestrator can act on them.

use crate::utils::looks_like_url;
use lazy_static::lazy_static;
use regex::Regex;
use std::time::Duration;

/// Wait applied when a rate-limit notice names no cooldown.
pub const DEFAULT_RATE_LIMIT_WAIT_SECS: u64 = 60;

lazy_static! {
    static ref RATE_LIMIT_WITH_WAIT: Vec<Regex> = compile(&[
        r"(?i)rate limit exceeded.*?try again (?:after|in):?\s*(\d+)\s*(?:s\b|sec|seconds?)",
        r"(?i)too many (?:requests|queries).*?(?:wait|try again (?:after|in)):?\s*(\d+)\s*(?:s\b|sec|seconds?)",
        r"(?i)please wait:?\s*(\d+)\s*(?:s\b|sec|seconds?)",
        r"(?i)(?:query|request) limit.*?(\d+)\s*(?:s\b|sec|seconds?)",
        r"(?i)retry[- ]after:?\s*(\d+)",
    ]);
    static ref RDAP_DEPRECATION: Vec<Regex> = compile(&[
        r"(?i)\bwhois\b.{0,60}\b(?:deprecated|discontinued|sunset(?:ting)?|retired)\b",
        r"(?i)\b(?:please|should) (?:use|migrate to|switch to) rdap\b",
        r"(?i)\brdap\b.{0,40}\b(?:replaces|replaced|instead of)\b.{0,20}\bwhois\b",
    ]);
    static ref RDAP_URL: Regex =
        Regex::new(r#"(?i)https?://rdap[^\s"'<>]*"#).expect("RDAP URL pattern");
    static ref REFERRAL: Regex = Regex::new(r"(?im)^[ \t]*Registrar WHOIS Server:[ \t]*(\S+)")
        .expect("referral pattern");
}

/// Rate-limit phrases that carry no wait value.
const RATE_LIMIT_PHRASES: &[&str] = &[
    "rate limit exceeded",
    "too many requests",
    "quota exceeded",
    "limit exceeded",
    "throttled",
    "rate-limited",
    "too many requests from your ip",
];

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("signal pattern"))
        .collect()
}

/// Everything a response told us besides the registration data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseSignals {
    /// Declared cooldown, if the response is a rate-limit notice
    pub rate_limit_seconds: Option<u64>,

    /// The response announces WHOIS deprecation in favor of RDAP
    pub deprecated: bool,

    /// RDAP URL mentioned in the response, if any
    pub rdap_url: Option<String>,

    /// Registrar WHOIS server to ask next, if different from the one asked
    pub referral: Option<String>,
}

impl ResponseSignals {
    /// Scan a response that came from `server`.
    pub fn detect(text: &str, server: &str) -> Self {
        Self {
            rate_limit_seconds: detect_rate_limit(text),
            deprecated: detect_deprecation(text),
            rdap_url: find_rdap_url(text),
            referral: find_referral(text, server),
        }
    }

    pub fn rate_limited(&self) -> bool {
        self.rate_limit_seconds.is_some()
    }

    /// The cooldown as a sleep duration.
    pub fn rate_limit_wait(&self) -> Option<Duration> {
        self.rate_limit_seconds.map(Duration::from_secs)
    }
}

/// Seconds to wait if the text is a rate-limit notice.
pub fn detect_rate_limit(text: &str) -> Option<u64> {
    for pattern in RATE_LIMIT_WITH_WAIT.iter() {
        if let Some(seconds) = pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
        {
            return Some(seconds);
        }
    }

    let lower = text.to_lowercase();
    if RATE_LIMIT_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
        return Some(DEFAULT_RATE_LIMIT_WAIT_SECS);
    }

    None
}

/// Whether the text announces that WHOIS is deprecated in favor of RDAP.
pub fn detect_deprecation(text: &str) -> bool {
    RDAP_DEPRECATION.iter().any(|pattern| pattern.is_match(text))
}

/// First RDAP URL mentioned in the text.
pub fn find_rdap_url(text: &str) -> Option<String> {
    RDAP_URL
        .find(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ')']).to_string())
}

/// Registrar WHOIS server named in the text, when it is a bare host that
/// differs from `current_server`.
pub fn find_referral(text: &str, current_server: &str) -> Option<String> {
    let host = REFERRAL
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().trim_end_matches('.').to_lowercase())?;

    if host.is_empty() || looks_like_url(&host) || host.eq_ignore_ascii_case(current_server) {
        return None;
    }

    Some(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_with_declared_wait() {
        assert_eq!(
            detect_rate_limit("Rate limit exceeded. Try again after: 30s"),
            Some(30)
        );
        assert_eq!(
            detect_rate_limit("Too many queries from your IP, please wait 15 seconds"),
            Some(15)
        );
        assert_eq!(detect_rate_limit("Retry-After: 120"), Some(120));
    }

    #[test]
    fn test_rate_limit_without_wait_uses_default() {
        assert_eq!(
            detect_rate_limit("Too many requests from your IP."),
            Some(DEFAULT_RATE_LIMIT_WAIT_SECS)
        );
        assert_eq!(detect_rate_limit("Normal whois response"), None);
    }

    #[test]
    fn test_deprecation_notice() {
        assert!(detect_deprecation(
            "NOTICE: This WHOIS service has been deprecated. Please use RDAP at https://rdap.verisign.com/com/v1/"
        ));
        assert!(detect_deprecation("You should migrate to RDAP"));
        assert!(!detect_deprecation("Domain Name: EXAMPLE.COM"));
    }

    #[test]
    fn test_find_rdap_url() {
        assert_eq!(
            find_rdap_url("Please use RDAP (https://rdap.verisign.com/com/v1/)."),
            Some("https://rdap.verisign.com/com/v1/".to_string())
        );
        assert_eq!(find_rdap_url("nothing here"), None);
    }

    #[test]
    fn test_find_referral() {
        let text = "   Registrar WHOIS Server: whois.markmonitor.com\r\n";
        assert_eq!(
            find_referral(text, "whois.verisign-grs.com"),
            Some("whois.markmonitor.com".to_string())
        );
        // Same server, URL, or empty values are not referrals
        assert_eq!(find_referral(text, "WHOIS.MARKMONITOR.COM"), None);
        assert_eq!(
            find_referral(
                "Registrar WHOIS Server: https://whois.example.com/lookup",
                "whois.verisign-grs.com"
            ),
            None
        );
        assert_eq!(
            find_referral("Registrar WHOIS Server:\nRegistrar: X", "whois.verisign-grs.com"),
            None
        );
    }

    #[test]
    fn test_detect_combines_signals() {
        let signals = ResponseSignals::detect(
            "Rate limit exceeded. Try again after: 30s\nRegistrar WHOIS Server: whois.example.net\n",
            "whois.verisign-grs.com",
        );
        assert!(signals.rate_limited());
        assert_eq!(signals.rate_limit_wait(), Some(Duration::from_secs(30)));
        assert!(!signals.deprecated);
        assert_eq!(signals.referral.as_deref(), Some("whois.example.net"));
    }
}
