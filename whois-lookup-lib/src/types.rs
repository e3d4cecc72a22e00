//! Core data types for WHOIS and RDAP lookups.
//!
//! This module defines the query options, the response envelope returned by
//! [`query_whois`](crate::query_whois), the canonical [`DomainRecord`], and
//! the field sets produced by the extraction engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// The authoritative registry WHOIS server for `.com`.
pub const DEFAULT_WHOIS_SERVER: &str = "whois.verisign-grs.com";

/// WHOIS always listens on this TCP port.
pub const WHOIS_PORT: u16 = 43;

/// Options controlling a single lookup.
///
/// Defaults mirror the recognized option set: 5s timeout, no referral
/// following, 3 retries one second apart, rate-limit handling on and RDAP
/// fallback on.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    /// Inactivity timeout for each socket session and RDAP request
    pub timeout: Duration,

    /// Re-query the registrar WHOIS server named in the registry response
    pub follow_referral: bool,

    /// Number of retries after the first attempt
    pub retry_count: u32,

    /// Fixed wait between retries after a transport failure
    pub retry_delay: Duration,

    /// Wait out a server-declared rate limit and try again
    pub handle_rate_limit: bool,

    /// Try RDAP when WHOIS is rate limited, deprecated or unreachable
    pub use_rdap_fallback: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5000),
            follow_referral: false,
            retry_count: 3,
            retry_delay: Duration::from_millis(1000),
            handle_rate_limit: true,
            use_rdap_fallback: true,
        }
    }
}

impl QueryOptions {
    /// Set the per-connection timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable or disable referral following.
    pub fn with_follow_referral(mut self, enabled: bool) -> Self {
        self.follow_referral = enabled;
        self
    }

    /// Set how many times a failed query is retried.
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Set the wait between retries after transport failures.
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Enable or disable waiting out rate limits.
    pub fn with_rate_limit_handling(mut self, enabled: bool) -> Self {
        self.handle_rate_limit = enabled;
        self
    }

    /// Enable or disable the RDAP fallback.
    pub fn with_rdap_fallback(mut self, enabled: bool) -> Self {
        self.use_rdap_fallback = enabled;
        self
    }
}

/// Which protocol produced the returned data.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Protocol {
    #[serde(rename = "whois")]
    Whois,

    #[serde(rename = "rdap")]
    Rdap,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Whois => write!(f, "WHOIS"),
            Protocol::Rdap => write!(f, "RDAP"),
        }
    }
}

/// Text accumulated from one socket session.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    /// Host the text came from
    pub server: String,

    /// Everything the server sent before closing the connection
    pub text: String,
}

/// Envelope returned by [`query_whois`](crate::query_whois).
///
/// Carries the raw payload, its provenance, and the rate-limit/deprecation
/// signals seen along the way, whichever protocol ended up answering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResponse {
    pub protocol: Protocol,

    /// WHOIS text, or the serialized RDAP JSON
    pub raw: String,

    /// Parsed RDAP document when `protocol` is RDAP
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rdap: Option<serde_json::Value>,

    /// WHOIS server whose text is in `raw`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    pub rate_limited: bool,
    pub rate_limit_seconds: u64,
    pub rdap_recommended: bool,
    pub rdap_url: Option<String>,

    /// Registrar WHOIS server advertised by the registry, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral: Option<String>,
}

/// Fields extracted by [`extract_core`](crate::extract_core).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CoreFields {
    pub domain_name: Option<String>,
    pub registrar: Option<String>,
    pub creation_date: Option<String>,
    pub expiration_date: Option<String>,
    pub updated_date: Option<String>,
}

/// Fields extracted by [`extract_all`](crate::extract_all).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AllFields {
    #[serde(flatten)]
    pub core: CoreFields,

    /// Every name server line, in document order
    pub name_servers: Vec<String>,

    /// Every status line, in document order
    pub status: Vec<String>,

    /// Other named fields plus any residual `key: value` lines
    pub fields: BTreeMap<String, String>,
}

impl AllFields {
    /// Look up a non-core field by its snake_case key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

/// Subset of the canonical record that RDAP parsing produces.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RdapFields {
    pub domain_name: Option<String>,
    pub registrar: Option<String>,
    pub creation_date: Option<String>,
    pub expiration_date: Option<String>,
    pub updated_date: Option<String>,
    pub name_servers: Vec<String>,
    pub status: Vec<String>,

    /// The full RDAP document, serialized
    pub raw: String,
}

/// The stable output shape of [`whois`](crate::whois).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DomainRecord {
    pub domain_name: Option<String>,
    pub registrar: Option<String>,
    pub creation_date: Option<String>,
    pub expiration_date: Option<String>,
    pub updated_date: Option<String>,
    pub name_servers: Vec<String>,
    pub status: Vec<String>,
    pub raw: String,
    pub protocol: Protocol,
    pub rate_limited: bool,
    pub rate_limit_seconds: u64,
    pub rdap_recommended: bool,
    pub rdap_url: Option<String>,

    /// WHOIS server the record was parsed from (absent for RDAP)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whois_server: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = QueryOptions::default();
        assert_eq!(options.timeout, Duration::from_millis(5000));
        assert!(!options.follow_referral);
        assert_eq!(options.retry_count, 3);
        assert_eq!(options.retry_delay, Duration::from_millis(1000));
        assert!(options.handle_rate_limit);
        assert!(options.use_rdap_fallback);
    }

    #[test]
    fn test_option_builders() {
        let options = QueryOptions::default()
            .with_timeout(Duration::from_secs(2))
            .with_follow_referral(true)
            .with_retry_count(0)
            .with_rdap_fallback(false);
        assert_eq!(options.timeout, Duration::from_secs(2));
        assert!(options.follow_referral);
        assert_eq!(options.retry_count, 0);
        assert!(!options.use_rdap_fallback);
    }

    #[test]
    fn test_protocol_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Protocol::Rdap).unwrap(), "\"rdap\"");
        assert_eq!(Protocol::Whois.to_string(), "WHOIS");
    }
}
