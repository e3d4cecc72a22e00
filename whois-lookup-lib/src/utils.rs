//! Utility functions for domain validation.
//!
//! Validation runs before any network I/O: a rejected domain never opens a
//! socket or sends an HTTP request.

use crate::error::WhoisError;

/// Top-level labels the WHOIS path can serve.
pub const SUPPORTED_TLDS: &[&str] = &["com"];

/// Validate a domain name and return its normalized (trimmed, lower-cased) form.
///
/// Requires at least two non-empty dot-separated labels made of
/// alphanumerics and hyphens, with no label starting or ending in a hyphen.
pub fn validate_domain(domain: &str) -> Result<String, WhoisError> {
    let normalized = domain.trim().trim_end_matches('.').to_lowercase();

    if normalized.is_empty() {
        return Err(WhoisError::invalid_domain(
            domain,
            "Domain name cannot be empty",
        ));
    }

    if normalized.len() > 253 {
        return Err(WhoisError::invalid_domain(domain, "Domain name too long"));
    }

    let labels: Vec<&str> = normalized.split('.').collect();
    if labels.len() < 2 {
        return Err(WhoisError::invalid_domain(
            domain,
            "Domain name needs at least two labels",
        ));
    }

    for label in &labels {
        if label.is_empty() || label.len() > 63 {
            return Err(WhoisError::invalid_domain(
                domain,
                "Domain labels must be 1-63 characters",
            ));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(WhoisError::invalid_domain(
                domain,
                "Domain labels cannot start or end with a hyphen",
            ));
        }

        if !label.chars().all(|c| c.is_alphanumeric() || c == '-') {
            return Err(WhoisError::invalid_domain(
                domain,
                "Domain labels may only contain letters, digits and hyphens",
            ));
        }
    }

    Ok(normalized)
}

/// Validate a domain for the WHOIS path, which only serves [`SUPPORTED_TLDS`].
pub fn validate_whois_domain(domain: &str) -> Result<String, WhoisError> {
    let normalized = validate_domain(domain)?;
    let tld = extract_tld(&normalized)?;

    if !SUPPORTED_TLDS.contains(&tld.as_str()) {
        return Err(WhoisError::unsupported_tld(normalized, tld));
    }

    Ok(normalized)
}

/// Extract the top-level label from a domain (e.g., "example.com" -> "com").
pub fn extract_tld(domain: &str) -> Result<String, WhoisError> {
    match domain.trim().rsplit_once('.') {
        Some((_, tld)) if !tld.is_empty() => Ok(tld.to_lowercase()),
        _ => Err(WhoisError::invalid_domain(
            domain,
            "Domain has no top-level label",
        )),
    }
}

/// Whether a string looks like a URL rather than a bare host name.
pub(crate) fn looks_like_url(value: &str) -> bool {
    let lower = value.trim().to_lowercase();
    lower.contains("://") || (lower.starts_with("www.") && lower.contains('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_domain() {
        assert_eq!(validate_domain("Example.COM").unwrap(), "example.com");
        assert_eq!(validate_domain(" sub.example.com. ").unwrap(), "sub.example.com");
        assert!(validate_domain("").is_err());
        assert!(validate_domain("example").is_err());
        assert!(validate_domain("example..com").is_err());
        assert!(validate_domain("-example.com").is_err());
        assert!(validate_domain("exa mple.com").is_err());
    }

    #[test]
    fn test_validate_whois_domain_rejects_other_tlds() {
        assert!(validate_whois_domain("example.com").is_ok());

        match validate_whois_domain("example.org") {
            Err(WhoisError::UnsupportedTld { tld, .. }) => assert_eq!(tld, "org"),
            other => panic!("expected UnsupportedTld, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_tld() {
        assert_eq!(extract_tld("example.com").unwrap(), "com");
        assert_eq!(extract_tld("test.co.uk").unwrap(), "uk");
        assert!(extract_tld("example").is_err());
    }

    #[test]
    fn test_looks_like_url() {
        assert!(looks_like_url("https://whois.example.com"));
        assert!(looks_like_url("http://registrar.example/whois"));
        assert!(!looks_like_url("whois.markmonitor.com"));
    }
}
