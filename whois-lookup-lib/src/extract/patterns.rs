//! The field pattern table.
//!
//! Every named WHOIS field maps to exactly one case-insensitive,
//! line-anchored pattern whose first capture group is the value. The table
//! is built once and shared read-only; callers that need different patterns
//! build their own table with [`FieldPatterns::with_override`] and inject it
//! into an [`Extractor`](super::Extractor).

use crate::error::WhoisError;
use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use std::sync::Arc;

/// Fields that collect every match instead of only the first.
pub const MULTI_VALUED_FIELDS: &[&str] = &["name_servers", "status"];

/// Fields reported by [`extract_core`](super::extract_core).
pub const CORE_FIELDS: &[&str] = &[
    "domain_name",
    "registrar",
    "creation_date",
    "expiration_date",
    "updated_date",
];

const BUILTIN_PATTERNS: &[(&str, &str)] = &[
    ("domain_name", r"^[ \t]*Domain(?: Name)?:[ \t]*(.+)$"),
    (
        "registrar",
        r"^[ \t]*(?:Registrar|Sponsoring Registrar|Registrar Name):[ \t]*(.+)$",
    ),
    (
        "creation_date",
        r"^[ \t]*(?:Creation Date|Created On|Created Date|Created|Registration Date|Registered On):[ \t]*(.+)$",
    ),
    (
        "expiration_date",
        r"^[ \t]*(?:Registry Expiry Date|Registrar Registration Expiration Date|Expiration Date|Expiry Date|Expires On|Expires|paid-till):[ \t]*(.+)$",
    ),
    (
        "updated_date",
        r"^[ \t]*(?:Updated Date|Last Updated On|Last Updated|Last Modified|Modified|Changed):[ \t]*(.+)$",
    ),
    (
        "name_servers",
        r"^[ \t]*(?:Name Server|Nameserver|nserver):[ \t]*(.+)$",
    ),
    ("status", r"^[ \t]*(?:Domain Status|Status):[ \t]*(.+)$"),
    (
        "registrar_whois_server",
        r"^[ \t]*Registrar WHOIS Server:[ \t]*(.+)$",
    ),
    ("registrar_url", r"^[ \t]*Registrar URL:[ \t]*(.+)$"),
    ("registrar_iana_id", r"^[ \t]*Registrar IANA ID:[ \t]*(.+)$"),
    ("registry_domain_id", r"^[ \t]*Registry Domain ID:[ \t]*(.+)$"),
    ("registrant_name", r"^[ \t]*Registrant Name:[ \t]*(.+)$"),
    (
        "registrant_organization",
        r"^[ \t]*Registrant Organi[sz]ation:[ \t]*(.+)$",
    ),
    ("registrant_country", r"^[ \t]*Registrant Country:[ \t]*(.+)$"),
    ("registrant_email", r"^[ \t]*Registrant Email:[ \t]*(.+)$"),
    ("admin_email", r"^[ \t]*Admin Email:[ \t]*(.+)$"),
    ("tech_email", r"^[ \t]*Tech Email:[ \t]*(.+)$"),
    (
        "abuse_contact_email",
        r"^[ \t]*Registrar Abuse Contact Email:[ \t]*(.+)$",
    ),
    (
        "abuse_contact_phone",
        r"^[ \t]*Registrar Abuse Contact Phone:[ \t]*(.+)$",
    ),
    ("dnssec", r"^[ \t]*DNSSEC:[ \t]*(.+)$"),
];

lazy_static! {
    static ref DEFAULT_PATTERNS: Arc<FieldPatterns> = Arc::new(
        FieldPatterns::from_pairs(BUILTIN_PATTERNS).expect("built-in field patterns compile")
    );
}

/// One named field and its pattern.
#[derive(Debug, Clone)]
pub struct FieldPattern {
    name: String,
    regex: Regex,
    multi_valued: bool,
}

impl FieldPattern {
    /// Compile a field pattern. Matching is always case-insensitive and
    /// multi-line (`^`/`$` anchor at line boundaries).
    pub fn new<N: Into<String>>(name: N, pattern: &str) -> Result<Self, WhoisError> {
        let name = name.into();
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .multi_line(true)
            .build()?;
        if regex.captures_len() < 2 {
            return Err(WhoisError::config(format!(
                "Field pattern for '{}' needs a capture group for the value",
                name
            )));
        }
        let multi_valued = MULTI_VALUED_FIELDS.contains(&name.as_str());

        Ok(Self {
            name,
            regex,
            multi_valued,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_multi_valued(&self) -> bool {
        self.multi_valued
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// First non-empty captured value.
    pub fn first_match(&self, text: &str) -> Option<String> {
        self.captured_values(text).next()
    }

    /// Every non-empty captured value, in document order.
    pub fn all_matches(&self, text: &str) -> Vec<String> {
        self.captured_values(text).collect()
    }

    /// Whether the pattern matches anywhere in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    fn captured_values<'t>(&'t self, text: &'t str) -> impl Iterator<Item = String> + 't {
        self.regex.captures_iter(text).filter_map(|caps| {
            caps.get(1)
                .map(|m| m.as_str().trim())
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        })
    }
}

/// Ordered, immutable mapping from field name to pattern.
#[derive(Debug, Clone)]
pub struct FieldPatterns {
    patterns: Vec<FieldPattern>,
}

impl FieldPatterns {
    /// The shared built-in table.
    pub fn shared() -> Arc<FieldPatterns> {
        Arc::clone(&DEFAULT_PATTERNS)
    }

    /// Build a table from `(name, pattern)` pairs. Later pairs replace
    /// earlier ones with the same name.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Result<Self, WhoisError> {
        let mut table = Self {
            patterns: Vec::with_capacity(pairs.len()),
        };
        for (name, pattern) in pairs {
            table.insert(FieldPattern::new(*name, pattern)?);
        }
        Ok(table)
    }

    /// Return a copy of this table with `name` mapped to `pattern`.
    ///
    /// Replaces the existing pattern for a known field, or appends a new
    /// single-valued field.
    pub fn with_override(&self, name: &str, pattern: &str) -> Result<Self, WhoisError> {
        let mut table = self.clone();
        table.insert(FieldPattern::new(name, pattern)?);
        Ok(table)
    }

    pub fn get(&self, name: &str) -> Option<&FieldPattern> {
        self.patterns.iter().find(|p| p.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldPattern> {
        self.patterns.iter()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// First value for `name`, or `None` if the field is unknown or absent.
    pub fn first_match(&self, name: &str, text: &str) -> Option<String> {
        self.get(name).and_then(|p| p.first_match(text))
    }

    /// Whether any named pattern claims this line.
    pub fn claims_line(&self, line: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(line))
    }

    fn insert(&mut self, pattern: FieldPattern) {
        match self.patterns.iter_mut().find(|p| p.name == pattern.name) {
            Some(existing) => *existing = pattern,
            None => self.patterns.push(pattern),
        }
    }
}

impl Default for FieldPatterns {
    fn default() -> Self {
        DEFAULT_PATTERNS.as_ref().clone()
    }
}
