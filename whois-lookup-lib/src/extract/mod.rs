//! Text extraction engine.
//!
//! Turns free-form WHOIS text into typed fields. Both entry points are total:
//! a field that cannot be found is `None` (or an empty list), never an error,
//! because registries disagree on almost everything about the format.

mod dates;
mod patterns;

pub use dates::normalize_date;
pub use patterns::{FieldPattern, FieldPatterns, CORE_FIELDS, MULTI_VALUED_FIELDS};

use crate::types::{AllFields, CoreFields};
use std::sync::Arc;

/// Applies a [`FieldPatterns`] table to WHOIS text.
///
/// Holds no state besides the (immutable) table, so extraction is pure:
/// the same text always yields the same fields.
#[derive(Debug, Clone)]
pub struct Extractor {
    patterns: Arc<FieldPatterns>,
}

impl Extractor {
    /// Create an extractor over a specific pattern table.
    pub fn new(patterns: Arc<FieldPatterns>) -> Self {
        Self { patterns }
    }

    pub fn patterns(&self) -> &FieldPatterns {
        &self.patterns
    }

    /// Extract the five core fields, first match each.
    pub fn extract_core(&self, text: &str) -> CoreFields {
        let date = |name: &str| {
            self.patterns
                .first_match(name, text)
                .map(|value| normalize_date(&value))
        };

        CoreFields {
            domain_name: self.patterns.first_match("domain_name", text),
            registrar: self.patterns.first_match("registrar", text),
            creation_date: date("creation_date"),
            expiration_date: date("expiration_date"),
            updated_date: date("updated_date"),
        }
    }

    /// Extract every named field plus any residual `key: value` lines.
    pub fn extract_all(&self, text: &str) -> AllFields {
        let mut all = AllFields {
            core: self.extract_core(text),
            ..Default::default()
        };

        for pattern in self.patterns.iter() {
            if CORE_FIELDS.contains(&pattern.name()) {
                continue;
            }

            match pattern.name() {
                "name_servers" => all.name_servers = pattern.all_matches(text),
                "status" => all.status = pattern.all_matches(text),
                name => {
                    if let Some(value) = pattern.first_match(text) {
                        all.fields
                            .insert(name.to_string(), field_value(name, &value));
                    }
                }
            }
        }

        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('%') || trimmed.starts_with('#') {
                continue;
            }

            if self.patterns.claims_line(line) {
                continue;
            }

            if let Some((key, value)) = split_line(trimmed) {
                if is_reserved_key(&key) || all.fields.contains_key(&key) {
                    continue;
                }
                let value = field_value(&key, value);
                all.fields.insert(key, value);
            }
        }

        all
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(FieldPatterns::shared())
    }
}

/// Extract the core fields using the built-in pattern table.
pub fn extract_core(text: &str) -> CoreFields {
    Extractor::default().extract_core(text)
}

/// Extract all fields using the built-in pattern table.
pub fn extract_all(text: &str) -> AllFields {
    Extractor::default().extract_all(text)
}

/// Split `Some Key: value` into (`some_key`, `value`).
fn split_line(line: &str) -> Option<(String, &str)> {
    let (key, value) = line.split_once(':')?;
    // `>>> Last update of whois database: ... <<<` banners
    let value = value.trim().trim_end_matches('<').trim_end();

    // "https://..." split at the scheme, not a field separator
    if value.is_empty() || value.starts_with("//") {
        return None;
    }

    let key = key
        .trim_matches(|c: char| !c.is_alphanumeric())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase();

    if key.is_empty() {
        None
    } else {
        Some((key, value))
    }
}

fn is_reserved_key(key: &str) -> bool {
    CORE_FIELDS.contains(&key) || MULTI_VALUED_FIELDS.contains(&key)
}

fn field_value(key: &str, value: &str) -> String {
    if key.contains("date") || key.contains("expiry") || key.contains("created") {
        normalize_date(value)
    } else {
        value.trim().to_string()
    }
}
