//! RDAP (Registration Data Access Protocol) client.
//!
//! RDAP is the structured JSON successor to WHOIS. Here it serves as the
//! fallback when the registry's WHOIS service rate-limits us, announces its
//! own deprecation, or cannot be reached at all.

use crate::error::WhoisError;
use crate::extract::normalize_date;
use crate::types::RdapFields;
use crate::utils::{extract_tld, validate_domain};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Registry host the endpoint template points at.
pub const DEFAULT_RDAP_BASE: &str = "https://rdap.verisign.com";

/// Anything that can fetch an RDAP domain document.
#[async_trait]
pub trait RdapFetcher: Send + Sync {
    /// URL the document for `domain` is fetched from.
    fn endpoint(&self, domain: &str) -> Result<String, WhoisError>;

    /// Fetch and decode the RDAP document for `domain`.
    async fn fetch(&self, domain: &str, timeout: Duration)
        -> Result<serde_json::Value, WhoisError>;
}

#[async_trait]
impl<T: RdapFetcher + ?Sized> RdapFetcher for Arc<T> {
    fn endpoint(&self, domain: &str) -> Result<String, WhoisError> {
        (**self).endpoint(domain)
    }

    async fn fetch(
        &self,
        domain: &str,
        timeout: Duration,
    ) -> Result<serde_json::Value, WhoisError> {
        (**self).fetch(domain, timeout).await
    }
}

/// RDAP client over `reqwest`.
///
/// The endpoint is always `<base>/<tld>/v1/domain/<domain>`; there is no
/// bootstrap discovery.
#[derive(Clone)]
pub struct RdapClient {
    /// HTTP client for making RDAP requests
    http_client: reqwest::Client,
    /// Scheme and host, without a trailing slash
    base_url: String,
    /// Timeout used by [`RdapClient::fetch_rdap`]
    timeout: Duration,
}

impl RdapClient {
    /// Create a new RDAP client against the default registry host.
    pub fn new() -> Result<Self, WhoisError> {
        Self::with_config(Duration::from_secs(5), DEFAULT_RDAP_BASE)
    }

    /// Create a new RDAP client with a custom timeout and base URL.
    pub fn with_config<B: Into<String>>(timeout: Duration, base_url: B) -> Result<Self, WhoisError> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("whois-lookup/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                WhoisError::http(
                    DEFAULT_RDAP_BASE,
                    format!("Failed to create RDAP HTTP client: {}", e),
                )
            })?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the RDAP URL for a domain.
    pub fn rdap_url(&self, domain: &str) -> Result<String, WhoisError> {
        let tld = extract_tld(domain)?;
        Ok(format!("{}/{}/v1/domain/{}", self.base_url, tld, domain))
    }

    /// Fetch the RDAP document for `domain` using the client's own timeout.
    pub async fn fetch_rdap(&self, domain: &str) -> Result<serde_json::Value, WhoisError> {
        self.fetch(domain, self.timeout).await
    }
}

#[async_trait]
impl RdapFetcher for RdapClient {
    fn endpoint(&self, domain: &str) -> Result<String, WhoisError> {
        self.rdap_url(domain)
    }

    async fn fetch(
        &self,
        domain: &str,
        timeout: Duration,
    ) -> Result<serde_json::Value, WhoisError> {
        let url = self.rdap_url(domain)?;
        debug!(%domain, %url, "requesting RDAP document");

        let response = self
            .http_client
            .get(&url)
            .header(ACCEPT, "application/rdap+json, application/json")
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        debug!(%domain, status = status.as_u16(), "RDAP response received");

        if !status.is_success() {
            return Err(WhoisError::http_with_status(
                &url,
                format!("RDAP server returned error: {}", status),
                status.as_u16(),
            ));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Fetch the RDAP document for a domain from the default registry host.
pub async fn fetch_rdap(domain: &str) -> Result<serde_json::Value, WhoisError> {
    let domain = validate_domain(domain)?;
    RdapClient::new()?.fetch_rdap(&domain).await
}

/// Extract canonical fields from an RDAP domain document.
///
/// Missing or oddly shaped members leave the corresponding field empty;
/// this never fails.
pub fn parse_rdap(json: &serde_json::Value) -> RdapFields {
    let mut fields = RdapFields {
        domain_name: json
            .get("ldhName")
            .and_then(|n| n.as_str())
            .map(String::from),
        raw: json.to_string(),
        ..Default::default()
    };

    // Extract registrar information from entities
    if let Some(entities) = json.get("entities").and_then(|e| e.as_array()) {
        for entity in entities {
            let is_registrar = entity
                .get("roles")
                .and_then(|r| r.as_array())
                .map(|roles| roles.iter().any(|role| role.as_str() == Some("registrar")))
                .unwrap_or(false);

            if is_registrar {
                if let Some(name) =
                    extract_vcard_name(entity).or_else(|| extract_entity_identifier(entity))
                {
                    fields.registrar = Some(name);
                    break;
                }
            }
        }
    }

    // Extract dates from events
    if let Some(events) = json.get("events").and_then(|e| e.as_array()) {
        for event in events {
            if let (Some(action), Some(date)) = (
                event.get("eventAction").and_then(|a| a.as_str()),
                event.get("eventDate").and_then(|d| d.as_str()),
            ) {
                let date = normalize_date(date);
                match action {
                    "registration" => fields.creation_date = Some(date),
                    "expiration" => fields.expiration_date = Some(date),
                    "last changed" | "last update" => fields.updated_date = Some(date),
                    _ => {}
                }
            }
        }
    }

    if let Some(statuses) = json.get("status").and_then(|s| s.as_array()) {
        fields.status = statuses
            .iter()
            .filter_map(|s| s.as_str())
            .map(String::from)
            .collect();
    }

    if let Some(nameservers) = json.get("nameservers").and_then(|ns| ns.as_array()) {
        fields.name_servers = nameservers
            .iter()
            .filter_map(|ns| {
                ns.get("ldhName")
                    .or_else(|| ns.get("unicodeName"))
                    .and_then(|name| name.as_str())
            })
            .map(String::from)
            .collect();
    }

    fields
}

/// Extract the `fn` (formatted name) property from an entity's vCard.
fn extract_vcard_name(entity: &serde_json::Value) -> Option<String> {
    entity
        .get("vcardArray")
        .and_then(|v| v.as_array())
        .and_then(|a| a.get(1))
        .and_then(|a| a.as_array())
        .and_then(|items| {
            items
                .iter()
                .filter_map(|item| item.as_array())
                .find(|item| item.first().and_then(|f| f.as_str()) == Some("fn"))
                .and_then(|item| item.get(3))
                .and_then(|name| name.as_str())
                .map(String::from)
        })
}

/// Extract entity identifier from publicIds or handle.
fn extract_entity_identifier(entity: &serde_json::Value) -> Option<String> {
    if let Some(id) = entity
        .get("publicIds")
        .and_then(|p| p.as_array())
        .and_then(|ids| ids.first())
        .and_then(|id| id.get("identifier"))
        .and_then(|i| i.as_str())
    {
        return Some(id.to_string());
    }

    entity
        .get("handle")
        .and_then(|h| h.as_str())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> serde_json::Value {
        serde_json::json!({
            "objectClassName": "domain",
            "ldhName": "EXAMPLE.COM",
            "entities": [
                {
                    "roles": ["technical"],
                    "vcardArray": ["vcard", [["fn", {}, "text", "Not The Registrar"]]]
                },
                {
                    "roles": ["registrar"],
                    "vcardArray": [
                        "vcard",
                        [
                            ["version", {}, "text", "4.0"],
                            ["fn", {}, "text", "Example Registrar Inc."]
                        ]
                    ]
                }
            ],
            "events": [
                {"eventAction": "registration", "eventDate": "1995-08-14T04:00:00Z"},
                {"eventAction": "expiration", "eventDate": "2025-08-13T04:00:00Z"},
                {"eventAction": "last changed", "eventDate": "2024-08-14T07:01:34Z"},
                {"eventAction": "last update of RDAP database", "eventDate": "2024-09-01T00:00:00Z"}
            ],
            "nameservers": [
                {"objectClassName": "nameserver", "ldhName": "A.IANA-SERVERS.NET"},
                {"objectClassName": "nameserver", "ldhName": "B.IANA-SERVERS.NET"}
            ],
            "status": ["client delete prohibited", "client transfer prohibited"]
        })
    }

    #[test]
    fn test_parse_rdap_full_document() {
        let fields = parse_rdap(&sample_document());

        assert_eq!(fields.domain_name.as_deref(), Some("EXAMPLE.COM"));
        assert_eq!(fields.registrar.as_deref(), Some("Example Registrar Inc."));
        assert_eq!(fields.creation_date.as_deref(), Some("1995-08-14T04:00:00Z"));
        assert_eq!(fields.expiration_date.as_deref(), Some("2025-08-13T04:00:00Z"));
        assert_eq!(fields.updated_date.as_deref(), Some("2024-08-14T07:01:34Z"));
        assert_eq!(fields.name_servers, vec!["A.IANA-SERVERS.NET", "B.IANA-SERVERS.NET"]);
        assert_eq!(
            fields.status,
            vec!["client delete prohibited", "client transfer prohibited"]
        );
        assert!(fields.raw.contains("\"ldhName\":\"EXAMPLE.COM\""));
    }

    #[test]
    fn test_parse_rdap_tolerates_shape_mismatches() {
        let fields = parse_rdap(&serde_json::json!({
            "entities": "not an array",
            "events": [{"eventAction": "registration"}],
            "nameservers": [{"ldhName": 42}],
            "status": [1, "active"]
        }));

        assert_eq!(fields.registrar, None);
        assert_eq!(fields.creation_date, None);
        assert!(fields.name_servers.is_empty());
        assert_eq!(fields.status, vec!["active"]);
    }

    #[test]
    fn test_registrar_falls_back_to_identifier() {
        let fields = parse_rdap(&serde_json::json!({
            "entities": [{"roles": ["registrar"], "handle": "292", "publicIds": [{"type": "IANA Registrar ID", "identifier": "376"}]}]
        }));
        assert_eq!(fields.registrar.as_deref(), Some("376"));
    }

    #[test]
    fn test_rdap_url_template() {
        let client = RdapClient::new().unwrap();
        assert_eq!(
            client.rdap_url("example.com").unwrap(),
            "https://rdap.verisign.com/com/v1/domain/example.com"
        );

        let custom = RdapClient::with_config(Duration::from_secs(1), "http://127.0.0.1:8080/").unwrap();
        assert_eq!(
            custom.endpoint("example.com").unwrap(),
            "http://127.0.0.1:8080/com/v1/domain/example.com"
        );
    }
}
