//! RDAP client tests against a local HTTP server.

use httpmock::prelude::*;
use std::time::Duration;
use whois_lookup_lib::{
    parse_rdap, QueryOptions, RdapClient, RdapFetcher, TcpWhoisTransport, WhoisError, WhoisLookup,
};

fn rdap_body() -> serde_json::Value {
    serde_json::json!({
        "objectClassName": "domain",
        "ldhName": "EXAMPLE.COM",
        "entities": [{
            "roles": ["registrar"],
            "vcardArray": ["vcard", [["version", {}, "text", "4.0"], ["fn", {}, "text", "Mock Registrar"]]]
        }],
        "events": [
            {"eventAction": "registration", "eventDate": "1995-08-14T04:00:00Z"},
            {"eventAction": "last changed", "eventDate": "2024-08-14T07:01:34Z"}
        ],
        "status": ["client transfer prohibited"]
    })
}

#[tokio::test]
async fn test_fetch_and_parse_document() {
    let server = MockServer::start_async().await;
    let rdap_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/com/v1/domain/example.com");
            then.status(200)
                .header("Content-Type", "application/rdap+json")
                .json_body(rdap_body());
        })
        .await;

    let client = RdapClient::with_config(Duration::from_secs(2), server.base_url()).unwrap();
    let document = client.fetch("example.com", Duration::from_secs(2)).await.unwrap();

    rdap_mock.assert_async().await;
    let fields = parse_rdap(&document);
    assert_eq!(fields.domain_name.as_deref(), Some("EXAMPLE.COM"));
    assert_eq!(fields.registrar.as_deref(), Some("Mock Registrar"));
    assert_eq!(fields.updated_date.as_deref(), Some("2024-08-14T07:01:34Z"));
    assert_eq!(fields.status, vec!["client transfer prohibited"]);
}

#[tokio::test]
async fn test_not_found_carries_status_code() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/com/v1/domain/missing.com");
            then.status(404);
        })
        .await;

    let client = RdapClient::with_config(Duration::from_secs(2), server.base_url()).unwrap();
    let err = client.fetch_rdap("missing.com").await.unwrap_err();

    assert!(matches!(err, WhoisError::Http { .. }));
    assert_eq!(err.status_code(), Some(404));
}

#[tokio::test]
async fn test_invalid_json_is_parse_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/com/v1/domain/example.com");
            then.status(200).body("<html>not rdap</html>");
        })
        .await;

    let client = RdapClient::with_config(Duration::from_secs(2), server.base_url()).unwrap();
    let err = client.fetch_rdap("example.com").await.unwrap_err();

    assert!(matches!(err, WhoisError::Parse { .. }));
}

/// Unreachable WHOIS plus a live RDAP server: the lookup is rescued.
#[tokio::test]
async fn test_lookup_rescued_over_http() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/com/v1/domain/example.com");
            then.status(200).json_body(rdap_body());
        })
        .await;

    // Port 1 on loopback refuses connections
    let transport = TcpWhoisTransport::with_port(1);
    let rdap = RdapClient::with_config(Duration::from_secs(2), server.base_url()).unwrap();
    let lookup = WhoisLookup::with_parts(transport, rdap).with_server("127.0.0.1");

    let options = QueryOptions::default()
        .with_retry_count(0)
        .with_timeout(Duration::from_secs(2));
    let record = lookup.lookup("example.com", &options).await.unwrap();

    assert_eq!(record.registrar.as_deref(), Some("Mock Registrar"));
    assert_eq!(
        record.rdap_url,
        Some(format!("{}/com/v1/domain/example.com", server.base_url()))
    );
}
