// whois-lookup/tests/cli_integration.rs

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::NamedTempFile;

const SAVED_RESPONSE: &str = "   Domain Name: EXAMPLE.COM\r
   Registry Domain ID: 2336799_DOMAIN_COM-VRSN\r
   Registrar WHOIS Server: whois.iana.org\r
   Creation Date: 14-Aug-1995\r
   Registry Expiry Date: 2025-08-13T04:00:00Z\r
   Registrar: RESERVED-Internet Assigned Numbers Authority\r
   Name Server: A.IANA-SERVERS.NET\r
   Name Server: B.IANA-SERVERS.NET\r
   DNSSEC: signedDelegation\r
";

/// Helper to write a saved WHOIS response
fn create_response_file(content: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("Failed to create temp file");
    fs::write(file.path(), content).expect("Failed to write to temp file");
    file
}

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("whois-lookup").unwrap();
    // Keep the environment from leaking into the tests
    for var in [
        "WL_TIMEOUT",
        "WL_RETRIES",
        "WL_RETRY_DELAY",
        "WL_FOLLOW",
        "WL_HANDLE_RATE_LIMIT",
        "WL_RDAP_FALLBACK",
        "WL_CONFIG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_help_lists_flags() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--follow"))
        .stdout(predicate::str::contains("--no-rdap"))
        .stdout(predicate::str::contains("--parse-file"))
        .stdout(predicate::str::contains("--retry-delay"));
}

#[test]
fn test_no_arguments_is_an_error() {
    cli()
        .assert()
        .failure()
        .stderr(predicate::str::contains("You must specify domain names"));
}

#[test]
fn test_unsupported_tld_fails_without_network() {
    cli()
        .args(["example.org", "--json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"query\": \"example.org\""))
        .stdout(predicate::str::contains("Unsupported TLD"));
}

#[test]
fn test_parse_file_core_fields_json() {
    let file = create_response_file(SAVED_RESPONSE);

    cli()
        .args(["--parse-file", file.path().to_str().unwrap(), "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"domain_name\": \"EXAMPLE.COM\""))
        .stdout(predicate::str::contains(
            "\"creation_date\": \"1995-08-14T00:00:00.000Z\"",
        ))
        .stdout(predicate::str::contains("name_servers").not());
}

#[test]
fn test_parse_file_all_fields_json() {
    let file = create_response_file(SAVED_RESPONSE);

    cli()
        .args([
            "--parse-file",
            file.path().to_str().unwrap(),
            "--json",
            "--all-fields",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("A.IANA-SERVERS.NET"))
        .stdout(predicate::str::contains("B.IANA-SERVERS.NET"))
        .stdout(predicate::str::contains("\"dnssec\": \"signedDelegation\""))
        .stdout(predicate::str::contains(
            "\"registry_domain_id\": \"2336799_DOMAIN_COM-VRSN\"",
        ));
}

#[test]
fn test_parse_file_text_output() {
    let file = create_response_file(SAVED_RESPONSE);

    cli()
        .args(["--parse-file", file.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("EXAMPLE.COM"))
        .stdout(predicate::str::contains("RESERVED-Internet Assigned Numbers Authority"));
}

#[test]
fn test_parse_file_with_pattern_override_from_config() {
    let response = create_response_file("Sponsoring Outfit: Acme Names\nDomain Name: ACME.COM\n");
    let config = create_response_file("[patterns]\nregistrar = '^\\s*Sponsoring Outfit:\\s*(.+)$'\n");

    cli()
        .args([
            "--parse-file",
            response.path().to_str().unwrap(),
            "--config",
            config.path().to_str().unwrap(),
            "--json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"registrar\": \"Acme Names\""));
}

#[test]
fn test_missing_parse_file_fails() {
    cli()
        .args(["--parse-file", "/definitely/not/here.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read WHOIS response"));
}
