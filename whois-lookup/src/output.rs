//! Display logic for whois-lookup.
//!
//! Human-readable records with `console` styling, plus the JSON shapes
//! printed with `--json`. Everything goes to stdout except errors.

use console::{pad_str, style, Alignment};
use serde_json::{json, Value};
use whois_lookup_lib::{AllFields, DomainRecord, FileConfig, WhoisError};

use crate::Args;

const LABEL_WIDTH: usize = 18;

/// Output switches after merging CLI flags with the `[output]` config section.
#[derive(Debug, Clone, Default)]
pub struct OutputSettings {
    pub json: bool,
    pub all_fields: bool,
    pub raw: bool,
}

impl OutputSettings {
    /// A flag given on the command line always wins; otherwise the config
    /// file decides.
    pub fn resolve(args: &Args, file_config: &FileConfig) -> Self {
        let configured = file_config.output.clone().unwrap_or_default();
        Self {
            json: args.json || configured.json.unwrap_or(false),
            all_fields: args.all_fields || configured.all_fields.unwrap_or(false),
            raw: args.raw,
        }
    }
}

// ── JSON ─────────────────────────────────────────────────────────────────────

/// JSON object for one successful lookup.
pub fn record_json(
    query: &str,
    record: &DomainRecord,
    fields: Option<&AllFields>,
    settings: &OutputSettings,
) -> Result<Value, serde_json::Error> {
    let mut value = serde_json::to_value(record)?;

    if let Value::Object(map) = &mut value {
        if !settings.raw {
            map.remove("raw");
        }
        if let Some(fields) = fields {
            map.insert("fields".to_string(), serde_json::to_value(&fields.fields)?);
        }
        map.insert("query".to_string(), Value::String(query.to_string()));
    }

    Ok(value)
}

/// JSON object for one failed lookup.
pub fn error_json(query: &str, error: &WhoisError) -> Value {
    json!({
        "query": query,
        "error": error.to_string(),
    })
}

// ── Text ─────────────────────────────────────────────────────────────────────

/// Print one record as aligned `label: value` lines.
pub fn print_record(
    query: &str,
    record: &DomainRecord,
    fields: Option<&AllFields>,
    settings: &OutputSettings,
) {
    let source = match &record.whois_server {
        Some(server) => format!("{} via {}", record.protocol, server),
        None => record.protocol.to_string(),
    };
    println!("{} {}", style(query).bold(), style(format!("({})", source)).dim());

    print_line("Domain Name", record.domain_name.as_deref());
    print_line("Registrar", record.registrar.as_deref());
    print_line("Created", record.creation_date.as_deref());
    print_line("Expires", record.expiration_date.as_deref());
    print_line("Updated", record.updated_date.as_deref());
    print_list("Name Servers", &record.name_servers);
    print_list("Status", &record.status);

    if record.rate_limited {
        println!(
            "  {} rate limited by the server ({}s cooldown)",
            style("!").yellow().bold(),
            record.rate_limit_seconds
        );
    }
    if record.rdap_recommended {
        let hint = record
            .rdap_url
            .as_deref()
            .map(|url| format!(", see {}", url))
            .unwrap_or_default();
        println!(
            "  {} WHOIS service is deprecated in favor of RDAP{}",
            style("!").yellow().bold(),
            hint
        );
    }

    if let Some(fields) = fields {
        print_extra_fields(fields);
    }

    if settings.raw {
        println!();
        println!("{}", style("── Raw response ").dim());
        println!("{}", record.raw.trim_end());
    }

    println!();
}

/// Print a lookup failure to stderr.
pub fn print_error(query: &str, error: &WhoisError) {
    eprintln!(
        "{} {}  {}",
        style(query).bold(),
        style("FAILED").red().bold(),
        style(error).dim()
    );
}

/// Print fields extracted from a saved response (`--parse-file`).
pub fn print_fields(
    source: &str,
    fields: &AllFields,
    text: &str,
    settings: &OutputSettings,
) -> Result<(), serde_json::Error> {
    if settings.json {
        let mut value = if settings.all_fields {
            serde_json::to_value(fields)?
        } else {
            serde_json::to_value(&fields.core)?
        };
        if let (Value::Object(map), true) = (&mut value, settings.raw) {
            map.insert("raw".to_string(), Value::String(text.to_string()));
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{} {}", style(source).bold(), style("(offline)").dim());
    print_line("Domain Name", fields.core.domain_name.as_deref());
    print_line("Registrar", fields.core.registrar.as_deref());
    print_line("Created", fields.core.creation_date.as_deref());
    print_line("Expires", fields.core.expiration_date.as_deref());
    print_line("Updated", fields.core.updated_date.as_deref());

    if settings.all_fields {
        print_list("Name Servers", &fields.name_servers);
        print_list("Status", &fields.status);
        print_extra_fields(fields);
    }

    if settings.raw {
        println!();
        println!("{}", text.trim_end());
    }

    Ok(())
}

fn print_extra_fields(fields: &AllFields) {
    if fields.fields.is_empty() {
        return;
    }
    println!("  {}", style("── Other fields ").dim());
    for (key, value) in &fields.fields {
        print_line(key, Some(value.as_str()));
    }
}

fn print_line(label: &str, value: Option<&str>) {
    let label = pad_str(label, LABEL_WIDTH, Alignment::Left, Some(".."));
    match value {
        Some(value) => println!("  {}  {}", style(label).cyan(), value),
        None => println!("  {}  {}", style(label).cyan(), style("-").dim()),
    }
}

fn print_list(label: &str, values: &[String]) {
    if values.is_empty() {
        print_line(label, None);
        return;
    }
    for (i, value) in values.iter().enumerate() {
        let shown = if i == 0 { label } else { "" };
        print_line(shown, Some(value.as_str()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use whois_lookup_lib::Protocol;

    fn record() -> DomainRecord {
        DomainRecord {
            domain_name: Some("EXAMPLE.COM".to_string()),
            registrar: Some("Example Inc.".to_string()),
            creation_date: None,
            expiration_date: None,
            updated_date: None,
            name_servers: vec!["a.iana-servers.net".to_string()],
            status: vec![],
            raw: "Domain Name: EXAMPLE.COM".to_string(),
            protocol: Protocol::Whois,
            rate_limited: false,
            rate_limit_seconds: 0,
            rdap_recommended: false,
            rdap_url: None,
            whois_server: Some("whois.verisign-grs.com".to_string()),
        }
    }

    #[test]
    fn test_record_json_omits_raw_by_default() {
        let value = record_json("example.com", &record(), None, &OutputSettings::default()).unwrap();
        assert_eq!(value["query"], "example.com");
        assert_eq!(value["registrar"], "Example Inc.");
        assert_eq!(value["protocol"], "whois");
        assert!(value.get("raw").is_none());
        assert!(value.get("fields").is_none());
    }

    #[test]
    fn test_record_json_with_raw_and_fields() {
        let settings = OutputSettings {
            raw: true,
            all_fields: true,
            ..Default::default()
        };
        let mut fields = AllFields::default();
        fields
            .fields
            .insert("dnssec".to_string(), "unsigned".to_string());

        let value = record_json("example.com", &record(), Some(&fields), &settings).unwrap();
        assert_eq!(value["raw"], "Domain Name: EXAMPLE.COM");
        assert_eq!(value["fields"]["dnssec"], "unsigned");
    }

    #[test]
    fn test_error_json() {
        let value = error_json(
            "example.org",
            &WhoisError::unsupported_tld("example.org", "org"),
        );
        assert_eq!(value["query"], "example.org");
        assert!(value["error"].as_str().unwrap().contains("org"));
    }
}
