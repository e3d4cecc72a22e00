//! WHOIS Lookup CLI Application
//!
//! A command-line interface for looking up `.com` registration data over
//! WHOIS with RDAP fallback. All protocol work happens in whois-lookup-lib;
//! this binary resolves configuration, runs lookups one domain at a time,
//! and formats the results.

mod output;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use std::path::Path;
use std::process;
use std::time::Duration;
use tracing_subscriber::prelude::*;
use whois_lookup_lib::{
    load_env_config, CancellationToken, ConfigManager, Extractor, FileConfig, Protocol,
    QueryOptions, WhoisError, WhoisLookup,
};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for whois-lookup
#[derive(Parser, Debug)]
#[command(name = "whois-lookup")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Look up .com registration data over WHOIS with RDAP fallback")]
#[command(
    long_about = "Look up .com registration data over WHOIS (port 43).\n\nRate-limit notices are waited out, deprecation notices and unreachable servers fall back to RDAP, and the registrar referral can be followed."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Domain names to look up (.com only)
    #[arg(value_name = "DOMAIN", help_heading = "Query")]
    pub domains: Vec<String>,

    /// Extract fields from a saved WHOIS response instead of querying
    #[arg(
        long = "parse-file",
        value_name = "FILE",
        conflicts_with = "domains",
        help_heading = "Query"
    )]
    pub parse_file: Option<String>,

    /// Per-operation timeout in milliseconds (default: 5000)
    #[arg(long = "timeout", value_name = "MS", help_heading = "Protocol")]
    pub timeout: Option<u64>,

    /// Re-query the registrar WHOIS server named by the registry
    #[arg(long = "follow", help_heading = "Protocol")]
    pub follow: bool,

    /// Retries after the first attempt (default: 3)
    #[arg(long = "retries", value_name = "N", help_heading = "Protocol")]
    pub retries: Option<u32>,

    /// Delay between retries in milliseconds (default: 1000)
    #[arg(long = "retry-delay", value_name = "MS", help_heading = "Protocol")]
    pub retry_delay: Option<u64>,

    /// Return rate-limit notices instead of waiting them out
    #[arg(long = "no-rate-limit-handling", help_heading = "Protocol")]
    pub no_rate_limit_handling: bool,

    /// Never fall back to RDAP
    #[arg(long = "no-rdap", help_heading = "Protocol")]
    pub no_rdap: bool,

    /// Output results in JSON format
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// Include every extracted field, not only the core record
    #[arg(short = 'a', long = "all-fields", help_heading = "Output Format")]
    pub all_fields: bool,

    /// Include the raw server response
    #[arg(long = "raw", help_heading = "Output Format")]
    pub raw: bool,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Verbose logging (debug level unless RUST_LOG says otherwise)
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(2);
    }

    init_tracing(args.verbose);

    match run(args).await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if args.domains.is_empty() && args.parse_file.is_none() {
        return Err("You must specify domain names or a saved response with --parse-file".into());
    }

    if args.timeout == Some(0) {
        return Err("--timeout must be greater than zero".into());
    }

    Ok(())
}

/// Install the tracing subscriber. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Run the requested work. Returns `Ok(false)` when any lookup failed.
async fn run(args: Args) -> Result<bool, Box<dyn std::error::Error>> {
    let (options, file_config) = build_options(&args)?;
    let extractor = Extractor::new(file_config.field_patterns()?);
    let output = output::OutputSettings::resolve(&args, &file_config);

    if let Some(path) = &args.parse_file {
        parse_saved_response(path, &extractor, &output)?;
        return Ok(true);
    }

    let lookup = WhoisLookup::new()?.with_extractor(extractor);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let mut all_ok = true;
    let mut results = Vec::with_capacity(args.domains.len());

    // Registries rate-limit per client, so domains go one at a time
    for domain in &args.domains {
        match lookup.lookup_with_cancel(domain, &options, &cancel).await {
            Ok(record) => {
                let fields = if output.all_fields && record.protocol == Protocol::Whois {
                    Some(lookup.extractor().extract_all(&record.raw))
                } else {
                    None
                };
                if output.json {
                    results.push(output::record_json(domain, &record, fields.as_ref(), &output)?);
                } else {
                    output::print_record(domain, &record, fields.as_ref(), &output);
                }
            }
            Err(WhoisError::Cancelled) => {
                eprintln!("Interrupted");
                return Ok(false);
            }
            Err(e) => {
                all_ok = false;
                if output.json {
                    results.push(output::error_json(domain, &e));
                } else {
                    output::print_error(domain, &e);
                }
            }
        }
    }

    if output.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }

    Ok(all_ok)
}

/// Resolve query options with precedence CLI > environment > config file > defaults.
fn build_options(args: &Args) -> Result<(QueryOptions, FileConfig), Box<dyn std::error::Error>> {
    let env_config = load_env_config();
    let manager = ConfigManager::new(args.verbose);

    // An explicit config file must load; discovered ones are best effort
    let file_config = match args.config.as_ref().or(env_config.config.as_ref()) {
        Some(path) => manager.load_file(path)?,
        None => manager.discover_and_load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "config discovery failed");
            FileConfig::default()
        }),
    };

    let mut options = file_config.apply_to(QueryOptions::default());
    options = env_config.apply_to(options);

    if let Some(ms) = args.timeout {
        options.timeout = Duration::from_millis(ms);
    }
    if args.follow {
        options.follow_referral = true;
    }
    if let Some(retries) = args.retries {
        options.retry_count = retries;
    }
    if let Some(ms) = args.retry_delay {
        options.retry_delay = Duration::from_millis(ms);
    }
    if args.no_rate_limit_handling {
        options.handle_rate_limit = false;
    }
    if args.no_rdap {
        options.use_rdap_fallback = false;
    }

    tracing::debug!(?options, "resolved query options");
    Ok((options, file_config))
}

/// Run the extraction engine over a saved WHOIS response.
fn parse_saved_response(
    path: &str,
    extractor: &Extractor,
    output: &output::OutputSettings,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(Path::new(path)).map_err(|e| {
        WhoisError::file_error(path, format!("Failed to read WHOIS response: {}", e))
    })?;

    let fields = extractor.extract_all(&text);
    output::print_fields(path, &fields, &text, output)?;
    Ok(())
}
