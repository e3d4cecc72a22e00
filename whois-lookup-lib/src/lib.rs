//! # WHOIS Lookup Library
//!
//! Query the `.com` registry over WHOIS, cope with the ways registries push
//! back, and turn free-form WHOIS text into a canonical record.
//!
//! A lookup sends the domain to the registry's port-43 service, reads the
//! reply until the connection closes, and watches the text for rate-limit
//! and deprecation notices. Depending on [`QueryOptions`] it waits out a
//! declared cooldown, follows the registrar referral, or switches to RDAP.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use whois_lookup_lib::{whois, QueryOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let record = whois("example.com", &QueryOptions::default()).await?;
//!
//!     println!("Registrar: {:?} (via {})", record.registrar, record.protocol);
//!     Ok(())
//! }
//! ```
//!
//! ## Offline extraction
//!
//! ```rust
//! use whois_lookup_lib::extract_core;
//!
//! let fields = extract_core("Domain Name: EXAMPLE.COM\nCreation Date: 14-Aug-1995\n");
//! assert_eq!(fields.domain_name.as_deref(), Some("EXAMPLE.COM"));
//! assert_eq!(fields.creation_date.as_deref(), Some("1995-08-14T00:00:00.000Z"));
//! ```
//!
//! ## Features
//!
//! - **Retry policy**: transport failures retried after a fixed delay,
//!   rate-limit notices after the declared cooldown
//! - **RDAP fallback**: immediate switch on rate limits or deprecation
//!   notices, plus a last-chance rescue when retries run out
//! - **Referrals**: optional single hop to the registrar's WHOIS server
//! - **Configurable extraction**: injectable field pattern tables

// Re-export main public API types and functions
pub use config::{
    load_env_config, load_env_config_from, parse_duration_string, ConfigManager, DefaultsConfig,
    EnvConfig, FileConfig, OutputConfig,
};
pub use error::WhoisError;
pub use extract::{extract_all, extract_core, normalize_date, Extractor, FieldPattern, FieldPatterns};
pub use lookup::{query_whois, whois, WhoisLookup};
pub use protocols::{
    connect_and_query, fetch_rdap, parse_rdap, RdapClient, RdapFetcher, ResponseSignals,
    TcpWhoisTransport, WhoisTransport,
};
pub use types::{
    AllFields, CoreFields, DomainRecord, Protocol, QueryOptions, QueryResponse, RawResponse,
    RdapFields, DEFAULT_WHOIS_SERVER, WHOIS_PORT,
};
pub use utils::{validate_domain, validate_whois_domain, SUPPORTED_TLDS};

pub use tokio_util::sync::CancellationToken;

// Public modules
pub mod extract;
pub mod protocols;

// Internal modules
mod config;
mod error;
mod lookup;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, WhoisError>;

// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
