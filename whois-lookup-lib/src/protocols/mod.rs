//! Protocol implementations.
//!
//! This module contains the port-43 WHOIS socket client, the RDAP fallback
//! client, and detection of the signals registries embed in WHOIS text.

/// RDAP (Registration Data Access Protocol) client
pub mod rdap;

/// Rate-limit, deprecation and referral detection
pub mod signals;

/// WHOIS over a raw TCP stream
pub mod socket;

// Re-export commonly used functions and types
pub use rdap::{fetch_rdap, parse_rdap, RdapClient, RdapFetcher, DEFAULT_RDAP_BASE};
pub use signals::ResponseSignals;
pub use socket::{connect_and_query, TcpWhoisTransport, WhoisTransport};
