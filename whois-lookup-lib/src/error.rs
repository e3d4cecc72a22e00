//! Error handling for WHOIS and RDAP lookups.
//!
//! This module defines the error type for every way a lookup can fail, from
//! rejected input to exhausted retries. Extraction never produces errors;
//! only the network-facing operations do.

use std::fmt;
use std::time::Duration;

/// Main error type for lookup operations.
#[derive(Debug, Clone)]
pub enum WhoisError {
    /// The domain string is malformed (empty, missing labels, bad characters)
    InvalidDomain { domain: String, reason: String },

    /// The domain is well-formed but its top-level label is not served
    UnsupportedTld { domain: String, tld: String },

    /// No progress on a socket or HTTP request within the allowed window
    Timeout { server: String, duration: Duration },

    /// DNS, TCP or I/O failure talking to a WHOIS server
    Connection { server: String, message: String },

    /// RDAP request failed, either with a non-success status or in transport
    Http {
        url: String,
        status_code: Option<u16>,
        message: String,
    },

    /// RDAP body could not be decoded as JSON
    Parse { message: String },

    /// All attempts failed; carries the last underlying error
    ExhaustedRetries {
        attempts: u32,
        last: Box<WhoisError>,
    },

    /// The caller cancelled the lookup
    Cancelled,

    /// Invalid configuration values
    Config { message: String },

    /// Configuration file could not be read
    File { path: String, message: String },
}

impl WhoisError {
    /// Create a new invalid domain error.
    pub fn invalid_domain<D: Into<String>, R: Into<String>>(domain: D, reason: R) -> Self {
        Self::InvalidDomain {
            domain: domain.into(),
            reason: reason.into(),
        }
    }

    /// Create a new unsupported TLD error.
    pub fn unsupported_tld<D: Into<String>, T: Into<String>>(domain: D, tld: T) -> Self {
        Self::UnsupportedTld {
            domain: domain.into(),
            tld: tld.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<S: Into<String>>(server: S, duration: Duration) -> Self {
        Self::Timeout {
            server: server.into(),
            duration,
        }
    }

    /// Create a new connection error.
    pub fn connection<S: Into<String>, M: Into<String>>(server: S, message: M) -> Self {
        Self::Connection {
            server: server.into(),
            message: message.into(),
        }
    }

    /// Create a new HTTP error without a status code (transport failure).
    pub fn http<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::Http {
            url: url.into(),
            status_code: None,
            message: message.into(),
        }
    }

    /// Create a new HTTP error with the response status code.
    pub fn http_with_status<U: Into<String>, M: Into<String>>(
        url: U,
        message: M,
        status_code: u16,
    ) -> Self {
        Self::Http {
            url: url.into(),
            status_code: Some(status_code),
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::File {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether the input was rejected before any network I/O.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidDomain { .. } | Self::UnsupportedTld { .. })
    }

    /// Check if this error suggests the operation should be retried.
    ///
    /// The orchestrator stops retrying a WHOIS server as soon as a
    /// transport returns an error for which this is false.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::Timeout { .. }
                | Self::Http {
                    status_code: None | Some(500..=599),
                    ..
                }
        )
    }

    /// HTTP status code, if this is an RDAP status failure.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status_code, .. } => *status_code,
            Self::ExhaustedRetries { last, .. } => last.status_code(),
            _ => None,
        }
    }
}

impl fmt::Display for WhoisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDomain { domain, reason } => {
                write!(f, "Invalid domain '{}': {}", domain, reason)
            }
            Self::UnsupportedTld { domain, tld } => {
                write!(f, "Unsupported TLD '{}' for domain '{}'", tld, domain)
            }
            Self::Timeout { server, duration } => {
                write!(f, "Timeout after {:?} waiting on {}", duration, server)
            }
            Self::Connection { server, message } => {
                write!(f, "Connection error with {}: {}", server, message)
            }
            Self::Http {
                url,
                status_code,
                message,
            } => {
                if let Some(code) = status_code {
                    write!(f, "HTTP error for '{}' (HTTP {}): {}", url, code, message)
                } else {
                    write!(f, "HTTP error for '{}': {}", url, message)
                }
            }
            Self::Parse { message } => {
                write!(f, "Parse error: {}", message)
            }
            Self::ExhaustedRetries { attempts, last } => {
                write!(f, "Gave up after {} attempts: {}", attempts, last)
            }
            Self::Cancelled => write!(f, "Lookup cancelled"),
            Self::Config { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::File { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
        }
    }
}

impl std::error::Error for WhoisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ExhaustedRetries { last, .. } => Some(last.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for WhoisError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        match err.status() {
            Some(status) => Self::http_with_status(url, err.to_string(), status.as_u16()),
            None => Self::http(url, err.to_string()),
        }
    }
}

impl From<serde_json::Error> for WhoisError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse {
            message: format!("JSON parsing failed: {}", err),
        }
    }
}

impl From<toml::de::Error> for WhoisError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("Failed to parse TOML configuration: {}", err))
    }
}

impl From<regex::Error> for WhoisError {
    fn from(err: regex::Error) -> Self {
        Self::config(format!("Invalid field pattern: {}", err))
    }
}
