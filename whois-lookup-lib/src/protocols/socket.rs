//! WHOIS wire protocol over a raw TCP stream.
//!
//! The protocol is as simple as it gets: connect to port 43, send the query
//! terminated by CRLF, read until the server closes the connection. There is
//! no framing, so connection close is the only completion signal.

use crate::error::WhoisError;
use crate::types::{RawResponse, WHOIS_PORT};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Anything that can run one WHOIS session against a server.
///
/// The orchestrator only talks to this trait, so tests can substitute a
/// scripted transport for the real socket.
#[async_trait]
pub trait WhoisTransport: Send + Sync {
    /// Send `domain` to `server` and return everything it answered.
    async fn query(
        &self,
        domain: &str,
        server: &str,
        timeout: Duration,
    ) -> Result<RawResponse, WhoisError>;
}

#[async_trait]
impl<T: WhoisTransport + ?Sized> WhoisTransport for Arc<T> {
    async fn query(
        &self,
        domain: &str,
        server: &str,
        timeout: Duration,
    ) -> Result<RawResponse, WhoisError> {
        (**self).query(domain, server, timeout).await
    }
}

/// Largest response accepted from one WHOIS session (1 MiB).
pub const MAX_RESPONSE_BYTES: usize = 1024 * 1024;

/// Real WHOIS transport over `tokio::net::TcpStream`.
#[derive(Debug, Clone)]
pub struct TcpWhoisTransport {
    port: u16,
    max_response_bytes: usize,
}

impl TcpWhoisTransport {
    /// Transport targeting the standard WHOIS port.
    pub fn new() -> Self {
        Self::with_port(WHOIS_PORT)
    }

    /// Transport targeting a non-standard port.
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            max_response_bytes: MAX_RESPONSE_BYTES,
        }
    }

    /// Cap the response size; a server sending more fails the session.
    pub fn with_max_response_bytes(mut self, max_response_bytes: usize) -> Self {
        self.max_response_bytes = max_response_bytes;
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Default for TcpWhoisTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WhoisTransport for TcpWhoisTransport {
    async fn query(
        &self,
        domain: &str,
        server: &str,
        limit: Duration,
    ) -> Result<RawResponse, WhoisError> {
        let address = format!("{}:{}", server, self.port);
        debug!(%domain, %address, "opening WHOIS connection");

        let mut stream = match timeout(limit, TcpStream::connect(&address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(WhoisError::connection(
                    server,
                    format!("Failed to connect to {}: {}", address, e),
                ))
            }
            Err(_) => return Err(WhoisError::timeout(server, limit)),
        };

        let request = format!("{}\r\n", domain);
        match timeout(limit, stream.write_all(request.as_bytes())).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(WhoisError::connection(
                    server,
                    format!("Failed to send query: {}", e),
                ))
            }
            Err(_) => return Err(WhoisError::timeout(server, limit)),
        }

        // Each read gets the full window: the timeout bounds inactivity,
        // not the total transfer time.
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            match timeout(limit, stream.read(&mut chunk)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => {
                    if buffer.len() + n > self.max_response_bytes {
                        return Err(WhoisError::connection(
                            server,
                            format!(
                                "Response exceeds {} bytes",
                                self.max_response_bytes
                            ),
                        ));
                    }
                    buffer.extend_from_slice(&chunk[..n]);
                }
                Ok(Err(e)) => {
                    return Err(WhoisError::connection(
                        server,
                        format!("Failed to read response: {}", e),
                    ))
                }
                Err(_) => {
                    debug!(%server, received = buffer.len(), "WHOIS read timed out");
                    return Err(WhoisError::timeout(server, limit));
                }
            }
        }

        debug!(%server, bytes = buffer.len(), "WHOIS response complete");

        Ok(RawResponse {
            server: server.to_string(),
            text: String::from_utf8_lossy(&buffer).into_owned(),
        })
    }
}

/// Run one WHOIS session against `server:43`.
pub async fn connect_and_query(
    domain: &str,
    server: &str,
    timeout: Duration,
) -> Result<RawResponse, WhoisError> {
    TcpWhoisTransport::new().query(domain, server, timeout).await
}
