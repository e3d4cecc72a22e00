//! Query orchestration.
//!
//! [`WhoisLookup`] drives one lookup from validation to a finished
//! [`QueryResponse`]: it queries the registry over WHOIS, reads the
//! rate-limit and deprecation signals in the answer, and decides whether to
//! wait and retry, follow a referral, fall back to RDAP, or return.
//!
//! The retry policy is an explicit loop over an attempt counter. Each
//! attempt ends in a [`Transition`], which keeps the exhausted-retries and
//! RDAP-rescue paths flat and easy to test with scripted transports.

use crate::error::WhoisError;
use crate::extract::Extractor;
use crate::protocols::rdap::{parse_rdap, RdapClient, RdapFetcher};
use crate::protocols::signals::ResponseSignals;
use crate::protocols::socket::{TcpWhoisTransport, WhoisTransport};
use crate::types::{
    DomainRecord, Protocol, QueryOptions, QueryResponse, RawResponse, DEFAULT_WHOIS_SERVER,
};
use crate::utils::validate_whois_domain;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What to do after one attempt.
#[derive(Debug)]
enum Transition {
    /// Sleep, then query the registry again
    Retry(Duration),
    /// Stop with this response
    Return(QueryResponse),
    /// No attempts left
    Exhausted,
}

/// Orchestrates WHOIS queries with retries, referral following and RDAP
/// fallback.
///
/// # Example
///
/// ```rust,no_run
/// use whois_lookup_lib::{QueryOptions, WhoisLookup};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let lookup = WhoisLookup::new()?;
///     let record = lookup.lookup("example.com", &QueryOptions::default()).await?;
///     println!("{:?} via {}", record.registrar, record.protocol);
///     Ok(())
/// }
/// ```
pub struct WhoisLookup<T = TcpWhoisTransport, R = RdapClient> {
    transport: T,
    rdap: R,
    extractor: Extractor,
    server: String,
}

impl WhoisLookup {
    /// Create a lookup using real sockets and the default RDAP client.
    pub fn new() -> Result<Self, WhoisError> {
        Ok(Self::with_parts(TcpWhoisTransport::new(), RdapClient::new()?))
    }
}

impl<T: WhoisTransport, R: RdapFetcher> WhoisLookup<T, R> {
    /// Create a lookup over the given transport and RDAP fetcher.
    pub fn with_parts(transport: T, rdap: R) -> Self {
        Self {
            transport,
            rdap,
            extractor: Extractor::default(),
            server: DEFAULT_WHOIS_SERVER.to_string(),
        }
    }

    /// Use a different extraction pattern table.
    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Query a different registry WHOIS server.
    pub fn with_server<S: Into<String>>(mut self, server: S) -> Self {
        self.server = server.into();
        self
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    /// Run a lookup and return the raw response envelope.
    pub async fn query(
        &self,
        domain: &str,
        options: &QueryOptions,
    ) -> Result<QueryResponse, WhoisError> {
        self.query_with_cancel(domain, options, &CancellationToken::new())
            .await
    }

    /// Run a lookup and return the canonical record.
    pub async fn lookup(
        &self,
        domain: &str,
        options: &QueryOptions,
    ) -> Result<DomainRecord, WhoisError> {
        self.lookup_with_cancel(domain, options, &CancellationToken::new())
            .await
    }

    /// Like [`lookup`](Self::lookup), aborting with [`WhoisError::Cancelled`]
    /// once `cancel` fires.
    pub async fn lookup_with_cancel(
        &self,
        domain: &str,
        options: &QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<DomainRecord, WhoisError> {
        let response = self.query_with_cancel(domain, options, cancel).await?;
        Ok(self.to_record(response))
    }

    /// Like [`query`](Self::query), aborting with [`WhoisError::Cancelled`]
    /// once `cancel` fires. Socket sessions, RDAP requests and every wait
    /// race the token.
    pub async fn query_with_cancel(
        &self,
        domain: &str,
        options: &QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<QueryResponse, WhoisError> {
        let domain = validate_whois_domain(domain)?;
        let max_attempts = options.retry_count.saturating_add(1);
        let mut attempts: u32 = 0;
        let mut last_error: Option<WhoisError> = None;

        while attempts < max_attempts {
            attempts += 1;
            debug!(%domain, server = %self.server, attempt = attempts, "querying WHOIS");

            let outcome = cancellable(
                cancel,
                self.transport.query(&domain, &self.server, options.timeout),
            )
            .await?;

            let can_retry = attempts < max_attempts;
            let transition = match outcome {
                Ok(raw) => {
                    self.on_response(&domain, raw, options, can_retry, cancel)
                        .await?
                }
                Err(e) => {
                    warn!(%domain, attempt = attempts, error = %e, "WHOIS query failed");
                    let retryable = e.is_retryable();
                    last_error = Some(e);
                    if can_retry && retryable {
                        Transition::Retry(options.retry_delay)
                    } else {
                        Transition::Exhausted
                    }
                }
            };

            match transition {
                Transition::Return(response) => return Ok(response),
                Transition::Retry(wait) => {
                    debug!(%domain, wait_ms = wait.as_millis() as u64, "waiting before retry");
                    cancellable(cancel, tokio::time::sleep(wait)).await?;
                }
                Transition::Exhausted => break,
            }
        }

        if options.use_rdap_fallback {
            info!(%domain, attempts, "WHOIS attempts exhausted, trying RDAP rescue");
            match self
                .rdap_response(&domain, options, &ResponseSignals::default(), cancel)
                .await
            {
                Ok(response) => return Ok(response),
                Err(WhoisError::Cancelled) => return Err(WhoisError::Cancelled),
                Err(e) => warn!(%domain, error = %e, "RDAP rescue failed"),
            }
        }

        Err(WhoisError::ExhaustedRetries {
            attempts,
            last: Box::new(last_error.unwrap_or_else(|| {
                WhoisError::connection(self.server.clone(), "no WHOIS attempt completed")
            })),
        })
    }

    /// Decide what to do with a WHOIS answer.
    async fn on_response(
        &self,
        domain: &str,
        raw: RawResponse,
        options: &QueryOptions,
        can_retry: bool,
        cancel: &CancellationToken,
    ) -> Result<Transition, WhoisError> {
        let signals = ResponseSignals::detect(&raw.text, &raw.server);

        if signals.rate_limited() || signals.deprecated {
            info!(
                %domain,
                rate_limited = signals.rate_limited(),
                deprecated = signals.deprecated,
                "WHOIS response carries a back-off signal"
            );

            if options.use_rdap_fallback {
                match self.rdap_response(domain, options, &signals, cancel).await {
                    Ok(response) => return Ok(Transition::Return(response)),
                    Err(WhoisError::Cancelled) => return Err(WhoisError::Cancelled),
                    Err(e) => warn!(%domain, error = %e, "RDAP fallback failed"),
                }
            }
        }

        if let Some(wait) = signals.rate_limit_wait() {
            if options.handle_rate_limit && can_retry {
                return Ok(Transition::Retry(wait));
            }
        }

        let mut response = self.whois_response(domain, raw, &signals);

        if options.follow_referral {
            if let Some(referral) = signals.referral.as_deref() {
                debug!(%domain, %referral, "following registrar referral");
                match cancellable(
                    cancel,
                    self.transport.query(domain, referral, options.timeout),
                )
                .await?
                {
                    Ok(registrar) => {
                        response.raw = registrar.text;
                        response.server = Some(registrar.server);
                    }
                    Err(e) => {
                        warn!(%domain, %referral, error = %e, "referral query failed, keeping registry data")
                    }
                }
            }
        }

        Ok(Transition::Return(response))
    }

    fn whois_response(
        &self,
        domain: &str,
        raw: RawResponse,
        signals: &ResponseSignals,
    ) -> QueryResponse {
        let rdap_url = signals.rdap_url.clone().or_else(|| {
            if signals.deprecated {
                self.rdap.endpoint(domain).ok()
            } else {
                None
            }
        });

        QueryResponse {
            protocol: Protocol::Whois,
            raw: raw.text,
            rdap: None,
            server: Some(raw.server),
            rate_limited: signals.rate_limited(),
            rate_limit_seconds: signals.rate_limit_seconds.unwrap_or(0),
            rdap_recommended: signals.deprecated,
            rdap_url,
            referral: signals.referral.clone(),
        }
    }

    async fn rdap_response(
        &self,
        domain: &str,
        options: &QueryOptions,
        signals: &ResponseSignals,
        cancel: &CancellationToken,
    ) -> Result<QueryResponse, WhoisError> {
        let url = self.rdap.endpoint(domain)?;
        let document = cancellable(cancel, self.rdap.fetch(domain, options.timeout)).await??;
        debug!(%domain, %url, "answered from RDAP");

        Ok(QueryResponse {
            protocol: Protocol::Rdap,
            raw: document.to_string(),
            rdap: Some(document),
            server: None,
            rate_limited: signals.rate_limited(),
            rate_limit_seconds: signals.rate_limit_seconds.unwrap_or(0),
            rdap_recommended: signals.deprecated,
            rdap_url: Some(url),
            referral: signals.referral.clone(),
        })
    }

    /// Turn a response envelope into the canonical record.
    pub fn to_record(&self, response: QueryResponse) -> DomainRecord {
        match response.protocol {
            Protocol::Whois => {
                let all = self.extractor.extract_all(&response.raw);
                DomainRecord {
                    domain_name: all.core.domain_name,
                    registrar: all.core.registrar,
                    creation_date: all.core.creation_date,
                    expiration_date: all.core.expiration_date,
                    updated_date: all.core.updated_date,
                    name_servers: all.name_servers,
                    status: all.status,
                    raw: response.raw,
                    protocol: Protocol::Whois,
                    rate_limited: response.rate_limited,
                    rate_limit_seconds: response.rate_limit_seconds,
                    rdap_recommended: response.rdap_recommended,
                    rdap_url: response.rdap_url,
                    whois_server: response.server,
                }
            }
            Protocol::Rdap => {
                let document = response
                    .rdap
                    .or_else(|| serde_json::from_str(&response.raw).ok())
                    .unwrap_or(serde_json::Value::Null);
                let fields = parse_rdap(&document);
                DomainRecord {
                    domain_name: fields.domain_name,
                    registrar: fields.registrar,
                    creation_date: fields.creation_date,
                    expiration_date: fields.expiration_date,
                    updated_date: fields.updated_date,
                    name_servers: fields.name_servers,
                    status: fields.status,
                    raw: response.raw,
                    protocol: Protocol::Rdap,
                    rate_limited: response.rate_limited,
                    rate_limit_seconds: response.rate_limit_seconds,
                    rdap_recommended: response.rdap_recommended,
                    rdap_url: response.rdap_url,
                    whois_server: None,
                }
            }
        }
    }
}

/// Race a future against the cancellation token.
async fn cancellable<F: Future>(
    cancel: &CancellationToken,
    future: F,
) -> Result<F::Output, WhoisError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(WhoisError::Cancelled),
        output = future => Ok(output),
    }
}

/// Query the `.com` registry and return the response envelope.
pub async fn query_whois(domain: &str, options: &QueryOptions) -> Result<QueryResponse, WhoisError> {
    WhoisLookup::new()?.query(domain, options).await
}

/// Query the `.com` registry and return the canonical record.
pub async fn whois(domain: &str, options: &QueryOptions) -> Result<DomainRecord, WhoisError> {
    WhoisLookup::new()?.lookup(domain, options).await
}
