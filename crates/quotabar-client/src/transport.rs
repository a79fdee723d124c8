//! HTTP transport for the quota endpoint

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::error::{FetchError, Result, TransportCode};

/// Default quota endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.github.com/copilot_internal/user";

/// Default user agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("quotabar/", env!("CARGO_PKG_VERSION"));

/// Opaque bearer token.
#[derive(Clone)]
pub struct Credential(Arc<SecretString>);

impl Credential {
    /// Wrap a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(Arc::new(SecretString::from(token.into())))
    }

    /// Raw token value, for the Authorization header only.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

/// Raw HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Response body
    pub body: String,
}

impl HttpResponse {
    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs one network round trip to the quota endpoint.
///
/// Transport failures are classified into a [`FetchError`] here; status
/// classification and payload parsing happen in the client.
#[async_trait]
pub trait QuotaTransport: Send + Sync {
    /// Issue a single GET with the given credential and timeout.
    async fn get(&self, token: &Credential, timeout: Duration) -> Result<HttpResponse>;
}

/// reqwest-backed transport.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    user_agent: String,
}

impl HttpTransport {
    /// Create a transport for the given endpoint.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Builder: override the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Configured endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

#[async_trait]
impl QuotaTransport for HttpTransport {
    async fn get(&self, token: &Credential, timeout: Duration) -> Result<HttpResponse> {
        debug!(endpoint = %self.endpoint, timeout_ms = timeout.as_millis() as u64, "Requesting quota");

        let resp = self
            .client
            .get(&self.endpoint)
            .bearer_auth(token.expose())
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, &self.user_agent)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| transport_error(&e))?;
        Ok(HttpResponse { status, body })
    }
}

fn transport_error(err: &reqwest::Error) -> FetchError {
    FetchError::from_transport(transport_code(err), "quota request failed").with_cause(err)
}

/// Map a reqwest failure onto a transport code by walking its source chain.
fn transport_code(err: &reqwest::Error) -> TransportCode {
    if err.is_timeout() {
        return TransportCode::Timeout;
    }

    let mut source = err.source();
    while let Some(inner) = source {
        if let Some(io) = inner.downcast_ref::<std::io::Error>() {
            if let Some(code) = io_code(io.kind()) {
                return code;
            }
        }
        if is_dns_failure(&inner.to_string()) {
            return TransportCode::HostNotFound;
        }
        source = inner.source();
    }

    if err.is_connect() {
        TransportCode::ConnectionRefused
    } else {
        TransportCode::Other
    }
}

fn io_code(kind: std::io::ErrorKind) -> Option<TransportCode> {
    match kind {
        std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::ConnectionAborted => {
            Some(TransportCode::ConnectionReset)
        }
        std::io::ErrorKind::TimedOut => Some(TransportCode::TimedOut),
        std::io::ErrorKind::ConnectionRefused => Some(TransportCode::ConnectionRefused),
        _ => None,
    }
}

fn is_dns_failure(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("dns error")
        || message.contains("failed to lookup address")
        || message.contains("name or service not known")
        || message.contains("no such host")
}
