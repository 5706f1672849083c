//! HTTP transport used by [`ApiClient`](crate::client::ApiClient).
//!
//! The transport only executes fully built requests. Authentication, retries and
//! status interpretation live in the client, so tests can swap in a scripted
//! transport without a network.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::trace;

use crate::error::{ApiError, Result};

/// Default request timeout for REST calls.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Interval of TCP keepalive probes on every connection.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Executes HTTP requests.
pub trait Transport: Send + Sync {
    /// Client used to build requests.
    fn client(&self) -> &reqwest::Client;

    /// Send `request` and return the response head; the body is read lazily.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the request could not be sent.
    fn execute(
        &self,
        request: reqwest::Request,
    ) -> Pin<Box<dyn Future<Output = Result<reqwest::Response>> + Send + '_>>;
}

/// Transport backed by a [`reqwest::Client`].
///
/// Connections disable Nagle's algorithm and send keepalive probes, which the
/// interactive exec channel relies on after the connection upgrade.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with the default connection settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self> {
        Self::with_insecure(false)
    }

    /// Create a transport, optionally accepting self-signed certificates.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn with_insecure(accept_invalid_certs: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .tcp_nodelay(true)
            .tcp_keepalive(Some(KEEPALIVE_INTERVAL))
            .danger_accept_invalid_certs(accept_invalid_certs)
            .user_agent(concat!("cloudron-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::transport(format!("failed to build http client: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn client(&self) -> &reqwest::Client {
        &self.client
    }

    fn execute(
        &self,
        request: reqwest::Request,
    ) -> Pin<Box<dyn Future<Output = Result<reqwest::Response>> + Send + '_>> {
        Box::pin(async move {
            trace!(method = %request.method(), url = %request.url().path(), "sending request");
            self.client.execute(request).await.map_err(ApiError::from)
        })
    }
}
