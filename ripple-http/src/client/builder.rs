//! Configuration surface for building a [`Client`](super::Client).

use std::time::Duration;

use ripple_model::Token;

use super::Client;
use crate::error::{Error, ErrorType};

/// Discord REST API base URL.
pub(crate) const API_BASE: &str = "https://discord.com/api/v10";

/// Default per-request timeout, matching Discord's own documented
/// round-trip expectations.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds a [`Client`] with optional proxying and timeout configuration.
#[derive(Debug)]
#[must_use = "must call `build` to construct the client"]
pub struct ClientBuilder {
    proxy: Option<Box<str>>,
    proxy_http_only: bool,
    timeout: Duration,
    token: Token,
}

impl ClientBuilder {
    /// Start building a client authenticating as `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            proxy: None,
            proxy_http_only: false,
            timeout: DEFAULT_TIMEOUT,
            token: Token::new(token),
        }
    }

    /// Route all requests through an HTTP(S) proxy.
    pub fn proxy(mut self, proxy_url: impl Into<Box<str>>, http_only: bool) -> Self {
        self.proxy = Some(proxy_url.into());
        self.proxy_http_only = http_only;
        self
    }

    /// Override the per-request timeout (default 10 seconds).
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorType::BuildingRequest`] if the proxy URL or timeout
    /// configuration is rejected by the underlying HTTP client.
    pub fn build(self) -> Result<Client, Error> {
        let mut builder = reqwest::Client::builder().timeout(self.timeout);

        if let Some(proxy_url) = self.proxy.as_deref() {
            let proxy = if self.proxy_http_only {
                reqwest::Proxy::http(proxy_url)
            } else {
                reqwest::Proxy::all(proxy_url)
            }
            .map_err(|source| Error::new(ErrorType::BuildingRequest, Some(Box::new(source))))?;

            builder = builder.proxy(proxy);
        }

        let http = builder
            .build()
            .map_err(|source| Error::new(ErrorType::BuildingRequest, Some(Box::new(source))))?;

        Ok(Client::from_parts(http, self.token))
    }
}
