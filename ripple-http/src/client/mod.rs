//! [`Client`]: executes REST requests under rate-limit supervision.

pub mod builder;
mod request;

use http::{
    header::{HeaderValue, AUTHORIZATION, CONNECTION, CONTENT_TYPE, USER_AGENT},
    HeaderMap, StatusCode,
};
use rand::Rng;
use ripple_http_ratelimiting::{LimitKey, Ratelimiter};
use ripple_model::Token;

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

pub use self::{
    builder::ClientBuilder,
    request::{Request, Response},
};
use crate::{
    api_error::ApiError,
    error::{Error, ErrorType},
};

/// Maximum number of attempts (including the first) before a `429`/`502`
/// gives up and surfaces an error.
const MAX_ATTEMPTS: u8 = 5;

/// `User-Agent` sent on every request, per Discord's documented format.
const USER_AGENT_VALUE: &str = concat!(
    "DiscordBot (",
    env!("CARGO_PKG_REPOSITORY"),
    ", ",
    env!("CARGO_PKG_VERSION"),
    ") Rust"
);

/// A REST client authenticated against Discord's API, serializing requests
/// against server-observed rate-limit buckets.
#[derive(Debug)]
pub struct Client {
    http: reqwest::Client,
    ratelimiter: Ratelimiter,
    token: Token,
}

impl Client {
    /// Create a client with default configuration (no proxy, a 10-second
    /// request timeout).
    ///
    /// # Errors
    ///
    /// Returns [`ErrorType::BuildingRequest`] if the underlying HTTP client
    /// fails to build.
    pub fn new(token: impl Into<String>) -> Result<Self, Error> {
        ClientBuilder::new(token).build()
    }

    /// Start building a client with non-default configuration.
    pub fn builder(token: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(token)
    }

    pub(crate) fn from_parts(http: reqwest::Client, token: Token) -> Self {
        Self { http, ratelimiter: Ratelimiter::new(), token }
    }

    /// Execute `request` against the bucket named by `key`, retrying
    /// transient `429`/`502` responses up to [`MAX_ATTEMPTS`] times.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorType::Unauthorized`] on a `401`, [`ErrorType::Response`]
    /// carrying the parsed [`ApiError`] on other non-success `4xx`,
    /// [`ErrorType::ServiceUnavailable`] on an unretried `5xx`,
    /// [`ErrorType::RetriesExhausted`] once `429`/`502` retries are used up,
    /// and [`ErrorType::RequestError`]/[`ErrorType::BuildingRequest`] for
    /// transport-level failures.
    pub async fn send(&self, request: &Request, key: LimitKey) -> Result<Response, Error> {
        let trace_id = trace_id();
        let mut attempt = 0;

        loop {
            attempt += 1;

            if let Some(bucket) = self.ratelimiter.lookup(key) {
                bucket.wait().await;

                if bucket.next_will_limit(tokio::time::Instant::now()) {
                    bucket
                        .cooldown(tokio::time::Instant::now())
                        .await
                        .map_err(|source| Error::new(ErrorType::Ratelimiting, Some(Box::new(source))))?;
                }
            }

            #[cfg(feature = "tracing")]
            debug!(trace_id, attempt, path = %request.path, "sending request");

            let response = self.execute_once(request).await?;
            let status = response.status();

            match self.ratelimiter.update(key, response.headers()) {
                Ok(_) => {}
                Err(_source) => {
                    #[cfg(feature = "tracing")]
                    warn!(trace_id, "response carried no usable ratelimit headers");
                }
            }

            if status.is_success() {
                return Ok(response);
            }

            if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::BAD_GATEWAY {
                if attempt < MAX_ATTEMPTS {
                    #[cfg(feature = "tracing")]
                    warn!(trace_id, attempt, %status, "retrying after a transient response");
                    continue;
                }

                return Err(Error::new(
                    ErrorType::RetriesExhausted { attempts: attempt },
                    None,
                ));
            }

            if status == StatusCode::UNAUTHORIZED {
                return Err(Error::new(ErrorType::Unauthorized, None));
            }

            if status.is_client_error() {
                let error: ApiError = response
                    .json()
                    .unwrap_or_else(|_| ApiError { code: 0, message: String::new(), errors: None });

                return Err(Error::new(
                    ErrorType::Response { body: response.bytes().to_vec(), error, status },
                    None,
                ));
            }

            return Err(Error::new(ErrorType::ServiceUnavailable { status }, None));
        }
    }

    async fn execute_once(&self, request: &Request) -> Result<Response, Error> {
        let url = format!("{}{}", builder::API_BASE, request.path);
        let mut builder = self.http.request(request.method.clone(), url);
        builder = builder.headers(self.base_headers(request)?);

        if let Some(body) = request.body.clone() {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|source| Error::new(ErrorType::RequestError, Some(Box::new(source))))?;

        let status = response.status();
        let headers = response.headers().clone();

        let bytes = response
            .bytes()
            .await
            .map_err(|source| Error::new(ErrorType::RequestError, Some(Box::new(source))))?;

        Ok(Response { status, headers, bytes })
    }

    fn base_headers(&self, request: &Request) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();

        if self.token.kind() != ripple_model::TokenKind::Empty {
            let value = HeaderValue::from_str(self.token.authorization())
                .map_err(|source| Error::new(ErrorType::BuildingRequest, Some(Box::new(source))))?;
            headers.insert(AUTHORIZATION, value);
        }

        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

        if let Some(content_type) = request.content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }

        Ok(headers)
    }
}

/// Generate an 8-hex-digit id for correlating a request's log lines.
fn trace_id() -> String {
    let value: u32 = rand::thread_rng().gen();
    format!("{value:08x}")
}

#[cfg(test)]
mod tests {
    use super::Client;
    use static_assertions::assert_impl_all;

    assert_impl_all!(Client: Send, Sync);

    #[test]
    fn building_a_client_with_an_empty_token_succeeds() {
        assert!(Client::new("").is_ok());
    }

    #[test]
    fn builder_rejects_an_invalid_proxy_url() {
        let result = Client::builder("Bot token").proxy("not a url", false).build();
        assert!(result.is_err());
    }
}
