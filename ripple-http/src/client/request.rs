//! The request/response shapes exchanged with [`super::Client::send`].
//!
//! Per-route request-body modeling is explicitly out of scope for this
//! core: a caller builds a [`Request`] naming a method, a path relative to
//! the API base, and an already-serialized body, and gets back a
//! [`Response`] it can deserialize however it likes.

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, ErrorType};

/// An outgoing REST request, independent of any particular Discord route.
#[derive(Debug, Clone)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: Box<str>,
    pub(crate) body: Option<Vec<u8>>,
    pub(crate) content_type: Option<&'static str>,
}

impl Request {
    /// Start a request with no body.
    pub fn new(method: Method, path: impl Into<Box<str>>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            content_type: None,
        }
    }

    /// Attach a JSON-serialized body.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorType::Json`] if `body` fails to serialize.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, Error> {
        let bytes = serde_json::to_vec(body)
            .map_err(|source| Error::new(ErrorType::Json, Some(Box::new(source))))?;

        self.body = Some(bytes);
        self.content_type = Some("application/json");
        Ok(self)
    }
}

/// A successful or unsuccessful-but-parseable REST response.
#[derive(Debug)]
pub struct Response {
    pub(crate) status: StatusCode,
    pub(crate) headers: HeaderMap,
    pub(crate) bytes: Bytes,
}

impl Response {
    /// The HTTP status code of the response.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// The raw response headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The raw response body.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Deserialize the response body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorType::Parsing`] if the body isn't valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_slice(&self.bytes).map_err(|source| {
            Error::new(
                ErrorType::Parsing { body: self.bytes.to_vec() },
                Some(Box::new(source)),
            )
        })
    }
}
