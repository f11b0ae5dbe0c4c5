//! The top-level error type returned by a failed [`crate::Client::send`].

use std::{
    error::Error as StdError,
    fmt::{Display, Formatter, Result as FmtResult},
    result::Result as StdResult,
};

use http::StatusCode;

use crate::api_error::ApiError;

/// Convenience alias for this crate's `Result`.
pub type Result<T, E = Error> = StdResult<T, E>;

/// An error encountered while building, sending, or interpreting a REST
/// request.
#[derive(Debug)]
pub struct Error {
    pub(crate) source: Option<Box<dyn StdError + Send + Sync>>,
    pub(crate) kind: ErrorType,
}

impl Error {
    /// Immutable reference to the type of error that occurred.
    #[must_use]
    pub const fn kind(&self) -> &ErrorType {
        &self.kind
    }

    /// Consume the error, returning the source error if there is any.
    #[must_use]
    pub fn into_source(self) -> Option<Box<dyn StdError + Send + Sync>> {
        self.source
    }

    /// Consume the error, returning the owned error type and the source
    /// error.
    #[must_use]
    pub fn into_parts(self) -> (ErrorType, Option<Box<dyn StdError + Send + Sync>>) {
        (self.kind, self.source)
    }

    pub(crate) fn new(kind: ErrorType, source: Option<Box<dyn StdError + Send + Sync>>) -> Self {
        Self { kind, source }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.kind {
            ErrorType::BuildingRequest => f.write_str("failed to build the request"),
            ErrorType::RequestError => f.write_str("sending the request failed"),
            ErrorType::Json => f.write_str("given value couldn't be serialized"),
            ErrorType::Parsing { body } => {
                write!(f, "response body couldn't be deserialized: {body:?}")
            }
            ErrorType::Ratelimiting => f.write_str("ratelimiter headers update failed"),
            ErrorType::RetriesExhausted { attempts } => {
                write!(f, "giving up after {attempts} attempts")
            }
            ErrorType::Response { status, error, .. } => {
                write!(f, "response error: status code {status}, error: {error}")
            }
            ErrorType::ServiceUnavailable { status } => {
                write!(f, "api may be temporarily unavailable (received {status})")
            }
            ErrorType::Unauthorized => {
                f.write_str("token in use is invalid, expired, or is revoked")
            }
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| &**source as &(dyn StdError + 'static))
    }
}

/// The type of [`Error`] that occurred.
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorType {
    /// Building the outgoing request failed, e.g. an invalid header value.
    BuildingRequest,
    /// The underlying HTTP client failed to send the request or receive a
    /// response.
    RequestError,
    /// A request body failed to serialize to JSON.
    Json,
    /// A response body could not be deserialized into the expected shape.
    Parsing {
        /// Raw response body.
        body: Vec<u8>,
    },
    /// Feeding response headers back into the ratelimiter failed.
    Ratelimiting,
    /// The request was retried the maximum number of times (`429`/`502`)
    /// without succeeding.
    RetriesExhausted {
        /// Number of attempts made, including the first.
        attempts: u8,
    },
    /// A non-success, non-retried response was returned.
    Response {
        /// Raw response body.
        body: Vec<u8>,
        /// Parsed API error, if the body matched the expected error shape.
        error: ApiError,
        /// HTTP status code of the response.
        status: StatusCode,
    },
    /// The API returned a `5xx` other than `502`, signaling a likely
    /// outage.
    ServiceUnavailable {
        /// HTTP status code of the response.
        status: StatusCode,
    },
    /// The token in use has been rejected outright (`401`).
    Unauthorized,
}
