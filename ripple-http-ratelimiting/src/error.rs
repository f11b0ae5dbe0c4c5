//! Error types returned by bucket waiting and header-driven updates.

use std::{
    error::Error,
    fmt::{Display, Formatter, Result as FmtResult},
};

/// An error occurred while waiting on or cooling down a [`Bucket`](crate::Bucket).
#[derive(Debug)]
pub struct BucketError {
    pub(crate) kind: BucketErrorType,
}

impl BucketError {
    /// The type of error that occurred.
    #[must_use]
    pub const fn kind(&self) -> &BucketErrorType {
        &self.kind
    }

    /// Consume this error, returning its source error, if any.
    #[must_use]
    pub fn into_source(self) -> Option<Box<dyn Error + Send + Sync>> {
        None
    }

    /// Consume this error, returning its kind and source error.
    #[must_use]
    pub fn into_parts(self) -> (BucketErrorType, Option<Box<dyn Error + Send + Sync>>) {
        (self.kind, None)
    }
}

impl Display for BucketError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.kind {
            BucketErrorType::ClockSkew { reset_time_nanos_ago } => write!(
                f,
                "bucket reset time is {reset_time_nanos_ago} nanoseconds in the past"
            ),
        }
    }
}

impl Error for BucketError {}

impl From<BucketErrorType> for BucketError {
    fn from(kind: BucketErrorType) -> Self {
        Self { kind }
    }
}

/// The type of [`BucketError`] that occurred.
#[derive(Debug)]
#[non_exhaustive]
pub enum BucketErrorType {
    /// The requested reset time has already elapsed relative to the clock
    /// used to schedule the cooldown.
    ClockSkew {
        /// How far in the past the reset time was, in nanoseconds.
        reset_time_nanos_ago: u128,
    },
}

/// An error occurred while applying response headers to the rate-limit
/// table.
#[derive(Debug)]
pub struct UpdateError {
    pub(crate) kind: UpdateErrorType,
    pub(crate) source: Option<Box<dyn Error + Send + Sync>>,
}

impl UpdateError {
    /// The type of error that occurred.
    #[must_use]
    pub const fn kind(&self) -> &UpdateErrorType {
        &self.kind
    }

    /// Consume this error, returning its source error, if any.
    #[must_use]
    pub fn into_source(self) -> Option<Box<dyn Error + Send + Sync>> {
        self.source
    }

    /// Consume this error, returning its kind and source error.
    #[must_use]
    pub fn into_parts(self) -> (UpdateErrorType, Option<Box<dyn Error + Send + Sync>>) {
        (self.kind, self.source)
    }
}

impl Display for UpdateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.kind {
            UpdateErrorType::HeadersIncomplete { missing } => {
                write!(f, "response headers are missing required field `{missing}`")
            }
            UpdateErrorType::Parsing { name, value } => {
                write!(f, "header `{name}` has an unparsable value `{value}`")
            }
        }
    }
}

impl Error for UpdateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| &**source as &(dyn Error + 'static))
    }
}

/// The type of [`UpdateError`] that occurred.
#[derive(Debug)]
#[non_exhaustive]
pub enum UpdateErrorType {
    /// The headers present were not sufficient to compute a cooldown: no
    /// combination of `Retry-After`/`Date` or `X-RateLimit-Reset` was
    /// present alongside `X-RateLimit-Remaining`.
    HeadersIncomplete {
        /// Name of a header that would have resolved the ambiguity.
        missing: &'static str,
    },
    /// A header was present but its value didn't parse into the expected
    /// type.
    Parsing {
        /// Name of the header.
        name: &'static str,
        /// Raw value of the header.
        value: Box<str>,
    },
}
