//! Errors returned by [`Shard`](super::Shard) operations.

use std::{
    error::Error,
    fmt::{Display, Formatter, Result as FmtResult},
};

/// An error from a [`Shard`](super::Shard) operation.
#[derive(Debug)]
pub struct ShardError {
    kind: ShardErrorType,
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl ShardError {
    pub(crate) fn new(kind: ShardErrorType, source: Option<Box<dyn Error + Send + Sync>>) -> Self {
        Self { kind, source }
    }

    /// Immutable reference to the type of error that occurred.
    #[must_use = "retrieving the type has no effect if left unused"]
    pub const fn kind(&self) -> &ShardErrorType {
        &self.kind
    }

    /// Consume the error, returning the source error if there is any.
    #[must_use = "consuming the error and retrieving the source has no effect if left unused"]
    pub fn into_source(self) -> Option<Box<dyn Error + Send + Sync>> {
        self.source
    }

    /// Consume the error, returning the owned error type and the source error.
    #[must_use = "consuming the error into its parts has no effect if left unused"]
    pub fn into_parts(self) -> (ShardErrorType, Option<Box<dyn Error + Send + Sync>>) {
        (self.kind, self.source)
    }
}

impl Display for ShardError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.kind {
            ShardErrorType::UnknownCompressor { name } => {
                f.write_str("unknown compressor: ")?;
                f.write_str(name)
            }
            ShardErrorType::UnknownDecoder { name } => {
                f.write_str("unknown decoder: ")?;
                f.write_str(name)
            }
            ShardErrorType::BadTokenType { kind } => {
                write!(f, "cannot identify with a {kind} token, only Bot tokens may")
            }
            ShardErrorType::Connecting => f.write_str("failed to connect to the gateway"),
            ShardErrorType::NeverConnected => {
                f.write_str("the shard has not connected, or has already disconnected")
            }
            ShardErrorType::Sending => f.write_str("failed to send a message over the websocket"),
            ShardErrorType::Serializing => f.write_str("failed to serialize the outgoing payload"),
        }
    }
}

impl Error for ShardError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| &**source as &(dyn Error + 'static))
    }
}

/// The type of [`ShardError`] that occurred.
#[derive(Debug)]
#[non_exhaustive]
pub enum ShardErrorType {
    /// The connection URI's `compress` query parameter named a strategy
    /// this crate doesn't implement.
    UnknownCompressor {
        /// The unrecognized name.
        name: String,
    },
    /// The connection URI's `encoding` query parameter named a strategy
    /// this crate doesn't implement.
    UnknownDecoder {
        /// The unrecognized name.
        name: String,
    },
    /// An `Identify` was attempted with a non-`Bot` token.
    BadTokenType {
        /// The token kind that was rejected.
        kind: ripple_model::token::TokenKind,
    },
    /// Opening the WebSocket connection failed.
    Connecting,
    /// An operation that requires an open connection was attempted before
    /// `connect` was called, or after the session has ended.
    NeverConnected,
    /// Writing a message to the WebSocket connection failed.
    Sending,
    /// The outgoing payload could not be serialized to JSON.
    Serializing,
}
