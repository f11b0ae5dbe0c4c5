//! Pluggable payload-decoding strategies.
//!
//! A single implementation, `"json"`, is provided today; the [`Decoder`]
//! trait is kept small so a future `etf` or `simd-json` decoder can be added
//! without touching [`Shard`](crate::shard::Shard).

use ripple_model::gateway::Packet;
use std::{
    error::Error,
    fmt::{Display, Formatter, Result as FmtResult},
};

/// A pluggable payload-decoding strategy.
pub trait Decoder: std::fmt::Debug + Send {
    /// Decode a complete message's bytes into a [`Packet`].
    ///
    /// # Errors
    ///
    /// Returns [`DecodingError`] if `bytes` is not a well-formed envelope
    /// for this decoder.
    fn decode(&self, bytes: &[u8]) -> Result<Packet, DecodingError>;
}

/// The JSON decoder: parses the `{op, s, d, t}` envelope via `serde_json`.
#[derive(Debug, Default)]
pub struct JsonDecoder;

impl JsonDecoder {
    /// Create a new JSON decoder.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Decoder for JsonDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Packet, DecodingError> {
        serde_json::from_slice(bytes).map_err(|source| {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                "invalid json payload: {}",
                String::from_utf8_lossy(bytes)
            );

            DecodingError {
                kind: DecodingErrorType::Deserializing,
                source: Some(Box::new(source)),
            }
        })
    }
}

/// Select a [`Decoder`] by the name used in the gateway connection URI's
/// `encoding` query parameter.
///
/// # Errors
///
/// Returns [`DecodingErrorType::UnknownDecoder`] for any name other than
/// `"json"`.
pub fn from_name(name: &str) -> Result<Box<dyn Decoder>, DecodingError> {
    match name {
        "json" => Ok(Box::new(JsonDecoder::new())),
        other => Err(DecodingError {
            kind: DecodingErrorType::UnknownDecoder {
                name: other.to_owned(),
            },
            source: None,
        }),
    }
}

/// An error decoding a gateway payload, or selecting a decoder by name.
#[derive(Debug)]
pub struct DecodingError {
    kind: DecodingErrorType,
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl DecodingError {
    /// Immutable reference to the type of error that occurred.
    #[must_use = "retrieving the type has no effect if left unused"]
    pub const fn kind(&self) -> &DecodingErrorType {
        &self.kind
    }

    /// Consume the error, returning the source error if there is any.
    #[must_use = "consuming the error and retrieving the source has no effect if left unused"]
    pub fn into_source(self) -> Option<Box<dyn Error + Send + Sync>> {
        self.source
    }

    /// Consume the error, returning the owned error type and the source error.
    #[must_use = "consuming the error into its parts has no effect if left unused"]
    pub fn into_parts(self) -> (DecodingErrorType, Option<Box<dyn Error + Send + Sync>>) {
        (self.kind, self.source)
    }
}

impl Display for DecodingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.kind {
            DecodingErrorType::Deserializing => f.write_str("payload failed to deserialize"),
            DecodingErrorType::UnknownDecoder { name } => {
                f.write_str("unknown decoder: ")?;
                f.write_str(name)
            }
        }
    }
}

impl Error for DecodingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| &**source as &(dyn Error + 'static))
    }
}

/// The type of [`DecodingError`] that occurred.
#[derive(Debug)]
#[non_exhaustive]
pub enum DecodingErrorType {
    /// The payload was not a well-formed envelope for this decoder.
    Deserializing,
    /// The `encoding` query parameter named a strategy this crate doesn't
    /// implement.
    UnknownDecoder {
        /// The unrecognized name.
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::{from_name, Decoder, JsonDecoder};

    #[test]
    fn decodes_a_well_formed_envelope() {
        let decoder = JsonDecoder::new();
        let packet = decoder
            .decode(br#"{"op":0,"s":1,"d":{"foo":"bar"},"t":"event type"}"#)
            .unwrap();

        assert_eq!(ripple_model::gateway::OpCode::Dispatch, packet.op);
    }

    #[test]
    fn unknown_decoder_name_errors() {
        assert!(from_name("etf").is_err());
    }

    #[test]
    fn known_decoder_name_succeeds() {
        assert!(from_name("json").is_ok());
    }
}
