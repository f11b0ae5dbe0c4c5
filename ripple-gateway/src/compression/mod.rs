//! Pluggable payload-inflation strategies for gateway binary frames.
//!
//! Two strategies are selectable by name at [`Shard::connect`]:
//!
//! - `"zlib"`: each binary frame is an independent zlib stream, inflated
//!   fully and reset between messages.
//! - `"zlib-stream"`: a single zlib stream spans the whole connection, with
//!   message boundaries marked by Discord's `00 00 FF FF` suffix.
//!
//! [`Shard::connect`]: crate::shard::Shard::connect

mod stream;

pub use self::stream::ZlibStream;

use std::{
    error::Error,
    fmt::{Display, Formatter, Result as FmtResult},
};

/// A pluggable payload-inflation strategy.
///
/// Implementations are **not** shareable across connections; each
/// [`Shard`](crate::shard::Shard) owns exactly one.
pub trait Compressor: std::fmt::Debug + Send {
    /// Feed `bytes` to the compressor and return the next complete inflated
    /// message, if one is now available.
    ///
    /// Returns `Ok(None)` when more bytes are needed to complete a message.
    fn read(&mut self, bytes: &[u8]) -> Result<Option<Vec<u8>>, CompressionError>;
}

/// Per-message zlib: every binary frame is an independent, complete zlib
/// stream.
#[derive(Debug, Default)]
pub struct Zlib {
    buffer: Vec<u8>,
}

impl Zlib {
    /// Create a fresh per-message inflater.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Compressor for Zlib {
    fn read(&mut self, bytes: &[u8]) -> Result<Option<Vec<u8>>, CompressionError> {
        use flate2::read::ZlibDecoder;
        use std::io::Read;

        self.buffer.clear();

        let mut decoder = ZlibDecoder::new(bytes);
        decoder
            .read_to_end(&mut self.buffer)
            .map_err(|source| CompressionError {
                kind: CompressionErrorType::Decompressing,
                source: Some(Box::new(source)),
            })?;

        // Clearing the buffer between calls (rather than only truncating on
        // reuse) is what keeps this bounded across a long connection; the
        // reference implementation this was distilled from reuses it across
        // frames without clearing and grows without bound.
        Ok(Some(std::mem::take(&mut self.buffer)))
    }
}

/// Select a [`Compressor`] by the name used in the gateway connection URI's
/// `compress` query parameter.
///
/// # Errors
///
/// Returns [`CompressionErrorType::UnknownCompressor`] for any name other
/// than `"zlib"` or `"zlib-stream"`.
pub fn from_name(name: &str) -> Result<Box<dyn Compressor>, CompressionError> {
    match name {
        "zlib" => Ok(Box::new(Zlib::new())),
        "zlib-stream" => Ok(Box::new(ZlibStream::new())),
        other => Err(CompressionError {
            kind: CompressionErrorType::UnknownCompressor {
                name: other.to_owned(),
            },
            source: None,
        }),
    }
}

/// An error inflating or selecting a gateway compressor.
#[derive(Debug)]
pub struct CompressionError {
    kind: CompressionErrorType,
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl CompressionError {
    /// Immutable reference to the type of error that occurred.
    #[must_use = "retrieving the type has no effect if left unused"]
    pub const fn kind(&self) -> &CompressionErrorType {
        &self.kind
    }

    /// Consume the error, returning the source error if there is any.
    #[must_use = "consuming the error and retrieving the source has no effect if left unused"]
    pub fn into_source(self) -> Option<Box<dyn Error + Send + Sync>> {
        self.source
    }

    /// Consume the error, returning the owned error type and the source error.
    #[must_use = "consuming the error into its parts has no effect if left unused"]
    pub fn into_parts(self) -> (CompressionErrorType, Option<Box<dyn Error + Send + Sync>>) {
        (self.kind, self.source)
    }
}

impl Display for CompressionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.kind {
            CompressionErrorType::Decompressing => f.write_str("message could not be decompressed"),
            CompressionErrorType::UnknownCompressor { name } => {
                f.write_str("unknown compressor: ")?;
                f.write_str(name)
            }
        }
    }
}

impl Error for CompressionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| &**source as &(dyn Error + 'static))
    }
}

/// The type of [`CompressionError`] that occurred.
#[derive(Debug)]
#[non_exhaustive]
pub enum CompressionErrorType {
    /// Decompressing a message failed.
    Decompressing,
    /// The `compress` query parameter named a strategy this crate doesn't
    /// implement.
    UnknownCompressor {
        /// The unrecognized name.
        name: String,
    },
}
