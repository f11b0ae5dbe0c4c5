//! Persistent-stream zlib inflation (`compress=zlib-stream`).
//!
//! # Resizing buffers
//!
//! Buffers are resized after some heuristics:
//!
//! - if the data does not fit, the buffer size is doubled; or
//! - at most once per minute the buffer will be resized down to the size of
//!   the most recently received message. This is especially useful since
//!   Discord generally sends the largest messages on startup.

use super::{CompressionError, CompressionErrorType, Compressor};
use flate2::{Decompress, FlushDecompress};
use std::time::Instant;

/// The 4-byte suffix marking the end of a message on a zlib-stream
/// connection, per Discord's documented transport-compression framing.
const ZLIB_SUFFIX: [u8; 4] = [0x00, 0x00, 0xff, 0xff];

/// Initial buffer size of 32 KiB, used for both the compressed-input buffer
/// and the inflated-output buffer.
const INITIAL_BUFFER_SIZE: usize = 32 * 1024;

/// A single zlib stream spanning the whole connection.
///
/// Created lazily by [`super::from_name`] and reused across every message
/// of the connection — the decompressor's internal dictionary state
/// carries across frames, which is load-bearing for Discord's use of
/// stream-wide compression.
#[derive(Debug)]
pub struct ZlibStream {
    decompress: Decompress,
    compressed: Vec<u8>,
    internal_buffer: Vec<u8>,
    output: Vec<u8>,
    last_resize: Instant,
}

impl ZlibStream {
    /// Create a new, empty stream inflater.
    #[must_use]
    pub fn new() -> Self {
        Self {
            decompress: Decompress::new(true),
            compressed: Vec::new(),
            internal_buffer: Vec::with_capacity(INITIAL_BUFFER_SIZE),
            output: Vec::with_capacity(INITIAL_BUFFER_SIZE),
            last_resize: Instant::now(),
        }
    }

    fn shrink(&mut self) {
        if self.last_resize.elapsed().as_secs() < 60 {
            return;
        }

        self.compressed.shrink_to_fit();
        self.output.shrink_to_fit();
        self.last_resize = Instant::now();
    }
}

impl Default for ZlibStream {
    fn default() -> Self {
        Self::new()
    }
}

impl Compressor for ZlibStream {
    fn read(&mut self, bytes: &[u8]) -> Result<Option<Vec<u8>>, CompressionError> {
        self.compressed.extend_from_slice(bytes);

        let length = self.compressed.len();

        if length < 4 || self.compressed[(length - 4)..] != ZLIB_SUFFIX {
            return Ok(None);
        }

        self.output.clear();

        let before = self.decompress.total_in();
        let mut offset = 0;

        loop {
            self.internal_buffer.clear();

            self.decompress
                .decompress_vec(
                    &self.compressed[offset..],
                    &mut self.internal_buffer,
                    FlushDecompress::Sync,
                )
                .map_err(|source| CompressionError {
                    kind: CompressionErrorType::Decompressing,
                    source: Some(Box::new(source)),
                })?;

            offset = (self.decompress.total_in() - before)
                .try_into()
                .unwrap_or_default();
            self.output.extend_from_slice(&self.internal_buffer);

            let not_at_capacity = self.internal_buffer.len() < self.internal_buffer.capacity();

            if not_at_capacity || offset > self.compressed.len() {
                break;
            }
        }

        self.compressed.clear();
        self.shrink();

        Ok(Some(std::mem::take(&mut self.output)))
    }
}
