//! Zstandard compression codec.

use std::io::Read;

use crate::codec::PayloadCodec;
use crate::error::{CodecError, Result};
use crate::payload::{Payload, METADATA_ENCODING};
use crate::wire;

/// `encoding` metadata value for compressed payloads.
pub const ZSTD_ENCODING: &[u8] = b"binary/zstd";

/// Compresses each payload, metadata included, with zstd.
///
/// Decoding only touches payloads marked `binary/zstd`; anything else is
/// passed through unchanged. Decompressed output is capped at
/// `max_decoded_bytes` per payload.
#[derive(Debug, Clone, Copy)]
pub struct ZstdCodec {
    level: i32,
    max_decoded_bytes: usize,
}

impl ZstdCodec {
    /// Compression level used by [`ZstdCodec::new`].
    pub const DEFAULT_LEVEL: i32 = 3;

    /// Per-payload decompression limit used by [`ZstdCodec::new`].
    pub const DEFAULT_MAX_DECODED_BYTES: usize = 16 * 1024 * 1024; // 16 MiB

    /// Create a codec with the default level.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_level(Self::DEFAULT_LEVEL)
    }

    /// Create a codec with an explicit zstd level.
    #[must_use]
    pub const fn with_level(level: i32) -> Self {
        Self {
            level,
            max_decoded_bytes: Self::DEFAULT_MAX_DECODED_BYTES,
        }
    }

    /// Set the largest decompressed size accepted for a single payload.
    #[must_use]
    pub const fn with_max_decoded_bytes(mut self, max_decoded_bytes: usize) -> Self {
        self.max_decoded_bytes = max_decoded_bytes;
        self
    }

    /// Largest decompressed size accepted for a single payload.
    #[must_use]
    pub const fn max_decoded_bytes(&self) -> usize {
        self.max_decoded_bytes
    }

    fn compress(&self, payload: &Payload) -> Result<Payload> {
        let raw = wire::to_bytes(payload)?;
        let compressed = zstd::encode_all(raw.as_slice(), self.level)
            .map_err(|e| CodecError::Compression(e.to_string()))?;
        Ok(Payload::new(compressed).with_metadata(METADATA_ENCODING, ZSTD_ENCODING))
    }

    fn decompress(&self, payload: &Payload) -> Result<Payload> {
        if payload.encoding() != Some(ZSTD_ENCODING) {
            return Ok(payload.clone());
        }

        let decoder = zstd::stream::read::Decoder::new(payload.data())
            .map_err(|e| CodecError::Decompression(e.to_string()))?;

        // One byte past the limit is enough to detect an oversized frame.
        let limit = u64::try_from(self.max_decoded_bytes)
            .unwrap_or(u64::MAX)
            .saturating_add(1);
        let mut raw = Vec::new();
        decoder
            .take(limit)
            .read_to_end(&mut raw)
            .map_err(|e| CodecError::Decompression(e.to_string()))?;

        if raw.len() > self.max_decoded_bytes {
            return Err(CodecError::Decompression(format!(
                "decompressed payload exceeds {} bytes",
                self.max_decoded_bytes
            )));
        }

        wire::from_bytes(&raw)
    }
}

impl Default for ZstdCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl PayloadCodec for ZstdCodec {
    fn name(&self) -> &str {
        "zstd"
    }

    fn encode(&self, payloads: &[Payload]) -> Result<Vec<Payload>> {
        payloads.iter().map(|p| self.compress(p)).collect()
    }

    fn decode(&self, payloads: &[Payload]) -> Result<Vec<Payload>> {
        payloads.iter().map(|p| self.decompress(p)).collect()
    }
}
