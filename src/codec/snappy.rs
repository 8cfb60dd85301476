//! Snappy codec for legacy compressed GC messages.
//!
//! The coordinator compresses the body of a wrapped message with raw
//! (unframed) Snappy. The declared length in the stream header is checked
//! against a limit before any output buffer is allocated.

use crate::error::{GcError, Result};

/// Default upper bound for decompressed output (16 MB)
pub const DEFAULT_MAX_DECOMPRESSED: usize = 16 * 1024 * 1024;

/// Raw Snappy codec
#[derive(Debug, Clone)]
pub struct SnappyCodec {
    /// Largest decompressed size accepted
    pub max_decompressed: usize,
}

impl Default for SnappyCodec {
    fn default() -> Self {
        Self {
            max_decompressed: DEFAULT_MAX_DECOMPRESSED,
        }
    }
}

impl SnappyCodec {
    /// Create new Snappy codec with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create codec with a custom decompression limit
    pub fn with_limit(max_decompressed: usize) -> Self {
        Self { max_decompressed }
    }

    /// Compress bytes to raw Snappy
    pub fn compress_bytes(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(snap::raw::Encoder::new().compress_vec(data)?)
    }

    /// Decompress raw Snappy bytes
    pub fn decompress_bytes(&self, data: &[u8]) -> Result<Vec<u8>> {
        let declared = snap::raw::decompress_len(data)?;
        if declared > self.max_decompressed {
            return Err(GcError::PayloadTooLarge {
                declared,
                limit: self.max_decompressed,
            });
        }

        Ok(snap::raw::Decoder::new().decompress_vec(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_roundtrip() {
        let codec = SnappyCodec::new();
        let original = b"Hello, Snappy! This is a test of byte compression.";

        let compressed = codec.compress_bytes(original).unwrap();
        let decompressed = codec.decompress_bytes(&compressed).unwrap();

        assert_eq!(decompressed, original);
    }

    #[test]
    fn test_rejects_garbage() {
        let codec = SnappyCodec::new();
        // Declares 127 bytes, then a literal tag running past the end of input
        let result = codec.decompress_bytes(&[0x7f, 0xf0, 0x01]);
        assert!(matches!(result, Err(GcError::Decompression(_))));
    }

    #[test]
    fn test_limit_enforced_before_decompressing() {
        let data = vec![0u8; 4096];
        let compressed = SnappyCodec::new().compress_bytes(&data).unwrap();

        let codec = SnappyCodec::with_limit(1024);
        match codec.decompress_bytes(&compressed) {
            Err(GcError::PayloadTooLarge { declared, limit }) => {
                assert_eq!(declared, 4096);
                assert_eq!(limit, 1024);
            },
            other => panic!("expected PayloadTooLarge, got {other:?}"),
        }
    }
}
