//! Plane decode pipeline.
//!
//! A plane's raw slice runs from its data element's `<` up to the next data
//! element (or the end of its series region). Decoding:
//!
//! 1. Isolate the payload between the end of the opening tag (`>`) and the
//!    start of the closing tag (`<`)
//! 2. Base64-decode it (line breaks and indentation are ignored)
//! 3. Undo the series compression, yielding exactly
//!    `sizeX * sizeY * bytesPerPixel` bytes
//!
//! The pipeline never seeks; the caller hands it the bounded slice.

use std::io::{ErrorKind, Read};

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use bytes::Bytes;
use flate2::read::ZlibDecoder;

use super::metadata::Compression;
use crate::error::DecodeError;

/// Standard alphabet, padding optional.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Stream signature preceding every bzip2 payload.
const BZIP2_SIGNATURE: &[u8] = b"BZ";

// =============================================================================
// Codec capability
// =============================================================================

/// Which payload codecs this build can decode.
///
/// Determined once at startup and handed to the reader, so a missing codec
/// surfaces as a per-plane error instead of disabling the whole reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecSupport {
    pub zlib: bool,
    pub bzip2: bool,
}

impl CodecSupport {
    /// Codecs compiled into this build.
    pub const fn detect() -> Self {
        Self {
            zlib: true,
            bzip2: cfg!(feature = "bzip2"),
        }
    }

    pub fn supports(&self, compression: Compression) -> bool {
        match compression {
            Compression::None => true,
            Compression::Zlib => self.zlib,
            Compression::Bzip2 => self.bzip2,
        }
    }
}

impl Default for CodecSupport {
    fn default() -> Self {
        Self::detect()
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Decode one plane's raw slice into `expected` raw pixel bytes.
///
/// # Errors
/// Any base64 or codec failure, an unsupported codec, or a byte count other
/// than `expected` after decoding.
pub fn decode_plane(
    raw: &[u8],
    compression: Compression,
    expected: usize,
    codecs: &CodecSupport,
) -> Result<Bytes, DecodeError> {
    if !codecs.supports(compression) {
        return Err(DecodeError::UnsupportedCompression(compression.name()));
    }

    let payload = extract_payload(raw)?;
    let decoded = decode_base64(payload)?;

    let pixels = match compression {
        Compression::None => {
            if decoded.len() != expected {
                return Err(DecodeError::SizeMismatch {
                    expected,
                    actual: decoded.len(),
                });
            }
            decoded
        }
        Compression::Zlib => inflate_zlib(&decoded, expected)?,
        Compression::Bzip2 => decompress_bzip2(&decoded, expected)?,
    };

    Ok(Bytes::from(pixels))
}

/// Text between the end of the opening tag and the start of the closing tag.
pub fn extract_payload(raw: &[u8]) -> Result<&[u8], DecodeError> {
    let start = memchr::memchr(b'>', raw).ok_or(DecodeError::MissingPayload)? + 1;
    let rest = &raw[start..];
    let end = memchr::memchr(b'<', rest).unwrap_or(rest.len());
    Ok(&rest[..end])
}

/// Base64-decode a payload, skipping ASCII whitespace.
pub fn decode_base64(payload: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let compact: Vec<u8> = payload
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    PAYLOAD_ENGINE
        .decode(&compact)
        .map_err(|e| DecodeError::Base64(e.to_string()))
}

/// Inflate a zlib stream into exactly `expected` bytes.
fn inflate_zlib(data: &[u8], expected: usize) -> Result<Vec<u8>, DecodeError> {
    let decoder = ZlibDecoder::new(data);
    fill_exact(decoder, expected, |e| DecodeError::Inflate(e.to_string()))
}

/// Decompress a bzip2 stream into exactly `expected` bytes.
///
/// The 2-byte `BZ` stream signature is checked before the block header is
/// handed to the decoder.
#[cfg(feature = "bzip2")]
fn decompress_bzip2(data: &[u8], expected: usize) -> Result<Vec<u8>, DecodeError> {
    use bzip2::read::BzDecoder;

    if !data.starts_with(BZIP2_SIGNATURE) {
        return Err(DecodeError::InvalidBzip2Header);
    }
    fill_exact(BzDecoder::new(data), expected, |e| {
        DecodeError::Bzip2(e.to_string())
    })
}

#[cfg(not(feature = "bzip2"))]
fn decompress_bzip2(data: &[u8], _expected: usize) -> Result<Vec<u8>, DecodeError> {
    if !data.starts_with(BZIP2_SIGNATURE) {
        return Err(DecodeError::InvalidBzip2Header);
    }
    Err(DecodeError::UnsupportedCompression(Compression::Bzip2.name()))
}

/// Read from `reader` until `expected` bytes are filled.
///
/// Trailing output beyond `expected` is ignored; a stream that ends early is
/// a size mismatch.
fn fill_exact<Rd, F>(mut reader: Rd, expected: usize, map_err: F) -> Result<Vec<u8>, DecodeError>
where
    Rd: Read,
    F: Fn(std::io::Error) -> DecodeError,
{
    let mut out = vec![0u8; expected];
    let mut filled = 0;

    while filled < expected {
        match reader.read(&mut out[filled..]) {
            Ok(0) => {
                return Err(DecodeError::SizeMismatch {
                    expected,
                    actual: filled,
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(map_err(e)),
        }
    }

    Ok(out)
}

// =============================================================================
// Tests
// =============================================================================
