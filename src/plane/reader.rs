//! PlaneReader trait for format-agnostic plane access.
//!
//! The plane service only depends on this trait, so a reader for another
//! container format can be plugged in without touching the service or the
//! cache.
//!
//! # Usage
//!
//! The trait is implemented by format-specific readers:
//! - [`crate::format::OmeXmlReader`] for OME-XML containers

use bytes::Bytes;

use crate::error::OmeXmlError;
use crate::format::{ByteOrder, SeriesMetadata};
use crate::io::RangeReader;

/// Format-agnostic interface for reading planes of a multi-series container.
///
/// Implementations are immutable once opened. Decoding reads through the
/// `RangeReader` passed to each call, so concurrent calls never share a file
/// position.
pub trait PlaneReader: Send + Sync {
    /// Number of series in the container.
    fn series_count(&self) -> usize;

    /// Number of decodable planes of a series.
    fn plane_count(&self, series: usize) -> Result<u32, OmeXmlError>;

    /// Whether multi-byte samples of a series are little-endian.
    fn is_little_endian(&self, series: usize) -> Result<bool, OmeXmlError>;

    /// Dimensions and pixel type of a series.
    fn series_metadata(&self, series: usize) -> Result<SeriesMetadata, OmeXmlError>;

    /// Raw bytes of one decoded plane of a series.
    fn plane_size(&self, series: usize) -> Result<usize, OmeXmlError> {
        Ok(self.series_metadata(series)?.plane_size())
    }

    /// Byte order of a series.
    fn byte_order(&self, series: usize) -> Result<ByteOrder, OmeXmlError> {
        Ok(ByteOrder::from_little_endian(self.is_little_endian(series)?))
    }

    /// Decode one plane into exactly `plane_size` raw pixel bytes.
    ///
    /// # Errors
    /// `InvalidSeriesIndex` / `InvalidPlaneIndex` for out-of-range indices,
    /// `Decode` when the plane's payload cannot be decoded.
    fn decode_plane<R: RangeReader + ?Sized>(
        &self,
        reader: &R,
        series: usize,
        plane: u32,
    ) -> Result<Bytes, OmeXmlError>;
}
