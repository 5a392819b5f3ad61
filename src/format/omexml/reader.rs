//! OME-XML container reader.
//!
//! Opening a container runs the whole index once:
//!
//! 1. Locate every `BigEndian` declaration (one per series)
//! 2. Bound each series region by the next `<Image ` tag
//! 3. Ask the metadata provider for the series dimensions
//! 4. Index the series' data elements and sniff its compression
//!
//! The resulting reader is immutable. Planes are decoded lazily through a
//! caller-supplied [`RangeReader`], so one reader can serve concurrent decode
//! calls.

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::decode::{self, CodecSupport};
use super::endian::{locate_series, EndianDeclaration};
use super::indexer::{sniff_compression, IndexPass, PlaneIndexer, PlaneOffsetTable};
use super::markers::IMAGE_START;
use super::metadata::{ByteOrder, Compression, MetadataProvider, SeriesMetadata};
use crate::error::OmeXmlError;
use crate::io::{ByteScanner, RangeReader, DEFAULT_WINDOW_SIZE};
use crate::plane::PlaneReader;

// =============================================================================
// Options
// =============================================================================

/// Settings fixed when a container is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Scan window in bytes
    pub window_size: usize,

    /// Codecs available for decoding
    pub codecs: CodecSupport,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            codecs: CodecSupport::detect(),
        }
    }
}

// =============================================================================
// Series
// =============================================================================

/// One indexed series of a container.
#[derive(Debug, Clone)]
pub struct Series {
    index: usize,
    byte_order: ByteOrder,
    metadata: SeriesMetadata,
    compression: Compression,
    anchor: u64,
    offsets: PlaneOffsetTable,
}

impl Series {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn is_little_endian(&self) -> bool {
        self.byte_order.is_little_endian()
    }

    pub fn metadata(&self) -> &SeriesMetadata {
        &self.metadata
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Offset of the series' endianness declaration.
    pub fn anchor(&self) -> u64 {
        self.anchor
    }

    pub fn offsets(&self) -> &PlaneOffsetTable {
        &self.offsets
    }

    /// Planes actually located; may be below the declared count.
    pub fn plane_count(&self) -> u32 {
        self.offsets.len() as u32
    }

    /// Raw bytes of one decoded plane.
    pub fn plane_size(&self) -> usize {
        self.metadata.plane_size()
    }

    /// Serializable overview of the series.
    pub fn summary(&self) -> SeriesSummary {
        SeriesSummary {
            index: self.index,
            byte_order: self.byte_order,
            size_x: self.metadata.size_x,
            size_y: self.metadata.size_y,
            size_z: self.metadata.size_z,
            size_c: self.metadata.size_c,
            size_t: self.metadata.size_t,
            pixel_type: self.metadata.pixel_type.name(),
            dimension_order: self.metadata.dimension_order.to_string(),
            compression: self.compression.name(),
            declared_planes: self.offsets.declared(),
            discovered_planes: self.plane_count(),
            index_pass: self.offsets.pass(),
        }
    }
}

/// Overview of one series, as printed by `info`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub index: usize,
    pub byte_order: ByteOrder,
    pub size_x: u32,
    pub size_y: u32,
    pub size_z: u32,
    pub size_c: u32,
    pub size_t: u32,
    pub pixel_type: &'static str,
    pub dimension_order: String,
    pub compression: &'static str,
    pub declared_planes: u32,
    pub discovered_planes: u32,
    pub index_pass: IndexPass,
}

// =============================================================================
// Reader
// =============================================================================

/// Indexed OME-XML container.
#[derive(Debug, Clone)]
pub struct OmeXmlReader {
    series: Vec<Series>,
    codecs: CodecSupport,
}

impl OmeXmlReader {
    /// Index a container.
    ///
    /// # Errors
    /// `MalformedContainer` when declarations, separators or data elements
    /// are missing, `Metadata` when the provider cannot describe a series.
    /// No partially indexed reader is ever returned.
    pub fn open<R, M>(
        reader: &R,
        metadata: &M,
        options: &ReaderOptions,
    ) -> Result<Self, OmeXmlError>
    where
        R: RangeReader + ?Sized,
        M: MetadataProvider + ?Sized,
    {
        let declarations = locate_series(reader, options.window_size)?;
        info!(
            source = reader.identifier(),
            series = declarations.len(),
            "located series declarations"
        );

        if metadata.series_count() != declarations.len() {
            warn!(
                declared = declarations.len(),
                described = metadata.series_count(),
                "metadata provider and container disagree on series count"
            );
        }

        let regions = series_regions(reader, options.window_size, &declarations)?;

        let mut series = Vec::with_capacity(declarations.len());
        for (index, (declaration, region_end)) in declarations.iter().zip(regions).enumerate() {
            let pixels = metadata.pixels(index).ok_or_else(|| OmeXmlError::Metadata {
                series: index,
                reason: "no pixel description available".to_string(),
            })?;
            let series_metadata = SeriesMetadata::from_pixels(index, &pixels)?;

            let offsets = PlaneIndexer::new(
                reader,
                options.window_size,
                index,
                declaration.offset,
                region_end,
                series_metadata.plane_count(),
                series_metadata.plane_size(),
            )
            .run()?;

            let first = offsets.get(0).ok_or_else(|| {
                OmeXmlError::malformed(format!("series {} has no data element", index))
            })?;
            let compression = sniff_compression(reader, first)?;

            info!(
                series = index,
                planes = offsets.len(),
                declared = offsets.declared(),
                compression = %compression,
                little_endian = declaration.little_endian,
                "indexed series"
            );

            series.push(Series {
                index,
                byte_order: ByteOrder::from_little_endian(declaration.little_endian),
                metadata: series_metadata,
                compression,
                anchor: declaration.offset,
                offsets,
            });
        }

        Ok(OmeXmlReader {
            series,
            codecs: options.codecs,
        })
    }

    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    /// Get an indexed series.
    pub fn series(&self, series: usize) -> Result<&Series, OmeXmlError> {
        self.series.get(series).ok_or(OmeXmlError::InvalidSeriesIndex {
            series,
            count: self.series.len(),
        })
    }

    /// Iterate over all series in file order.
    pub fn all_series(&self) -> impl Iterator<Item = &Series> {
        self.series.iter()
    }

    pub fn plane_count(&self, series: usize) -> Result<u32, OmeXmlError> {
        Ok(self.series(series)?.plane_count())
    }

    pub fn is_little_endian(&self, series: usize) -> Result<bool, OmeXmlError> {
        Ok(self.series(series)?.is_little_endian())
    }

    pub fn plane_offsets(&self, series: usize) -> Result<&PlaneOffsetTable, OmeXmlError> {
        Ok(self.series(series)?.offsets())
    }

    pub fn codecs(&self) -> CodecSupport {
        self.codecs
    }

    /// Read a plane's raw slice: its data element up to the next one, or up
    /// to the series region end for the last plane.
    pub fn read_raw_plane<R: RangeReader + ?Sized>(
        &self,
        reader: &R,
        series: usize,
        plane: u32,
    ) -> Result<Bytes, OmeXmlError> {
        let s = self.series(series)?;
        let (start, end) = s
            .offsets
            .slice_bounds(plane as usize)
            .ok_or(OmeXmlError::InvalidPlaneIndex {
                series,
                plane,
                count: s.plane_count(),
            })?;

        let len = usize::try_from(end - start).map_err(|_| {
            OmeXmlError::malformed(format!(
                "plane {} of series {} spans {} bytes",
                plane,
                series,
                end - start
            ))
        })?;
        Ok(reader.read_exact_at(start, len)?)
    }

    /// Decode a plane into exactly `plane_size` raw pixel bytes.
    ///
    /// A decode failure is reported for this plane only.
    pub fn decode_plane<R: RangeReader + ?Sized>(
        &self,
        reader: &R,
        series: usize,
        plane: u32,
    ) -> Result<Bytes, OmeXmlError> {
        let s = self.series(series)?;
        let raw = self.read_raw_plane(reader, series, plane)?;

        decode::decode_plane(&raw, s.compression, s.plane_size(), &self.codecs).map_err(|source| {
            OmeXmlError::Decode {
                series,
                plane,
                source,
            }
        })
    }
}

impl PlaneReader for OmeXmlReader {
    fn series_count(&self) -> usize {
        self.series.len()
    }

    fn plane_count(&self, series: usize) -> Result<u32, OmeXmlError> {
        OmeXmlReader::plane_count(self, series)
    }

    fn is_little_endian(&self, series: usize) -> Result<bool, OmeXmlError> {
        OmeXmlReader::is_little_endian(self, series)
    }

    fn series_metadata(&self, series: usize) -> Result<SeriesMetadata, OmeXmlError> {
        Ok(*self.series(series)?.metadata())
    }

    fn decode_plane<R: RangeReader + ?Sized>(
        &self,
        reader: &R,
        series: usize,
        plane: u32,
    ) -> Result<Bytes, OmeXmlError> {
        OmeXmlReader::decode_plane(self, reader, series, plane)
    }
}

/// Exclusive end of each series region.
///
/// A region ends at the first `<Image ` tag after its anchor, or at the end
/// of the source. Every series after the first must be preceded by such a
/// tag, otherwise two series' data elements would be indistinguishable.
fn series_regions<R: RangeReader + ?Sized>(
    reader: &R,
    window_size: usize,
    declarations: &[EndianDeclaration],
) -> Result<Vec<u64>, OmeXmlError> {
    let mut scanner = ByteScanner::new(reader).with_window_size(window_size);
    let mut regions = Vec::with_capacity(declarations.len());

    for (index, declaration) in declarations.iter().enumerate() {
        if let Some(&previous_end) = regions.last() {
            if previous_end > declaration.offset {
                return Err(OmeXmlError::malformed(format!(
                    "no image separator between series {} and series {}",
                    index - 1,
                    index
                )));
            }
        }

        scanner.seek(declaration.offset);
        let end = scanner.find(&IMAGE_START)?.unwrap_or_else(|| reader.size());
        debug!(series = index, start = declaration.offset, end, "series region");
        regions.push(end);
    }

    Ok(regions)
}

// =============================================================================
// Tests
// =============================================================================
