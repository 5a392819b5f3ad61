//! Series metadata model.
//!
//! The markup describing each series (dimensions, pixel type, dimension
//! order) is extracted by a [`MetadataProvider`]. The indexer and decoder
//! only consume the typed [`SeriesMetadata`] built from it.

use std::fmt;

use serde::Serialize;

use crate::error::OmeXmlError;
use crate::io::{read_u16_be, read_u16_le, read_u32_be, read_u32_le};

// =============================================================================
// ByteOrder
// =============================================================================

/// Byte order of multi-byte samples in a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

impl ByteOrder {
    pub fn from_little_endian(little_endian: bool) -> Self {
        if little_endian {
            ByteOrder::LittleEndian
        } else {
            ByteOrder::BigEndian
        }
    }

    pub fn is_little_endian(self) -> bool {
        self == ByteOrder::LittleEndian
    }

    /// Read a u16 from a byte slice using this byte order.
    #[inline]
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        match self {
            ByteOrder::LittleEndian => read_u16_le(bytes),
            ByteOrder::BigEndian => read_u16_be(bytes),
        }
    }

    /// Read a u32 from a byte slice using this byte order.
    #[inline]
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        match self {
            ByteOrder::LittleEndian => read_u32_le(bytes),
            ByteOrder::BigEndian => read_u32_be(bytes),
        }
    }
}

// =============================================================================
// PixelType
// =============================================================================

/// Sample type of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PixelType {
    Uint8,
    Uint16,
    Uint32,
    Float,
}

impl PixelType {
    /// Map a textual pixel type to a sample type.
    ///
    /// Names ending in `16` are 16-bit, names ending in `32` are 32-bit,
    /// `float` is 32-bit floating point, and everything else is 8-bit.
    pub fn from_name(name: &str) -> Self {
        let name = name.trim().to_ascii_lowercase();
        if name.ends_with("16") {
            PixelType::Uint16
        } else if name.ends_with("32") {
            PixelType::Uint32
        } else if name == "float" {
            PixelType::Float
        } else {
            PixelType::Uint8
        }
    }

    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelType::Uint8 => 1,
            PixelType::Uint16 => 2,
            PixelType::Uint32 | PixelType::Float => 4,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            PixelType::Uint8 => "uint8",
            PixelType::Uint16 => "uint16",
            PixelType::Uint32 => "uint32",
            PixelType::Float => "float",
        }
    }
}

// =============================================================================
// Compression
// =============================================================================

/// Compression applied to a data element's payload after base64 decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Compression {
    None,
    Zlib,
    Bzip2,
}

impl Compression {
    /// Parse a `Compression` attribute value. Unknown names yield `None`.
    pub fn from_attribute(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Some(Compression::None),
            "zlib" => Some(Compression::Zlib),
            "bzip2" => Some(Compression::Bzip2),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Zlib => "zlib",
            Compression::Bzip2 => "bzip2",
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// DimensionOrder
// =============================================================================

/// Axis order of planes, a permutation of `XYZCT` (X and Y always first).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionOrder([u8; 5]);

impl DimensionOrder {
    pub const XYZCT: DimensionOrder = DimensionOrder(*b"XYZCT");

    /// Parse a dimension order string such as `XYCZT`.
    pub fn parse(order: &str) -> Option<Self> {
        let upper = order.trim().to_ascii_uppercase();
        let bytes: [u8; 5] = upper.as_bytes().try_into().ok()?;
        let mut sorted = bytes;
        sorted.sort_unstable();
        if &sorted != b"CTXYZ" {
            return None;
        }
        Some(DimensionOrder(bytes))
    }

    pub fn as_str(&self) -> &str {
        // Only ASCII letters are ever stored
        std::str::from_utf8(&self.0).unwrap_or("XYZCT")
    }

    /// Position of `axis` in the order, or `None` for an unknown axis.
    pub fn axis_index(&self, axis: char) -> Option<usize> {
        let axis = axis.to_ascii_uppercase();
        self.0.iter().position(|&b| b as char == axis)
    }
}

impl Default for DimensionOrder {
    fn default() -> Self {
        DimensionOrder::XYZCT
    }
}

impl fmt::Display for DimensionOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DimensionOrder {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// =============================================================================
// Metadata provider boundary
// =============================================================================

/// Untyped per-series values as reported by a metadata provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelsMetadata {
    pub size_x: u32,
    pub size_y: u32,
    pub size_z: u32,
    pub size_c: u32,
    pub size_t: u32,
    /// Pixel type name, e.g. `uint16` or `float`
    pub pixel_type: String,
    /// Permutation of `XYZCT`
    pub dimension_order: String,
}

/// Source of per-series dimensions and pixel types.
///
/// The markup itself is never parsed by the indexer; an implementation of
/// this trait supplies what it needs.
pub trait MetadataProvider {
    /// Number of series the provider can describe.
    fn series_count(&self) -> usize;

    /// Describe series `series`, or `None` if it is unknown.
    fn pixels(&self, series: usize) -> Option<PixelsMetadata>;
}

/// A provider backed by a fixed list of series descriptions.
#[derive(Debug, Clone, Default)]
pub struct StaticMetadata {
    series: Vec<PixelsMetadata>,
}

impl StaticMetadata {
    pub fn new(series: Vec<PixelsMetadata>) -> Self {
        Self { series }
    }
}

impl MetadataProvider for StaticMetadata {
    fn series_count(&self) -> usize {
        self.series.len()
    }

    fn pixels(&self, series: usize) -> Option<PixelsMetadata> {
        self.series.get(series).cloned()
    }
}

// =============================================================================
// SeriesMetadata
// =============================================================================

/// Typed description of one series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeriesMetadata {
    pub size_x: u32,
    pub size_y: u32,
    pub size_z: u32,
    pub size_c: u32,
    pub size_t: u32,
    pub pixel_type: PixelType,
    pub dimension_order: DimensionOrder,
}

impl SeriesMetadata {
    /// Validate provider values for series `series`.
    ///
    /// Every dimension must be non-zero and the plane size and count must fit
    /// in memory-addressable integers.
    pub fn from_pixels(series: usize, pixels: &PixelsMetadata) -> Result<Self, OmeXmlError> {
        let dims = [
            ("SizeX", pixels.size_x),
            ("SizeY", pixels.size_y),
            ("SizeZ", pixels.size_z),
            ("SizeC", pixels.size_c),
            ("SizeT", pixels.size_t),
        ];
        if let Some((name, _)) = dims.iter().find(|(_, v)| *v == 0) {
            return Err(OmeXmlError::malformed(format!(
                "series {} declares {} = 0",
                series, name
            )));
        }

        let dimension_order = match DimensionOrder::parse(&pixels.dimension_order) {
            Some(order) => order,
            None => {
                return Err(OmeXmlError::Metadata {
                    series,
                    reason: format!("invalid dimension order '{}'", pixels.dimension_order),
                })
            }
        };

        let metadata = SeriesMetadata {
            size_x: pixels.size_x,
            size_y: pixels.size_y,
            size_z: pixels.size_z,
            size_c: pixels.size_c,
            size_t: pixels.size_t,
            pixel_type: PixelType::from_name(&pixels.pixel_type),
            dimension_order,
        };

        if metadata.checked_plane_count().is_none() || metadata.checked_plane_size().is_none() {
            return Err(OmeXmlError::Metadata {
                series,
                reason: "dimensions overflow".to_string(),
            });
        }

        Ok(metadata)
    }

    fn checked_plane_count(&self) -> Option<u32> {
        self.size_z.checked_mul(self.size_c)?.checked_mul(self.size_t)
    }

    fn checked_plane_size(&self) -> Option<usize> {
        (self.size_x as usize)
            .checked_mul(self.size_y as usize)?
            .checked_mul(self.pixel_type.bytes_per_pixel())
    }

    /// Declared plane count: `sizeZ * sizeC * sizeT`.
    pub fn plane_count(&self) -> u32 {
        self.checked_plane_count().unwrap_or(u32::MAX)
    }

    /// Raw bytes per plane: `sizeX * sizeY * bytesPerPixel`.
    pub fn plane_size(&self) -> usize {
        self.checked_plane_size().unwrap_or(usize::MAX)
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.pixel_type.bytes_per_pixel()
    }
}

// =============================================================================
// Tests
// =============================================================================
