//! Attribute-based metadata provider.
//!
//! Reads each `<Pixels` opening tag of the document and reports its size,
//! pixel type and dimension order attributes. Nothing else of the markup is
//! interpreted.

use tracing::debug;

use super::attributes::parse_attributes;
use super::markers::PIXELS_ELEMENT;
use super::metadata::{MetadataProvider, PixelsMetadata};
use crate::error::OmeXmlError;
use crate::io::{ByteScanner, RangeReader};

/// Longest opening tag read for a pixels element.
const MAX_PIXELS_TAG_BYTES: usize = 4096;

/// Metadata provider built from the `<Pixels` elements of a document.
#[derive(Debug, Clone, Default)]
pub struct PixelsAttributeProvider {
    series: Vec<PixelsMetadata>,
}

impl PixelsAttributeProvider {
    /// Scan the whole source for pixels elements, in document order.
    ///
    /// # Errors
    /// `Metadata` if an element lacks `SizeX`/`SizeY` or carries a
    /// non-numeric size.
    pub fn scan<R: RangeReader + ?Sized>(
        reader: &R,
        window_size: usize,
    ) -> Result<Self, OmeXmlError> {
        let mut scanner = ByteScanner::new(reader).with_window_size(window_size);
        let offsets = scanner.find_all(&PIXELS_ELEMENT)?;

        let mut series = Vec::with_capacity(offsets.len());
        for (index, offset) in offsets.into_iter().enumerate() {
            let tag = reader.read_at_most(offset, MAX_PIXELS_TAG_BYTES)?;
            let pixels = parse_pixels(index, &tag)?;
            debug!(
                series = index,
                offset,
                size_x = pixels.size_x,
                size_y = pixels.size_y,
                pixel_type = %pixels.pixel_type,
                "read pixels element"
            );
            series.push(pixels);
        }

        Ok(Self { series })
    }
}

impl MetadataProvider for PixelsAttributeProvider {
    fn series_count(&self) -> usize {
        self.series.len()
    }

    fn pixels(&self, series: usize) -> Option<PixelsMetadata> {
        self.series.get(series).cloned()
    }
}

/// Build a series description from one `<Pixels ...>` opening tag.
///
/// `SizeZ`, `SizeC` and `SizeT` default to 1, `PixelType` to `uint8` and
/// `DimensionOrder` to `XYZCT`.
fn parse_pixels(series: usize, tag: &[u8]) -> Result<PixelsMetadata, OmeXmlError> {
    let attributes = parse_attributes(tag);
    let get = |name: &str| {
        attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    };

    let size = |name: &'static str, default: Option<u32>| -> Result<u32, OmeXmlError> {
        match get(name) {
            Some(value) => value.trim().parse().map_err(|_| OmeXmlError::Metadata {
                series,
                reason: format!("{} is not a number: '{}'", name, value),
            }),
            None => default.ok_or_else(|| OmeXmlError::Metadata {
                series,
                reason: format!("missing {} attribute", name),
            }),
        }
    };

    Ok(PixelsMetadata {
        size_x: size("SizeX", None)?,
        size_y: size("SizeY", None)?,
        size_z: size("SizeZ", Some(1))?,
        size_c: size("SizeC", Some(1))?,
        size_t: size("SizeT", Some(1))?,
        pixel_type: get("PixelType").unwrap_or("uint8").to_string(),
        dimension_order: get("DimensionOrder").unwrap_or("XYZCT").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
