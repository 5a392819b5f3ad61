//! Test utilities for integration tests.
//!
//! This module provides a tracking range reader and a builder that
//! synthesises OME-XML documents with embedded planes.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use flate2::write::ZlibEncoder;

use omexml_planes::error::IoError;
use omexml_planes::io::RangeReader;

// =============================================================================
// Range Reader with Request Tracking
// =============================================================================

/// An in-memory range reader that records every read request.
pub struct TrackingReader {
    data: Bytes,
    identifier: String,
    request_count: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<(u64, usize)>>>,
}

impl TrackingReader {
    pub fn new(data: Vec<u8>, identifier: impl Into<String>) -> Self {
        Self {
            data: Bytes::from(data),
            identifier: identifier.into(),
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    pub fn get_requests(&self) -> Vec<(u64, usize)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn reset_tracking(&self) {
        self.request_count.store(0, Ordering::SeqCst);
        self.requests.lock().unwrap().clear();
    }
}

impl RangeReader for TrackingReader {
    fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push((offset, len));

        let start = offset as usize;
        let end = start + len;
        if end > self.data.len() {
            return Err(IoError::RangeOutOfBounds {
                offset,
                requested: len as u64,
                size: self.data.len() as u64,
            });
        }
        Ok(self.data.slice(start..end))
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

// =============================================================================
// Plane Data
// =============================================================================

/// Payload compression used by the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    None,
    Zlib,
    #[cfg(feature = "bzip2")]
    Bzip2,
}

impl Codec {
    fn attribute(self) -> &'static str {
        match self {
            Codec::None => "none",
            Codec::Zlib => "zlib",
            #[cfg(feature = "bzip2")]
            Codec::Bzip2 => "bzip2",
        }
    }

    fn encode(self, raw: &[u8]) -> Vec<u8> {
        match self {
            Codec::None => raw.to_vec(),
            Codec::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(raw).unwrap();
                encoder.finish().unwrap()
            }
            #[cfg(feature = "bzip2")]
            Codec::Bzip2 => {
                let mut encoder =
                    bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
                encoder.write_all(raw).unwrap();
                encoder.finish().unwrap()
            }
        }
    }
}

/// A deterministic plane of `len` bytes; `seed` distinguishes planes.
pub fn pattern_plane(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u32).wrapping_mul(31).wrapping_add(seed as u32 * 7) as u8)
        .collect()
}

// =============================================================================
// Document Builder
// =============================================================================

/// One series of a synthesised document.
#[derive(Debug, Clone)]
pub struct SeriesSpec {
    pub size_x: u32,
    pub size_y: u32,
    pub size_z: u32,
    pub size_c: u32,
    pub size_t: u32,
    pub pixel_type: &'static str,
    pub big_endian: bool,
    pub codec: Codec,
    pub planes: Vec<Vec<u8>>,
    /// Whitespace inserted between the pixels tag and the first data element
    pub padding: usize,
}

impl SeriesSpec {
    /// A series with `planes` planes of pattern data, declared along Z.
    pub fn new(size_x: u32, size_y: u32, pixel_type: &'static str, planes: u32) -> Self {
        let bytes_per_pixel = match pixel_type {
            "uint16" | "int16" => 2,
            "uint32" | "int32" | "float" => 4,
            _ => 1,
        };
        let plane_size = (size_x * size_y) as usize * bytes_per_pixel;
        Self {
            size_x,
            size_y,
            size_z: planes,
            size_c: 1,
            size_t: 1,
            pixel_type,
            big_endian: false,
            codec: Codec::None,
            planes: (0..planes)
                .map(|p| pattern_plane(plane_size, p as u8))
                .collect(),
            padding: 0,
        }
    }

    pub fn big_endian(mut self, big_endian: bool) -> Self {
        self.big_endian = big_endian;
        self
    }

    pub fn codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    pub fn planes(mut self, planes: Vec<Vec<u8>>) -> Self {
        self.planes = planes;
        self
    }

    /// Override the declared Z size without changing the embedded planes.
    pub fn declared_z(mut self, size_z: u32) -> Self {
        self.size_z = size_z;
        self
    }

    pub fn padding(mut self, padding: usize) -> Self {
        self.padding = padding;
        self
    }

    pub fn plane_size(&self) -> usize {
        self.planes.first().map(|p| p.len()).unwrap_or(0)
    }
}

/// A built document and the offsets of its data elements.
pub struct Fixture {
    pub data: Vec<u8>,
    /// Offset of the `BigEndian` declaration of each series
    pub anchors: Vec<u64>,
    /// Offset of every data element, per series
    pub offsets: Vec<Vec<u64>>,
}

/// Builder for OME-XML documents.
#[derive(Default)]
pub struct OmeXmlBuilder {
    series: Vec<SeriesSpec>,
    line_width: Option<usize>,
    external_reference: bool,
}

impl OmeXmlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn series(mut self, series: SeriesSpec) -> Self {
        self.series.push(series);
        self
    }

    /// Wrap base64 payloads into lines of `width` characters.
    pub fn line_width(mut self, width: usize) -> Self {
        self.line_width = Some(width);
        self
    }

    /// Put a `<Bin:External>` reference before the first data element of
    /// every series.
    pub fn external_reference(mut self) -> Self {
        self.external_reference = true;
        self
    }

    pub fn build(&self) -> Fixture {
        let mut data = String::new();
        let mut anchors = Vec::new();
        let mut offsets = Vec::new();

        data.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        data.push_str(
            "<OME xmlns=\"http://www.openmicroscopy.org/Schemas/OME/2016-06\" \
             xmlns:Bin=\"http://www.openmicroscopy.org/Schemas/BinaryFile/2016-06\">\n",
        );

        for (index, series) in self.series.iter().enumerate() {
            data.push_str(&format!(
                "  <Image ID=\"Image:{}\" Name=\"Series {}\">\n",
                index, index
            ));
            data.push_str(&format!(
                "    <Pixels ID=\"Pixels:{}\" DimensionOrder=\"XYZCT\" PixelType=\"{}\" ",
                index, series.pixel_type
            ));
            anchors.push(data.len() as u64);
            data.push_str(&format!(
                "BigEndian=\"{}\" SizeX=\"{}\" SizeY=\"{}\" SizeZ=\"{}\" SizeC=\"{}\" SizeT=\"{}\">\n",
                series.big_endian,
                series.size_x,
                series.size_y,
                series.size_z,
                series.size_c,
                series.size_t
            ));

            data.push_str(&" ".repeat(series.padding));

            if self.external_reference {
                data.push_str("      <Bin:External href=\"planes.bin\" SHA1=\"0\" Offset=\"0\"/>\n");
            }

            let mut series_offsets = Vec::new();
            for plane in &series.planes {
                let payload = self.wrap(&STANDARD.encode(series.codec.encode(plane)));
                data.push_str("      ");
                series_offsets.push(data.len() as u64);
                data.push_str(&format!(
                    "<Bin:BinData Compression=\"{}\" Length=\"{}\">{}</Bin:BinData>\n",
                    series.codec.attribute(),
                    payload.len(),
                    payload
                ));
            }
            offsets.push(series_offsets);

            data.push_str("    </Pixels>\n  </Image>\n");
        }

        data.push_str("</OME>\n");

        Fixture {
            data: data.into_bytes(),
            anchors,
            offsets,
        }
    }

    fn wrap(&self, payload: &str) -> String {
        match self.line_width {
            Some(width) => payload
                .as_bytes()
                .chunks(width)
                .map(|line| std::str::from_utf8(line).unwrap())
                .collect::<Vec<_>>()
                .join("\n"),
            None => payload.to_string(),
        }
    }
}

/// Two series: 3 uncompressed 10x10 uint8 planes (little-endian), then
/// 2 zlib 16x8 uint16 planes (big-endian).
pub fn two_series_fixture() -> (Fixture, Vec<SeriesSpec>) {
    let series = vec![
        SeriesSpec::new(10, 10, "uint8", 3),
        SeriesSpec::new(16, 8, "uint16", 2)
            .big_endian(true)
            .codec(Codec::Zlib),
    ];
    let mut builder = OmeXmlBuilder::new();
    for s in &series {
        builder = builder.series(s.clone());
    }
    (builder.build(), series)
}
