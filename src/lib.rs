//! # OME-XML Planes
//!
//! Locates and decodes the pixel planes embedded in OME-XML files.
//!
//! An OME-XML file stores every plane of every series as base64 text,
//! optionally zlib or bzip2 compressed, inside one large markup document.
//! This library indexes the byte offset of every plane by scanning for
//! structural markers, without a full parse of the (potentially
//! gigabyte-scale) document, and decodes planes on demand.
//!
//! ## Features
//!
//! - **Windowed scanning**: Markers are found across read-window boundaries
//! - **Heuristic indexing**: Skips over plane payloads, with an exhaustive fallback
//! - **Codecs**: Uncompressed, zlib and (feature `bzip2`) bzip2 payloads
//! - **Plane caching**: Decoded planes are kept in a size-bounded LRU cache
//! - **Image export**: Planes convert to grayscale images and PNG files
//!
//! ## Architecture
//!
//! - [`io`] - Range readers and the windowed marker scanner
//! - [`mod@format`] - OME-XML detection, indexing and decoding
//! - [`plane`] - Format-agnostic plane access, cache and export
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use omexml_planes::{FileRangeReader, PlaneService, ReaderOptions};
//!
//! let source = FileRangeReader::open("image.ome.xml").unwrap();
//! let service = PlaneService::open(source, &ReaderOptions::default(), 64 * 1024 * 1024).unwrap();
//!
//! let count = service.reader().plane_count(0).unwrap();
//! for plane in 0..count {
//!     let response = service.plane(0, plane).unwrap();
//!     println!("plane {}: {} bytes", plane, response.data.len());
//! }
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod io;
pub mod plane;

// Re-export commonly used types
pub use config::{
    Cli, Command, ExtractConfig, InfoConfig, OffsetsConfig, OutputFormat, ScanOptions,
};
pub use error::{DecodeError, ExportError, FormatError, IoError, OmeXmlError, ServiceError};
pub use format::omexml::{
    decode_base64, decode_plane, extract_payload, locate_series, sniff_compression,
    EndianDeclaration, PlaneIndexer, SAFE_SKIP_DIVISOR,
};
pub use format::{
    detect_format, is_omexml_header, ByteOrder, CodecSupport, Compression, ContainerFormat,
    DimensionOrder, IndexPass, IndexState, MetadataProvider, OmeXmlReader, PixelType,
    PixelsAttributeProvider, PixelsMetadata, PlaneOffsetTable, ReaderOptions, Series,
    SeriesMetadata, SeriesSummary, StaticMetadata,
};
pub use io::{
    ByteScanner, FileRangeReader, MarkerPattern, MemoryRangeReader, RangeReader,
    DEFAULT_WINDOW_SIZE,
};
pub use plane::{
    encode_png, plane_to_image, save_png, PlaneCache, PlaneCacheKey, PlaneReader, PlaneResponse,
    PlaneService, DEFAULT_PLANE_CACHE_CAPACITY,
};
