//! Container formats.
//!
//! # Format Detection
//!
//! Use [`detect::detect_format`] to check that a file is an OME-XML
//! container before opening it with [`OmeXmlReader`].

pub mod detect;
pub mod omexml;

pub use detect::{detect_format, is_omexml_header, ContainerFormat};
pub use omexml::{
    ByteOrder, CodecSupport, Compression, DimensionOrder, IndexPass, IndexState, MetadataProvider,
    OmeXmlReader, PixelType, PixelsAttributeProvider, PixelsMetadata, PlaneOffsetTable,
    ReaderOptions, Series, SeriesMetadata, SeriesSummary, StaticMetadata,
};
