//! OME-XML container support.
//!
//! An OME-XML file is a markup document whose pixel planes are embedded as
//! base64 text inside `<Bin:BinData>` elements, optionally compressed.
//!
//! ```text
//! <?xml ...?>
//! <OME>
//!   <Image ID="Image:0">
//!     <Pixels BigEndian="false" SizeX=.. PixelType=..>   ◄── series anchor
//!       <Bin:BinData Compression="zlib">eJz...</Bin:BinData>   ◄── plane 0
//!       <Bin:BinData Compression="zlib">eJz...</Bin:BinData>   ◄── plane 1
//!     </Pixels>
//!   </Image>
//!   <Image ID="Image:1">                                 ◄── region end
//!   ...
//! ```
//!
//! The document is never parsed as a tree. Series and planes are found by
//! scanning for markers, and the offsets of every plane are kept so planes
//! can be decoded individually.

mod attributes;
mod decode;
mod endian;
mod indexer;
pub(crate) mod markers;
mod metadata;
mod provider;
mod reader;

pub use decode::{decode_base64, decode_plane, extract_payload, CodecSupport};
pub use endian::{locate_series, EndianDeclaration};
pub use indexer::{
    sniff_compression, IndexPass, IndexState, PlaneIndexer, PlaneOffsetTable, SAFE_SKIP_DIVISOR,
};
pub use metadata::{
    ByteOrder, Compression, DimensionOrder, MetadataProvider, PixelType, PixelsMetadata,
    SeriesMetadata, StaticMetadata,
};
pub use provider::PixelsAttributeProvider;
pub use reader::{OmeXmlReader, ReaderOptions, Series, SeriesSummary};
