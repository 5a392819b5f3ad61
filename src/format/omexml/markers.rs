//! Structural markers of an OME-XML document.

use crate::io::MarkerPattern;

/// Endianness declaration; one per series.
pub const ENDIAN_DECLARATION: MarkerPattern = MarkerPattern::new(b"BigEndian", &[]);

/// Start of an embedded data element, excluding references to external files.
///
/// Documents without the `Bin:` prefix spell the file reference
/// `<BinaryFile`; that form is a reference too.
pub const DATA_ELEMENT: MarkerPattern = MarkerPattern::new(
    b"<Bin",
    &[b"<Bin:External", b"<Bin:BinaryFile", b"<BinaryFile"],
);

/// Start of an image element; separates consecutive series.
pub const IMAGE_START: MarkerPattern = MarkerPattern::new(b"<Image ", &[]);

/// Start of a pixels element, excluding pixel references.
pub const PIXELS_ELEMENT: MarkerPattern = MarkerPattern::new(b"<Pixels", &[b"<PixelsRef"]);

/// Opening signature of the document.
pub const XML_SIGNATURE: &[u8] = b"<?xml";
