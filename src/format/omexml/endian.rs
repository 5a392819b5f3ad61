//! Series endianness locator.
//!
//! Every series' pixel element carries a `BigEndian="true|false"` attribute.
//! One full pass over the file collects every declaration: the number of
//! declarations is the series count, and each declaration's offset is the
//! anchor from which that series' data elements are searched.
//!
//! The declaration may also be an element, `<BigEndian>true</BigEndian>`;
//! its closing tag repeats the marker and is not a second declaration.
//!
//! Newer schemas repeat the attribute on every `<BinData>` element. A
//! declaration whose enclosing tag is a data element describes a plane, not
//! a series, and is skipped.

use tracing::debug;

use super::markers::{DATA_ELEMENT, ENDIAN_DECLARATION};
use crate::error::OmeXmlError;
use crate::io::{ByteScanner, RangeReader};

/// Bytes read after a declaration to extract its value.
const DECLARATION_VALUE_BYTES: usize = 32;

/// Bytes read before a declaration to find its enclosing tag.
const ENCLOSING_TAG_LOOKBACK: u64 = 512;

/// One `BigEndian` declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndianDeclaration {
    /// Absolute offset of the declaration marker
    pub offset: u64,
    /// Whether the series' samples are little-endian
    pub little_endian: bool,
}

/// Scan the whole source for endianness declarations.
///
/// # Errors
/// `MalformedContainer` if the file holds no declaration at all.
pub fn locate_series<R: RangeReader + ?Sized>(
    reader: &R,
    window_size: usize,
) -> Result<Vec<EndianDeclaration>, OmeXmlError> {
    let mut scanner = ByteScanner::new(reader).with_window_size(window_size);
    let offsets = scanner.find_all(&ENDIAN_DECLARATION)?;

    if offsets.is_empty() {
        return Err(OmeXmlError::malformed(
            "no BigEndian declaration found; file holds no pixel data",
        ));
    }

    let mut declarations = Vec::with_capacity(offsets.len());
    for offset in offsets {
        match enclosing_tag(reader, offset)? {
            EnclosingTag::Closing => continue,
            EnclosingTag::DataElement => {
                debug!(offset, "skipping data element byte order attribute");
                continue;
            }
            EnclosingTag::Other => {}
        }

        let text = reader.read_at_most(offset, DECLARATION_VALUE_BYTES)?;
        let little_endian = !declares_big_endian(&text[ENDIAN_DECLARATION.primary().len()..]);
        debug!(offset, little_endian, "found endianness declaration");
        declarations.push(EndianDeclaration {
            offset,
            little_endian,
        });
    }

    if declarations.is_empty() {
        return Err(OmeXmlError::malformed(
            "BigEndian only declared on data elements; no series found",
        ));
    }

    Ok(declarations)
}

/// Kind of tag a marker occurrence sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnclosingTag {
    /// `</BigEndian>` ending an element-form declaration
    Closing,
    /// A `<Bin…>` data element
    DataElement,
    /// Any other opening tag, including `<BigEndian>` itself
    Other,
}

/// Classify the tag enclosing the marker at `offset` by the last `<` before it.
fn enclosing_tag<R: RangeReader + ?Sized>(
    reader: &R,
    offset: u64,
) -> Result<EnclosingTag, OmeXmlError> {
    let start = offset.saturating_sub(ENCLOSING_TAG_LOOKBACK);
    let before = reader.read_exact_at(start, (offset - start) as usize)?;

    let tag = match memchr::memrchr(b'<', &before) {
        Some(open) => &before[open..],
        None => return Ok(EnclosingTag::Other),
    };
    Ok(if tag.starts_with(b"</") {
        EnclosingTag::Closing
    } else if tag.starts_with(DATA_ELEMENT.primary()) {
        EnclosingTag::DataElement
    } else {
        EnclosingTag::Other
    })
}

/// Interpret the text following the `BigEndian` marker.
///
/// Accepts `="true"`, `= 'True'`, `>true<` and similar spellings; a value
/// starting with `t` means big-endian, anything else little-endian.
fn declares_big_endian(after_marker: &[u8]) -> bool {
    after_marker
        .iter()
        .copied()
        .find(|&b| !matches!(b, b'=' | b'"' | b'\'' | b'>' | b' ' | b'\t' | b'\r' | b'\n'))
        .map(|b| b.eq_ignore_ascii_case(&b't'))
        .unwrap_or(false)
}

// =============================================================================
// Tests
// =============================================================================
