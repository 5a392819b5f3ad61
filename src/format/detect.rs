//! Container detection.
//!
//! An OME-XML container is recognised by its opening `<?xml` signature
//! alone. Comments or a DOCTYPE may precede the root element at any length,
//! so the root is not looked for here; a document without pixel data fails
//! later, when no series is found.

use crate::error::FormatError;
use crate::io::RangeReader;

use super::omexml::markers::XML_SIGNATURE;

/// Detected container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    /// OME-XML with embedded base64 pixel data
    OmeXml,
}

impl ContainerFormat {
    /// Get a human-readable name for the format.
    pub const fn name(&self) -> &'static str {
        match self {
            ContainerFormat::OmeXml => "OME-XML",
        }
    }
}

/// Detect the format of a container.
///
/// # Errors
/// `UnsupportedFormat` if the source does not start with `<?xml`.
pub fn detect_format<R: RangeReader + ?Sized>(reader: &R) -> Result<ContainerFormat, FormatError> {
    if reader.size() < XML_SIGNATURE.len() as u64 {
        return Err(FormatError::UnsupportedFormat {
            reason: "File too small to be an XML document".to_string(),
        });
    }

    let header = reader.read_exact_at(0, XML_SIGNATURE.len())?;
    if !is_omexml_header(&header) {
        return Err(FormatError::UnsupportedFormat {
            reason: "Missing <?xml signature".to_string(),
        });
    }

    Ok(ContainerFormat::OmeXml)
}

/// Check whether `bytes` start with the container's opening signature.
pub fn is_omexml_header(bytes: &[u8]) -> bool {
    bytes.starts_with(XML_SIGNATURE)
}

// =============================================================================
// Tests
// =============================================================================
