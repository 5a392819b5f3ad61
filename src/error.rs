use thiserror::Error;

/// I/O errors that can occur when reading from the byte source
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Error reported by the operating system
    #[error("I/O error: {0}")]
    Io(String),

    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// File not found
    #[error("File not found: {0}")]
    NotFound(String),
}

impl From<std::io::Error> for IoError {
    fn from(err: std::io::Error) -> Self {
        IoError::Io(err.to_string())
    }
}

/// Errors related to container signature detection
#[derive(Debug, Clone, Error)]
pub enum FormatError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// File does not carry the OME-XML opening signature
    #[error("Unsupported format: {reason}")]
    UnsupportedFormat { reason: String },
}

/// Errors raised while turning one embedded data element into raw pixels.
///
/// A decode error is scoped to a single plane; the offset index stays valid.
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// The slice has no `>` terminating the opening tag
    #[error("Data element has no payload")]
    MissingPayload,

    /// Payload text is not valid base64
    #[error("Invalid base64 payload: {0}")]
    Base64(String),

    /// zlib stream is corrupt
    #[error("Error uncompressing zlib data: {0}")]
    Inflate(String),

    /// bzip2 stream is corrupt
    #[error("Error uncompressing bzip2 data: {0}")]
    Bzip2(String),

    /// bzip2 payload does not start with the `BZ` stream signature
    #[error("bzip2 payload is missing its stream header")]
    InvalidBzip2Header,

    /// The codec was not compiled into this build
    #[error("Compression '{0}' is not supported by this build")]
    UnsupportedCompression(&'static str),

    /// Decoded byte count differs from `sizeX * sizeY * bytesPerPixel`
    #[error("Decoded plane has {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },
}

/// Errors surfaced by the OME-XML reader.
#[derive(Debug, Clone, Error)]
pub enum OmeXmlError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Structural markers required for indexing are missing
    #[error("Malformed container: {reason}")]
    MalformedContainer { reason: String },

    /// The metadata provider could not describe a series
    #[error("Invalid metadata for series {series}: {reason}")]
    Metadata { series: usize, reason: String },

    /// Series index outside `[0, series_count)`
    #[error("Invalid series index: {series} (container has {count} series)")]
    InvalidSeriesIndex { series: usize, count: usize },

    /// Plane index outside `[0, plane_count)`
    #[error("Invalid plane index: {plane} (series {series} has {count} planes)")]
    InvalidPlaneIndex { series: usize, plane: u32, count: u32 },

    /// Decoding a single plane failed
    #[error("Failed to decode plane {plane} of series {series}: {source}")]
    Decode {
        series: usize,
        plane: u32,
        #[source]
        source: DecodeError,
    },
}

impl OmeXmlError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        OmeXmlError::MalformedContainer {
            reason: reason.into(),
        }
    }
}

/// Errors raised when converting a decoded plane into an image.
#[derive(Debug, Clone, Error)]
pub enum ExportError {
    /// Buffer length does not match the plane geometry
    #[error("Plane buffer has {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    /// Image encoding or file write failed
    #[error("Image error: {0}")]
    Image(String),
}

impl From<image::ImageError> for ExportError {
    fn from(err: image::ImageError) -> Self {
        ExportError::Image(err.to_string())
    }
}

/// Errors surfaced by the plane service.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// The source is not a supported container
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Indexing or decoding failed
    #[error(transparent)]
    Container(#[from] OmeXmlError),

    /// A decoded plane could not be turned into an image
    #[error(transparent)]
    Export(#[from] ExportError),
}

impl From<IoError> for ServiceError {
    fn from(err: IoError) -> Self {
        ServiceError::Container(OmeXmlError::Io(err))
    }
}
