//! Plane service.
//!
//! The service owns one byte source, the indexed reader for it and a cache
//! of decoded planes:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     PlaneService                     │
//! │   plane(series, plane)                               │
//! │     1. Check cache                                   │
//! │     2. Decode through the PlaneReader (cache miss)   │
//! │     3. Cache & return                                │
//! │         │                  │                         │
//! │         ▼                  ▼                         │
//! │   ┌────────────┐   ┌───────────────┐  ┌───────────┐  │
//! │   │ PlaneCache │   │  PlaneReader  │─►│RangeReader│  │
//! │   └────────────┘   └───────────────┘  └───────────┘  │
//! └──────────────────────────────────────────────────────┘
//! ```

use bytes::Bytes;
use image::DynamicImage;
use tracing::debug;

use crate::error::{OmeXmlError, ServiceError};
use crate::format::{detect_format, OmeXmlReader, PixelsAttributeProvider, ReaderOptions};
use crate::io::RangeReader;

use super::cache::{PlaneCache, PlaneCacheKey, DEFAULT_PLANE_CACHE_CAPACITY};
use super::export::plane_to_image;
use super::reader::PlaneReader;

/// Response from the plane service.
#[derive(Debug, Clone)]
pub struct PlaneResponse {
    /// Decoded raw pixel bytes
    pub data: Bytes,

    /// Whether this plane was served from cache
    pub cache_hit: bool,
}

/// Service for decoding and caching planes of one container.
///
/// # Type Parameters
///
/// * `R` - The byte source (local file, in-memory buffer)
/// * `P` - The indexed plane reader for that source
pub struct PlaneService<R: RangeReader, P: PlaneReader> {
    source: R,
    reader: P,
    cache: PlaneCache,
}

impl<R: RangeReader> PlaneService<R, OmeXmlReader> {
    /// Detect, describe and index an OME-XML container.
    ///
    /// Series dimensions are read from the document's `<Pixels` elements.
    pub fn open(
        source: R,
        options: &ReaderOptions,
        cache_capacity: usize,
    ) -> Result<Self, ServiceError> {
        let format = detect_format(&source)?;
        debug!(
            source = source.identifier(),
            format = format.name(),
            "detected container"
        );

        let metadata = PixelsAttributeProvider::scan(&source, options.window_size)?;
        let reader = OmeXmlReader::open(&source, &metadata, options)?;

        Ok(Self::with_cache_capacity(source, reader, cache_capacity))
    }
}

impl<R: RangeReader, P: PlaneReader> PlaneService<R, P> {
    /// Create a new plane service with default cache capacity (64MB).
    pub fn new(source: R, reader: P) -> Self {
        Self::with_cache_capacity(source, reader, DEFAULT_PLANE_CACHE_CAPACITY)
    }

    /// Create a new plane service with custom cache capacity in bytes.
    pub fn with_cache_capacity(source: R, reader: P, cache_capacity: usize) -> Self {
        Self {
            source,
            reader,
            cache: PlaneCache::with_capacity(cache_capacity),
        }
    }

    pub fn source(&self) -> &R {
        &self.source
    }

    pub fn reader(&self) -> &P {
        &self.reader
    }

    /// Get a decoded plane, using the cache when available.
    ///
    /// # Errors
    /// Out-of-range indices and decode failures of this plane.
    pub fn plane(&self, series: usize, plane: u32) -> Result<PlaneResponse, OmeXmlError> {
        let key = PlaneCacheKey::new(series, plane);

        if let Some(data) = self.cache.get(&key) {
            return Ok(PlaneResponse {
                data,
                cache_hit: true,
            });
        }

        let data = self.decode_uncached(series, plane)?;
        self.cache.put(key, data.clone());

        Ok(PlaneResponse {
            data,
            cache_hit: false,
        })
    }

    /// Decode a plane without touching the cache.
    pub fn decode_uncached(&self, series: usize, plane: u32) -> Result<Bytes, OmeXmlError> {
        self.reader.decode_plane(&self.source, series, plane)
    }

    /// Decode a plane and convert it into a grayscale image.
    pub fn image(&self, series: usize, plane: u32) -> Result<DynamicImage, ServiceError> {
        let metadata = self.reader.series_metadata(series)?;
        let byte_order = self.reader.byte_order(series)?;
        let response = self.plane(series, plane)?;
        Ok(plane_to_image(&response.data, &metadata, byte_order)?)
    }

    /// Get plane cache statistics.
    ///
    /// Returns `(current_size, capacity, entry_count)`.
    pub fn cache_stats(&self) -> (usize, usize, usize) {
        (self.cache.size(), self.cache.capacity(), self.cache.len())
    }

    /// Clear the plane cache.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

// =============================================================================
// Tests
// =============================================================================
