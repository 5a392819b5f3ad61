//! Plane offset indexer.
//!
//! For one series, the indexer records the absolute offset of every
//! embedded data element inside the series region, in file order.
//!
//! ```text
//!   anchor                                                     region end
//!     │                                                             │
//!     ▼  first       skip ─────►  next window  skip ─────►          ▼
//!   ─────┬─<Bin..>───────────────────┬─<Bin..>──<Bin..>─────────────┤<Image
//!        │                           │   (every match of the window)│
//! ```
//!
//! Indexing is a small state machine:
//!
//! ```text
//! Unindexed ──► Heuristic(skip > 0) ──────────────────────► Indexed
//!                      │                                        ▲
//!                      └── under-count ──► Exhaustive(skip 0) ──┘
//! ```
//!
//! The heuristic pass jumps `plane_size / SAFE_SKIP_DIVISOR` bytes past each
//! recorded element before searching again. Base64 inflates a payload by a
//! third, so an uncompressed plane is never shorter than the skip; a
//! well-compressed plane can be, in which case the exhaustive pass re-runs
//! the search with no skip. The fallback runs at most once. A remaining
//! shortfall is accepted and the series reports fewer planes.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::attributes::attribute;
use super::markers::DATA_ELEMENT;
use super::metadata::Compression;
use crate::error::{IoError, OmeXmlError};
use crate::io::{ByteScanner, RangeReader};

/// Divisor applied to the raw plane size to get the heuristic skip.
pub const SAFE_SKIP_DIVISOR: usize = 2;

/// Bytes of the first data element inspected for its compression attribute.
const COMPRESSION_SNIFF_BYTES: usize = 256;

// =============================================================================
// Offset table
// =============================================================================

/// Which pass produced an offset table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexPass {
    Heuristic,
    Exhaustive,
}

/// Immutable, strictly increasing offsets of one series' data elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaneOffsetTable {
    offsets: Vec<u64>,
    region_end: u64,
    declared: u32,
    pass: IndexPass,
}

impl PlaneOffsetTable {
    /// Number of planes discovered.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }

    pub fn get(&self, plane: usize) -> Option<u64> {
        self.offsets.get(plane).copied()
    }

    /// Byte range `[start, end)` of plane `plane`'s raw slice.
    ///
    /// A plane ends where the next one starts; the last plane ends at the
    /// series region end.
    pub fn slice_bounds(&self, plane: usize) -> Option<(u64, u64)> {
        let start = self.get(plane)?;
        let end = self.get(plane + 1).unwrap_or(self.region_end);
        Some((start, end))
    }

    /// Exclusive end of the series region.
    pub fn region_end(&self) -> u64 {
        self.region_end
    }

    /// Plane count declared by the series metadata.
    pub fn declared(&self) -> u32 {
        self.declared
    }

    /// Declared planes that could not be located.
    pub fn shortfall(&self) -> u32 {
        self.declared.saturating_sub(self.offsets.len() as u32)
    }

    pub fn pass(&self) -> IndexPass {
        self.pass
    }
}

// =============================================================================
// Indexer
// =============================================================================

/// Indexing progress of one series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    /// First data element not located yet
    Unindexed,
    /// Heuristic search pending, with the given skip
    Heuristic { safe_skip: u64 },
    /// Exhaustive search pending after a heuristic under-count
    Exhaustive,
    /// Table frozen
    Indexed,
}

/// Builds the [`PlaneOffsetTable`] of one series.
pub struct PlaneIndexer<'a, R: RangeReader + ?Sized> {
    reader: &'a R,
    window_size: usize,
    series: usize,
    anchor: u64,
    region_end: u64,
    declared: u32,
    safe_skip: u64,
    state: IndexState,
    first: u64,
    offsets: Vec<u64>,
    pass: IndexPass,
}

impl<'a, R: RangeReader + ?Sized> PlaneIndexer<'a, R> {
    /// Prepare to index series `series`, whose data elements lie in
    /// `[anchor, region_end)`.
    pub fn new(
        reader: &'a R,
        window_size: usize,
        series: usize,
        anchor: u64,
        region_end: u64,
        declared: u32,
        plane_size: usize,
    ) -> Self {
        Self {
            reader,
            window_size,
            series,
            anchor,
            region_end: region_end.min(reader.size()),
            declared,
            safe_skip: (plane_size / SAFE_SKIP_DIVISOR) as u64,
            state: IndexState::Unindexed,
            first: anchor,
            offsets: Vec::new(),
            pass: IndexPass::Heuristic,
        }
    }

    pub fn state(&self) -> IndexState {
        self.state
    }

    /// Perform one transition and return the new state.
    ///
    /// # Errors
    /// `MalformedContainer` if the series region holds no data element;
    /// I/O failures from the byte source.
    pub fn advance(&mut self) -> Result<IndexState, OmeXmlError> {
        self.state = match self.state {
            IndexState::Unindexed => {
                self.first = self.find_first()?;
                debug!(
                    series = self.series,
                    offset = self.first,
                    "found first data element"
                );
                IndexState::Heuristic {
                    safe_skip: self.safe_skip,
                }
            }
            IndexState::Heuristic { safe_skip } => {
                self.offsets = self.search(safe_skip)?;
                self.pass = IndexPass::Heuristic;
                debug!(
                    series = self.series,
                    found = self.offsets.len(),
                    declared = self.declared,
                    safe_skip,
                    "heuristic pass complete"
                );
                if self.is_short() && safe_skip > 0 {
                    info!(
                        series = self.series,
                        found = self.offsets.len(),
                        declared = self.declared,
                        "heuristic pass under-counted, re-scanning exhaustively"
                    );
                    IndexState::Exhaustive
                } else {
                    self.accept();
                    IndexState::Indexed
                }
            }
            IndexState::Exhaustive => {
                self.offsets = self.search(0)?;
                self.pass = IndexPass::Exhaustive;
                self.accept();
                IndexState::Indexed
            }
            IndexState::Indexed => IndexState::Indexed,
        };
        Ok(self.state)
    }

    /// Drive the state machine to completion and freeze the table.
    pub fn run(mut self) -> Result<PlaneOffsetTable, OmeXmlError> {
        while self.advance()? != IndexState::Indexed {}
        Ok(PlaneOffsetTable {
            offsets: self.offsets,
            region_end: self.region_end,
            declared: self.declared,
            pass: self.pass,
        })
    }

    fn is_short(&self) -> bool {
        self.offsets.len() < self.declared as usize
    }

    fn accept(&self) {
        if self.is_short() {
            warn!(
                series = self.series,
                found = self.offsets.len(),
                declared = self.declared,
                "fewer data elements than declared planes, reporting shortfall"
            );
        }
    }

    fn scanner(&self) -> ByteScanner<'a, R> {
        ByteScanner::new(self.reader)
            .with_window_size(self.window_size)
            .bounded(self.region_end)
    }

    fn find_first(&self) -> Result<u64, OmeXmlError> {
        let mut scanner = self.scanner();
        scanner.seek(self.anchor);
        scanner.find(&DATA_ELEMENT)?.ok_or_else(|| {
            OmeXmlError::malformed(format!(
                "series {} has no data element after offset {}",
                self.series, self.anchor
            ))
        })
    }

    /// One search pass from the first element, skipping `safe_skip` bytes
    /// past each recorded element.
    ///
    /// Every match of a window is recorded, up to the declared count.
    fn search(&self, safe_skip: u64) -> Result<Vec<u64>, IoError> {
        let declared = self.declared as usize;
        let mut offsets = vec![self.first];
        let mut scanner = self.scanner();

        while offsets.len() < declared {
            let last = offsets[offsets.len() - 1];
            let next = last + 1 + safe_skip;
            if next >= self.region_end {
                break;
            }

            scanner.seek(next);
            let found = scanner.find_in_next_window(&DATA_ELEMENT)?;
            if found.is_empty() {
                break;
            }

            let room = declared - offsets.len();
            if found.len() > room {
                debug!(
                    series = self.series,
                    ignored = found.len() - room,
                    "declared plane count reached, ignoring extra data elements"
                );
            }
            offsets.extend(found.into_iter().take(room));
        }

        Ok(offsets)
    }
}

/// Read the `Compression` attribute of the data element at `offset`.
///
/// An absent attribute means no compression; an unknown codec name is
/// logged and treated as no compression.
pub fn sniff_compression<R: RangeReader + ?Sized>(
    reader: &R,
    offset: u64,
) -> Result<Compression, IoError> {
    let head = reader.read_at_most(offset, COMPRESSION_SNIFF_BYTES)?;
    let value = attribute(&head, "Compression").unwrap_or_default();

    Ok(match Compression::from_attribute(&value) {
        Some(compression) => compression,
        None => {
            warn!(offset, codec = %value, "unknown compression, assuming none");
            Compression::None
        }
    })
}

// =============================================================================
// Tests
// =============================================================================
