//! Windowed sequential marker scanner.
//!
//! The scanner reads a bounded region of a [`RangeReader`] in fixed-size
//! windows and reports absolute offsets of a [`MarkerPattern`]. The tail of
//! each window (`span - 1` bytes) is carried to the front of the next one, so
//! a marker split across a window boundary is still seen as contiguous.
//!
//! ```text
//!   window n                         window n + 1
//! ┌──────────────────────────┬───┐ ┌───┬──────────────────────────┐
//! │ .......................  │<Bi│ │<Bi│n:BinData ...............│
//! └──────────────────────────┴───┘ └───┴──────────────────────────┘
//!                             carry ──► copied to the front
//! ```

use bytes::BytesMut;

use super::marker::MarkerPattern;
use super::range_reader::RangeReader;
use crate::error::IoError;

/// Default scan window: 8KB.
pub const DEFAULT_WINDOW_SIZE: usize = 8192;

/// Sequential marker scanner over `[position, limit)` of a byte source.
///
/// The scanner holds no state beyond its position and the carried tail, so
/// it is cheap to create one per lookup.
pub struct ByteScanner<'a, R: RangeReader + ?Sized> {
    reader: &'a R,
    window_size: usize,
    /// Next byte to fetch from the source
    position: u64,
    /// Exclusive end of the scanned region
    limit: u64,
    /// Tail of the previous window, starting at `position - carry.len()`
    carry: BytesMut,
}

impl<'a, R: RangeReader + ?Sized> ByteScanner<'a, R> {
    /// Create a scanner over the whole source, starting at offset 0.
    pub fn new(reader: &'a R) -> Self {
        Self {
            reader,
            window_size: DEFAULT_WINDOW_SIZE,
            position: 0,
            limit: reader.size(),
            carry: BytesMut::new(),
        }
    }

    /// Use a custom window size.
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size.max(1);
        self
    }

    /// Restrict scanning to offsets below `limit`.
    pub fn bounded(mut self, limit: u64) -> Self {
        self.limit = limit.min(self.reader.size());
        self.position = self.position.min(self.limit);
        self
    }

    /// Move the scanner to `offset`, dropping any carried bytes.
    pub fn seek(&mut self, offset: u64) {
        self.position = offset.min(self.limit);
        self.carry.clear();
    }

    /// Logical position: the first byte not yet fully examined.
    pub fn position(&self) -> u64 {
        self.position - self.carry.len() as u64
    }

    /// Exclusive end of the scanned region.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Whether every byte of the region has been examined.
    pub fn is_exhausted(&self) -> bool {
        self.position >= self.limit && self.carry.is_empty()
    }

    /// Find the next occurrence of `pattern` at or after the current position.
    ///
    /// On success the scanner is left just past the start of the match, so a
    /// second call returns the following occurrence.
    pub fn find(&mut self, pattern: &MarkerPattern) -> Result<Option<u64>, IoError> {
        loop {
            match self.scan_window(pattern)? {
                Some(matches) => {
                    if let Some(&first) = matches.first() {
                        self.seek(first + 1);
                        return Ok(Some(first));
                    }
                }
                None => return Ok(None),
            }
        }
    }

    /// Read windows until one contains at least one match, and return every
    /// match in that window.
    ///
    /// Small planes can put several data elements in one window; all of them
    /// are reported. An empty result means the region is exhausted.
    pub fn find_in_next_window(&mut self, pattern: &MarkerPattern) -> Result<Vec<u64>, IoError> {
        while let Some(matches) = self.scan_window(pattern)? {
            if !matches.is_empty() {
                return Ok(matches);
            }
        }
        Ok(Vec::new())
    }

    /// Every occurrence of `pattern` from the current position to the limit.
    pub fn find_all(&mut self, pattern: &MarkerPattern) -> Result<Vec<u64>, IoError> {
        let mut all = Vec::new();
        while let Some(matches) = self.scan_window(pattern)? {
            all.extend(matches);
        }
        Ok(all)
    }

    /// Fetch one window and return the matches it settles.
    ///
    /// Returns `None` once the region is exhausted. A candidate too close to
    /// the end of the window to be classified stays in the carry and is
    /// reported by the next window instead.
    fn scan_window(&mut self, pattern: &MarkerPattern) -> Result<Option<Vec<u64>>, IoError> {
        if self.position >= self.limit {
            self.carry.clear();
            return Ok(None);
        }

        let span = pattern.span();
        let keep = span.saturating_sub(1);
        let window = self.window_size.max(span + 1);

        let fresh = (window - self.carry.len()).max(1) as u64;
        let len = fresh.min(self.limit - self.position) as usize;
        let chunk = self.reader.read_exact_at(self.position, len)?;

        let base = self.position - self.carry.len() as u64;
        let mut haystack = std::mem::take(&mut self.carry);
        haystack.extend_from_slice(&chunk);
        self.position += len as u64;
        let at_end = self.position >= self.limit;

        // Candidates starting inside the carried tail are left for the next
        // window, which sees them with enough trailing context.
        let settled = if at_end {
            haystack.len()
        } else {
            haystack.len().saturating_sub(keep)
        };

        let mut matches = Vec::new();
        let mut from = 0;
        while from < settled {
            match pattern.find_from(&haystack, from, at_end) {
                Ok(Some(idx)) if idx < settled => {
                    matches.push(base + idx as u64);
                    from = idx + 1;
                }
                _ => break,
            }
        }

        if !at_end {
            self.carry = haystack.split_off(settled);
        }

        Ok(Some(matches))
    }
}

// =============================================================================
// Tests
// =============================================================================
