//! Literal marker search over raw byte buffers.
//!
//! A [`MarkerPattern`] is a short literal prefix plus an optional list of
//! longer variants that must not be reported. `<Bin` with the exclusions
//! `<Bin:External`, `<Bin:BinaryFile` and `<BinaryFile` finds inline data
//! elements while skipping references to external pixel files.
//!
//! Matching is byte-wise. No character-set decoding happens, so a marker
//! spelled with multi-byte characters is simply not found.

use memchr::memmem;

/// A literal marker with excluded longer variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerPattern {
    primary: &'static [u8],
    excluded: &'static [&'static [u8]],
}

/// Result of checking a candidate against the exclusion list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Candidate {
    /// The marker occurs here and is not an excluded variant.
    Match,
    /// The marker occurs here but is one of the excluded variants.
    Excluded,
    /// The buffer ends before an excluded variant could be ruled out.
    Incomplete,
}

impl MarkerPattern {
    /// Create a pattern. Every excluded variant must start with `primary`.
    pub const fn new(primary: &'static [u8], excluded: &'static [&'static [u8]]) -> Self {
        Self { primary, excluded }
    }

    /// The literal every match starts with.
    pub fn primary(&self) -> &'static [u8] {
        self.primary
    }

    /// Number of bytes needed to classify a candidate: the longest of the
    /// primary marker and its excluded variants.
    pub fn span(&self) -> usize {
        self.excluded
            .iter()
            .map(|v| v.len())
            .fold(self.primary.len(), usize::max)
    }

    /// Classify the occurrence of the primary marker at `haystack[idx..]`.
    ///
    /// `at_end` tells whether the haystack is the final piece of the stream;
    /// a truncated variant at the very end of the stream cannot match.
    pub fn classify(&self, haystack: &[u8], idx: usize, at_end: bool) -> Candidate {
        let rest = &haystack[idx..];
        if self.excluded.iter().any(|v| rest.starts_with(v)) {
            return Candidate::Excluded;
        }
        if !at_end
            && self
                .excluded
                .iter()
                .any(|v| rest.len() < v.len() && v.starts_with(rest))
        {
            return Candidate::Incomplete;
        }
        Candidate::Match
    }

    /// Find the first accepted match at or after `from`.
    ///
    /// Returns `Err(idx)` when the first candidate at `idx` cannot be
    /// classified because the buffer ends too early (only when `at_end` is false).
    pub fn find_from(
        &self,
        haystack: &[u8],
        from: usize,
        at_end: bool,
    ) -> Result<Option<usize>, usize> {
        let mut start = from;
        while start <= haystack.len() {
            let idx = match memmem::find(&haystack[start..], self.primary) {
                Some(rel) => start + rel,
                None => return Ok(None),
            };
            match self.classify(haystack, idx, at_end) {
                Candidate::Match => return Ok(Some(idx)),
                Candidate::Incomplete => return Err(idx),
                Candidate::Excluded => start = idx + 1,
            }
        }
        Ok(None)
    }

    /// Find the first accepted match in a complete buffer.
    pub fn find(&self, haystack: &[u8]) -> Option<usize> {
        self.find_from(haystack, 0, true).unwrap_or(None)
    }

    /// All accepted matches in a complete buffer, in order.
    pub fn find_all(&self, haystack: &[u8]) -> Vec<usize> {
        let mut matches = Vec::new();
        let mut from = 0;
        while let Ok(Some(idx)) = self.find_from(haystack, from, true) {
            matches.push(idx);
            from = idx + 1;
        }
        matches
    }
}

// =============================================================================
// Tests
// =============================================================================
