//! Cache for decoded planes.
//!
//! Decoding a plane means base64 plus possibly zlib or bzip2, so repeated
//! requests for the same plane are served from an LRU cache.
//!
//! # Size-Based Eviction
//!
//! The cache tracks the total size of cached planes in bytes and evicts
//! least-recently-used entries when the capacity is exceeded.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};

use bytes::Bytes;
use lru::LruCache;

/// Default cache capacity: 64MB
pub const DEFAULT_PLANE_CACHE_CAPACITY: usize = 64 * 1024 * 1024;

/// Default maximum number of entries (to bound LRU overhead)
const DEFAULT_MAX_ENTRIES: NonZeroUsize = match NonZeroUsize::new(4096) {
    Some(n) => n,
    None => NonZeroUsize::MIN,
};

/// Cache key for decoded planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaneCacheKey {
    pub series: usize,
    pub plane: u32,
}

impl PlaneCacheKey {
    pub fn new(series: usize, plane: u32) -> Self {
        Self { series, plane }
    }
}

struct CacheState {
    entries: LruCache<PlaneCacheKey, Bytes>,
    current_size: usize,
}

/// LRU cache for decoded planes with size-based capacity.
///
/// # Thread Safety
///
/// All operations take a single internal lock, so the cache can be shared
/// across threads.
///
/// # Example
///
/// ```
/// use omexml_planes::plane::{PlaneCache, PlaneCacheKey};
/// use bytes::Bytes;
///
/// let cache = PlaneCache::with_capacity(1024);
/// let key = PlaneCacheKey::new(0, 3);
///
/// cache.put(key, Bytes::from(vec![0u8; 100]));
/// assert_eq!(cache.get(&key).map(|b| b.len()), Some(100));
/// ```
pub struct PlaneCache {
    state: Mutex<CacheState>,
    max_size: usize,
}

impl PlaneCache {
    /// Create a new plane cache with default capacity (64MB).
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_PLANE_CACHE_CAPACITY)
    }

    /// Create a new plane cache with the specified capacity in bytes.
    pub fn with_capacity(max_size: usize) -> Self {
        Self::with_capacity_and_entries(max_size, DEFAULT_MAX_ENTRIES)
    }

    /// Create a new plane cache with specified capacity and maximum entries.
    pub fn with_capacity_and_entries(max_size: usize, max_entries: NonZeroUsize) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::new(max_entries),
                current_size: 0,
            }),
            max_size,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // No operation panics between updating entries and size
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get a plane from the cache, marking it as recently used.
    pub fn get(&self, key: &PlaneCacheKey) -> Option<Bytes> {
        self.lock().entries.get(key).cloned()
    }

    /// Check if a plane is cached without updating LRU order.
    pub fn contains(&self, key: &PlaneCacheKey) -> bool {
        self.lock().entries.contains(key)
    }

    /// Store a plane in the cache.
    ///
    /// If the cache is over capacity after insertion, least-recently-used
    /// entries are evicted until the cache is within capacity. A plane
    /// larger than the whole capacity is not kept and evicts nothing else;
    /// it only drops a stale entry under the same key.
    pub fn put(&self, key: PlaneCacheKey, data: Bytes) {
        let data_size = data.len();
        let mut state = self.lock();

        if data_size > self.max_size {
            if let Some(old) = state.entries.pop(&key) {
                state.current_size = state.current_size.saturating_sub(old.len());
            }
            return;
        }

        if let Some(old) = state.entries.peek(&key) {
            state.current_size = state.current_size.saturating_sub(old.len());
        }

        // An entry-count eviction also has to release its bytes
        if let Some((evicted_key, evicted)) = state.entries.push(key, data) {
            if evicted_key != key {
                state.current_size = state.current_size.saturating_sub(evicted.len());
            }
        }
        state.current_size += data_size;

        while state.current_size > self.max_size {
            match state.entries.pop_lru() {
                Some((_, evicted)) => {
                    state.current_size = state.current_size.saturating_sub(evicted.len());
                }
                None => break,
            }
        }
    }

    /// Remove a plane from the cache.
    pub fn remove(&self, key: &PlaneCacheKey) -> Option<Bytes> {
        let mut state = self.lock();
        let data = state.entries.pop(key)?;
        state.current_size = state.current_size.saturating_sub(data.len());
        Some(data)
    }

    /// Clear all entries from the cache.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.current_size = 0;
    }

    /// Get the current number of cached planes.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Get the current total size of cached planes in bytes.
    pub fn size(&self) -> usize {
        self.lock().current_size
    }

    /// Get the maximum capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.max_size
    }
}

impl Default for PlaneCache {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
