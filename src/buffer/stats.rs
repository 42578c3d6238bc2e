//! Buffer pool statistics tracking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters maintained by a [`BufferPool`](crate::BufferPool).
///
/// Every counter is an independent relaxed atomic: they are bumped from
/// whatever thread runs a transaction and read without stopping anyone, so
/// a snapshot taken under load may mix values from slightly different
/// instants.
///
/// # Example
/// ```
/// use lockpool::BufferPoolStats;
/// use std::sync::atomic::Ordering;
///
/// let stats = BufferPoolStats::new();
/// stats.cache_hits.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(stats.snapshot().cache_hits, 1);
/// ```
#[derive(Debug, Default)]
pub struct BufferPoolStats {
    /// Fetches served from a resident page.
    pub cache_hits: AtomicU64,

    /// Fetches that had to load the page from the store.
    pub cache_misses: AtomicU64,

    /// Clean pages evicted to make room.
    pub evictions: AtomicU64,

    /// Pages dropped without being written (abort or explicit discard).
    pub discards: AtomicU64,

    /// Pages read from the page store.
    pub pages_read: AtomicU64,

    /// Pages written to the page store.
    pub pages_written: AtomicU64,

    /// Lock requests that ran out of retries.
    pub lock_timeouts: AtomicU64,
}

impl BufferPoolStats {
    /// Create a new stats tracker with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy every counter into a plain value.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            discards: self.discards.load(Ordering::Relaxed),
            pages_read: self.pages_read.load(Ordering::Relaxed),
            pages_written: self.pages_written.load(Ordering::Relaxed),
            lock_timeouts: self.lock_timeouts.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        for counter in [
            &self.cache_hits,
            &self.cache_misses,
            &self.evictions,
            &self.discards,
            &self.pages_read,
            &self.pages_written,
            &self.lock_timeouts,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// A point-in-time copy of [`BufferPoolStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub evictions: u64,
    pub discards: u64,
    pub pages_read: u64,
    pub pages_written: u64,
    pub lock_timeouts: u64,
}

impl StatsSnapshot {
    /// Fraction of fetches served from the cache (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={} misses={} hit_rate={:.2}% evictions={} discards={} reads={} writes={} lock_timeouts={}",
            self.cache_hits,
            self.cache_misses,
            self.hit_rate() * 100.0,
            self.evictions,
            self.discards,
            self.pages_read,
            self.pages_written,
            self.lock_timeouts
        )
    }
}
