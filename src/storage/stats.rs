//! Cache Statistics
//!
//! Process-lifetime counters for the cache. Every counter is an independent
//! `AtomicU64`, so incrementing never takes a lock and never blocks another
//! counter. A snapshot reads each counter once; it is a point-in-time view,
//! not a transaction over the cache contents.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic operation counters.
#[derive(Debug, Default)]
pub struct Stats {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    evictions: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads every counter. `keys` is supplied by the caller since the live
    /// key count belongs to the shards, not to this block.
    pub fn snapshot(&self, keys: u64) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            keys,
        }
    }
}

/// A point-in-time copy of the cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Successful GETs
    pub hits: u64,
    /// GETs on absent or expired keys
    pub misses: u64,
    /// SET calls, including overwrites
    pub sets: u64,
    /// DELETE calls that removed a key
    pub deletes: u64,
    /// Keys removed because their TTL ran out (lazy or active)
    pub evictions: u64,
    /// Live keys at snapshot time
    pub keys: u64,
}

impl StatsSnapshot {
    /// Returns the counters as `(name, value)` pairs, in wire order.
    pub fn fields(&self) -> [(&'static str, u64); 6] {
        [
            ("hits", self.hits),
            ("misses", self.misses),
            ("sets", self.sets),
            ("deletes", self.deletes),
            ("evictions", self.evictions),
            ("keys", self.keys),
        ]
    }

    /// Looks a counter up by name.
    pub fn get(&self, name: &str) -> Option<u64> {
        self.fields()
            .into_iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }
}

impl fmt::Display for StatsSnapshot {
    /// Renders `hits:1 misses:0 sets:1 deletes:0 evictions:0 keys:1`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.fields().iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}:{}", name, value)?;
        }
        Ok(())
    }
}
