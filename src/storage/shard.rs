//! Cache Shards
//!
//! A shard owns one partition of the key space behind its own reader/writer
//! lock. Many readers can look keys up at once; a writer excludes everyone
//! else for the duration of a single map mutation.
//!
//! The live count is kept in an atomic next to the lock. It is only changed
//! while the write lock is held, so it always matches the map for anyone
//! holding the lock, and it can be summed across shards without locking.

use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// Initial per-shard map capacity.
const INITIAL_SHARD_CAPACITY: usize = 1024;

/// A stored value with its deadline and write version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheItem {
    /// The actual value stored
    pub value: Bytes,
    /// When this item expires (None = never expires)
    pub expires_at: Option<Instant>,
    /// Write counter for this key, 1 on first insert
    pub version: u64,
}

impl CacheItem {
    /// Creates an item that has not been versioned yet.
    ///
    /// The version is assigned by [`Shard::put`] under the write lock.
    pub fn new(value: Bytes, expires_at: Option<Instant>) -> Self {
        Self {
            value,
            expires_at,
            version: 0,
        }
    }

    /// Checks if this item has expired as of `now`.
    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }

    /// Checks if this item has expired.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }
}

/// A single shard containing a portion of the key-value pairs.
#[derive(Debug)]
pub struct Shard {
    items: RwLock<HashMap<Bytes, CacheItem>>,
    count: AtomicUsize,
}

impl Default for Shard {
    fn default() -> Self {
        Self::new()
    }
}

impl Shard {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::with_capacity(INITIAL_SHARD_CAPACITY)),
            count: AtomicUsize::new(0),
        }
    }

    /// Inserts or replaces `key`.
    ///
    /// The stored item gets the previous version plus one, or 1 for a new
    /// key. Returns the version that was written.
    pub fn put(&self, key: Bytes, mut item: CacheItem) -> u64 {
        let mut items = self.items.write();

        item.version = match items.get(&key) {
            Some(existing) => existing.version + 1,
            None => {
                self.count.fetch_add(1, Ordering::Relaxed);
                1
            }
        };

        let version = item.version;
        items.insert(key, item);
        version
    }

    /// Returns a copy of the item stored under `key`, expired or not.
    pub fn get(&self, key: &[u8]) -> Option<CacheItem> {
        self.items.read().get(key).cloned()
    }

    /// Removes `key`. Returns `true` if it was present.
    pub fn remove(&self, key: &[u8]) -> bool {
        self.remove_if(key, |_| true)
    }

    /// Removes `key` only if `predicate` accepts the item currently stored.
    ///
    /// The check and the removal happen under one write lock, so a decision
    /// made on a stale read never removes a newer write.
    pub fn remove_if<F>(&self, key: &[u8], predicate: F) -> bool
    where
        F: FnOnce(&CacheItem) -> bool,
    {
        let mut items = self.items.write();

        match items.get(key) {
            Some(item) if predicate(item) => {
                items.remove(key);
                self.count.fetch_sub(1, Ordering::Relaxed);
                true
            }
            _ => false,
        }
    }

    /// Drops every item in the shard.
    pub fn reset_all(&self) {
        let mut items = self.items.write();
        *items = HashMap::with_capacity(INITIAL_SHARD_CAPACITY);
        self.count.store(0, Ordering::Relaxed);
    }

    /// Number of items currently stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
