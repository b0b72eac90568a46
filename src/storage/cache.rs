//! Sharded TTL Cache
//!
//! This module ties the shards, the statistics block and the timing wheel
//! together into the cache that the rest of the crate talks to.
//!
//! ## Expiry
//!
//! A key with a TTL can leave the cache in two ways, whichever comes first:
//!
//! 1. **Lazy**: `get` finds the deadline has passed, removes the key and
//!    reports a miss.
//! 2. **Active**: the timing wheel fires the key's ticket and the key is
//!    removed without anyone reading it.
//!
//! Both paths remove the key and count one eviction, so callers cannot tell
//! them apart.
//!
//! ## Stale tickets
//!
//! The wheel never cancels or deduplicates entries. A ticket records the
//! version and deadline of the write that scheduled it, and it only removes
//! the key if that exact write is still stored. Overwriting a key with a
//! longer TTL, with no TTL, or deleting and recreating it leaves the old
//! ticket to fire into nothing.
//!
//! ## Locking
//!
//! No lock is held across components: `set` releases the shard lock before
//! registering with the wheel, and the wheel releases its lock before the
//! expiry callback takes a shard lock.

use crate::storage::config::{CacheConfig, ConfigError};
use crate::storage::shard::{CacheItem, Shard};
use crate::storage::stats::{Stats, StatsSnapshot};
use crate::storage::wheel::TimingWheel;
use bytes::Bytes;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, trace};

/// What the timing wheel carries for each TTL write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiryTicket {
    pub key: Bytes,
    pub version: u64,
    pub expires_at: Option<Instant>,
}

/// The shards and counters, shared with the wheel's expiry callback.
#[derive(Debug)]
struct Keyspace {
    shards: Vec<Shard>,
    stats: Stats,
}

impl Keyspace {
    fn new(shard_count: usize) -> Self {
        Self {
            shards: (0..shard_count).map(|_| Shard::new()).collect(),
            stats: Stats::new(),
        }
    }

    /// Determines which shard a key belongs to.
    #[inline]
    fn shard_index(&self, key: &[u8]) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.shards.len() as u64) as usize
    }

    #[inline]
    fn shard(&self, key: &[u8]) -> &Shard {
        &self.shards[self.shard_index(key)]
    }

    fn count(&self) -> u64 {
        self.shards.iter().map(|shard| shard.len() as u64).sum()
    }

    /// Active expiry: removes the key only if the ticketed write is current.
    fn expire(&self, ticket: ExpiryTicket) {
        let removed = self.shard(&ticket.key).remove_if(&ticket.key, |item| {
            item.version == ticket.version && item.expires_at == ticket.expires_at
        });

        if removed {
            self.stats.record_eviction();
            trace!(key = ?ticket.key, version = ticket.version, "Key expired");
        }
    }
}

/// A sharded in-memory cache with TTL expiry.
///
/// # Example
///
/// ```
/// use blitzcache::storage::Cache;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let cache = Cache::new(4);
///
/// cache.set("colour", "teal", Duration::ZERO);
/// assert_eq!(cache.get(b"colour").as_deref(), Some(&b"teal"[..]));
///
/// cache.set("session", "abc123", Duration::from_secs(60));
/// assert_eq!(cache.count(), 2);
///
/// cache.close();
/// # }
/// ```
pub struct Cache {
    keyspace: Arc<Keyspace>,
    wheel: TimingWheel<ExpiryTicket>,
    config: CacheConfig,
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("shards", &self.keyspace.shards.len())
            .field("keys", &self.keyspace.count())
            .field("wheel_slots", &self.wheel.size())
            .field("running", &self.wheel.is_running())
            .finish()
    }
}

impl Cache {
    /// Creates a cache with `shard_count` shards (0 = 256) and the default
    /// 100ms tick and one hour horizon.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime, since the expiry task is
    /// spawned immediately. Use [`Cache::try_new`] to get an error instead.
    pub fn new(shard_count: usize) -> Self {
        match Self::try_new(shard_count) {
            Ok(cache) => cache,
            Err(e) => panic!("Cache::new: {}", e),
        }
    }

    /// Like [`Cache::new`], but reports a missing runtime as an error.
    pub fn try_new(shard_count: usize) -> Result<Self, ConfigError> {
        Self::with_config(CacheConfig {
            shard_count,
            ..Default::default()
        })
    }

    /// Creates a cache from an explicit configuration.
    ///
    /// The configuration is validated before the expiry task is spawned.
    pub fn with_config(config: CacheConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Self::build(config)
    }

    fn build(mut config: CacheConfig) -> Result<Self, ConfigError> {
        config.shard_count = config.effective_shard_count();

        let keyspace = Arc::new(Keyspace::new(config.shard_count));

        let expiring = Arc::clone(&keyspace);
        let wheel = TimingWheel::start(
            config.tick_duration,
            config.wheel_horizon,
            move |ticket| expiring.expire(ticket),
        )?;

        info!(
            shards = config.shard_count,
            tick_ms = config.tick_duration.as_millis() as u64,
            horizon_secs = config.wheel_horizon.as_secs(),
            "Cache initialized"
        );

        Ok(Self {
            keyspace,
            wheel,
            config,
        })
    }

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// A zero `ttl` means the key never expires. Returns the version of this
    /// write: 1 for a new key, previous version plus one for an overwrite.
    pub fn set(&self, key: impl Into<Bytes>, value: impl Into<Bytes>, ttl: Duration) -> u64 {
        let key = key.into();
        let expires_at = if ttl.is_zero() {
            None
        } else {
            Instant::now().checked_add(ttl)
        };

        let version = self
            .keyspace
            .shard(&key)
            .put(key.clone(), CacheItem::new(value.into(), expires_at));

        // Shard lock is released; only now touch the wheel.
        if !ttl.is_zero() {
            self.wheel.add(
                ExpiryTicket {
                    key,
                    version,
                    expires_at,
                },
                ttl,
            );
        }

        self.keyspace.stats.record_set();
        version
    }

    /// Gets the value for a key.
    ///
    /// Returns `None` if the key doesn't exist or has expired. An expired key
    /// is removed on the spot.
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        let shard = self.keyspace.shard(key);
        let stats = &self.keyspace.stats;

        let Some(item) = shard.get(key) else {
            stats.record_miss();
            return None;
        };

        let now = Instant::now();
        if item.is_expired_at(now) {
            // Re-check under the write lock: a concurrent set may have won.
            let removed = shard.remove_if(key, |current| {
                current.version == item.version && current.is_expired_at(now)
            });
            if removed {
                stats.record_eviction();
            }
            stats.record_miss();
            return None;
        }

        stats.record_hit();
        Some(item.value)
    }

    /// Deletes a key. Returns `true` if it was present.
    pub fn delete(&self, key: &[u8]) -> bool {
        let removed = self.keyspace.shard(key).remove(key);
        if removed {
            self.keyspace.stats.record_delete();
        }
        removed
    }

    /// Number of live keys, summed shard by shard.
    pub fn count(&self) -> u64 {
        self.keyspace.count()
    }

    /// Point-in-time counters plus the current key count.
    pub fn stats(&self) -> StatsSnapshot {
        self.keyspace.stats.snapshot(self.count())
    }

    /// Removes every key. Counters are kept, and pending wheel entries are
    /// left to fire against the empty shards.
    pub fn flush(&self) {
        for shard in &self.keyspace.shards {
            shard.reset_all();
        }
        info!("Cache flushed");
    }

    /// Stops the background expiry task.
    ///
    /// Lazy expiry keeps working afterwards. Calling this more than once is
    /// harmless; dropping the cache has the same effect.
    pub fn close(&self) {
        self.wheel.stop();
    }

    pub fn is_closed(&self) -> bool {
        !self.wheel.is_running()
    }

    pub fn shard_count(&self) -> usize {
        self.keyspace.shards.len()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Tickets still waiting in the timing wheel, stale ones included.
    pub fn pending_expirations(&self) -> usize {
        self.wheel.pending()
    }
}
