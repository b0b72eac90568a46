//! Storage Module
//!
//! This module provides the core of BlitzCache: a sharded key-value cache
//! with TTL support and a timing wheel that expires keys in the background.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Cache                               │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │...N     │   Stats   │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ shards  │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │ expire(ticket)
//!              ┌─────────────┴─────────────┐
//!              │       TimingWheel         │
//!              │  (Background Tokio Task)  │
//!              └───────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Sharded Storage**: `hash(key) % shard_count` picks one of N locks
//! - **RwLock**: Multiple concurrent readers, exclusive writers
//! - **Lazy Expiry**: Expired keys are removed when read
//! - **Active Expiry**: The timing wheel removes keys nobody reads
//! - **Versioned Writes**: Every overwrite bumps a per-key version
//!
//! ## Example
//!
//! ```
//! use blitzcache::storage::{Cache, CacheConfig};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let cache = Cache::with_config(CacheConfig {
//!     shard_count: 16,
//!     tick_duration: Duration::from_millis(50),
//!     ..Default::default()
//! })
//! .unwrap();
//!
//! cache.set("session", "token123", Duration::from_secs(3600));
//! assert!(cache.get(b"session").is_some());
//! assert_eq!(cache.stats().sets, 1);
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod shard;
pub mod stats;
pub mod wheel;

// Re-export commonly used types
pub use cache::{Cache, ExpiryTicket};
pub use config::{CacheConfig, ConfigError, DEFAULT_HORIZON, DEFAULT_SHARD_COUNT, DEFAULT_TICK};
pub use shard::{CacheItem, Shard};
pub use stats::{Stats, StatsSnapshot};
pub use wheel::{wheel_slots, TimingWheel, WheelCore, MAX_WHEEL_SLOTS, MIN_TICK};
