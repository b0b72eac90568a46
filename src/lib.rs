//! # BlitzCache - An In-Memory Cache with Timing-Wheel Expiry
//!
//! BlitzCache is a sharded, thread-safe key/value cache. Keys may carry a
//! time-to-live; expired keys disappear when they are read, and a timing
//! wheel driven by a background Tokio task removes the ones nobody reads.
//! The cache can be embedded as a library or served over TCP with a small
//! Redis-style protocol.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              BlitzCache                                 │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │   Server    │───>│ Connection  │───>│  Command    │                  │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │                  │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘                  │
//! │                                               │                         │
//! │                                               ▼                         │
//! │  ┌─────────────┐    ┌──────────────────────────────────────────────┐   │
//! │  │  Request    │    │                   Cache                      │   │
//! │  │  Parser     │    │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ │   │
//! │  │             │    │  │Shard 0 │ │Shard 1 │ │Shard 2 │ │...N    │ │   │
//! │  └─────────────┘    │  │RwLock  │ │RwLock  │ │RwLock  │ │shards  │ │   │
//! │                     │  └────────┘ └────────┘ └────────┘ └────────┘ │   │
//! │                     └──────────────────────────────────────────────┘   │
//! │                                               ▲                         │
//! │                                               │ expire(ticket)          │
//! │                     ┌─────────────────────────┴───────────────────────┐ │
//! │                     │              TimingWheel                        │ │
//! │                     │         (Background Tokio Task)                 │ │
//! │                     └─────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use blitzcache::Cache;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let cache = Cache::new(64);
//!
//! cache.set("greeting", "hello", Duration::ZERO);
//! cache.set("session:9", "abc", Duration::from_secs(30));
//!
//! assert_eq!(cache.get(b"greeting").as_deref(), Some(&b"hello"[..]));
//! assert_eq!(cache.count(), 2);
//!
//! cache.close();
//! # }
//! ```
//!
//! ## Wire Commands
//!
//! - `SET key value [EX seconds]`
//! - `GET key`
//! - `DEL key`
//! - `STATS`
//! - `FLUSH`
//! - `PING`
//! - `QUIT`
//!
//! ## Module Overview
//!
//! - [`storage`]: Shards, statistics, the timing wheel and the `Cache` itself
//! - [`protocol`]: Request parser and reply encoding
//! - [`commands`]: Turns requests into cache operations
//! - [`connection`]: Per-client read/execute/reply loop
//! - [`server`]: TCP accept loop
//!
//! ## Lazy + Active Expiry
//!
//! Keys with a TTL are expired in two ways:
//! 1. **Lazy**: `get` notices the deadline has passed and removes the key
//! 2. **Active**: the timing wheel fires roughly when the deadline passes
//!
//! Each wheel entry remembers the version and deadline of the write that
//! scheduled it, so a key overwritten in the meantime is left alone.

pub mod commands;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::CommandHandler;
pub use connection::handle_connection;
pub use protocol::{ParseError, Reply, RequestParser};
pub use server::Server;
pub use storage::{Cache, CacheConfig, ConfigError, StatsSnapshot};

/// The default address the server binds to
pub const DEFAULT_ADDR: &str = "127.0.0.1:6380";

/// Version of BlitzCache
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
