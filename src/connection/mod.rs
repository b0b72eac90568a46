//! Client Connections
//!
//! Every accepted socket is served by its own task. The task owns a read
//! buffer, pulls as many complete requests out of it as it can, runs them
//! through the [`CommandHandler`](crate::commands::CommandHandler), and
//! flushes the replies in one write.
//!
//! ```text
//!  socket ──read──> BytesMut ──parse──> args ──execute──> Reply
//!     ▲                                                     │
//!     └───────────────────── flush <── BufWriter <──────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use blitzcache::commands::CommandHandler;
//! use blitzcache::connection::handle_connection;
//! use blitzcache::storage::Cache;
//! use std::sync::Arc;
//!
//! let handler = CommandHandler::new(Arc::new(Cache::new(256)));
//!
//! // For each accepted connection...
//! let (stream, addr) = listener.accept().await?;
//! tokio::spawn(handle_connection(stream, addr, handler.clone()));
//! ```

pub mod handler;

pub use handler::{handle_connection, ConnectionError, ConnectionHandler};
