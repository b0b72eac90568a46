//! Command Handler Module
//!
//! This module implements the command processing layer for BlitzCache.
//! It receives parsed requests, validates them, executes them against the
//! cache, and returns the reply to send back.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │ Request Parser  │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! │                 │
//! │  - Parse        │
//! │  - Validate     │
//! │  - Execute      │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │     Cache       │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - `SET`, `GET`, `DEL`
//! - `STATS`, `FLUSH`
//! - `PING`, `QUIT`

pub mod handler;

// Re-export the main command handler
pub use handler::{Command, CommandError, CommandHandler, Outcome};
