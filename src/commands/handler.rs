//! Command Handler Module
//!
//! This module implements the commands BlitzCache understands. A parsed
//! request (a list of arguments) is first turned into a typed [`Command`],
//! then executed against the shared [`Cache`].
//!
//! ## Supported Commands
//!
//! - `SET key value [EX seconds]` - Set a key, optionally with a TTL
//! - `GET key` - Get a key's value
//! - `DEL key` - Delete a key
//! - `STATS` - Cache counters as `name:value` pairs
//! - `FLUSH` - Remove every key
//! - `PING` - Test connection
//! - `QUIT` - Close the connection
//!
//! Command names are case-insensitive.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │    args     │───>│  Command::  │───>│  execute()  │     │
//! │  │             │    │   parse()   │    │             │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! │                                               │             │
//! │                                               ▼             │
//! │                                             Cache           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::protocol::Reply;
use crate::storage::Cache;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Reasons a request cannot be turned into a [`Command`].
///
/// The `Display` text is exactly what goes back to the client after `-`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("ERR empty command")]
    Empty,

    #[error("ERR unknown command: {0}")]
    Unknown(String),

    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),

    #[error("ERR syntax error")]
    Syntax,

    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,

    #[error("ERR invalid expire time in '{0}' command")]
    InvalidExpire(&'static str),
}

/// A validated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// SET key value [EX seconds]
    Set {
        key: Bytes,
        value: Bytes,
        ttl: Option<Duration>,
    },
    /// GET key
    Get { key: Bytes },
    /// DEL key
    Del { key: Bytes },
    /// STATS
    Stats,
    /// FLUSH
    Flush,
    /// PING
    Ping,
    /// QUIT
    Quit,
}

impl Command {
    /// Parses the arguments of one request, command name first.
    pub fn parse(args: Vec<Bytes>) -> Result<Self, CommandError> {
        let mut args = args.into_iter();

        let name = match args.next() {
            Some(name) => String::from_utf8_lossy(&name).to_uppercase(),
            None => return Err(CommandError::Empty),
        };
        let rest: Vec<Bytes> = args.collect();

        match name.as_str() {
            "SET" => Self::parse_set(rest),
            "GET" => {
                let [key] = exact::<1>(rest, "get")?;
                Ok(Command::Get { key })
            }
            "DEL" => {
                let [key] = exact::<1>(rest, "del")?;
                Ok(Command::Del { key })
            }
            "STATS" => {
                exact::<0>(rest, "stats")?;
                Ok(Command::Stats)
            }
            "FLUSH" => {
                exact::<0>(rest, "flush")?;
                Ok(Command::Flush)
            }
            "PING" => {
                exact::<0>(rest, "ping")?;
                Ok(Command::Ping)
            }
            "QUIT" => Ok(Command::Quit),
            _ => Err(CommandError::Unknown(name)),
        }
    }

    /// SET key value [EX seconds]
    fn parse_set(args: Vec<Bytes>) -> Result<Self, CommandError> {
        let mut args = args.into_iter();

        let (Some(key), Some(value)) = (args.next(), args.next()) else {
            return Err(CommandError::WrongArity("set"));
        };

        let ttl = match (args.next(), args.next(), args.next()) {
            (None, _, _) => None,
            (Some(option), Some(seconds), None) if option.eq_ignore_ascii_case(b"EX") => {
                let seconds = std::str::from_utf8(&seconds)
                    .ok()
                    .and_then(|s| s.parse::<i64>().ok())
                    .ok_or(CommandError::NotAnInteger)?;
                if seconds <= 0 {
                    return Err(CommandError::InvalidExpire("set"));
                }
                Some(Duration::from_secs(seconds as u64))
            }
            _ => return Err(CommandError::Syntax),
        };

        Ok(Command::Set { key, value, ttl })
    }
}

/// Checks that exactly `N` arguments were given.
fn exact<const N: usize>(args: Vec<Bytes>, name: &'static str) -> Result<[Bytes; N], CommandError> {
    args.try_into()
        .map_err(|_| CommandError::WrongArity(name))
}

/// What the connection should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Send this reply and keep reading.
    Reply(Reply),
    /// Close the connection without replying.
    Close,
}

/// Executes requests against the shared cache.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    cache: Arc<Cache>,
}

impl CommandHandler {
    /// Creates a new command handler for the given cache.
    pub fn new(cache: Arc<Cache>) -> Self {
        Self { cache }
    }

    /// Parses and executes one request.
    ///
    /// Invalid requests become error replies; they never end the connection.
    pub fn execute(&self, args: Vec<Bytes>) -> Outcome {
        match Command::parse(args) {
            Ok(command) => self.dispatch(command),
            Err(e) => Outcome::Reply(Reply::error(e.to_string())),
        }
    }

    /// Runs a parsed command.
    pub fn dispatch(&self, command: Command) -> Outcome {
        let reply = match command {
            Command::Set { key, value, ttl } => {
                self.cache.set(key, value, ttl.unwrap_or(Duration::ZERO));
                Reply::ok()
            }
            Command::Get { key } => match self.cache.get(&key) {
                Some(value) => Reply::bulk(value),
                None => Reply::null(),
            },
            Command::Del { key } => Reply::integer(i64::from(self.cache.delete(&key))),
            Command::Stats => Reply::simple(self.cache.stats().to_string()),
            Command::Flush => {
                self.cache.flush();
                Reply::ok()
            }
            Command::Ping => Reply::pong(),
            Command::Quit => return Outcome::Close,
        };

        Outcome::Reply(reply)
    }

    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }
}
