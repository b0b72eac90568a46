//! Reply Types
//!
//! This module defines the replies the server sends back. They use the RESP
//! framing, where each reply starts with a type prefix byte:
//! - `+` Simple String
//! - `-` Error
//! - `:` Integer
//! - `$` Bulk String (`$-1` is the null reply)
//!
//! All replies are terminated with CRLF (`\r\n`).
//!
//! ## Examples
//!
//! Simple String: `+OK\r\n`
//! Error: `-ERR unknown command: FOO\r\n`
//! Integer: `:1\r\n`
//! Bulk String: `$5\r\nhello\r\n`
//! Null: `$-1\r\n`

use bytes::Bytes;
use std::fmt;

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// RESP protocol type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A reply to one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Status line, must not contain CRLF.
    /// Format: `+<string>\r\n`
    Simple(String),

    /// Error line.
    /// Format: `-<error message>\r\n`
    Error(String),

    /// Format: `:<integer>\r\n`
    Integer(i64),

    /// Binary-safe payload.
    /// Format: `$<length>\r\n<data>\r\n`
    Bulk(Bytes),

    /// Missing value.
    /// Format: `$-1\r\n`
    Null,
}

impl Reply {
    /// Creates a new simple string reply.
    ///
    /// # Example
    /// ```
    /// use blitzcache::protocol::Reply;
    /// assert_eq!(Reply::simple("OK").serialize(), b"+OK\r\n");
    /// ```
    pub fn simple(s: impl Into<String>) -> Self {
        Reply::Simple(s.into())
    }

    /// Creates a new error reply.
    pub fn error(s: impl Into<String>) -> Self {
        Reply::Error(s.into())
    }

    pub fn integer(n: i64) -> Self {
        Reply::Integer(n)
    }

    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Reply::Bulk(data.into())
    }

    pub fn null() -> Self {
        Reply::Null
    }

    /// Common reply for successful operations
    pub fn ok() -> Self {
        Reply::Simple("OK".to_string())
    }

    /// Reply to PING
    pub fn pong() -> Self {
        Reply::Simple("PONG".to_string())
    }

    /// Serializes the reply to bytes for sending over the wire.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the reply into an existing buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            Reply::Simple(s) => {
                buf.push(prefix::SIMPLE_STRING);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Reply::Error(s) => {
                buf.push(prefix::ERROR);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Reply::Integer(n) => {
                buf.push(prefix::INTEGER);
                buf.extend_from_slice(n.to_string().as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Reply::Bulk(data) => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(data.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                buf.extend_from_slice(data);
                buf.extend_from_slice(CRLF);
            }
            Reply::Null => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(b"-1");
                buf.extend_from_slice(CRLF);
            }
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Simple(s) => write!(f, "{}", s),
            Reply::Error(s) => write!(f, "(error) {}", s),
            Reply::Integer(n) => write!(f, "(integer) {}", n),
            Reply::Bulk(data) => match std::str::from_utf8(data) {
                Ok(s) => write!(f, "\"{}\"", s),
                Err(_) => write!(f, "(binary data, {} bytes)", data.len()),
            },
            Reply::Null => write!(f, "(nil)"),
        }
    }
}
