//! Wire Protocol
//!
//! This module implements the line-oriented protocol BlitzCache speaks.
//! Requests are RESP multi-bulk arrays or plain inline lines; replies use
//! RESP framing.
//!
//! ## Modules
//!
//! - `types`: Defines the `Reply` enum and its serialization
//! - `parser`: Incremental parser for incoming requests
//!
//! ## Example
//!
//! ```
//! use blitzcache::protocol::{parse_request, Reply};
//!
//! // Parsing incoming data
//! let data = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
//! let (args, consumed) = parse_request(data).unwrap().unwrap();
//! assert_eq!(args.len(), 2);
//! assert_eq!(consumed, data.len());
//!
//! // Creating replies
//! let reply = Reply::bulk("teal");
//! assert_eq!(reply.serialize(), b"$4\r\nteal\r\n");
//! ```

pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{parse_request, ParseError, ParseResult, Request, RequestParser};
pub use types::Reply;
