//! Incremental Request Parser
//!
//! A request arrives in one of two shapes:
//!
//! 1. **Multi-bulk** (what Redis clients send):
//!    `*<N>\r\n` followed by `N` bulk strings `$<len>\r\n<data>\r\n`
//! 2. **Inline** (what you type into telnet or netcat):
//!    `SET key value EX 10\r\n`, split on whitespace
//!
//! Line terminators may be `\r\n` or a bare `\n`.
//!
//! ## How the Parser Works
//!
//! The parser reads from a buffer and returns either:
//! - `Ok(Some((args, consumed)))` - A full request, `consumed` bytes were used
//! - `Ok(None)` - Need more data, the request is incomplete
//! - `Err(ParseError)` - The bytes cannot be a request
//!
//! The caller appends network data to its buffer, calls `parse()`, and on
//! success advances the buffer by `consumed` bytes. A request with no
//! arguments (a blank line, `*0`) is returned as an empty vector.

use crate::protocol::types::prefix;
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur while parsing a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A length or count field is not a number
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// Bulk string length is negative
    #[error("invalid bulk length: {0}")]
    InvalidBulkLength(i64),

    /// Multi-bulk count is negative (but not -1)
    #[error("invalid multibulk length: {0}")]
    InvalidArgCount(i64),

    /// A multi-bulk element did not start with `$`
    #[error("expected '$', got '{0}'")]
    ExpectedBulk(char),

    /// Bulk data not followed by a line terminator
    #[error("bulk string missing trailing CRLF")]
    MissingTerminator,

    /// A length or count above the configured limit
    #[error("request too large: {size} (max: {max})")]
    TooLarge { size: usize, max: usize },

    /// A header or inline line with no terminator in sight
    #[error("line too long (max: {max} bytes)")]
    LineTooLong { max: usize },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// The arguments of one request, command name first.
pub type Request = Vec<Bytes>;

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum number of arguments in one multi-bulk request
pub const MAX_ARGS: usize = 1024 * 1024;

/// Maximum length of an inline request or header line
pub const MAX_INLINE_SIZE: usize = 64 * 1024;

/// Parses requests out of a byte buffer.
///
/// # Example
///
/// ```
/// use blitzcache::protocol::RequestParser;
///
/// let parser = RequestParser::new();
/// let (args, consumed) = parser
///     .parse(b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n")
///     .unwrap()
///     .unwrap();
///
/// assert_eq!(args, vec!["GET", "name"]);
/// assert_eq!(consumed, 23);
/// ```
#[derive(Debug, Clone)]
pub struct RequestParser {
    max_bulk: usize,
    max_args: usize,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestParser {
    /// Creates a parser with the default limits.
    pub fn new() -> Self {
        Self::with_limits(MAX_BULK_SIZE, MAX_ARGS)
    }

    /// Creates a parser with custom bulk size and argument count limits.
    pub fn with_limits(max_bulk: usize, max_args: usize) -> Self {
        Self { max_bulk, max_args }
    }

    pub fn max_bulk(&self) -> usize {
        self.max_bulk
    }

    /// Attempts to parse one request from the front of `buf`.
    pub fn parse(&self, buf: &[u8]) -> ParseResult<Option<(Request, usize)>> {
        match buf.first() {
            None => Ok(None),
            Some(&prefix::ARRAY) => self.parse_multibulk(buf),
            Some(_) => self.parse_inline(buf),
        }
    }

    /// Parses `*<N>\r\n` and `N` bulk strings.
    fn parse_multibulk(&self, buf: &[u8]) -> ParseResult<Option<(Request, usize)>> {
        let Some((header, mut consumed)) = read_line(buf)? else {
            return Ok(None);
        };

        let count = parse_int(&header[1..])?;
        if count < -1 {
            return Err(ParseError::InvalidArgCount(count));
        }
        if count <= 0 {
            return Ok(Some((Vec::new(), consumed)));
        }

        let count = count as usize;
        if count > self.max_args {
            return Err(ParseError::TooLarge {
                size: count,
                max: self.max_args,
            });
        }

        let mut args = Vec::with_capacity(count.min(64));

        for _ in 0..count {
            let Some((line, used)) = read_line(&buf[consumed..])? else {
                return Ok(None);
            };

            match line.first() {
                Some(&prefix::BULK_STRING) => {}
                Some(&other) => return Err(ParseError::ExpectedBulk(char::from(other))),
                None => return Err(ParseError::ExpectedBulk(' ')),
            }

            let length = parse_int(&line[1..])?;
            if length < 0 {
                return Err(ParseError::InvalidBulkLength(length));
            }

            let length = length as usize;
            if length > self.max_bulk {
                return Err(ParseError::TooLarge {
                    size: length,
                    max: self.max_bulk,
                });
            }

            let data_start = consumed + used;
            let data_end = data_start + length;

            let terminator = match buf.get(data_end) {
                None => return Ok(None),
                Some(b'\n') => 1,
                Some(b'\r') => match buf.get(data_end + 1) {
                    None => return Ok(None),
                    Some(b'\n') => 2,
                    Some(_) => return Err(ParseError::MissingTerminator),
                },
                Some(_) => return Err(ParseError::MissingTerminator),
            };

            args.push(Bytes::copy_from_slice(&buf[data_start..data_end]));
            consumed = data_end + terminator;
        }

        Ok(Some((args, consumed)))
    }

    /// Parses a whitespace-separated line.
    fn parse_inline(&self, buf: &[u8]) -> ParseResult<Option<(Request, usize)>> {
        let Some((line, consumed)) = read_line(buf)? else {
            return Ok(None);
        };

        let args = line
            .split(|b| b.is_ascii_whitespace())
            .filter(|part| !part.is_empty())
            .map(Bytes::copy_from_slice)
            .collect();

        Ok(Some((args, consumed)))
    }
}

/// Finds the first line in `buf`.
///
/// Returns the line without its terminator and the number of bytes used,
/// including the terminator.
fn read_line(buf: &[u8]) -> ParseResult<Option<(&[u8], usize)>> {
    match buf.iter().position(|&b| b == b'\n') {
        Some(pos) => {
            let line = &buf[..pos];
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            Ok(Some((line, pos + 1)))
        }
        None if buf.len() > MAX_INLINE_SIZE => Err(ParseError::LineTooLong {
            max: MAX_INLINE_SIZE,
        }),
        None => Ok(None),
    }
}

fn parse_int(digits: &[u8]) -> ParseResult<i64> {
    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .ok_or_else(|| ParseError::InvalidInteger(String::from_utf8_lossy(digits).into_owned()))
}

/// Helper function to parse a single request with the default limits.
pub fn parse_request(buf: &[u8]) -> ParseResult<Option<(Request, usize)>> {
    RequestParser::new().parse(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Request {
        parts.iter().map(|s| Bytes::from(s.to_string())).collect()
    }

    #[test]
    fn test_parse_multibulk() {
        let input = b"*3\r\n$3\r\nSET\r\n$8\r\nitem:042\r\n$4\r\nteal\r\n";
        let (request, consumed) = parse_request(input).unwrap().unwrap();
        assert_eq!(request, args(&["SET", "item:042", "teal"]));
        assert_eq!(consumed, input.len());
    }

    #[test]
    fn test_parse_multibulk_incomplete() {
        let input = b"*2\r\n$3\r\nGET\r\n$4\r\nna";
        for end in 0..input.len() {
            assert!(
                parse_request(&input[..end]).unwrap().is_none(),
                "prefix of {} bytes should be incomplete",
                end
            );
        }
    }

    #[test]
    fn test_parse_pipelined() {
        let input = b"*1\r\n$4\r\nPING\r\n*2\r\n$3\r\nGET\r\n$1\r\na\r\n";
        let (first, consumed) = parse_request(input).unwrap().unwrap();
        assert_eq!(first, args(&["PING"]));
        assert_eq!(consumed, 14);

        let (second, rest) = parse_request(&input[consumed..]).unwrap().unwrap();
        assert_eq!(second, args(&["GET", "a"]));
        assert_eq!(consumed + rest, input.len());
    }

    #[test]
    fn test_parse_empty_multibulk() {
        assert_eq!(parse_request(b"*0\r\n").unwrap(), Some((vec![], 4)));
        assert_eq!(parse_request(b"*-1\r\n").unwrap(), Some((vec![], 5)));
    }

    #[test]
    fn test_parse_inline() {
        let (request, consumed) = parse_request(b"SET  key value\r\n").unwrap().unwrap();
        assert_eq!(request, args(&["SET", "key", "value"]));
        assert_eq!(consumed, 16);
    }

    #[test]
    fn test_parse_inline_bare_newline() {
        let (request, consumed) = parse_request(b"get key\n").unwrap().unwrap();
        assert_eq!(request, args(&["get", "key"]));
        assert_eq!(consumed, 8);
    }

    #[test]
    fn test_parse_blank_line() {
        assert_eq!(parse_request(b"\r\n").unwrap(), Some((vec![], 2)));
    }

    #[test]
    fn test_parse_inline_incomplete() {
        assert!(parse_request(b"PING").unwrap().is_none());
    }

    #[test]
    fn test_binary_safe_bulk_string() {
        let input = b"*1\r\n$5\r\nhel\x00o\r\n";
        let (request, _) = parse_request(input).unwrap().unwrap();
        assert_eq!(request[0], Bytes::from(&b"hel\x00o"[..]));
    }

    #[test]
    fn test_bulk_containing_crlf() {
        let input = b"*1\r\n$4\r\na\r\nb\r\n";
        let (request, consumed) = parse_request(input).unwrap().unwrap();
        assert_eq!(request[0], Bytes::from("a\r\nb"));
        assert_eq!(consumed, input.len());
    }

    #[test]
    fn test_invalid_count() {
        assert!(matches!(
            parse_request(b"*abc\r\n"),
            Err(ParseError::InvalidInteger(_))
        ));
        assert_eq!(
            parse_request(b"*-5\r\n"),
            Err(ParseError::InvalidArgCount(-5))
        );
    }

    #[test]
    fn test_expected_bulk() {
        assert_eq!(
            parse_request(b"*1\r\n:5\r\n"),
            Err(ParseError::ExpectedBulk(':'))
        );
    }

    #[test]
    fn test_negative_bulk_length() {
        assert_eq!(
            parse_request(b"*1\r\n$-3\r\n"),
            Err(ParseError::InvalidBulkLength(-3))
        );
    }

    #[test]
    fn test_missing_terminator() {
        assert_eq!(
            parse_request(b"*1\r\n$3\r\nGETX\r\n"),
            Err(ParseError::MissingTerminator)
        );
    }

    #[test]
    fn test_limits() {
        let parser = RequestParser::with_limits(4, 2);
        assert!(matches!(
            parser.parse(b"*3\r\n"),
            Err(ParseError::TooLarge { size: 3, max: 2 })
        ));
        assert!(matches!(
            parser.parse(b"*1\r\n$5\r\n"),
            Err(ParseError::TooLarge { size: 5, max: 4 })
        ));
    }

    #[test]
    fn test_line_too_long() {
        let input = vec![b'a'; MAX_INLINE_SIZE + 1];
        assert!(matches!(
            parse_request(&input),
            Err(ParseError::LineTooLong { .. })
        ));
    }
}
