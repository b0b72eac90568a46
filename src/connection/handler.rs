//! Connection Handler Module
//!
//! This module handles individual client connections to BlitzCache.
//! Each client gets its own handler task that runs in a loop,
//! reading requests and sending replies.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  Parse every complete        │
//!    │  request in the buffer,      │
//!    │  execute, queue replies      │
//!    │              │               │
//!    │              ▼               │
//!    │  Flush replies               │
//!    │              │               │
//!    │              ▼               │
//!    │  Read more bytes             │
//!    │              │               │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. QUIT, disconnect, I/O error or protocol error
//!        │
//!        ▼
//! 5. Handler task ends
//! ```
//!
//! Bad arguments only produce an error reply. Bytes that cannot be framed as
//! a request get one error reply and end the connection, since there is no
//! way to find where the next request starts.

use crate::commands::{CommandHandler, Outcome};
use crate::protocol::parser::MAX_INLINE_SIZE;
use crate::protocol::{ParseError, Reply, RequestParser};
use bytes::BytesMut;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, info, trace, warn};

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Handles a single client connection.
///
/// Generic over the stream so tests can drive it with in-memory I/O.
pub struct ConnectionHandler<S> {
    /// The client stream, with buffered writes
    stream: BufWriter<S>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Buffer for incoming data
    buffer: BytesMut,

    /// The command handler (shared cache)
    command_handler: CommandHandler,

    parser: RequestParser,

    /// Largest the read buffer may grow
    max_buffer: usize,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new connection handler.
    pub fn new(stream: S, addr: SocketAddr, command_handler: CommandHandler) -> Self {
        let parser = RequestParser::new();
        let max_buffer = parser.max_bulk() + MAX_INLINE_SIZE;

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            command_handler,
            parser,
            max_buffer,
        }
    }

    /// Runs the connection until the client leaves or an error occurs.
    ///
    /// Returns `Ok(())` when the client sent QUIT.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client quit"),
            Err(ConnectionError::ClientDisconnected) => {
                info!(client = %self.addr, "Client disconnected")
            }
            Err(ConnectionError::Io(io_err))
                if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection error"),
        }

        result
    }

    /// The main read-execute-respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            let mut pending_flush = false;

            loop {
                let args = match self.parser.parse(&self.buffer) {
                    Ok(Some((args, consumed))) => {
                        let _ = self.buffer.split_to(consumed);
                        trace!(
                            client = %self.addr,
                            consumed = consumed,
                            remaining = self.buffer.len(),
                            "Parsed request"
                        );
                        args
                    }
                    Ok(None) => break,
                    Err(e) => return self.reject(e).await,
                };

                if args.is_empty() {
                    continue;
                }

                match self.command_handler.execute(args) {
                    Outcome::Reply(reply) => {
                        self.queue_reply(&reply).await?;
                        pending_flush = true;
                    }
                    Outcome::Close => {
                        self.stream.flush().await?;
                        return Ok(());
                    }
                }
            }

            // Replies for one batch of pipelined requests go out together
            if pending_flush {
                self.stream.flush().await?;
            }

            self.read_more_data().await?;
        }
    }

    /// Reports an unparseable request and gives up on the connection.
    async fn reject(&mut self, error: ParseError) -> Result<(), ConnectionError> {
        warn!(client = %self.addr, error = %error, "Protocol error");

        let reply = Reply::error(format!("ERR Protocol error: {}", error));
        self.queue_reply(&reply).await?;
        self.stream.flush().await?;

        Err(ConnectionError::Parse(error))
    }

    /// Reads more data from the socket into the buffer.
    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        if self.buffer.len() >= self.max_buffer {
            warn!(
                client = %self.addr,
                size = self.buffer.len(),
                "Buffer size limit exceeded"
            );
            return Err(ConnectionError::BufferFull);
        }

        // Ensure we have some capacity
        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(INITIAL_BUFFER_SIZE);
        }

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;

        if n == 0 {
            return if self.buffer.is_empty() {
                Err(ConnectionError::ClientDisconnected)
            } else {
                Err(ConnectionError::UnexpectedEof)
            };
        }

        trace!(client = %self.addr, bytes = n, "Read data");
        Ok(())
    }

    /// Writes a reply into the output buffer.
    async fn queue_reply(&mut self, reply: &Reply) -> Result<(), ConnectionError> {
        let bytes = reply.serialize();
        self.stream.write_all(&bytes).await?;
        trace!(client = %self.addr, bytes = bytes.len(), "Queued reply");
        Ok(())
    }
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bytes that cannot be framed as a request
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Client disconnected normally
    #[error("Client disconnected")]
    ClientDisconnected,

    /// Unexpected end of stream (partial request)
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    /// Buffer size limit exceeded
    #[error("Buffer size limit exceeded")]
    BufferFull,
}

/// Handles a client connection.
///
/// This is a convenience function that creates a ConnectionHandler
/// and runs it to completion. Errors only end this connection.
pub async fn handle_connection(stream: TcpStream, addr: SocketAddr, command_handler: CommandHandler) {
    let handler = ConnectionHandler::new(stream, addr, command_handler);
    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::ClientDisconnected => {}
            ConnectionError::Io(ref io_err)
                if io_err.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => {
                debug!(client = %addr, error = %e, "Connection ended with error");
            }
        }
    }
}
