//! Connection Handler Module
//!
//! Drives one client connection: read bytes, decode request frames, run them
//! through the [`Dispatcher`], write the replies.
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
//! 3. ┌──────────────────────────────────┐
//!    │      Main Loop                   │
//!    │                                  │
//!    │  decode every complete frame     │
//!    │  in the buffer, dispatch it,     │
//!    │  encode the reply into `out`     │
//!    │              │                   │
//!    │              ▼                   │
//!    │  flush all replies in one write  │
//!    │              │                   │
//!    │              ▼                   │
//!    │  read more bytes from the socket │
//!    │              │                   │
//!    │         [Loop back]              │
//!    └──────────────────────────────────┘
//!        │
//!        ▼
//! 4. QUIT / client disconnects / protocol error
//!        │
//!        ▼
//! 5. Handler task ends
//! ```
//!
//! ## Buffer Management
//!
//! TCP is a stream: one read may hold half a request or a dozen pipelined
//! ones. Incoming bytes accumulate in a `BytesMut` until the decoder can split
//! a whole frame off the front. Replies for every frame decoded from one read
//! are gathered in a second buffer and written together.
//!
//! Command errors are ordinary replies and never close the connection. A
//! protocol violation gets one `-ERR Protocol error: ...` reply and closes it,
//! since the byte stream can't be resynchronized.

use crate::commands::{Dispatcher, Reply};
use crate::protocol::{decode, encode_error_text, encode_reply, encode_result, ProtocolError};
use bytes::{Bytes, BytesMut};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, trace, warn};

/// Default cap on buffered, not yet decoded input (64 KB)
pub const DEFAULT_MAX_BUFFER: usize = 64 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection over any byte stream.
///
/// The TCP server hands it a `TcpStream`; tests hand it an in-memory mock.
pub struct ConnectionHandler<S> {
    stream: S,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Bytes read but not yet decoded
    buffer: BytesMut,

    /// Encoded replies waiting to be written
    out: BytesMut,

    /// Shared command dispatcher
    dispatcher: Arc<Dispatcher>,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,

    max_buffer: usize,
}

/// What the loop does after draining the decoded frames.
enum Next {
    Read,
    Close,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        addr: SocketAddr,
        dispatcher: Arc<Dispatcher>,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream,
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            out: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            dispatcher,
            stats,
            max_buffer: DEFAULT_MAX_BUFFER,
        }
    }

    /// Sets the cap on buffered input; a client exceeding it is disconnected.
    pub fn with_max_buffer(mut self, max_buffer: usize) -> Self {
        self.max_buffer = max_buffer;
        self
    }

    /// Runs the connection until the client leaves or an error occurs.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client quit"),
            Err(ConnectionError::ClientDisconnected) => {
                info!(client = %self.addr, "Client disconnected")
            }
            Err(ConnectionError::IoError(io_err))
                if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection error"),
        }

        self.stats.connection_closed();
        result
    }

    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            let next = self.process_buffered();
            self.flush_replies().await?;

            match next {
                Ok(Next::Read) => self.read_more_data().await?,
                Ok(Next::Close) => return Ok(()),
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Dispatches every complete frame in the buffer, encoding replies into
    /// `out`. A protocol error is encoded too, then returned.
    fn process_buffered(&mut self) -> Result<Next, ProtocolError> {
        loop {
            let frame = match decode(&mut self.buffer) {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    trace!(
                        client = %self.addr,
                        buffered = self.buffer.len(),
                        "Incomplete request, need more data"
                    );
                    return Ok(Next::Read);
                }
                Err(e) => {
                    warn!(client = %self.addr, error = %e, "Protocol error");
                    encode_error_text(&format!("ERR Protocol error: {}", e), &mut self.out);
                    return Err(e);
                }
            };

            if is_quit(&frame) {
                encode_reply(&Reply::ok(), &mut self.out);
                return Ok(Next::Close);
            }

            let result = self.dispatcher.execute(&frame);
            encode_result(&result, &mut self.out);
            self.stats.command_processed();
        }
    }

    async fn flush_replies(&mut self) -> Result<(), ConnectionError> {
        if self.out.is_empty() {
            return Ok(());
        }

        let reply = self.out.split();
        self.stream.write_all(&reply).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(reply.len());
        trace!(client = %self.addr, bytes = reply.len(), "Sent replies");
        Ok(())
    }

    /// Reads more data from the stream into the buffer.
    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        if self.buffer.len() >= self.max_buffer {
            error!(
                client = %self.addr,
                size = self.buffer.len(),
                limit = self.max_buffer,
                "Buffer size limit exceeded"
            );
            encode_error_text("ERR Protocol error: too big request", &mut self.out);
            self.flush_replies().await?;
            return Err(ConnectionError::BufferFull);
        }

        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(INITIAL_BUFFER_SIZE);
        }

        let n = self.stream.read_buf(&mut self.buffer).await?;

        if n == 0 {
            if self.buffer.is_empty() {
                return Err(ConnectionError::ClientDisconnected);
            }
            return Err(ConnectionError::UnexpectedEof);
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");

        Ok(())
    }
}

fn is_quit(frame: &[Bytes]) -> bool {
    frame
        .first()
        .is_some_and(|name| name.eq_ignore_ascii_case(b"QUIT"))
}

/// Errors that can occur while handling a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The client broke the wire protocol
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

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

/// Runs a [`ConnectionHandler`] to completion, logging how it ended.
pub async fn handle_connection<S>(
    stream: S,
    addr: SocketAddr,
    dispatcher: Arc<Dispatcher>,
    stats: Arc<ConnectionStats>,
    max_buffer: usize,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handler = ConnectionHandler::new(stream, addr, dispatcher, stats)
        .with_max_buffer(max_buffer);
    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::ClientDisconnected => {}
            ConnectionError::IoError(ref io_err)
                if io_err.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => {
                debug!(client = %addr, error = %e, "Connection ended with error");
            }
        }
    }
}
