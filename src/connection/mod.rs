//! Connection Handler Module
//!
//! Each client connection is handled by its own async task, so one slow
//! client never holds up another.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TCP Listener                            │
//! │                    (server.rs)                              │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │
//!                        │ accept()
//!                        ▼
//!           ┌────────────────────────┐
//!           │   For each client...   │
//!           └────────────┬───────────┘
//!                        │
//!                        │ spawn task
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │  │ Read bytes  │───>│ Decode RESP │───>│ Dispatcher  │      │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘      │
//! │                                               │             │
//! │                                               ▼             │
//! │                                      ┌─────────────┐        │
//! │                                      │ Encode reply│        │
//! │                                      └─────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Pipelining**: replies for every frame in one read go out in one write
//! - **Buffer cap**: a client that floods the input buffer is disconnected
//! - **Statistics**: connection, command and byte counters
//!
//! ## Example
//!
//! ```no_run
//! use tallykv::commands::Dispatcher;
//! use tallykv::connection::{handle_connection, ConnectionStats, DEFAULT_MAX_BUFFER};
//! use tallykv::storage::Keyspace;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! # async fn serve() -> std::io::Result<()> {
//! let dispatcher = Arc::new(Dispatcher::new(Arc::new(Keyspace::new())));
//! let stats = Arc::new(ConnectionStats::new());
//! let listener = TcpListener::bind("127.0.0.1:6379").await?;
//!
//! let (stream, addr) = listener.accept().await?;
//! tokio::spawn(handle_connection(stream, addr, dispatcher, stats, DEFAULT_MAX_BUFFER));
//! # Ok(())
//! # }
//! ```

pub mod handler;

pub use handler::{
    handle_connection, ConnectionError, ConnectionHandler, ConnectionStats, DEFAULT_MAX_BUFFER,
};
