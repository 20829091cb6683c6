//! # tallykv - An In-Memory Data-Structure Server
//!
//! tallykv keeps strings, hashes, lists and sets in a sharded in-memory
//! keyspace and serves them over the RESP protocol. Every command runs
//! atomically with respect to the key it touches, so concurrent increments on
//! one hash field never lose an update.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              tallykv                                    │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│ Dispatcher  │                  │
//! │  │ (server.rs) │    │  Handler    │    │ + handlers  │                  │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘                  │
//! │                            │                  │ type guard              │
//! │                     ┌──────┴──────┐           ▼                         │
//! │                     │ RESP decode │  ┌──────────────────────────────┐   │
//! │                     │ RESP encode │  │          Keyspace            │   │
//! │                     └─────────────┘  │ ┌───────┐┌───────┐┌───────┐  │   │
//! │                                      │ │Shard 0││Shard 1││...N   │  │   │
//! │                                      │ │RwLock ││RwLock ││shards │  │   │
//! │                                      │ └───────┘└───────┘└───────┘  │   │
//! │                                      └──────────────▲───────────────┘   │
//! │                                                     │                   │
//! │                                      ┌──────────────┴───────────────┐   │
//! │                                      │        ExpirySweeper         │   │
//! │                                      │   (background tokio task)    │   │
//! │                                      └──────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! The command layer needs no network at all:
//!
//! ```
//! use bytes::Bytes;
//! use std::sync::Arc;
//! use tallykv::commands::{Dispatcher, Reply};
//! use tallykv::storage::Keyspace;
//!
//! let dispatcher = Dispatcher::new(Arc::new(Keyspace::new()));
//! let frame = |parts: &[&'static str]| -> Vec<Bytes> {
//!     parts.iter().map(|p| Bytes::from_static(p.as_bytes())).collect()
//! };
//!
//! dispatcher.execute(&frame(&["HINCRBYFLOAT", "prices", "apple", "10.1"])).unwrap();
//! let reply = dispatcher.execute(&frame(&["HINCRBYFLOAT", "prices", "apple", "10.5"]));
//! assert_eq!(reply, Ok(Reply::Float("20.6".into())));
//!
//! dispatcher.execute(&frame(&["SET", "name", "value"])).unwrap();
//! let err = dispatcher
//!     .execute(&frame(&["HINCRBYFLOAT", "name", "f", "1"]))
//!     .unwrap_err();
//! assert_eq!(
//!     err.to_string(),
//!     "WRONGTYPE Operation against a key holding the wrong kind of value"
//! );
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: value objects, the sharded keyspace and active expiry
//! - [`commands`]: error taxonomy, type guard, dispatcher and command handlers
//! - [`protocol`]: RESP request decoder and reply encoder
//! - [`connection`]: per-client read/dispatch/write loop
//! - [`server`]: TCP accept loop
//! - [`config`]: command-line and environment configuration
//!
//! ## Lazy + Active Expiry
//!
//! Keys with a TTL are expired in two ways:
//! 1. **Lazy**: every access checks the deadline and purges a dead key
//! 2. **Active**: a background task sweeps a few shards per tick
//!
//! Memory is reclaimed even for keys that are never touched again.

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod storage;

pub use commands::{CommandError, Dispatcher, Reply};
pub use config::Config;
pub use connection::{handle_connection, ConnectionStats};
pub use storage::{ExpiryConfig, ExpirySweeper, Keyspace};

/// Version of tallykv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
