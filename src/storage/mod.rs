//! Storage Module
//!
//! Owns every stored value. The [`Keyspace`] maps keys to typed [`Object`]s,
//! and the [`ExpirySweeper`] purges expired objects nobody reads.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Keyspace                             │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐            │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │...N     │            │
//! │  │ key→Obj │ │ key→Obj │ │ key→Obj │ │ shards  │            │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘            │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │
//!              ┌─────────────┴─────────────┐
//!              │      ExpirySweeper        │
//!              │  (Background Tokio Task)  │
//!              └───────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use tallykv::storage::{Keyspace, Object, Value, ValueKind};
//! use bytes::Bytes;
//! use std::time::Duration;
//!
//! let keyspace = Keyspace::new();
//!
//! keyspace.set(Bytes::from("name"), Object::string("Ada"));
//! assert_eq!(keyspace.kind_of(b"name"), Some(ValueKind::String));
//!
//! keyspace.set(
//!     Bytes::from("session"),
//!     Object::with_ttl(Value::String(Bytes::from("token")), Duration::from_secs(3600)),
//! );
//! assert!(keyspace.get(b"session").unwrap().ttl().is_some());
//! ```

pub mod expiry;
pub mod keyspace;
pub mod object;

pub use expiry::{ExpiryConfig, ExpirySweeper};
pub use keyspace::{
    glob_match, KeyGuard, Keyspace, KeyspaceStats, MemoryInfo, ShardSweep, DEFAULT_SHARDS,
};
pub use object::{HashValue, ListValue, Object, Payload, SetValue, Value, ValueKind};
