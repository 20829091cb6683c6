//! Command Execution Module
//!
//! Receives a decoded command (name plus arguments), runs it against the
//! keyspace and returns a transport-agnostic [`Reply`] or [`CommandError`].
//!
//! ## Architecture
//!
//! ```text
//! Decoded request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │   Dispatcher    │  name → CommandSpec, arity check
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ Command Handler │  hash / string / list / set / keys / server
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │   Type Guard    │  WRONGTYPE check, create-on-demand
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │    Keyspace     │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! ### Hash Commands
//! - `HSET`, `HMSET`, `HSETNX`, `HGET`, `HMGET`, `HDEL`
//! - `HEXISTS`, `HLEN`, `HSTRLEN`, `HKEYS`, `HVALS`, `HGETALL`
//! - `HINCRBY`, `HINCRBYFLOAT`
//!
//! ### String Commands
//! - `SET`, `GET`, `GETDEL`, `SETNX`, `APPEND`, `STRLEN`
//! - `INCR`, `DECR`, `INCRBY`, `DECRBY`, `INCRBYFLOAT`
//! - `MSET`, `MGET`
//!
//! ### List Commands
//! - `LPUSH`, `RPUSH`, `LPOP`, `RPOP`, `LLEN`, `LINDEX`, `LRANGE`, `LSET`
//!
//! ### Set Commands
//! - `SADD`, `SREM`, `SISMEMBER`, `SMEMBERS`, `SCARD`
//!
//! ### Key Commands
//! - `DEL`, `EXISTS`, `TYPE`, `KEYS`
//! - `EXPIRE`, `PEXPIRE`, `TTL`, `PTTL`, `PERSIST`
//!
//! ### Server Commands
//! - `PING`, `ECHO`, `DBSIZE`, `FLUSHDB`, `FLUSHALL`, `INFO`, `TIME`, `COMMAND`

pub mod dispatch;
pub mod error;
pub mod guard;
pub mod hash;
pub mod keys;
pub mod list;
pub mod numeric;
pub mod reply;
pub mod server;
pub mod set;
pub mod string;

pub use dispatch::{Arity, CommandSpec, Context, Dispatcher, HandlerFn};
pub use error::{CommandError, CommandResult, ErrorKind};
pub use numeric::format_float;
pub use reply::Reply;
