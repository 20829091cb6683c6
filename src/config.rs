//! Server configuration from command-line flags and `TALLYKV_*` variables.

use crate::connection::DEFAULT_MAX_BUFFER;
use crate::storage::{ExpiryConfig, DEFAULT_SHARDS};
use clap::Parser;
use std::time::Duration;
use thiserror::Error;

/// The default port (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host to bind to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Smallest accepted per-connection buffer cap
pub const MIN_BUFFER: usize = 1024;

#[derive(Debug, Clone, Parser)]
#[command(name = "tallykv", version, about = "in-memory data-structure server")]
pub struct Config {
    /// address to bind to
    #[arg(long, env = "TALLYKV_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// port to listen on
    #[arg(short, long, env = "TALLYKV_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// number of keyspace shards
    #[arg(long, env = "TALLYKV_SHARDS", default_value_t = DEFAULT_SHARDS)]
    pub shards: usize,

    /// log filter used when RUST_LOG is unset (e.g. "info", "tallykv=debug")
    #[arg(long, env = "TALLYKV_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// base interval of the active expiry sweeper, in milliseconds
    #[arg(long, env = "TALLYKV_EXPIRY_INTERVAL_MS", default_value_t = 100)]
    pub expiry_interval_ms: u64,

    /// cap on buffered, undecoded input per connection, in bytes
    #[arg(long, env = "TALLYKV_MAX_BUFFER", default_value_t = DEFAULT_MAX_BUFFER)]
    pub max_buffer: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("shard count must be at least 1")]
    ZeroShards,

    #[error("expiry interval must be at least 1 ms")]
    ZeroExpiryInterval,

    #[error("max buffer must be at least {MIN_BUFFER} bytes, got {0}")]
    BufferTooSmall(usize),
}

impl Config {
    /// Rejects settings the server can't run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shards == 0 {
            return Err(ConfigError::ZeroShards);
        }
        if self.expiry_interval_ms == 0 {
            return Err(ConfigError::ZeroExpiryInterval);
        }
        if self.max_buffer < MIN_BUFFER {
            return Err(ConfigError::BufferTooSmall(self.max_buffer));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn expiry(&self) -> ExpiryConfig {
        ExpiryConfig::with_interval(Duration::from_millis(self.expiry_interval_ms))
    }
}
