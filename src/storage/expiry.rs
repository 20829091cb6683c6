//! Active Expiry
//!
//! Lazy expiry purges a key when a command touches it. A key that expires and
//! is never touched again would sit in memory forever, so a background task
//! walks the shards and removes what it finds.
//!
//! ## Design
//!
//! Each tick the sweeper visits `shards_per_tick` shards, continuing from a
//! round-robin cursor, so one tick never write-locks the whole keyspace:
//!
//! ```text
//!   tick 1          tick 2          tick 3
//! ┌──┬──┬──┬──┐   ┌──┬──┬──┬──┐   ┌──┬──┬──┬──┐
//! │██│██│  │  │   │  │  │██│██│   │██│██│  │  │ ...
//! └──┴──┴──┴──┘   └──┴──┴──┴──┘   └──┴──┴──┴──┘
//! ```
//!
//! ## Adaptive Frequency
//!
//! When a large share of the visited keys had expired, the interval halves.
//! When nothing expired, it doubles. It always stays within
//! `[min_interval, max_interval]`.

use crate::storage::Keyspace;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, trace};

/// Configuration for the expiry sweeper.
#[derive(Debug, Clone)]
pub struct ExpiryConfig {
    /// Interval the sweeper starts with (default: 100ms)
    pub base_interval: Duration,

    /// Lower bound for the interval (default: 10ms)
    pub min_interval: Duration,

    /// Upper bound for the interval (default: 1s)
    pub max_interval: Duration,

    /// Shards visited per tick (default: 16)
    pub shards_per_tick: usize,

    /// If more than this fraction of visited keys expired, speed up
    pub speedup_threshold: f64,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_millis(100),
            min_interval: Duration::from_millis(10),
            max_interval: Duration::from_secs(1),
            shards_per_tick: 16,
            speedup_threshold: 0.25,
        }
    }
}

impl ExpiryConfig {
    /// Default configuration with a different starting interval.
    pub fn with_interval(base_interval: Duration) -> Self {
        let defaults = Self::default();
        Self {
            base_interval,
            min_interval: defaults.min_interval.min(base_interval),
            max_interval: defaults.max_interval.max(base_interval),
            ..defaults
        }
    }

    fn next_interval(&self, current: Duration, scanned: usize, expired: usize) -> Duration {
        if scanned > 0 && expired as f64 / scanned as f64 > self.speedup_threshold {
            (current / 2).max(self.min_interval)
        } else if expired == 0 {
            (current * 2).min(self.max_interval)
        } else {
            current
        }
    }
}

/// A handle to the running expiry sweeper.
///
/// When this handle is dropped, the sweeper task stops.
#[derive(Debug)]
pub struct ExpirySweeper {
    shutdown_tx: watch::Sender<bool>,
}

impl ExpirySweeper {
    /// Spawns the sweeper on the current tokio runtime.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use tallykv::storage::{ExpiryConfig, ExpirySweeper, Keyspace};
    /// use std::sync::Arc;
    ///
    /// let keyspace = Arc::new(Keyspace::new());
    /// let sweeper = ExpirySweeper::start(keyspace, ExpiryConfig::default());
    ///
    /// // Dropping the handle stops the sweeper
    /// drop(sweeper);
    /// ```
    pub fn start(keyspace: Arc<Keyspace>, config: ExpiryConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(
            interval_ms = config.base_interval.as_millis() as u64,
            shards_per_tick = config.shards_per_tick,
            "Background expiry sweeper started"
        );
        tokio::spawn(sweeper_loop(keyspace, config, shutdown_rx));

        Self { shutdown_tx }
    }

    /// Signals the sweeper task to stop. Also called on drop.
    pub fn stop(&self) {
        if self.shutdown_tx.send(true).is_ok() {
            info!("Background expiry sweeper stopped");
        }
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn sweeper_loop(
    keyspace: Arc<Keyspace>,
    config: ExpiryConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let shard_count = keyspace.shard_count();
    let batch = config.shards_per_tick.clamp(1, shard_count);
    let mut cursor = 0usize;
    let mut interval = config.base_interval;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Expiry sweeper received shutdown signal");
                    return;
                }
            }
        }

        let (mut scanned, mut expired) = (0usize, 0usize);
        for _ in 0..batch {
            let sweep = keyspace.purge_expired_in_shard(cursor);
            scanned += sweep.scanned;
            expired += sweep.expired;
            cursor = (cursor + 1) % shard_count;
        }

        let next = config.next_interval(interval, scanned, expired);
        if next != interval {
            trace!(
                scanned,
                expired,
                interval_ms = next.as_millis() as u64,
                "Adjusted sweep interval"
            );
            interval = next;
        }

        if expired > 0 {
            debug!(
                expired,
                keys_remaining = keyspace.len(),
                "Expired keys cleaned up"
            );
        }
    }
}
