//! tallykv server binary.
//!
//! Builds the keyspace, the expiry sweeper and the dispatcher from the
//! configuration, then accepts connections until Ctrl+C.

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tallykv::commands::Dispatcher;
use tallykv::config::Config;
use tallykv::connection::ConnectionStats;
use tallykv::server::accept_loop;
use tallykv::storage::{ExpirySweeper, Keyspace};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn print_banner(config: &Config) {
    println!(
        r#"
tallykv v{} - in-memory data-structure server
──────────────────────────────────────────────
Listening on {} ({} shards)
Use Ctrl+C to shut down.
"#,
        tallykv::VERSION,
        config.bind_address(),
        config.shards,
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    config.validate().context("invalid configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let keyspace = Arc::new(Keyspace::with_shards(config.shards));
    info!(shards = keyspace.shard_count(), "Keyspace initialized");

    let sweeper = ExpirySweeper::start(Arc::clone(&keyspace), config.expiry());

    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&keyspace)));
    let stats = Arc::new(ConnectionStats::new());

    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;
    print_banner(&config);
    info!(addr = %config.bind_address(), "Listening");

    tokio::select! {
        _ = accept_loop(listener, dispatcher, Arc::clone(&stats), config.max_buffer) => {}
        result = signal::ctrl_c() => {
            if let Err(e) = result {
                error!(error = %e, "Failed to listen for Ctrl+C");
            }
            info!("Shutdown signal received, stopping server...");
        }
    }

    drop(sweeper);
    info!(
        keys = keyspace.len(),
        connections = stats
            .connections_accepted
            .load(std::sync::atomic::Ordering::Relaxed),
        "Server shutdown complete"
    );
    Ok(())
}
