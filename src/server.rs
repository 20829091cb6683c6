//! TCP accept loop.
//!
//! Every accepted client gets its own tokio task running a
//! [`ConnectionHandler`](crate::connection::ConnectionHandler); all of them
//! share one [`Dispatcher`] and therefore one keyspace.

use crate::commands::Dispatcher;
use crate::connection::{handle_connection, ConnectionStats};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error};

/// Accepts connections forever. Callers stop it by dropping the future,
/// e.g. from a `tokio::select!` against a shutdown signal.
pub async fn accept_loop(
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    stats: Arc<ConnectionStats>,
    max_buffer: usize,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                if let Err(e) = stream.set_nodelay(true) {
                    debug!(client = %addr, error = %e, "Failed to set TCP_NODELAY");
                }

                tokio::spawn(handle_connection(
                    stream,
                    addr,
                    Arc::clone(&dispatcher),
                    Arc::clone(&stats),
                    max_buffer,
                ));
            }
            Err(e) => {
                error!(error = %e, "Failed to accept connection");
            }
        }
    }
}
