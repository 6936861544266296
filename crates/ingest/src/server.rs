//! TCP listener for the carbon plaintext protocol.
//!
//! Thin accept loop in front of the ingester: binds the configured address,
//! spawns one handler task per connection, and on shutdown stops accepting
//! and waits for the handlers to drain. Accept errors are transient; they
//! are logged and the loop continues.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use socket2::{SockRef, TcpKeepalive};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::Ingester;

/// Carbon plaintext listener configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub listen_address: String,

    /// Disable Nagle's algorithm on accepted connections.
    pub nodelay: bool,

    /// TCP keepalive idle time; unset disables keepalive probing.
    #[serde(with = "humantime_serde")]
    pub keepalive: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:2003".to_string(),
            nodelay: true,
            keepalive: Some(Duration::from_secs(60)),
        }
    }
}

/// Connection counters for the listener.
#[derive(Debug, Default)]
pub struct ServerMetrics {
    pub connections_active: AtomicU64,
    pub connections_total: AtomicU64,
}

/// TCP server driving one ingester.
pub struct CarbonServer {
    config: ServerConfig,
    ingester: Arc<Ingester>,
    metrics: ServerMetrics,
}

impl CarbonServer {
    pub fn new(config: ServerConfig, ingester: Arc<Ingester>) -> Self {
        Self {
            config,
            ingester,
            metrics: ServerMetrics::default(),
        }
    }

    /// Bind and serve until cancelled, then drain active connections.
    pub async fn run(self, cancel: CancellationToken) -> io::Result<()> {
        let listener = TcpListener::bind(&self.config.listen_address).await?;

        tracing::info!(
            address = %self.config.listen_address,
            "carbon server listening"
        );

        self.serve(listener, cancel).await
    }

    /// Serve an already-bound listener until cancelled.
    pub async fn serve(self, listener: TcpListener, cancel: CancellationToken) -> io::Result<()> {
        let server = Arc::new(self);
        let handlers = TaskTracker::new();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                result = listener.accept() => match result {
                    Ok((stream, peer)) => {
                        server.configure_socket(&stream);
                        server.metrics.connections_total.fetch_add(1, Ordering::Relaxed);
                        server.metrics.connections_active.fetch_add(1, Ordering::Relaxed);

                        let server = Arc::clone(&server);
                        handlers.spawn(async move {
                            Arc::clone(&server.ingester).handle(stream).await;
                            server.metrics.connections_active.fetch_sub(1, Ordering::Relaxed);
                            tracing::debug!(peer = %peer, "carbon connection drained");
                        });
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "carbon server accept error");
                    }
                },
            }
        }

        tracing::info!("carbon server draining connections");
        handlers.close();
        handlers.wait().await;
        tracing::info!("carbon server stopped");

        Ok(())
    }

    /// Apply per-connection socket options. Failures are logged, never fatal.
    fn configure_socket(&self, stream: &TcpStream) {
        let socket = SockRef::from(stream);

        if self.config.nodelay {
            if let Err(err) = socket.set_nodelay(true) {
                tracing::debug!(error = %err, "failed to set TCP_NODELAY");
            }
        }

        if let Some(idle) = self.config.keepalive {
            let keepalive = TcpKeepalive::new()
                .with_time(idle)
                .with_interval(Duration::from_secs(10));
            if let Err(err) = socket.set_tcp_keepalive(&keepalive) {
                tracing::debug!(error = %err, "failed to set TCP keepalive");
            }
        }
    }
}

#[cfg(test)]
#[path = "server_test.rs"]
mod server_test;
