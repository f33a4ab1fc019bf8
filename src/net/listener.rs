//! TCP listener implementation with backpressure and bounded drain.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections
//! - Enforce max_connections limit via semaphore
//! - Graceful handling of accept errors
//! - On shutdown: stop accepting, drain for a bounded time, abort the rest

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use hyper_util::{
    rt::{TokioExecutor, TokioTimer},
    server::conn::auto,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::{ListenerConfig, TimeoutConfig};
use crate::lifecycle::Shutdown;
use crate::net::connection::{serve_connection, ConnectionGuard};

/// Pause after an accept error that is not a per-connection failure (e.g. EMFILE).
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Error type for listener operations.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    /// Failed to accept connection.
    #[error("Failed to accept: {0}")]
    Accept(#[source] std::io::Error),
    /// The connection limit semaphore was closed.
    #[error("Connection limit closed")]
    Closed,
}

/// A bounded TCP listener that limits concurrent connections.
///
/// Uses a semaphore to enforce `max_connections`. When the limit is reached,
/// new connections will wait until a slot becomes available.
pub struct Listener {
    /// The underlying TCP listener.
    inner: TcpListener,
    /// Semaphore to limit concurrent connections.
    connection_limit: Arc<Semaphore>,
}

impl Listener {
    /// Bind to the configured address with connection limits.
    pub async fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let bind_error = |source| ListenerError::Bind {
            address: config.bind_address.clone(),
            source,
        };

        let addr: SocketAddr = config
            .bind_address
            .parse()
            .map_err(|e| bind_error(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))?;

        let listener = TcpListener::bind(addr).await.map_err(bind_error)?;
        Ok(Self::from_tcp(listener, config.max_connections))
    }

    /// Wrap an already bound socket.
    pub fn from_tcp(listener: TcpListener, max_connections: usize) -> Self {
        if let Ok(local_addr) = listener.local_addr() {
            tracing::info!(
                address = %local_addr,
                max_connections,
                "Listener bound"
            );
        }

        Self {
            inner: listener,
            connection_limit: Arc::new(Semaphore::new(max_connections)),
        }
    }

    /// Accept a new connection, respecting the connection limit.
    ///
    /// This will wait if the connection limit has been reached.
    /// Returns the stream and a permit that must be held for the connection's lifetime.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, ConnectionPermit), ListenerError> {
        // Acquire permit first (backpressure)
        let permit = self
            .connection_limit
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ListenerError::Closed)?;

        // Then accept the connection
        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;

        tracing::debug!(
            peer_addr = %addr,
            available_permits = self.connection_limit.available_permits(),
            "Connection accepted"
        );

        Ok((stream, addr, ConnectionPermit { _permit: permit }))
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    /// Get current available connection slots.
    pub fn available_permits(&self) -> usize {
        self.connection_limit.available_permits()
    }

    /// Serve `app` until `shutdown` fires, then drain.
    ///
    /// The listening socket is closed as soon as shutdown is observed, so
    /// new connection attempts are refused. Open connections finish their
    /// in-flight request; whatever is still running after
    /// `timeouts.shutdown()` is aborted.
    pub async fn serve(self, app: Router, timeouts: &TimeoutConfig, shutdown: Shutdown) {
        let mut builder = auto::Builder::new(TokioExecutor::new());
        builder
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(timeouts.read());
        let builder = Arc::new(builder);

        let mut connections = JoinSet::new();

        loop {
            let accepted = tokio::select! {
                accepted = self.accept() => accepted,
                _ = shutdown.cancelled() => break,
            };

            // Reap finished connection tasks so the set stays small.
            while connections.try_join_next().is_some() {}

            match accepted {
                Ok((stream, peer_addr, permit)) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        tracing::debug!(peer_addr = %peer_addr, error = %e, "Failed to set TCP_NODELAY");
                    }
                    let guard = ConnectionGuard::new(permit);
                    connections.spawn(serve_connection(
                        stream,
                        peer_addr,
                        app.clone(),
                        Arc::clone(&builder),
                        shutdown.clone(),
                        guard,
                    ));
                }
                Err(ListenerError::Accept(e)) if is_connection_error(&e) => {
                    tracing::debug!(error = %e, "Connection failed during accept");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Accept failed; pausing");
                    tokio::select! {
                        _ = tokio::time::sleep(ACCEPT_ERROR_BACKOFF) => {}
                        _ = shutdown.cancelled() => break,
                    }
                }
            }
        }

        // Stop accepting immediately.
        drop(self);
        drain(connections, timeouts.shutdown()).await;
    }
}

fn is_connection_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::ConnectionReset
    )
}

/// Wait up to `timeout` for connection tasks to finish, then abort the rest.
async fn drain(mut connections: JoinSet<()>, timeout: Duration) {
    let open = connections.len();
    tracing::info!(open_connections = open, timeout = ?timeout, "Draining connections");

    let drained = tokio::time::timeout(timeout, async {
        while let Some(joined) = connections.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Connection task failed during drain");
            }
        }
    })
    .await;

    if drained.is_err() {
        tracing::warn!(
            aborted_connections = connections.len(),
            "Shutdown timeout elapsed; closing remaining connections"
        );
        connections.abort_all();
        while connections.join_next().await.is_some() {}
    }

    tracing::info!("HTTP server stopped");
}

/// A permit representing a connection slot.
///
/// When dropped, the connection slot is released back to the pool.
/// This ensures backpressure is maintained even if the connection handler panics.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bind_reports_address_in_use() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = ListenerConfig {
            bind_address: taken.local_addr().unwrap().to_string(),
            max_connections: 4,
        };

        let err = Listener::bind(&config).await.err().expect("bind should fail");
        assert!(matches!(err, ListenerError::Bind { .. }));
    }

    #[tokio::test]
    async fn permits_track_open_connections() {
        let listener = Listener::from_tcp(TcpListener::bind("127.0.0.1:0").await.unwrap(), 2);
        let addr = listener.local_addr().unwrap();

        let _client = TcpStream::connect(addr).await.unwrap();
        let (_stream, _, permit) = listener.accept().await.unwrap();
        assert_eq!(listener.available_permits(), 1);

        drop(permit);
        assert_eq!(listener.available_permits(), 2);
    }
}
