//! Per-connection serving and lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Serve HTTP/1.1 (with upgrades) and HTTP/2 on one accepted socket
//! - Switch the connection to graceful shutdown when the proxy stops
//! - Keep the active-connection gauge accurate

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{extract::ConnectInfo, http::Request, Router};
use hyper::body::Incoming;
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto,
};
use tokio::net::TcpStream;
use tower::ServiceExt;

use crate::lifecycle::Shutdown;
use crate::net::listener::ConnectionPermit;
use crate::observability::metrics;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Guard that tracks a connection's lifetime.
/// Updates the active gauge on creation and drop, including on abort.
#[derive(Debug)]
pub struct ConnectionGuard {
    id: ConnectionId,
    _permit: ConnectionPermit,
}

impl ConnectionGuard {
    pub fn new(permit: ConnectionPermit) -> Self {
        metrics::connection_opened();
        Self {
            id: ConnectionId::new(),
            _permit: permit,
        }
    }

    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        metrics::connection_closed();
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}

/// Serve one accepted connection until the peer closes it or, after
/// `shutdown` fires, until its in-flight request completes.
pub async fn serve_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    app: Router,
    builder: Arc<auto::Builder<TokioExecutor>>,
    shutdown: Shutdown,
    guard: ConnectionGuard,
) {
    let service = hyper::service::service_fn(move |mut request: Request<Incoming>| {
        request.extensions_mut().insert(ConnectInfo(peer_addr));
        app.clone().oneshot(request)
    });

    let conn = builder.serve_connection_with_upgrades(TokioIo::new(stream), service);
    tokio::pin!(conn);

    let result = tokio::select! {
        result = conn.as_mut() => result,
        _ = shutdown.cancelled() => {
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    };

    if let Err(e) = result {
        tracing::debug!(connection_id = %guard.id(), peer_addr = %peer_addr, error = %e, "Connection error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
        assert!(id1.to_string().starts_with("conn-"));
    }
}
