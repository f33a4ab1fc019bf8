//! Protocol upgrade pass-through (WebSocket and friends).
//!
//! # Responsibilities
//! - Detect upgrade requests (`Connection: upgrade` plus `Upgrade`)
//! - Carry the upgrade headers across the hop-by-hop stripping
//! - Splice the client and backend connections once both sides switched
//!
//! # Data Flow
//! ```text
//! Client ←──── raw bytes ────→ Proxy ←──── raw bytes ────→ Backend
//! ```
//!
//! # Design Decisions
//! - The backend decides: only its `101 Switching Protocols` starts a tunnel
//! - Byte-level splice; frames are never parsed
//! - The tunnel ends when either side closes

use axum::http::{header, HeaderMap, HeaderValue};
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;

/// The requested protocol, if this is an upgrade request.
pub fn requested_protocol(headers: &HeaderMap) -> Option<HeaderValue> {
    let connection_upgrade = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"));

    if connection_upgrade {
        headers.get(header::UPGRADE).cloned()
    } else {
        None
    }
}

/// Put back the headers that ask the next hop to switch protocols.
pub fn restore_upgrade_headers(headers: &mut HeaderMap, protocol: HeaderValue) {
    headers.insert(header::CONNECTION, HeaderValue::from_static("upgrade"));
    headers.insert(header::UPGRADE, protocol);
}

/// Copy bytes both ways between the upgraded client and backend connections.
pub fn spawn_tunnel(client: OnUpgrade, backend: OnUpgrade, request_id: String) {
    tokio::spawn(async move {
        let (client, backend) = match tokio::try_join!(client, backend) {
            Ok(upgraded) => upgraded,
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Upgrade failed");
                return;
            }
        };

        let mut client = TokioIo::new(client);
        let mut backend = TokioIo::new(backend);
        match tokio::io::copy_bidirectional(&mut client, &mut backend).await {
            Ok((sent, received)) => tracing::debug!(
                request_id = %request_id,
                bytes_sent = sent,
                bytes_received = received,
                "Upgraded connection closed"
            ),
            Err(e) => tracing::debug!(request_id = %request_id, error = %e, "Upgraded connection error"),
        }
    });
}
