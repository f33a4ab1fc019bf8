//! Per-request context.
//!
//! # Responsibilities
//! - Carry the correlation id (set by `SetRequestIdLayer` when absent)
//! - Infer the client-facing scheme
//! - Capture the original Host and URL for logging and redirects

use std::fmt;
use std::net::SocketAddr;

use axum::http::{header, HeaderName, Method, Request};

/// Correlation id header, honoured when the client sends one.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// Scheme the client used to reach us (or the edge in front of us).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientScheme {
    Http,
    Https,
}

impl ClientScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientScheme::Http => "http",
            ClientScheme::Https => "https",
        }
    }

    pub fn is_secure(&self) -> bool {
        matches!(self, ClientScheme::Https)
    }
}

impl fmt::Display for ClientScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ephemeral data derived from one inbound request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub scheme: ClientScheme,
    pub host: String,
    pub method: Method,
    pub client_addr: SocketAddr,
    /// Scheme-qualified URL as the client addressed it.
    pub original_url: String,
}

impl RequestContext {
    pub fn new<B>(request: &Request<B>, client_addr: SocketAddr) -> Self {
        let headers = request.headers();

        let request_id = headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        // No TLS is terminated here, so only an upstream edge can vouch for https.
        let scheme = match headers.get(X_FORWARDED_PROTO).and_then(|v| v.to_str().ok()) {
            Some(proto) if proto.eq_ignore_ascii_case("https") => ClientScheme::Https,
            _ => ClientScheme::Http,
        };

        // HTTP/2 carries the host in :authority rather than a Host header.
        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .or_else(|| request.uri().authority().map(|a| a.to_string()))
            .unwrap_or_default();

        let path_and_query = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        Self {
            original_url: format!("{scheme}://{host}{path_and_query}"),
            request_id,
            scheme,
            host,
            method: request.method().clone(),
            client_addr,
        }
    }
}
