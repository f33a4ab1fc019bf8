//! Response construction and header hygiene.
//!
//! # Responsibilities
//! - Fixed short bodies for rejected requests
//! - 301 redirect to the https equivalent URL
//! - Strip hop-by-hop headers in both directions

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
};

use crate::http::forward::ForwardError;
use crate::routing::RoutingError;

pub const BAD_GATEWAY_BODY: &str = "502 Bad Gateway\n";
pub const GATEWAY_TIMEOUT_BODY: &str = "504 Gateway Timeout\n";
pub const NOT_FOUND_BODY: &str = "404 Not Found\n";

impl RoutingError {
    pub fn status(&self) -> StatusCode {
        match self {
            RoutingError::InvalidHost { .. } | RoutingError::InvalidTargetUrl { .. } => {
                StatusCode::BAD_GATEWAY
            }
            RoutingError::UnknownSubdomain { .. } => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for RoutingError {
    fn into_response(self) -> Response {
        match self.status() {
            StatusCode::NOT_FOUND => (StatusCode::NOT_FOUND, NOT_FOUND_BODY).into_response(),
            _ => bad_gateway(),
        }
    }
}

impl ForwardError {
    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ForwardError::InvalidRequest(_) | ForwardError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        match self.status() {
            StatusCode::GATEWAY_TIMEOUT => {
                (StatusCode::GATEWAY_TIMEOUT, GATEWAY_TIMEOUT_BODY).into_response()
            }
            _ => bad_gateway(),
        }
    }
}

pub fn bad_gateway() -> Response {
    (StatusCode::BAD_GATEWAY, BAD_GATEWAY_BODY).into_response()
}

/// Permanent redirect to `https://{host}{path}?{query}`.
pub fn redirect_to_secure(host: &str, uri: &Uri) -> Response {
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let location = format!("https://{host}{path_and_query}");

    match HeaderValue::from_str(&location) {
        Ok(location) => Response::builder()
            .status(StatusCode::MOVED_PERMANENTLY)
            .header(header::LOCATION, location)
            .body(Body::empty())
            .unwrap_or_else(|_| bad_gateway()),
        Err(_) => bad_gateway(),
    }
}

const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
];

/// Remove headers that describe a single hop, including any the
/// `Connection` header names.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
    headers.remove(header::UPGRADE);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_errors_map_to_fixed_responses() {
        let invalid_host = RoutingError::InvalidHost {
            host: "a.b.example.com".into(),
            root_domain: "example.com".into(),
        };
        assert_eq!(invalid_host.into_response().status(), StatusCode::BAD_GATEWAY);

        let unknown = RoutingError::UnknownSubdomain { host: "bar.example.com".into() };
        assert_eq!(unknown.into_response().status(), StatusCode::NOT_FOUND);

        let bad_url = RoutingError::InvalidTargetUrl {
            target: "http://[::bad".into(),
            reason: "invalid IPv6 address".into(),
        };
        assert_eq!(bad_url.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn forward_timeouts_are_gateway_timeouts() {
        let timeout = ForwardError::Timeout(std::time::Duration::from_secs(1));
        assert_eq!(timeout.into_response().status(), StatusCode::GATEWAY_TIMEOUT);

        let refused = ForwardError::Upstream("connection refused".into());
        assert_eq!(refused.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn redirect_keeps_path_and_raw_query() {
        let uri: Uri = "/a/b?x=1&x=2".parse().unwrap();
        let response = redirect_to_secure("foo.example.com", &uri);
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://foo.example.com/a/b?x=1&x=2"
        );
    }

    #[test]
    fn strips_hop_by_hop_and_connection_named_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-secret"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-secret", HeaderValue::from_static("1"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 1);
        assert_eq!(headers[header::CONTENT_TYPE], "text/plain");
    }
}
