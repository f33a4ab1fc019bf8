//! Forwarding to a resolved backend.
//!
//! # Responsibilities
//! - Parse mapped backend values into forwarding targets
//! - Build the outbound request: target URI, forwarded-* annotations,
//!   hop-by-hop stripping
//! - Send it through a [`Forwarder`] and stream the response back
//!
//! # Design Decisions
//! - The inbound raw query is copied byte-for-byte; it is never parsed
//!   or re-encoded, so the backend sees exactly what the client sent
//! - One attempt per request; no retries
//! - The transport sits behind a trait so dispatch can be tested without sockets

use std::str::FromStr;

use axum::{
    body::Body,
    http::{
        header,
        uri::{Authority, Scheme},
        HeaderMap, HeaderName, HeaderValue, Request, Response, Uri, Version,
    },
};
use futures_util::future::BoxFuture;
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::Url;

use crate::http::request::RequestContext;
use crate::http::response::strip_hop_by_hop;

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure to obtain a response from the backend.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("could not build upstream request: {0}")]
    InvalidRequest(#[from] axum::http::Error),

    #[error("upstream request failed: {0}")]
    Upstream(#[source] BoxError),

    #[error("upstream did not respond within {0:?}")]
    Timeout(std::time::Duration),
}

/// The HTTP forwarding primitive.
pub trait Forwarder: Send + Sync {
    /// Send a fully prepared outbound request and return the backend's response.
    fn forward(&self, request: Request<Body>) -> BoxFuture<'_, Result<Response<Body>, ForwardError>>;
}

/// Forwarder backed by a pooled hyper client (http and https backends).
#[derive(Clone)]
pub struct HttpForwarder {
    client: Client<HttpsConnector<HttpConnector>, Body>,
}

impl HttpForwarder {
    /// Build the client with the ring provider and webpki roots.
    ///
    /// The provider is passed explicitly; the process-wide default is
    /// ambiguous when more than one rustls provider is compiled in.
    pub fn new() -> Result<Self, rustls::Error> {
        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())?
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();

        let client = Client::builder(TokioExecutor::new()).build(connector);
        Ok(Self { client })
    }
}

impl Forwarder for HttpForwarder {
    fn forward(&self, request: Request<Body>) -> BoxFuture<'_, Result<Response<Body>, ForwardError>> {
        Box::pin(async move {
            let response = self
                .client
                .request(request)
                .await
                .map_err(|e| ForwardError::Upstream(Box::new(e)))?;
            Ok(response.map(Body::new))
        })
    }
}

/// A backend value that parsed as an absolute http(s) URL.
#[derive(Debug, Clone)]
pub struct Target {
    scheme: Scheme,
    authority: Authority,
    base_path: String,
}

impl Target {
    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Outbound URI: the target's scheme and authority, the target's base
    /// path joined with the inbound path, and the inbound query verbatim.
    pub fn uri_for(&self, inbound: &Uri) -> Result<Uri, axum::http::Error> {
        let path = join_path(&self.base_path, inbound.path());
        let path_and_query = match inbound.query() {
            Some(query) => format!("{path}?{query}"),
            None => path,
        };

        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(raw).map_err(|e| e.to_string())?;

        let scheme = match url.scheme() {
            "http" => Scheme::HTTP,
            "https" => Scheme::HTTPS,
            other => return Err(format!("unsupported scheme {other:?}")),
        };
        let host = url.host_str().ok_or("missing host")?;
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let authority = Authority::from_str(&authority).map_err(|e| e.to_string())?;

        Ok(Self {
            scheme,
            authority,
            base_path: url.path().to_string(),
        })
    }
}

/// Join two paths with exactly one slash between them.
fn join_path(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{base}{}", &path[1..]),
        (false, false) => format!("{base}/{path}"),
        _ => format!("{base}{path}"),
    }
}

/// Turn the inbound request into the request sent to `target`.
pub fn outbound_request(
    target: &Target,
    ctx: &RequestContext,
    request: Request<Body>,
) -> Result<Request<Body>, ForwardError> {
    let (parts, body) = request.into_parts();
    let uri = target.uri_for(&parts.uri)?;

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);
    annotate_forwarded(&mut headers, ctx)?;
    let host = HeaderValue::from_str(target.authority().as_str()).map_err(axum::http::Error::from)?;
    headers.insert(header::HOST, host);

    let mut outbound = Request::builder()
        .method(parts.method)
        .uri(uri)
        // The client negotiates its own protocol with the backend.
        .version(Version::HTTP_11)
        .body(body)?;
    *outbound.headers_mut() = headers;

    Ok(outbound)
}

fn annotate_forwarded(headers: &mut HeaderMap, ctx: &RequestContext) -> Result<(), ForwardError> {
    // Whatever the client claimed is discarded; only the peer address is trusted.
    headers.remove(header::FORWARDED);

    let forwarded_for =
        HeaderValue::from_str(&ctx.client_addr.ip().to_string()).map_err(axum::http::Error::from)?;
    let forwarded_host = HeaderValue::from_str(&ctx.host).map_err(axum::http::Error::from)?;

    headers.insert(X_FORWARDED_FOR, forwarded_for);
    headers.insert(X_FORWARDED_HOST, forwarded_host);
    headers.insert(
        crate::http::request::X_FORWARDED_PROTO,
        HeaderValue::from_static(ctx.scheme.as_str()),
    );
    Ok(())
}
