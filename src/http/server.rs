//! HTTP application: router, middleware and the dispatch handler.
//!
//! # Responsibilities
//! - Create the Axum Router with the catch-all proxy handler
//! - Wire up middleware (tracing, request ID)
//! - Validate Host, redirect to https, resolve the subdomain
//! - Forward accepted requests under a deadline and log one line per request
//! - Hand switched-protocol connections to the upgrade tunnel

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::RoutingConfig;
use crate::http::forward::{outbound_request, ForwardError, Forwarder, Target};
use crate::http::request::RequestContext;
use crate::http::response::{redirect_to_secure, strip_hop_by_hop};
use crate::http::upgrade;
use crate::observability::metrics;
use crate::routing::{subdomain_of, RoutingError, RoutingTable};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub table: Arc<RoutingTable>,
    pub forwarder: Arc<dyn Forwarder>,
    pub root_domain: Arc<str>,
    pub force_secure_redirect: bool,
    pub server_header: Option<HeaderValue>,
    /// Bound on waiting for the backend's response head.
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(
        config: &RoutingConfig,
        table: Arc<RoutingTable>,
        forwarder: Arc<dyn Forwarder>,
        request_timeout: Duration,
    ) -> Self {
        let server_header = Some(config.server_header.as_str())
            .filter(|value| !value.is_empty())
            .and_then(|value| HeaderValue::from_str(value).ok());

        Self {
            table,
            forwarder,
            root_domain: Arc::from(config.root_domain.as_str()),
            force_secure_redirect: config.force_secure_redirect,
            server_header,
            request_timeout,
        }
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .fallback(proxy_handler)
        .with_state(state)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
}

async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(client_addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    dispatch(&state, client_addr, request).await
}

/// Decide accept/reject/forward for one request. Produces exactly one
/// response and makes at most one forwarding call.
pub async fn dispatch(state: &AppState, client_addr: SocketAddr, mut request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let ctx = RequestContext::new(&request, client_addr);

    let Some(subdomain) = subdomain_of(&ctx.host, &state.root_domain) else {
        let err = RoutingError::InvalidHost {
            host: ctx.host.clone(),
            root_domain: state.root_domain.to_string(),
        };
        return reject(&ctx, err, start_time);
    };

    if state.force_secure_redirect && !ctx.scheme.is_secure() {
        tracing::info!(
            request_id = %ctx.request_id,
            method = %ctx.method,
            url = %ctx.original_url,
            status = 301,
            "Redirecting http -> https"
        );
        metrics::record_request(ctx.method.as_str(), 301, "redirect", start_time);
        return redirect_to_secure(&ctx.host, request.uri());
    }

    let Some(raw_target) = state.table.lookup(subdomain) else {
        let err = RoutingError::UnknownSubdomain { host: ctx.host.clone() };
        return reject(&ctx, err, start_time);
    };

    let target: Target = match raw_target.parse() {
        Ok(target) => target,
        Err(reason) => {
            let err = RoutingError::InvalidTargetUrl { target: raw_target, reason };
            return reject(&ctx, err, start_time);
        }
    };

    let protocol = upgrade::requested_protocol(request.headers());
    let client_upgrade = protocol.as_ref().map(|_| hyper::upgrade::on(&mut request));

    let mut outbound = match outbound_request(&target, &ctx, request) {
        Ok(outbound) => outbound,
        Err(e) => return upstream_failure(&ctx, &raw_target, e, start_time),
    };
    if let Some(protocol) = protocol {
        upgrade::restore_upgrade_headers(outbound.headers_mut(), protocol);
    }
    let target_url = outbound.uri().to_string();

    let forwarded = tokio::time::timeout(state.request_timeout, state.forwarder.forward(outbound))
        .await
        .unwrap_or(Err(ForwardError::Timeout(state.request_timeout)));

    let mut response = match forwarded {
        Ok(response) => response,
        Err(e) => return upstream_failure(&ctx, &target_url, e, start_time),
    };

    let outcome = if response.status() == StatusCode::SWITCHING_PROTOCOLS {
        let Some(client_upgrade) = client_upgrade else {
            let err = ForwardError::Upstream("backend switched protocols unasked".into());
            return upstream_failure(&ctx, &target_url, err, start_time);
        };
        let backend_upgrade = hyper::upgrade::on(&mut response);
        upgrade::spawn_tunnel(client_upgrade, backend_upgrade, ctx.request_id.clone());
        "upgraded"
    } else {
        strip_hop_by_hop(response.headers_mut());
        "proxied"
    };

    if let Some(server) = &state.server_header {
        response.headers_mut().insert(header::SERVER, server.clone());
    }

    let status = response.status();
    tracing::info!(
        request_id = %ctx.request_id,
        method = %ctx.method,
        url = %ctx.original_url,
        target = %target_url,
        status = status.as_u16(),
        "Proxied request"
    );
    metrics::record_request(ctx.method.as_str(), status.as_u16(), outcome, start_time);
    response
}

fn reject(ctx: &RequestContext, err: RoutingError, start_time: Instant) -> Response {
    let status = err.status();
    let outcome = match &err {
        RoutingError::InvalidHost { .. } => "invalid_host",
        RoutingError::UnknownSubdomain { .. } => "unknown_subdomain",
        RoutingError::InvalidTargetUrl { .. } => "invalid_target",
    };

    match &err {
        RoutingError::UnknownSubdomain { .. } => tracing::warn!(
            request_id = %ctx.request_id,
            method = %ctx.method,
            url = %ctx.original_url,
            status = status.as_u16(),
            error = %err,
            "Rejected request"
        ),
        _ => tracing::error!(
            request_id = %ctx.request_id,
            method = %ctx.method,
            url = %ctx.original_url,
            status = status.as_u16(),
            error = %err,
            "Rejected request"
        ),
    }

    metrics::record_request(ctx.method.as_str(), status.as_u16(), outcome, start_time);
    err.into_response()
}

fn upstream_failure(ctx: &RequestContext, target: &str, err: ForwardError, start_time: Instant) -> Response {
    let status = err.status();
    let outcome = match &err {
        ForwardError::Timeout(_) => "upstream_timeout",
        ForwardError::InvalidRequest(_) | ForwardError::Upstream(_) => "upstream_error",
    };

    tracing::error!(
        request_id = %ctx.request_id,
        method = %ctx.method,
        url = %ctx.original_url,
        target = %target,
        status = status.as_u16(),
        error = %err,
        "Upstream error"
    );
    metrics::record_request(ctx.method.as_str(), status.as_u16(), outcome, start_time);
    err.into_response()
}
