//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the shared routing table, forwarder and domain source
//! - Run the listener, the refresher and the signal watcher concurrently
//! - Fail fast: the first task error triggers shutdown for everyone
//!
//! # Design Decisions
//! - Configuration is validated before a [`Proxy`] is constructed
//! - Listener binding happens in [`Proxy::run`], so a bind failure is a
//!   startup error like any other

use std::future::Future;
use std::io;
use std::sync::Arc;

use tokio::task::{JoinError, JoinSet};

use crate::config::ProxyConfig;
use crate::http::{build_router, AppState, Forwarder, HttpForwarder};
use crate::lifecycle::{signals, Shutdown};
use crate::net::{Listener, ListenerError};
use crate::refresh::{DomainSource, Refresher};
use crate::routing::RoutingTable;

/// Fatal error that stops the proxy.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("listener error: {0}")]
    Listener(#[from] ListenerError),

    #[error("could not build forwarding client: {0}")]
    ForwarderClient(#[source] rustls::Error),

    #[error("could not build domain source client: {0}")]
    SourceClient(#[source] reqwest::Error),

    #[error("signal handling failed: {0}")]
    Signal(#[source] io::Error),

    #[error("task failed: {0}")]
    Task(#[from] JoinError),
}

/// A configured proxy, ready to run.
pub struct Proxy {
    config: ProxyConfig,
    table: Arc<RoutingTable>,
    forwarder: Arc<dyn Forwarder>,
    shutdown: Shutdown,
}

impl Proxy {
    pub fn new(config: ProxyConfig) -> Result<Self, ProxyError> {
        let forwarder = HttpForwarder::new().map_err(ProxyError::ForwarderClient)?;
        Ok(Self::with_forwarder(config, Arc::new(forwarder)))
    }

    /// Use a custom forwarding primitive.
    pub fn with_forwarder(config: ProxyConfig, forwarder: Arc<dyn Forwarder>) -> Self {
        Self {
            config,
            table: Arc::new(RoutingTable::new()),
            forwarder,
            shutdown: Shutdown::new(),
        }
    }

    /// The table the refresher writes and the dispatcher reads.
    pub fn routing_table(&self) -> Arc<RoutingTable> {
        Arc::clone(&self.table)
    }

    /// Handle that stops the proxy when triggered.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Bind the configured address and run until SIGINT/SIGTERM or a fatal error.
    pub async fn run(self) -> Result<(), ProxyError> {
        let listener = match Listener::bind(&self.config.listener).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(error = %e, "Couldn't start listener");
                return Err(e.into());
            }
        };
        self.run_with_listener(listener, signals::termination()).await
    }

    /// Run on an already bound listener; `signal` resolving starts shutdown.
    pub async fn run_with_listener<S>(self, listener: Listener, signal: S) -> Result<(), ProxyError>
    where
        S: Future<Output = io::Result<&'static str>> + Send + 'static,
    {
        let source = DomainSource::new(
            self.config.domain_source.url.clone(),
            self.config.domain_source.refresh_interval(),
            self.config.domain_source.system_proxy,
        )
        .map_err(ProxyError::SourceClient)?;

        let refresher = Refresher::new(
            source,
            Arc::clone(&self.table),
            self.config.domain_source.refresh_interval(),
            self.config.domain_source.fetch_on_startup,
        );

        let state = AppState::new(
            &self.config.routing,
            Arc::clone(&self.table),
            self.forwarder,
            self.config.timeouts.request(),
        );
        let app = build_router(state);
        let timeouts = self.config.timeouts.clone();
        let shutdown = self.shutdown;

        if let Ok(addr) = listener.local_addr() {
            tracing::info!(address = %addr, root_domain = %self.config.routing.root_domain, "Proxy started");
        }

        let mut tasks: JoinSet<Result<(), ProxyError>> = JoinSet::new();

        {
            let shutdown = shutdown.clone();
            tasks.spawn(async move {
                listener.serve(app, &timeouts, shutdown).await;
                Ok(())
            });
        }

        {
            let shutdown = shutdown.clone();
            tasks.spawn(async move {
                refresher.run(shutdown).await;
                Ok(())
            });
        }

        {
            let shutdown = shutdown.clone();
            tasks.spawn(async move {
                tokio::select! {
                    received = signal => {
                        let name = received.map_err(ProxyError::Signal)?;
                        tracing::info!(signal = name, "Received signal; shutting down");
                        shutdown.trigger();
                    }
                    _ = shutdown.cancelled() => {}
                }
                Ok(())
            });
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.map_err(ProxyError::from).and_then(|result| result);
            if let Err(e) = outcome {
                tracing::error!(error = %e, "Proxy task failed; shutting down");
                shutdown.trigger();
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                tracing::info!("Shutdown complete");
                Ok(())
            }
        }
    }
}
