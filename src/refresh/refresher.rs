//! Periodic routing table refresh.
//!
//! Two states, looping until shutdown:
//!
//! ```text
//!   waiting ──(interval elapsed)──▶ fetching ──(ok: replace table)──▶ waiting
//!      ▲                               │
//!      └────────(error: keep table)────┘
//! ```
//!
//! Shutdown observed while waiting or fetching ends the loop with no error.
//! There is no backoff: failures are retried at the fixed interval and the
//! last good table stays authoritative meanwhile.

use std::sync::Arc;
use std::time::Duration;

use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::refresh::source::{DomainSource, FetchError};
use crate::routing::RoutingTable;

/// Keeps a [`RoutingTable`] in sync with a [`DomainSource`].
pub struct Refresher {
    source: DomainSource,
    table: Arc<RoutingTable>,
    interval: Duration,
    fetch_on_startup: bool,
}

impl Refresher {
    pub fn new(
        source: DomainSource,
        table: Arc<RoutingTable>,
        interval: Duration,
        fetch_on_startup: bool,
    ) -> Self {
        Self {
            source,
            table,
            interval,
            fetch_on_startup,
        }
    }

    /// Run until `shutdown` fires.
    pub async fn run(self, shutdown: Shutdown) {
        tracing::info!(
            endpoint = %self.source.url(),
            interval = ?self.interval,
            fetch_on_startup = self.fetch_on_startup,
            "Refresher starting"
        );

        let mut wait = !self.fetch_on_startup;
        loop {
            if wait {
                tokio::select! {
                    _ = tokio::time::sleep(self.interval) => {}
                    _ = shutdown.cancelled() => break,
                }
            }
            wait = true;

            tokio::select! {
                result = self.refresh_once() => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "Couldn't fetch domains endpoint; keeping current routes");
                    }
                }
                _ = shutdown.cancelled() => break,
            }
        }

        tracing::info!("Refresher received shutdown signal, exiting loop");
    }

    /// Fetch once and install the result. On error the table is untouched.
    ///
    /// Returns the number of entries installed.
    pub async fn refresh_once(&self) -> Result<usize, FetchError> {
        let mapping = match self.source.fetch().await {
            Ok(mapping) => mapping,
            Err(e) => {
                metrics::record_refresh("error");
                return Err(e);
            }
        };

        let duplicates = self.table.replace(mapping);
        let entries = self.table.len();
        if duplicates > 0 {
            tracing::warn!(duplicates, "Domain list repeats subdomains; last occurrence wins");
        }
        tracing::debug!(entries, "Routing table replaced");

        metrics::record_refresh("ok");
        metrics::set_routing_table_entries(entries);
        Ok(entries)
    }
}
