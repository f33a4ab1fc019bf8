//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the subdomain proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Host validation and response rewriting.
    pub routing: RoutingConfig,

    /// Where the subdomain mapping comes from and how often.
    pub domain_source: DomainSourceConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:80").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:80".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Host validation and per-response settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Base domain every accepted Host must be a direct subdomain of.
    pub root_domain: String,

    /// Redirect plaintext requests to https with a 301.
    pub force_secure_redirect: bool,

    /// Value written into the `Server` header of proxied responses.
    /// Empty leaves the backend's header alone.
    pub server_header: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            root_domain: String::new(),
            force_secure_redirect: false,
            server_header: "Proxy/2.0".to_string(),
        }
    }
}

/// Domain source polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DomainSourceConfig {
    /// Endpoint returning `[[subdomain, backend_url], ...]`.
    pub url: String,

    /// Seconds between polls. Also bounds each fetch.
    pub refresh_interval_secs: u64,

    /// Fetch once before the first interval elapses.
    pub fetch_on_startup: bool,

    /// Honour `HTTP_PROXY`/`HTTPS_PROXY`/`NO_PROXY` when fetching.
    pub system_proxy: bool,
}

impl Default for DomainSourceConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            refresh_interval_secs: 5,
            fetch_on_startup: true,
            system_proxy: true,
        }
    }
}

impl DomainSourceConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Time allowed to receive request headers, in seconds.
    pub read_secs: u64,

    /// Time allowed for the backend to send its response head, in seconds.
    pub request_secs: u64,

    /// How long in-flight connections may drain after shutdown, in seconds.
    pub shutdown_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            read_secs: 5,
            request_secs: 10,
            shutdown_secs: 10,
        }
    }
}

impl TimeoutConfig {
    pub fn read(&self) -> Duration {
        Duration::from_secs(self.read_secs)
    }

    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    pub fn shutdown(&self) -> Duration {
        Duration::from_secs(self.shutdown_secs)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable text or one JSON object per line.
    pub log_format: LogFormat,

    /// Prometheus scrape endpoint bind address. Disabled when unset.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            metrics_address: None,
        }
    }
}
