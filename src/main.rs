//! Subdomain-routing reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                   SUBDOMAIN PROXY                     │
//!                     │                                                       │
//!   Client Request    │  ┌─────────┐    ┌──────────┐    ┌──────────────┐     │
//!   ──────────────────┼─▶│   net   │───▶│   http   │───▶│   routing    │     │
//!                     │  │listener │    │ dispatch │    │ host + table │     │
//!                     │  └─────────┘    └────┬─────┘    └──────▲───────┘     │
//!                     │                      │                 │ replace     │
//!                     │                      ▼                 │             │
//!   Client Response   │                ┌──────────┐     ┌──────┴───────┐     │
//!   ◀─────────────────┼────────────────│ forward  │     │   refresh    │◀────┼── Domain
//!                     │                └────┬─────┘     │  (interval)  │     │   endpoint
//!                     │                     │           └──────────────┘     │
//!                     │                     ▼                                │
//!                     │                  Backend                             │
//!                     │                                                       │
//!                     │  lifecycle: signals → shutdown → drain → exit         │
//!                     └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use subdomain_proxy::config::load_config;
use subdomain_proxy::observability::{logging, metrics};
use subdomain_proxy::Proxy;

#[derive(Parser)]
#[command(name = "subdomain-proxy")]
#[command(about = "Reverse proxy that routes requests by subdomain", long_about = None)]
struct Cli {
    /// TOML configuration file; environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cli.check {
        match toml::to_string_pretty(&config) {
            Ok(effective) => {
                println!("{effective}");
                return ExitCode::SUCCESS;
            }
            Err(e) => {
                eprintln!("Failed to render configuration: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    logging::init_logging(&config.observability);

    tracing::info!("subdomain-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        root_domain = %config.routing.root_domain,
        endpoint = %config.domain_source.url,
        force_secure_redirect = config.routing.force_secure_redirect,
        refresh_interval_secs = config.domain_source.refresh_interval_secs,
        read_timeout_secs = config.timeouts.read_secs,
        request_timeout_secs = config.timeouts.request_secs,
        shutdown_timeout_secs = config.timeouts.shutdown_secs,
        "Configuration loaded"
    );

    if let Some(address) = config.observability.metrics_address.as_deref() {
        match address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                    return ExitCode::FAILURE;
                }
            }
            Err(e) => {
                tracing::error!(metrics_address = %address, error = %e, "Failed to parse metrics address");
                return ExitCode::FAILURE;
            }
        }
    }

    let proxy = match Proxy::new(config) {
        Ok(proxy) => proxy,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize proxy");
            return ExitCode::FAILURE;
        }
    };

    match proxy.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Proxy stopped with error");
            ExitCode::FAILURE
        }
    }
}
