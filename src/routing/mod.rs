//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (Host header)
//!     → host.rs (validate against root domain, extract subdomain)
//!     → table.rs (snapshot lookup)
//!     → Return: backend target or RoutingError
//!
//! Table refresh (refresh subsystem):
//!     DomainMapping
//!     → collapse duplicates (last wins)
//!     → atomic snapshot swap
//! ```
//!
//! # Design Decisions
//! - Routing is Host-only; path and method are never consulted
//! - Snapshots are replaced whole, never patched
//! - Explicit error kinds rather than silent defaults

pub mod host;
pub mod table;

pub use host::subdomain_of;
pub use table::{DomainMapping, RoutingTable};

/// Per-request routing failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingError {
    /// Host is not a direct subdomain of the root domain.
    #[error("invalid host: {host:?} must be a subdomain of {root_domain:?}")]
    InvalidHost { host: String, root_domain: String },

    /// No mapping entry for the subdomain.
    #[error("unknown host: {host}")]
    UnknownSubdomain { host: String },

    /// The mapped value does not parse as an absolute URL.
    #[error("invalid url {target:?}: {reason}")]
    InvalidTargetUrl { target: String, reason: String },
}
