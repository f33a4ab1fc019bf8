//! Subdomain-routing reverse proxy library.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod refresh;
pub mod routing;

pub use config::ProxyConfig;
pub use lifecycle::{Proxy, ProxyError, Shutdown};
pub use routing::RoutingTable;
