//! Routing table refresh subsystem.
//!
//! # Data Flow
//! ```text
//! refresher.rs (interval tick or shutdown)
//!     → source.rs (GET endpoint, decode [[subdomain, url], ...])
//!     → RoutingTable::replace on success
//!     → log and keep the current table on failure
//! ```

pub mod refresher;
pub mod source;

pub use refresher::Refresher;
pub use source::{DomainSource, FetchError};
