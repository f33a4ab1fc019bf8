//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Shared table → Listener + Refresher + Signal watcher
//!
//! Shutdown (shutdown.rs):
//!     Signal received or task failed → Stop accepting → Drain connections → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - One shutdown signal shared by every task
//! - Shutdown has timeout: open connections are aborted after the deadline

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{Proxy, ProxyError};
