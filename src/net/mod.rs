//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → connection.rs (HTTP/1.1 + HTTP/2 serving, lifecycle tracking)
//!     → Hand off to HTTP layer
//!
//! Shutdown:
//!     Stop accepting → Drain connections → Abort after deadline
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Each connection is a task in one set so it can be drained or aborted

pub mod connection;
pub mod listener;

pub use listener::{Listener, ListenerError};
