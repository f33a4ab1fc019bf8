//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! connection (net subsystem)
//!     → server.rs (middleware, dispatch)
//!     → request.rs (request id, scheme, original host)
//!     → routing subsystem (host validation, table lookup)
//!     → forward.rs (outbound request, forwarding primitive)
//!     → upgrade.rs (101 Switching Protocols tunnel)
//!     → response.rs (fixed rejections, header hygiene)
//!     → Send to client
//! ```

pub mod forward;
pub mod request;
pub mod response;
pub mod server;
pub mod upgrade;

pub use forward::{ForwardError, Forwarder, HttpForwarder, Target};
pub use request::{ClientScheme, RequestContext, X_REQUEST_ID};
pub use server::{build_router, dispatch, AppState};
