//! OS signal handling.
//!
//! SIGINT and SIGTERM both resolve [`termination`]. A repeated signal has
//! no additional effect; the runtime keeps the handlers installed.

use std::io;

/// Resolve when the process receives an interrupt or terminate signal.
#[cfg(unix)]
pub async fn termination() -> io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = terminate.recv() => Ok("SIGTERM"),
        _ = interrupt.recv() => Ok("SIGINT"),
    }
}

#[cfg(not(unix))]
pub async fn termination() -> io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}
