//! OS signal handling.
//!
//! Exactly two behaviours are installed, both before the supervisor loop
//! starts: interrupt/terminate request a graceful stop, and child-exit
//! notifications drive non-blocking reclamation of finished children. All
//! other signals keep their default disposition.

use anyhow::{Context, Result};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, info};

use crate::shutdown::ShutdownSignal;

/// Install the signal handlers. The handlers run as ordinary tasks on the
/// runtime (tokio translates the asynchronous delivery), so they stay
/// minimal anyway: one log line and a trigger, nothing else.
pub fn install(shutdown: &ShutdownSignal) -> Result<()> {
    let mut interrupt =
        signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?;
    let mut terminate =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    let mut child = signal(SignalKind::child()).context("failed to install SIGCHLD handler")?;

    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = interrupt.recv() => info!("interrupt signal received, shutting down"),
            _ = terminate.recv() => info!("terminate signal received, shutting down"),
        }
        trigger.trigger();
    });

    // Child processes are owned by tokio handles (the motion child, worker
    // subcommands); receiving SIGCHLD wakes their pending wait futures, which
    // perform the actual non-blocking reclamation. Reaping here with a raw
    // waitpid(-1) would steal exit statuses from those handles and corrupt
    // the monitor's running() queries, so this task only drains the stream.
    tokio::spawn(async move {
        while child.recv().await.is_some() {
            debug!("child exit notification received");
        }
    });

    Ok(())
}
