use tracing::{error, info};

use crate::motion::ProcessControl;
use crate::shutdown::ShutdownSignal;

/// Recurring check that keeps the motion daemon's running state in sync with
/// whether any enabled camera exists.
///
/// The monitor holds no state of its own: the daemon's liveness is re-queried
/// through [`ProcessControl::running`] on every tick, and the enabled-work
/// predicate is evaluated fresh by the caller. A failed start is an error log
/// and nothing more — the next tick retries.
pub struct MotionMonitor {
    shutdown: ShutdownSignal,
}

impl MotionMonitor {
    pub fn new(shutdown: ShutdownSignal) -> Self {
        Self { shutdown }
    }

    /// One scheduled check. `has_enabled_work` is the result of the
    /// enabled-camera predicate, evaluated by the caller just before the
    /// tick.
    pub async fn tick(&self, daemon: &mut dyn ProcessControl, has_enabled_work: bool) {
        if self.shutdown.is_shutting_down() {
            return;
        }

        if daemon.running() || !has_enabled_work {
            return;
        }

        match daemon.start().await {
            Ok(()) => info!("motion started"),
            Err(e) => error!(error = %e, "failed to start motion"),
        }
    }
}
