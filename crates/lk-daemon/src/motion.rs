use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use lk_core::capabilities::find_in_path;
use lk_core::settings::Settings;

/// How long a stopped daemon gets to exit on SIGTERM before being killed.
const STOP_GRACE: Duration = Duration::from_secs(10);

/// Control surface for the external motion-detection daemon.
///
/// The monitor may call `start()`; only the supervisor calls `stop()`, during
/// shutdown. `running()` re-queries the child on every call — there is no
/// shadow state to drift out of sync.
#[async_trait]
pub trait ProcessControl: Send {
    fn running(&mut self) -> bool;
    async fn start(&mut self) -> Result<()>;
    async fn stop(&mut self) -> Result<()>;
}

/// The production [`ProcessControl`]: spawns and terminates the `motion`
/// binary.
pub struct MotionDaemon {
    binary: PathBuf,
    conf_path: PathBuf,
    run_path: PathBuf,
    child: Option<Child>,
}

impl MotionDaemon {
    pub fn new(settings: &Settings) -> Self {
        Self {
            // The requirement check has already verified the binary exists;
            // the bare name is a fallback for tests that bypass the check.
            binary: find_in_path("motion").unwrap_or_else(|| PathBuf::from("motion")),
            conf_path: settings.conf_path(),
            run_path: settings.run_path(),
            child: None,
        }
    }
}

#[async_trait]
impl ProcessControl for MotionDaemon {
    fn running(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                debug!(%status, "motion exited");
                self.child = None;
                false
            }
            Err(e) => {
                warn!(error = %e, "could not query motion state");
                self.child = None;
                false
            }
        }
    }

    async fn start(&mut self) -> Result<()> {
        if self.running() {
            return Ok(());
        }

        let mut command = Command::new(&self.binary);
        command
            .arg("-n") // never let motion fork into the background itself
            .arg("-p")
            .arg(self.run_path.join("motion.pid"))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let motion_conf = self.conf_path.join("motion.conf");
        if motion_conf.is_file() {
            command.arg("-c").arg(motion_conf);
        }

        let child = command.spawn().context("failed to spawn motion")?;
        info!(pid = child.id(), "motion spawned");
        self.child = Some(child);
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        if let Some(pid) = child.id() {
            // Ask nicely first so motion can flush its event handlers.
            let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
            match tokio::time::timeout(STOP_GRACE, child.wait()).await {
                Ok(status) => {
                    let status = status.context("failed waiting for motion to exit")?;
                    debug!(%status, "motion exited after SIGTERM");
                    return Ok(());
                }
                Err(_) => warn!("motion ignored SIGTERM, killing it"),
            }
        }

        child.kill().await.context("failed to kill motion")?;
        Ok(())
    }
}
