use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use lk_core::cameras::{CameraRegistry, ShareConfig};
use lk_core::capabilities::find_mount_helper;
use lk_core::settings::Settings;

use crate::worker::Worker;

/// Share-mount manager.
///
/// On start, every distinct network share referenced by an enabled camera is
/// mounted under `RUN_PATH/mounts/<key>` via the CIFS mount helper, and a
/// background task re-checks the mounts every `MOUNT_CHECK_INTERVAL`
/// seconds, remounting anything that disappeared. On stop everything that
/// was mounted is unmounted. Individual mount and unmount failures are
/// logged and never fatal.
pub struct MountManager {
    conf_path: PathBuf,
    mount_root: PathBuf,
    helper: PathBuf,
    interval: Duration,
    mounted: Arc<Mutex<Vec<PathBuf>>>,
    handle: Option<JoinHandle<()>>,
}

impl MountManager {
    pub fn new(settings: &Settings) -> Self {
        Self {
            conf_path: settings.conf_path(),
            mount_root: settings.run_path().join("mounts"),
            helper: find_mount_helper().unwrap_or_else(|| PathBuf::from("mount.cifs")),
            interval: Duration::from_secs(settings.mount_check_interval().max(1)),
            mounted: Arc::new(Mutex::new(Vec::new())),
            handle: None,
        }
    }
}

#[async_trait]
impl Worker for MountManager {
    fn name(&self) -> &'static str {
        "mounts"
    }

    fn running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    async fn start(&mut self) -> Result<()> {
        mount_all(
            &self.conf_path,
            &self.mount_root,
            &self.helper,
            &self.mounted,
        )
        .await;

        let conf_path = self.conf_path.clone();
        let mount_root = self.mount_root.clone();
        let helper = self.helper.clone();
        let mounted = self.mounted.clone();
        let interval = self.interval;

        self.handle = Some(tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            // First check happened synchronously above.
            timer.tick().await;
            loop {
                timer.tick().await;
                mount_all(&conf_path, &mount_root, &helper, &mounted).await;
            }
        }));
        Ok(())
    }

    async fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        let targets: Vec<PathBuf> = {
            let mut mounted = self.mounted.lock().unwrap_or_else(|e| e.into_inner());
            mounted.drain(..).collect()
        };
        for target in targets {
            unmount(&target).await;
        }
    }
}

/// Mount every share an enabled camera references, skipping the ones already
/// mounted. Newly mounted targets are recorded for unmounting at stop.
async fn mount_all(
    conf_path: &Path,
    mount_root: &Path,
    helper: &Path,
    mounted: &Arc<Mutex<Vec<PathBuf>>>,
) {
    let registry = CameraRegistry::load(conf_path);
    for share in registry.enabled_shares() {
        let target = mount_root.join(share.mount_key());
        if let Err(e) = std::fs::create_dir_all(&target) {
            warn!(target = %target.display(), error = %e, "cannot create mount point");
            continue;
        }
        if target_is_mounted_now(&target) {
            continue;
        }
        if mount_share(helper, &share, &target).await {
            let mut mounted = mounted.lock().unwrap_or_else(|e| e.into_inner());
            if !mounted.contains(&target) {
                mounted.push(target);
            }
        }
    }
}

/// Run the mount helper for one share. Returns whether the mount succeeded.
async fn mount_share(helper: &Path, share: &ShareConfig, target: &Path) -> bool {
    let source = format!("//{}/{}", share.server, share.share);
    let output = tokio::process::Command::new(helper)
        .arg(&source)
        .arg(target)
        .arg("-o")
        .arg(mount_options(share))
        .output()
        .await;

    match output {
        Ok(output) if output.status.success() => {
            info!(source = %source, target = %target.display(), "share mounted");
            true
        }
        Ok(output) => {
            warn!(
                source = %source,
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "failed to mount share"
            );
            false
        }
        Err(e) => {
            warn!(source = %source, error = %e, "could not run mount helper");
            false
        }
    }
}

async fn unmount(target: &Path) {
    let output = tokio::process::Command::new("umount")
        .arg(target)
        .output()
        .await;
    match output {
        Ok(output) if output.status.success() => {
            info!(target = %target.display(), "share unmounted");
        }
        Ok(output) => warn!(
            target = %target.display(),
            status = %output.status,
            "failed to unmount share"
        ),
        Err(e) => warn!(target = %target.display(), error = %e, "could not run umount"),
    }
}

/// Helper `-o` option string for a share.
fn mount_options(share: &ShareConfig) -> String {
    match (&share.username, &share.password) {
        (Some(user), Some(pass)) => format!("rw,user={user},pass={pass}"),
        (Some(user), None) => format!("rw,user={user}"),
        _ => "rw,guest".to_string(),
    }
}

fn target_is_mounted_now(target: &Path) -> bool {
    std::fs::read_to_string("/proc/mounts")
        .map(|mounts| target_is_mounted(&mounts, target))
        .unwrap_or(false)
}

/// Whether `/proc/mounts` content lists `target` as a mount point.
fn target_is_mounted(proc_mounts: &str, target: &Path) -> bool {
    let Some(target) = target.to_str() else {
        return false;
    };
    proc_mounts
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .any(|mount_point| mount_point == target)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
