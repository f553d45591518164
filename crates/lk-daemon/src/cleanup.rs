use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::Result;
use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use lk_core::cameras::CameraRegistry;
use lk_core::settings::Settings;

use crate::worker::Worker;

const SECS_PER_DAY: u64 = 86_400;

/// Background worker that removes expired media files.
///
/// Every `CLEANUP_INTERVAL` seconds each enabled camera's target directory is
/// swept and files older than the camera's `preserve_media` days are
/// deleted. Cameras with `preserve_media = 0` keep everything.
pub struct CleanupWorker {
    conf_path: PathBuf,
    interval: Duration,
    handle: Option<JoinHandle<()>>,
}

impl CleanupWorker {
    pub fn new(settings: &Settings) -> Self {
        Self {
            conf_path: settings.conf_path(),
            interval: Duration::from_secs(settings.cleanup_interval().max(1)),
            handle: None,
        }
    }
}

#[async_trait]
impl Worker for CleanupWorker {
    fn name(&self) -> &'static str {
        "cleanup"
    }

    fn running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    async fn start(&mut self) -> Result<()> {
        let conf_path = self.conf_path.clone();
        let interval = self.interval;

        self.handle = Some(tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            // Consume the first immediate tick; the first sweep runs one
            // full interval after startup.
            timer.tick().await;
            loop {
                timer.tick().await;
                sweep(&conf_path);
            }
        }));
        Ok(())
    }

    async fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// One cleanup pass over every enabled camera.
fn sweep(conf_path: &Path) {
    let registry = CameraRegistry::load(conf_path);
    for camera in registry.enabled() {
        if camera.preserve_media == 0 {
            continue;
        }
        let Some(target_dir) = &camera.target_dir else {
            continue;
        };
        let max_age = Duration::from_secs(u64::from(camera.preserve_media) * SECS_PER_DAY);
        let removed = remove_older_than(target_dir, max_age);
        if removed > 0 {
            info!(camera = %camera.name, removed, "expired media removed");
        }
    }
}

/// Recursively delete files older than `max_age` under `dir`, then any
/// directories the deletion left empty. Returns the number of files removed;
/// individual failures are logged and skipped.
fn remove_older_than(dir: &Path, max_age: Duration) -> usize {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "cannot read media directory");
            return 0;
        }
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            removed += remove_older_than(&path, max_age);
            // Best effort: fails while the directory still has fresh files.
            let _ = std::fs::remove_dir(&path);
        } else if is_older_than(&path, max_age) {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove expired file"),
            }
        }
    }
    removed
}

fn is_older_than(path: &Path, max_age: Duration) -> bool {
    let Ok(metadata) = path.metadata() else {
        return false;
    };
    let Ok(modified) = metadata.modified() else {
        return false;
    };
    SystemTime::now()
        .duration_since(modified)
        .map(|age| age > max_age)
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
