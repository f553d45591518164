use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use lk_core::cameras::CameraRegistry;
use lk_core::capabilities::find_in_path;
use lk_core::settings::Settings;

use crate::worker::Worker;

/// Media extensions that get a thumbnail sidecar.
const MEDIA_EXTENSIONS: &[&str] = &["jpg", "jpeg", "avi", "mp4", "mkv"];

/// Suffix of the generated sidecar file.
const THUMB_SUFFIX: &str = ".thumb.jpg";

/// Background worker that generates missing thumbnail sidecars.
///
/// Generation is delegated to the external `ffmpeg` binary; this worker only
/// finds media files without a sidecar and queues one `ffmpeg` invocation
/// per file. Only started when `THUMBNAILER_INTERVAL` is non-zero.
pub struct ThumbnailWorker {
    conf_path: PathBuf,
    ffmpeg: PathBuf,
    interval: Duration,
    handle: Option<JoinHandle<()>>,
}

impl ThumbnailWorker {
    pub fn new(settings: &Settings) -> Self {
        Self {
            conf_path: settings.conf_path(),
            ffmpeg: find_in_path("ffmpeg").unwrap_or_else(|| PathBuf::from("ffmpeg")),
            interval: Duration::from_secs(settings.thumbnailer_interval().max(1)),
            handle: None,
        }
    }
}

#[async_trait]
impl Worker for ThumbnailWorker {
    fn name(&self) -> &'static str {
        "thumbnailer"
    }

    fn running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    async fn start(&mut self) -> Result<()> {
        let conf_path = self.conf_path.clone();
        let ffmpeg = self.ffmpeg.clone();
        let interval = self.interval;

        self.handle = Some(tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            // Consume the first immediate tick so startup is not spent
            // encoding a backlog before the daemon is even serving.
            timer.tick().await;
            loop {
                timer.tick().await;
                run_pass(&conf_path, &ffmpeg).await;
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

/// One thumbnailing pass: generate a sidecar for every pending media file of
/// every enabled camera.
async fn run_pass(conf_path: &Path, ffmpeg: &Path) {
    let registry = CameraRegistry::load(conf_path);
    for camera in registry.enabled() {
        let Some(target_dir) = &camera.target_dir else {
            continue;
        };
        for media in pending_thumbnails(target_dir) {
            generate_thumbnail(ffmpeg, &media).await;
        }
    }
}

/// Media files under `dir` (recursively) that have no thumbnail sidecar yet.
fn pending_thumbnails(dir: &Path) -> Vec<PathBuf> {
    let mut pending = Vec::new();
    collect_pending(dir, &mut pending);
    pending
}

fn collect_pending(dir: &Path, pending: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_pending(&path, pending);
        } else if is_media_file(&path) && !thumbnail_path(&path).exists() {
            pending.push(path);
        }
    }
}

fn is_media_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if name.ends_with(THUMB_SUFFIX) {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| MEDIA_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Sidecar path for a media file: `movie.avi` -> `movie.avi.thumb.jpg`.
fn thumbnail_path(media: &Path) -> PathBuf {
    let mut name = media.as_os_str().to_os_string();
    name.push(THUMB_SUFFIX);
    PathBuf::from(name)
}

async fn generate_thumbnail(ffmpeg: &Path, media: &Path) {
    let thumb = thumbnail_path(media);
    let output = tokio::process::Command::new(ffmpeg)
        .arg("-y")
        .arg("-i")
        .arg(media)
        .args(["-frames:v", "1", "-vf", "scale=200:-1"])
        .arg(&thumb)
        .output()
        .await;

    match output {
        Ok(output) if output.status.success() => {
            debug!(media = %media.display(), "thumbnail generated");
        }
        Ok(output) => {
            warn!(
                media = %media.display(),
                status = %output.status,
                "ffmpeg failed to generate thumbnail"
            );
        }
        Err(e) => warn!(media = %media.display(), error = %e, "could not run ffmpeg"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
