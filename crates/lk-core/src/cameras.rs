//! Camera registry.
//!
//! Each camera is a `camera-<id>.toml` file in the configuration directory.
//! The registry is loaded on demand: the camera set can change at runtime
//! (the UI writes these files), so callers re-scan instead of caching.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// A network share a camera records to, mounted by the share-mount manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareConfig {
    pub server: String,
    pub share: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

impl ShareConfig {
    /// Stable identifier for mount-point naming and deduplication.
    pub fn mount_key(&self) -> String {
        format!("{}_{}", self.server, self.share).replace(['/', '\\'], "_")
    }
}

/// One camera entry as persisted in the configuration directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Numeric id, derived from the file name.
    #[serde(default)]
    pub id: u32,
    pub name: String,
    /// Capture device, e.g. `/dev/video0`.
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Where this camera's media files land.
    #[serde(default)]
    pub target_dir: Option<PathBuf>,
    /// Days to keep media before the cleanup worker removes it; 0 keeps
    /// everything.
    #[serde(default)]
    pub preserve_media: u32,
    #[serde(default)]
    pub share: Option<ShareConfig>,
}

fn default_enabled() -> bool {
    true
}

/// The set of configured cameras at one point in time.
#[derive(Debug, Clone, Default)]
pub struct CameraRegistry {
    cameras: Vec<CameraConfig>,
}

impl CameraRegistry {
    /// Scan `conf_path` for camera files. Unreadable or unparseable entries
    /// are warned and skipped; a missing directory yields an empty registry.
    pub fn load(conf_path: &Path) -> Self {
        let mut cameras = Vec::new();
        let entries = match std::fs::read_dir(conf_path) {
            Ok(entries) => entries,
            Err(_) => return Self::default(),
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let Some(id) = camera_id(&path) else {
                continue;
            };
            let text = match std::fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable camera file");
                    continue;
                }
            };
            match toml::from_str::<CameraConfig>(&text) {
                Ok(mut camera) => {
                    camera.id = id;
                    cameras.push(camera);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping invalid camera file");
                }
            }
        }

        cameras.sort_by_key(|c| c.id);
        Self { cameras }
    }

    /// Whether at least one enabled camera exists — the daemon monitor's
    /// "enabled work" predicate.
    pub fn has_enabled(&self) -> bool {
        self.cameras.iter().any(|c| c.enabled)
    }

    pub fn all(&self) -> &[CameraConfig] {
        &self.cameras
    }

    pub fn enabled(&self) -> impl Iterator<Item = &CameraConfig> {
        self.cameras.iter().filter(|c| c.enabled)
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    /// Distinct shares referenced by enabled cameras, in id order.
    pub fn enabled_shares(&self) -> Vec<ShareConfig> {
        let mut shares: Vec<ShareConfig> = Vec::new();
        for camera in self.enabled() {
            if let Some(share) = &camera.share {
                if !shares.contains(share) {
                    shares.push(share.clone());
                }
            }
        }
        shares
    }
}

/// Extract the numeric id from a `camera-<id>.toml` file name.
fn camera_id(path: &Path) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    if path.extension()?.to_str()? != "toml" {
        return None;
    }
    stem.strip_prefix("camera-")?.parse().ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
