//! One-shot probing of the external capabilities the daemon depends on.
//!
//! The probe runs once at startup, before logging is configured; the result
//! is handed to the requirement checker and never persisted.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use nix::unistd::Uid;

/// Extra directories searched for system utilities that are commonly not on
/// an unprivileged user's PATH.
const SBIN_DIRS: &[&str] = &["/sbin", "/usr/sbin", "/usr/local/sbin"];

/// Boolean probe results for everything the supervisor may need from the
/// host environment.
#[derive(Debug, Clone, Copy)]
pub struct CapabilitySet {
    /// The external motion-detection daemon binary.
    pub motion: bool,
    /// Video encoder binary, used for thumbnail generation.
    pub ffmpeg: bool,
    /// Video-device control utility.
    pub v4l2_ctl: bool,
    /// CIFS mount helper, required only when share mounting is enabled.
    pub mount_cifs: bool,
    /// Web framework, templating and image libraries are statically linked
    /// into this binary; the flags exist so the requirement check covers the
    /// same surface whatever the build looks like.
    pub web_framework: bool,
    pub templating: bool,
    pub image_library: bool,
}

impl CapabilitySet {
    /// Probe the host once.
    pub fn probe() -> Self {
        Self {
            motion: find_in_path("motion").is_some(),
            ffmpeg: find_in_path("ffmpeg").is_some(),
            v4l2_ctl: find_in_path("v4l2-ctl").is_some(),
            mount_cifs: find_mount_helper().is_some(),
            web_framework: true,
            templating: true,
            image_library: true,
        }
    }
}

/// Whether the process runs with elevated privilege (effective uid 0).
pub fn is_root() -> bool {
    Uid::effective().is_root()
}

/// Locate an executable by scanning the PATH environment variable.
pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    find_in_dirs(name, std::env::split_paths(&path))
}

/// Locate the CIFS mount helper, also checking the sbin directories where
/// distributions install it.
pub fn find_mount_helper() -> Option<PathBuf> {
    find_in_path("mount.cifs")
        .or_else(|| find_in_dirs("mount.cifs", SBIN_DIRS.iter().map(PathBuf::from)))
}

/// Search an explicit directory list for an executable file.
fn find_in_dirs(name: &str, dirs: impl Iterator<Item = PathBuf>) -> Option<PathBuf> {
    for dir in dirs {
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            return Some(candidate);
        }
    }
    None
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn make_executable(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\n").expect("write stub");
        let mut perms = fs::metadata(&path).expect("metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("chmod");
        path
    }

    #[test]
    fn finds_executable_in_dir_list() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let expected = make_executable(tmp.path(), "motion");

        let found = find_in_dirs("motion", [tmp.path().to_path_buf()].into_iter());
        assert_eq!(found, Some(expected));
    }

    #[test]
    fn non_executable_file_is_not_found() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("motion");
        fs::write(&path, "not a program").expect("write");
        let mut perms = fs::metadata(&path).expect("metadata").permissions();
        perms.set_mode(0o644);
        fs::set_permissions(&path, perms).expect("chmod");

        let found = find_in_dirs("motion", [tmp.path().to_path_buf()].into_iter());
        assert_eq!(found, None);
    }

    #[test]
    fn missing_binary_yields_none() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let found = find_in_dirs("no-such-utility", [tmp.path().to_path_buf()].into_iter());
        assert_eq!(found, None);
    }
}
