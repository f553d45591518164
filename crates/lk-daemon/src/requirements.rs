//! Environment requirement verification.
//!
//! Runs after configuration resolution and before anything else: logging is
//! not configured yet, so diagnostics go straight to stderr. A failed check
//! aborts startup with a non-zero exit.

use lk_core::capabilities::{self, CapabilitySet};
use lk_core::settings::Settings;

/// Collect every unmet requirement as a human-readable diagnostic.
pub fn problems(settings: &Settings, caps: &CapabilitySet) -> Vec<String> {
    problems_as(settings, caps, capabilities::is_root())
}

fn problems_as(settings: &Settings, caps: &CapabilitySet, is_root: bool) -> Vec<String> {
    let mut problems = Vec::new();

    if settings.smb_shares() && !is_root {
        problems.push("share mounting requires root privileges".to_string());
    }
    if !caps.web_framework {
        problems.push("web framework support is unavailable in this build".to_string());
    }
    if !caps.templating {
        problems.push("template support is unavailable in this build".to_string());
    }
    if !caps.image_library {
        problems.push("image support is unavailable in this build".to_string());
    }
    if !caps.ffmpeg {
        problems.push("please install ffmpeg".to_string());
    }
    if !caps.motion {
        problems.push("please install motion".to_string());
    }
    if !caps.v4l2_ctl {
        problems.push("please install v4l-utils".to_string());
    }
    if settings.smb_shares() && !caps.mount_cifs {
        problems.push("please install cifs-utils".to_string());
    }

    problems
}

/// Print every problem to stderr and return whether the environment is
/// acceptable. The caller must abort startup when this returns `false`.
pub fn check(settings: &Settings, caps: &CapabilitySet) -> bool {
    let problems = problems(settings, caps);
    for problem in &problems {
        eprintln!("{problem}");
    }
    problems.is_empty()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use lk_core::settings::{Resolution, Settings};

    fn settings(tokens: &[&str]) -> Settings {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut argv = vec![
            "--conf-path".to_string(),
            tmp.path().join("conf").display().to_string(),
            "--run-path".to_string(),
            tmp.path().join("run").display().to_string(),
        ];
        argv.extend(tokens.iter().map(|s| s.to_string()));
        match Settings::resolve_with_store(&argv, None).expect("resolve") {
            Resolution::Run { settings, .. } => settings,
            Resolution::Help => panic!("unexpected help"),
        }
    }

    fn all_present() -> CapabilitySet {
        CapabilitySet {
            motion: true,
            ffmpeg: true,
            v4l2_ctl: true,
            mount_cifs: true,
            web_framework: true,
            templating: true,
            image_library: true,
        }
    }

    #[test]
    fn everything_present_passes() {
        let problems = problems_as(&settings(&[]), &all_present(), false);
        assert!(problems.is_empty());
    }

    #[test]
    fn missing_motion_is_reported() {
        let caps = CapabilitySet {
            motion: false,
            ..all_present()
        };
        let problems = problems_as(&settings(&[]), &caps, false);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("motion"));
    }

    #[test]
    fn missing_ffmpeg_and_v4l2_both_reported() {
        let caps = CapabilitySet {
            ffmpeg: false,
            v4l2_ctl: false,
            ..all_present()
        };
        let problems = problems_as(&settings(&[]), &caps, false);
        assert_eq!(problems.len(), 2);
    }

    #[test]
    fn smb_without_root_is_reported() {
        let problems = problems_as(&settings(&["--smb-shares", "true"]), &all_present(), false);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("root"));
    }

    #[test]
    fn smb_with_root_passes() {
        let problems = problems_as(&settings(&["--smb-shares", "true"]), &all_present(), true);
        assert!(problems.is_empty());
    }

    #[test]
    fn smb_needs_mount_helper() {
        let caps = CapabilitySet {
            mount_cifs: false,
            ..all_present()
        };
        let problems = problems_as(&settings(&["--smb-shares", "true"]), &caps, true);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("cifs-utils"));
    }

    #[test]
    fn mount_helper_irrelevant_without_smb() {
        let caps = CapabilitySet {
            mount_cifs: false,
            ..all_present()
        };
        let problems = problems_as(&settings(&[]), &caps, false);
        assert!(problems.is_empty());
    }
}
