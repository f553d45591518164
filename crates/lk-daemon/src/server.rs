//! Minimal HTTP status surface.
//!
//! The full web UI is a separate layer; the supervisor only binds this
//! router so the application is reachable for the loop's lifetime: a status
//! endpoint, the camera list, and the static file tree.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tower_http::services::ServeDir;

use lk_core::cameras::{CameraConfig, CameraRegistry};
use lk_core::settings::Settings;

/// Shared state for the status handlers.
#[derive(Clone)]
pub struct ApiState {
    conf_path: PathBuf,
    started_at: DateTime<Utc>,
    /// Updated by the supervisor after every monitor tick.
    pub motion_running: Arc<AtomicBool>,
}

impl ApiState {
    pub fn new(settings: &Settings) -> Self {
        Self {
            conf_path: settings.conf_path(),
            started_at: Utc::now(),
            motion_running: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Build the router served for the supervisor's lifetime.
pub fn api_router(state: ApiState, settings: &Settings) -> Router {
    let mut router = Router::new()
        .route("/api/status", get(status))
        .route("/api/cameras", get(cameras))
        .with_state(state);

    let static_url = settings.static_url();
    let static_route = static_url.trim_end_matches('/');
    if !static_route.is_empty() {
        router = router.nest_service(static_route, ServeDir::new(settings.static_path()));
    }
    router
}

async fn status(State(state): State<ApiState>) -> Json<Value> {
    Json(status_payload(&state))
}

async fn cameras(State(state): State<ApiState>) -> Json<Vec<CameraConfig>> {
    Json(CameraRegistry::load(&state.conf_path).all().to_vec())
}

fn status_payload(state: &ApiState) -> Value {
    let registry = CameraRegistry::load(&state.conf_path);
    json!({
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": (Utc::now() - state.started_at).num_seconds(),
        "motion_running": state.motion_running.load(Ordering::Relaxed),
        "cameras": registry.len(),
        "enabled_cameras": registry.enabled().count(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn state_with_conf(conf: &std::path::Path) -> ApiState {
        ApiState {
            conf_path: conf.to_path_buf(),
            started_at: Utc::now(),
            motion_running: Arc::new(AtomicBool::new(false)),
        }
    }

    #[test]
    fn status_reports_camera_counts_and_motion_state() {
        let tmp = tempfile::tempdir().expect("tempdir");
        fs::write(tmp.path().join("camera-1.toml"), "name = \"porch\"\n").expect("write");
        fs::write(
            tmp.path().join("camera-2.toml"),
            "name = \"garage\"\nenabled = false\n",
        )
        .expect("write");

        let state = state_with_conf(tmp.path());
        state.motion_running.store(true, Ordering::Relaxed);

        let payload = status_payload(&state);
        assert_eq!(payload["cameras"], 2);
        assert_eq!(payload["enabled_cameras"], 1);
        assert_eq!(payload["motion_running"], true);
        assert_eq!(payload["version"], env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn empty_conf_dir_reports_zero_cameras() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let payload = status_payload(&state_with_conf(tmp.path()));
        assert_eq!(payload["cameras"], 0);
        assert_eq!(payload["enabled_cameras"], 0);
    }
}
