use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use lk_core::cameras::CameraRegistry;
use lk_core::settings::Settings;

use crate::cleanup::CleanupWorker;
use crate::monitor::MotionMonitor;
use crate::motion::{MotionDaemon, ProcessControl};
use crate::mounts::MountManager;
use crate::server::{api_router, ApiState};
use crate::shutdown::ShutdownSignal;
use crate::thumbnailer::ThumbnailWorker;
use crate::worker::Worker;

/// Lifecycle orchestrator for the whole application.
///
/// Receives its collaborators fully constructed, sequences their startup in
/// a fixed order, runs the supervisory event loop until shutdown is
/// requested, then unwinds in reverse — stopping only what actually runs.
pub struct Supervisor {
    settings: Settings,
    shutdown: ShutdownSignal,
    daemon: Box<dyn ProcessControl>,
    cleanup: Box<dyn Worker>,
    thumbnailer: Box<dyn Worker>,
    mounts: Box<dyn Worker>,
}

impl Supervisor {
    /// Create a supervisor from its component parts.
    pub fn new(
        settings: Settings,
        daemon: Box<dyn ProcessControl>,
        cleanup: Box<dyn Worker>,
        thumbnailer: Box<dyn Worker>,
        mounts: Box<dyn Worker>,
    ) -> Self {
        Self {
            settings,
            shutdown: ShutdownSignal::new(),
            daemon,
            cleanup,
            thumbnailer,
            mounts,
        }
    }

    /// Build a supervisor wired to the production collaborators.
    pub fn wire(settings: Settings) -> Self {
        let daemon = Box::new(MotionDaemon::new(&settings));
        let cleanup = Box::new(CleanupWorker::new(&settings));
        let thumbnailer = Box::new(ThumbnailWorker::new(&settings));
        let mounts = Box::new(MountManager::new(&settings));
        Self::new(settings, daemon, cleanup, thumbnailer, mounts)
    }

    /// Handle for requesting shutdown from signal handlers or tests.
    pub fn shutdown_handle(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Run the full lifecycle. Blocks until a shutdown is requested and the
    /// unwind has completed.
    pub async fn run(&mut self) -> Result<()> {
        let conf_path = self.settings.conf_path();

        if self.settings.smb_shares() {
            match self.mounts.start().await {
                Ok(()) => info!("share mounts started"),
                Err(e) => warn!(error = %e, "failed to start share mounts"),
            }
        }

        // The motion monitor's first check fires immediately; the interval
        // takes over from there.
        let monitor = MotionMonitor::new(self.shutdown.clone());
        let registry = CameraRegistry::load(&conf_path);
        monitor
            .tick(self.daemon.as_mut(), registry.has_enabled())
            .await;
        let mut check_interval = tokio::time::interval(Duration::from_secs(
            self.settings.motion_check_interval().max(1),
        ));
        // Consume the interval's immediate tick — the first check just ran.
        check_interval.tick().await;

        match self.cleanup.start().await {
            Ok(()) => info!("cleanup started"),
            Err(e) => warn!(error = %e, "failed to start cleanup"),
        }

        if self.settings.thumbnailer_interval() != 0 {
            match self.thumbnailer.start().await {
                Ok(()) => info!("thumbnailer started"),
                Err(e) => warn!(error = %e, "failed to start thumbnailer"),
            }
        }

        let state = ApiState::new(&self.settings);
        state
            .motion_running
            .store(self.daemon.running(), Ordering::Relaxed);
        let app = api_router(state.clone(), &self.settings);
        let bind_addr = format!("{}:{}", self.settings.listen(), self.settings.port());
        let listener = tokio::net::TcpListener::bind(&bind_addr)
            .await
            .with_context(|| format!("failed to bind {bind_addr}"))?;
        let local_addr = listener.local_addr()?;
        let server_handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!(error = %e, "server error");
            }
        });
        info!(addr = %local_addr, "server started");

        let mut shutdown_rx = self.shutdown.subscribe();
        loop {
            tokio::select! {
                _ = check_interval.tick() => {
                    if self.shutdown.is_shutting_down() {
                        break;
                    }
                    let registry = CameraRegistry::load(&conf_path);
                    monitor
                        .tick(self.daemon.as_mut(), registry.has_enabled())
                        .await;
                    state
                        .motion_running
                        .store(self.daemon.running(), Ordering::Relaxed);
                }
                _ = shutdown_rx.recv() => break,
            }
        }
        info!("server stopped");

        if self.thumbnailer.running() {
            self.thumbnailer.stop().await;
            info!("thumbnailer stopped");
        }
        if self.cleanup.running() {
            self.cleanup.stop().await;
            info!("cleanup stopped");
        }
        if self.daemon.running() {
            match self.daemon.stop().await {
                Ok(()) => info!("motion stopped"),
                Err(e) => warn!(error = %e, "failed to stop motion"),
            }
        }
        if self.settings.smb_shares() && self.mounts.running() {
            self.mounts.stop().await;
            info!("shares unmounted");
        }
        server_handle.abort();

        Ok(())
    }
}
