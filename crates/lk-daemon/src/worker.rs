use anyhow::Result;
use async_trait::async_trait;

/// Lifecycle contract for the auxiliary background workers (cleanup,
/// thumbnailer, share mounts).
///
/// The supervisor is the only caller: it starts workers during the startup
/// sequence and stops them, guarded by [`running`](Worker::running), during
/// shutdown. A worker never started must never be asked to stop.
#[async_trait]
pub trait Worker: Send {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    /// Whether the worker's background task is currently alive.
    fn running(&self) -> bool;

    /// Start the worker's background task. An error means the worker did not
    /// come up; the supervisor logs it and continues with the next step.
    async fn start(&mut self) -> Result<()>;

    /// Stop the worker and release its resources. Infallible by contract:
    /// implementations contain their own teardown failures.
    async fn stop(&mut self);
}
