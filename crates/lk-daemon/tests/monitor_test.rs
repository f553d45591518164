use anyhow::Result;
use async_trait::async_trait;

use lk_daemon::monitor::MotionMonitor;
use lk_daemon::motion::ProcessControl;
use lk_daemon::shutdown::ShutdownSignal;

// -- Fake daemon process ----------------------------------------------------

#[derive(Default)]
struct FakeDaemon {
    running: bool,
    start_calls: usize,
    /// Number of upcoming start attempts that should fail.
    fail_starts: usize,
}

#[async_trait]
impl ProcessControl for FakeDaemon {
    fn running(&mut self) -> bool {
        self.running
    }

    async fn start(&mut self) -> Result<()> {
        self.start_calls += 1;
        if self.fail_starts > 0 {
            self.fail_starts -= 1;
            anyhow::bail!("spawn failed: no such device");
        }
        self.running = true;
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.running = false;
        Ok(())
    }
}

#[tokio::test]
async fn no_enabled_work_never_starts_the_daemon() {
    let monitor = MotionMonitor::new(ShutdownSignal::new());
    let mut daemon = FakeDaemon::default();

    for _ in 0..10 {
        monitor.tick(&mut daemon, false).await;
    }

    assert_eq!(daemon.start_calls, 0);
    assert!(!daemon.running);
}

#[tokio::test]
async fn enabled_work_starts_the_daemon_exactly_once() {
    let monitor = MotionMonitor::new(ShutdownSignal::new());
    let mut daemon = FakeDaemon::default();

    monitor.tick(&mut daemon, true).await;
    assert_eq!(daemon.start_calls, 1);
    assert!(daemon.running);

    // While the daemon reports running, further ticks do nothing.
    for _ in 0..5 {
        monitor.tick(&mut daemon, true).await;
    }
    assert_eq!(daemon.start_calls, 1);
}

#[tokio::test]
async fn start_failure_is_retried_on_the_next_tick() {
    let monitor = MotionMonitor::new(ShutdownSignal::new());
    let mut daemon = FakeDaemon {
        fail_starts: 1,
        ..FakeDaemon::default()
    };

    // Tick N fails; the loop must stay alive and retry on tick N+1.
    monitor.tick(&mut daemon, true).await;
    assert_eq!(daemon.start_calls, 1);
    assert!(!daemon.running);

    monitor.tick(&mut daemon, true).await;
    assert_eq!(daemon.start_calls, 2);
    assert!(daemon.running);
}

#[tokio::test]
async fn repeated_failures_keep_retrying() {
    let monitor = MotionMonitor::new(ShutdownSignal::new());
    let mut daemon = FakeDaemon {
        fail_starts: 3,
        ..FakeDaemon::default()
    };

    for _ in 0..4 {
        monitor.tick(&mut daemon, true).await;
    }
    assert_eq!(daemon.start_calls, 4);
    assert!(daemon.running);
}

#[tokio::test]
async fn no_action_once_shutdown_is_requested() {
    let shutdown = ShutdownSignal::new();
    let monitor = MotionMonitor::new(shutdown.clone());
    let mut daemon = FakeDaemon::default();

    shutdown.trigger();
    monitor.tick(&mut daemon, true).await;

    assert_eq!(daemon.start_calls, 0);
}

#[tokio::test]
async fn daemon_restart_after_external_exit() {
    let monitor = MotionMonitor::new(ShutdownSignal::new());
    let mut daemon = FakeDaemon::default();

    monitor.tick(&mut daemon, true).await;
    assert_eq!(daemon.start_calls, 1);

    // The external process dies between ticks; the monitor re-queries and
    // brings it back.
    daemon.running = false;
    monitor.tick(&mut daemon, true).await;
    assert_eq!(daemon.start_calls, 2);
    assert!(daemon.running);
}
