//! lenskeeper daemon — resolves runtime configuration, verifies the
//! environment, and supervises the motion daemon plus the background
//! workers until a stop signal arrives.

use std::process::ExitCode;

use tracing::{error, info};

use lk_core::capabilities::CapabilitySet;
use lk_core::settings::{help_text, Resolution, Settings};
use lk_daemon::{requirements, signals, supervisor::Supervisor};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> ExitCode {
    let argv: Vec<String> = std::env::args().skip(1).collect();

    let (settings, command) = match Settings::resolve(&argv) {
        Ok(Resolution::Help) => {
            println!("usage: lk-daemon [--option value] ...\n");
            print!("{}", help_text());
            return ExitCode::SUCCESS;
        }
        Ok(Resolution::Run { settings, command }) => (settings, command),
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };

    if let Some(command) = command {
        // Leftover tokens are sub-command hooks; none are defined yet.
        eprintln!("unknown command '{command}' (see --help for options)");
        return ExitCode::from(2);
    }

    let caps = CapabilitySet::probe();
    if !requirements::check(&settings, &caps) {
        return ExitCode::FAILURE;
    }

    lk_telemetry::logging::init_logging("lk-daemon", settings.log_level());
    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = std::process::id(),
        "lenskeeper starting"
    );

    let mut supervisor = Supervisor::wire(settings);

    if let Err(e) = signals::install(&supervisor.shutdown_handle()) {
        error!(error = %e, "failed to install signal handlers");
        return ExitCode::FAILURE;
    }

    if let Err(e) = supervisor.run().await {
        error!(error = %e, "supervisor failed");
        return ExitCode::FAILURE;
    }

    info!("lenskeeper stopped");
    ExitCode::SUCCESS
}
