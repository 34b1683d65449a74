use std::process::ExitCode;

use tokio::signal;
use tracing::{error, info};

use lanrelay::logging::init_tracing;
use lanrelay::{Reactor, ServerConfig};

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const APP_NAME: &str = "lanrelay";

// -----------------------------------------------------------------------------
// ----- Main ------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let config = match ServerConfig::from_args() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{APP_NAME}: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(config.log_level);

    match run_forever(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{APP_NAME}: {e}");
            ExitCode::FAILURE
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Run -------------------------------------------------------------------

async fn run_forever(config: ServerConfig) -> Result<(), lanrelay::RelayError> {
    let mut reactor = Reactor::bind(&config)?;
    let handle = reactor.handle();

    // The reactor owns its thread; the async side only waits for signals.
    let mut worker = tokio::task::spawn_blocking(move || reactor.run());

    tokio::select! {
        _ = wait_for_signal() => {
            info!("{APP_NAME} shutting down");
            handle.shutdown();
        }

        res = &mut worker => {
            return flatten(res);
        }
    }

    let res = worker.await;
    info!("{APP_NAME} terminated");
    flatten(res)
}

fn flatten(
    res: Result<Result<(), lanrelay::RelayError>, tokio::task::JoinError>,
) -> Result<(), lanrelay::RelayError> {
    res.map_err(|e| lanrelay::RelayError::Io(std::io::Error::other(e)))?
}

// -----------------------------------------------------------------------------
// ----- Signals ---------------------------------------------------------------

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal as unix_signal};

    let Ok(mut term) = unix_signal(SignalKind::terminate()) else {
        let _ = signal::ctrl_c().await;
        return;
    };

    tokio::select! {
        _ = signal::ctrl_c() => {}
        _ = term.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = signal::ctrl_c().await;
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
