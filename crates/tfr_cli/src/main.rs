//! tf-repo-executor - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: Targets failed, or any other unclassified error
//! - 2: Invalid configuration
//! - 3: Vault error
//! - 4: Working directory error
//! - 130: Interrupted

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

mod run;
mod settings;

use settings::Settings;

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const FAILURE: u8 = 1;
    pub const INVALID_CONFIG: u8 = 2;
    pub const VAULT_ERROR: u8 = 3;
    pub const WORKDIR_ERROR: u8 = 4;
    pub const INTERRUPTED: u8 = 130;
}

/// Extra wait on top of the executor's own shutdown grace.
const SHUTDOWN_MARGIN: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tfr=info,warn"));
    // Already initialized when embedded; keep going.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .try_init();

    let settings = match Settings::try_parse() {
        Ok(settings) => settings,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(ExitCodes::INVALID_CONFIG)
            } else {
                ExitCode::from(ExitCodes::SUCCESS)
            };
        }
    };

    let session = Uuid::new_v4();
    info!("Starting tf-repo-executor [session {}]", session);

    let cancel = CancellationToken::new();
    tokio::spawn(watch_signals(cancel.clone()));

    let delay = settings.flush_delay();
    let deadline = delay + SHUTDOWN_MARGIN;
    let work = run::execute(&settings, cancel.clone());
    let code = match run::until_shutdown(work, &cancel, deadline).await {
        None => {
            warn!("Run still busy {:?} after shutdown signal, abandoning it", deadline);
            ExitCodes::INTERRUPTED
        }
        Some(_) if cancel.is_cancelled() => ExitCodes::INTERRUPTED,
        Some(Ok(())) => ExitCodes::SUCCESS,
        Some(Err(e)) => {
            error!("{:#}", e);
            run::categorize_error(&e)
        }
    };

    info!(
        "Shutting down [session {}] in {}s (exit code {})",
        session,
        delay.as_secs(),
        code
    );
    tokio::time::sleep(delay).await;
    ExitCode::from(code)
}

/// Stop admitting targets on SIGINT or SIGTERM.
async fn watch_signals(cancel: CancellationToken) {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Unable to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Unable to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {}
        _ = terminate => {}
    }

    warn!("Received shutdown signal, no new targets will be started");
    cancel.cancel();
}
