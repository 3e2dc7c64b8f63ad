//! `trafficlight` - Two-phase light on a randomized schedule

use clap::Parser;
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;

use trafficlight::cli::args::Cli;
use trafficlight::cli::commands;
use trafficlight::error::ExitCode;
use trafficlight::observability::init_logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if !cli.quiet {
        init_logging(cli.log_format, cli.verbose, cli.color);
    }

    // First signal stops the light gracefully, a second one exits immediately
    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        eprintln!("\nShutting down gracefully... (press Ctrl+C again to force)");
        shutdown.cancel();
        std::process::exit(wait_for_signal().await);
    });

    let result = commands::dispatch(cli, cancel).await;

    match result {
        Ok(()) => std::process::exit(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}

/// Waits for SIGINT or SIGTERM and returns the matching exit code.
async fn wait_for_signal() -> i32 {
    let Ok(mut sigterm) = signal(SignalKind::terminate()) else {
        tracing::warn!("failed to register SIGTERM handler, listening for Ctrl+C only");
        let _ = tokio::signal::ctrl_c().await;
        return ExitCode::INTERRUPTED;
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => ExitCode::INTERRUPTED,
        _ = sigterm.recv() => ExitCode::TERMINATED,
    }
}
