//! `wait` command
//!
//! Starts a light and blocks until it changes into the requested phase.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::args::{OutputFormat, WaitArgs};
use crate::config;
use crate::error::{PhaseError, TrafficLightError};
use crate::phase::{Phase, PhaseWorker};

/// Start a light and wait for `--target`.
///
/// # Errors
///
/// Returns a usage error for a zero deadline, a config error if the
/// configuration cannot be loaded, and `PhaseError::DeadlineExceeded` or
/// `PhaseError::Stopped` if the target is not reached.
pub async fn run(
    args: &WaitArgs,
    quiet: bool,
    cancel: CancellationToken,
) -> Result<(), TrafficLightError> {
    if args.deadline.is_some_and(|d| d.is_zero()) {
        return Err(TrafficLightError::Usage(
            "--deadline must be greater than zero".to_string(),
        ));
    }

    let config = config::load(args.config.as_deref())?;
    let worker = PhaseWorker::new(config)?;
    worker.start()?;

    let started = Instant::now();
    let result = tokio::select! {
        biased;
        () = cancel.cancelled() => Err(PhaseError::Stopped { target: args.target }),
        result = worker.wait_for_phase(args.target, args.deadline) => result,
    };
    let waited = started.elapsed();
    worker.stop().await;

    result?;
    info!(phase = %args.target, waited_ms = waited.as_millis(), "target phase reached");
    if !quiet {
        println!("{}", render(args.target, waited, args.format));
    }
    Ok(())
}

/// Renders the success line for `format`.
#[must_use]
pub fn render(target: Phase, waited: Duration, format: OutputFormat) -> String {
    match format {
        OutputFormat::Human => {
            format!("{target} after {}", humantime::format_duration(round_ms(waited)))
        }
        OutputFormat::Json => serde_json::json!({
            "target": target,
            "reached": true,
            "waited_ms": u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
        })
        .to_string(),
    }
}

fn round_ms(d: Duration) -> Duration {
    Duration::from_millis(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
