//! `run` command
//!
//! Starts a light and reports each phase change until the cycle limit, the
//! duration limit, or a shutdown signal.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::channel::deadline_after;
use crate::cli::args::RunArgs;
use crate::config::{self, WorkerConfig};
use crate::error::{PhaseError, TrafficLightError};
use crate::observability::{EventEmitter, init_metrics};
use crate::phase::PhaseWorker;

/// Why a watched run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// `--cycles` phase changes were observed
    CyclesReached,
    /// `--duration` elapsed
    DurationElapsed,
    /// Shutdown was requested
    Cancelled,
}

/// Start a light and watch it.
///
/// # Errors
///
/// Returns a config error if the configuration cannot be loaded, an I/O
/// error if the event file or metrics endpoint cannot be opened, or a
/// phase error if the worker fails.
pub async fn run(
    args: &RunArgs,
    quiet: bool,
    cancel: CancellationToken,
) -> Result<(), TrafficLightError> {
    let config = resolve_config(args)?;

    if let Some(port) = args.metrics_port {
        init_metrics(Some(port))?;
        info!(port, "Prometheus metrics endpoint started");
    }

    let events = args.events.as_deref().map(open_events).transpose()?;
    // JSONL on stdout and human lines would interleave.
    let print = !quiet && !args.events.as_deref().is_some_and(is_stdout);

    let mut worker = PhaseWorker::new(config)?;
    if let Some(events) = events {
        worker = worker.with_events(events);
    }
    worker.start()?;

    let outcome = watch(&worker, args.cycles, args.duration, print, &cancel).await;
    worker.stop().await;

    let end = outcome?;
    info!(?end, toggles = worker.toggle_count(), "run finished");
    Ok(())
}

/// Loads the configuration file and applies command-line overrides.
fn resolve_config(args: &RunArgs) -> Result<WorkerConfig, TrafficLightError> {
    let mut config = config::load(args.config.as_deref())?;
    if let Some(phase) = args.initial_phase {
        config.initial_phase = phase;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    Ok(config)
}

fn is_stdout(path: &Path) -> bool {
    path == Path::new("-")
}

fn open_events(path: &Path) -> Result<Arc<EventEmitter>, TrafficLightError> {
    let emitter = if is_stdout(path) {
        EventEmitter::stdout()
    } else {
        EventEmitter::from_file(path)?
    };
    Ok(Arc::new(emitter))
}

/// Follows the light until one of the limits is hit.
///
/// Each iteration waits for the phase after the current one, so every
/// published change is reported once.
///
/// # Errors
///
/// Returns `PhaseError::Stopped` if the worker stops underneath the watch.
pub async fn watch(
    worker: &PhaseWorker,
    cycles: Option<u64>,
    duration: Option<Duration>,
    print: bool,
    cancel: &CancellationToken,
) -> Result<RunEnd, PhaseError> {
    let started = Instant::now();
    let limit = duration.map(|d| deadline_after(started, d));
    let mut seen = 0_u64;

    if print {
        println!("{:>8}ms  {}", 0, worker.current_phase());
    }

    loop {
        if cycles.is_some_and(|n| seen >= n) {
            return Ok(RunEnd::CyclesReached);
        }

        let next = worker.current_phase().toggled();
        let remaining = limit.map(|limit| limit.saturating_duration_since(Instant::now()));

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(RunEnd::Cancelled),
            result = worker.wait_for_phase(next, remaining) => result,
        };

        match result {
            Ok(()) => {
                seen += 1;
                if print {
                    println!("{:>8}ms  {next}", started.elapsed().as_millis());
                }
            }
            Err(PhaseError::DeadlineExceeded { .. }) => return Ok(RunEnd::DurationElapsed),
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CycleConfig;

    fn fast_worker() -> PhaseWorker {
        PhaseWorker::new(WorkerConfig {
            cycle: CycleConfig {
                min: Duration::from_millis(40),
                max: Duration::from_millis(60),
            },
            receive_timeout: Duration::from_millis(10),
            seed: Some(11),
            ..WorkerConfig::default()
        })
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn watch_stops_after_cycles() {
        let worker = fast_worker();
        worker.start().unwrap();
        let cancel = CancellationToken::new();

        let end = watch(&worker, Some(5), None, false, &cancel).await.unwrap();
        assert_eq!(end, RunEnd::CyclesReached);
        assert!(worker.toggle_count() >= 5);
        worker.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn watch_stops_after_duration() {
        let worker = fast_worker();
        worker.start().unwrap();
        let cancel = CancellationToken::new();

        let started = Instant::now();
        let end = watch(&worker, None, Some(Duration::from_millis(300)), false, &cancel)
            .await
            .unwrap();
        assert_eq!(end, RunEnd::DurationElapsed);
        assert!(started.elapsed() >= Duration::from_millis(300));
        worker.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn watch_accepts_unbounded_duration() {
        let worker = fast_worker();
        worker.start().unwrap();
        let cancel = CancellationToken::new();

        let end = watch(&worker, Some(3), Some(Duration::MAX), false, &cancel)
            .await
            .unwrap();
        assert_eq!(end, RunEnd::CyclesReached);
        worker.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn watch_honors_cancellation() {
        let worker = fast_worker();
        worker.start().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let end = watch(&worker, None, None, false, &cancel).await.unwrap();
        assert_eq!(end, RunEnd::Cancelled);
        worker.stop().await;
    }

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let args = RunArgs {
            config: None,
            initial_phase: Some(crate::phase::Phase::Green),
            seed: Some(9),
            cycles: None,
            duration: None,
            events: None,
            metrics_port: None,
        };
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.initial_phase, crate::phase::Phase::Green);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.cycle, CycleConfig::default());
    }

    #[test]
    fn dash_means_stdout() {
        assert!(is_stdout(Path::new("-")));
        assert!(!is_stdout(Path::new("events.jsonl")));
    }
}
