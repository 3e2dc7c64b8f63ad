//! Metrics collection for `trafficlight`.
//!
//! Prometheus-compatible metrics for phase transitions. Recording is a
//! no-op until [`init_metrics`] installs a recorder.

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::TrafficLightError;
use crate::phase::{Phase, PhaseTransition};

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without
/// an HTTP endpoint.
///
/// # Errors
///
/// Returns `TrafficLightError::Io` if the recorder or HTTP listener
/// cannot be installed (e.g. port already in use). A failed attempt does
/// not count as initialized, so a later call may retry.
pub fn init_metrics(port: Option<u16>) -> Result<(), TrafficLightError> {
    let installed = install_once(&METRICS_INITIALIZED, || {
        port.map_or_else(
            || PrometheusBuilder::new().install_recorder().map(|_| ()),
            |p| {
                PrometheusBuilder::new()
                    .with_http_listener(([127, 0, 0, 1], p))
                    .install()
            },
        )
    })?;

    if installed {
        describe_metrics();
    } else {
        tracing::debug!("metrics already initialized, skipping");
    }
    Ok(())
}

/// Runs `install` unless `guard` is already set. Returns whether it ran.
///
/// The guard is cleared again when `install` fails.
fn install_once<E: std::fmt::Display>(
    guard: &AtomicBool,
    install: impl FnOnce() -> Result<(), E>,
) -> Result<bool, TrafficLightError> {
    if guard.swap(true, Ordering::SeqCst) {
        return Ok(false);
    }
    install().map_err(|e| {
        guard.store(false, Ordering::SeqCst);
        TrafficLightError::Io(std::io::Error::other(e.to_string()))
    })?;
    Ok(true)
}

/// Registers metric descriptions with the global recorder.
fn describe_metrics() {
    describe_counter!(
        "trafficlight_phase_toggles_total",
        "Total number of phase toggles"
    );
    describe_gauge!(
        "trafficlight_current_phase",
        "Currently active phase (1 = active)"
    );
    describe_histogram!(
        "trafficlight_cycle_duration_ms",
        "Time spent in a phase before toggling, in milliseconds"
    );
}

/// Records a committed toggle.
///
/// The phase label set is closed (`red`, `green`), so labels need no
/// sanitizing.
pub fn record_transition(transition: &PhaseTransition) {
    counter!(
        "trafficlight_phase_toggles_total",
        "from" => transition.from.as_str(),
        "to" => transition.to.as_str(),
    )
    .increment(1);
    histogram!(
        "trafficlight_cycle_duration_ms",
        "phase" => transition.from.as_str(),
    )
    .record(transition.cycle.as_secs_f64() * 1000.0);
    set_current_phase(transition.to);
}

/// Sets the current phase gauge, zeroing every other phase label.
pub fn set_current_phase(phase: Phase) {
    for p in Phase::ALL {
        let value = if p == phase { 1.0 } else { 0.0 };
        gauge!("trafficlight_current_phase", "phase" => p.as_str()).set(value);
    }
}
