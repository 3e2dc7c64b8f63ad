//! Phase worker
//!
//! The `PhaseWorker` owns the authoritative phase of one light, toggles it
//! from a background task on a randomized schedule, publishes every new
//! phase into a [`SlotChannel`], and lets callers wait for a given phase.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use rand::rngs::StdRng;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::channel::{SlotChannel, deadline_after};
use crate::config::WorkerConfig;
use crate::error::{ChannelError, ConfigError, PhaseError};
use crate::observability::{Event, EventEmitter, metrics};

use super::schedule::{CycleSchedule, schedule_rng};
use super::state::{Phase, PhaseState, PhaseTransition};

/// State shared between the worker and its toggle task.
#[derive(Debug)]
struct Shared {
    state: PhaseState,
    channel: SlotChannel<Phase>,
}

impl Shared {
    fn new(initial: Phase) -> Arc<Self> {
        Arc::new(Self {
            state: PhaseState::new(initial),
            channel: SlotChannel::new(),
        })
    }
}

/// Two-phase light driven by a background toggle loop.
///
/// Lifecycle:
/// - [`new`](Self::new): phase set to the configured initial phase (`Red`
///   by default), nothing running
/// - [`start`](Self::start): spawns the toggle loop; allowed once
/// - [`stop`](Self::stop): cancels the loop and joins it
///
/// Dropping a worker without calling `stop()` cancels and aborts the loop.
/// The phase cell and the channel live behind an `Arc`, so the task can
/// never outlive the state it writes to.
pub struct PhaseWorker {
    id: Uuid,
    config: WorkerConfig,
    schedule: CycleSchedule,
    shared: Arc<Shared>,
    cancel: CancellationToken,
    started: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
    events: Option<Arc<EventEmitter>>,
}

impl PhaseWorker {
    /// Creates a stopped worker from `config`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the configuration fails
    /// validation.
    pub fn new(config: WorkerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let schedule = config.schedule()?;
        Ok(Self::from_parts(config, schedule))
    }

    fn from_parts(config: WorkerConfig, schedule: CycleSchedule) -> Self {
        Self {
            id: Uuid::new_v4(),
            shared: Shared::new(config.initial_phase),
            config,
            schedule,
            cancel: CancellationToken::new(),
            started: AtomicBool::new(false),
            task: Mutex::new(None),
            events: None,
        }
    }

    /// Attaches a structured event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<EventEmitter>) -> Self {
        self.events = Some(events);
        self
    }

    /// Spawns the toggle loop on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `PhaseError::AlreadyStarted` if the worker was started
    /// before, including after it has been stopped.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn start(&self) -> Result<(), PhaseError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(PhaseError::AlreadyStarted);
        }

        let initial = self.shared.state.current();
        info!(
            worker_id = %self.id,
            initial_phase = %initial,
            cycle_min = %humantime::format_duration(self.schedule.min()),
            cycle_max = %humantime::format_duration(self.schedule.max()),
            "phase worker started"
        );
        metrics::set_current_phase(initial);
        if let Some(events) = &self.events {
            events.emit(Event::WorkerStarted {
                timestamp: Utc::now(),
                worker_id: self.id,
                initial_phase: initial,
            });
        }

        let toggle_loop = ToggleLoop {
            id: self.id,
            shared: Arc::clone(&self.shared),
            schedule: self.schedule,
            rng: schedule_rng(self.config.seed),
            cancel: self.cancel.clone(),
            events: self.events.clone(),
        };
        let span = info_span!("light", worker_id = %self.id);
        let handle = tokio::spawn(toggle_loop.run().instrument(span));
        *self.lock_task() = Some(handle);
        Ok(())
    }

    /// Cancels the toggle loop and waits for it to exit.
    ///
    /// Idempotent. Stopping a worker that never started only marks it
    /// cancelled, so later waits return `PhaseError::Stopped`.
    ///
    /// Only the first caller joins the task. A concurrent `stop()` cancels
    /// the loop and returns immediately, possibly before the loop has exited;
    /// its last in-flight toggle may still land after that call returns.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let handle = self.lock_task().take();
        let Some(handle) = handle else {
            return;
        };

        if let Err(e) = handle.await {
            warn!(worker_id = %self.id, error = %e, "toggle loop did not exit cleanly");
        }

        let toggles = self.toggle_count();
        info!(worker_id = %self.id, toggles, "phase worker stopped");
        if let Some(events) = &self.events {
            events.emit(Event::WorkerStopped {
                timestamp: Utc::now(),
                worker_id: self.id,
                toggles,
            });
        }
    }

    /// Returns the current phase without blocking.
    #[must_use]
    pub fn current_phase(&self) -> Phase {
        self.shared.state.current()
    }

    /// Waits until a phase equal to `target` is received from the channel.
    ///
    /// Receives in slices of `receive_timeout`; a slice that times out is
    /// retried, never reported as success. Values other than `target` are
    /// discarded. With `deadline: None` the wait is unbounded.
    ///
    /// Values are consumed: when several callers wait at once, each
    /// published phase is delivered to at most one of them.
    ///
    /// # Errors
    ///
    /// - `PhaseError::DeadlineExceeded` if `deadline` elapses first
    /// - `PhaseError::Stopped` if the worker is stopped while waiting
    pub async fn wait_for_phase(
        &self,
        target: Phase,
        deadline: Option<Duration>,
    ) -> Result<(), PhaseError> {
        let started = Instant::now();
        let limit = deadline.map(|d| deadline_after(started, d));

        loop {
            let slice_end = deadline_after(Instant::now(), self.config.receive_timeout);
            let slice_end = limit.map_or(slice_end, |limit| limit.min(slice_end));

            let received = tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    return Err(PhaseError::Stopped { target });
                }
                received = self.shared.channel.receive_until(slice_end) => received,
            };

            match received {
                Ok(phase) if phase == target => {
                    debug!(worker_id = %self.id, phase = %phase, "target phase observed");
                    return Ok(());
                }
                Ok(phase) => {
                    debug!(
                        worker_id = %self.id,
                        received = %phase,
                        wanted = %target,
                        "discarding non-target phase"
                    );
                }
                Err(ChannelError::TimedOut { waited }) => {
                    if limit.is_some_and(|limit| Instant::now() >= limit) {
                        return Err(PhaseError::DeadlineExceeded {
                            target,
                            waited: started.elapsed(),
                        });
                    }
                    debug!(
                        worker_id = %self.id,
                        waited_ms = waited.as_millis(),
                        "receive slice timed out, retrying"
                    );
                }
            }
        }
    }

    /// Returns how many toggles have been committed.
    #[must_use]
    pub fn toggle_count(&self) -> u64 {
        self.shared.state.toggle_count()
    }

    /// Returns whether the toggle loop is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
            && self
                .lock_task()
                .as_ref()
                .is_some_and(|handle| !handle.is_finished())
    }

    /// Returns the worker instance id used in logs and events.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the configuration the worker was built from.
    #[must_use]
    pub const fn config(&self) -> &WorkerConfig {
        &self.config
    }

    fn lock_task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for PhaseWorker {
    fn default() -> Self {
        Self::from_parts(WorkerConfig::default(), CycleSchedule::default())
    }
}

impl Drop for PhaseWorker {
    fn drop(&mut self) {
        self.cancel.cancel();
        let task = self
            .task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = task {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for PhaseWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseWorker")
            .field("id", &self.id)
            .field("current_phase", &self.current_phase())
            .field("toggles", &self.toggle_count())
            .field("started", &self.started.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Toggle loop
// ============================================================================

/// Everything the background task owns.
struct ToggleLoop {
    id: Uuid,
    shared: Arc<Shared>,
    schedule: CycleSchedule,
    rng: StdRng,
    cancel: CancellationToken,
    events: Option<Arc<EventEmitter>>,
}

impl ToggleLoop {
    async fn run(mut self) {
        let mut last_toggle = Instant::now();
        loop {
            let interval = self.schedule.next_interval(&mut self.rng);
            debug!(interval_ms = interval.as_millis(), "next cycle drawn");

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    debug!("toggle loop cancelled");
                    break;
                }
                () = tokio::time::sleep_until(deadline_after(last_toggle, interval)) => {}
            }

            let now = Instant::now();
            let transition = self.shared.state.toggle(now - last_toggle);
            last_toggle = now;
            // Publish only after the phase is committed.
            self.shared.channel.send(transition.to);
            self.record(&transition);
        }
    }

    fn record(&self, transition: &PhaseTransition) {
        let cycle_ms = u64::try_from(transition.cycle.as_millis()).unwrap_or(u64::MAX);
        info!(
            from = %transition.from,
            to = %transition.to,
            toggle = transition.toggle,
            cycle_ms,
            "phase transition"
        );
        metrics::record_transition(transition);
        if let Some(events) = &self.events {
            events.emit(Event::PhaseChanged {
                timestamp: Utc::now(),
                worker_id: self.id,
                from: transition.from,
                to: transition.to,
                toggle: transition.toggle,
                cycle_ms,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CycleConfig;

    fn fast_config(seed: u64) -> WorkerConfig {
        WorkerConfig {
            cycle: CycleConfig {
                min: Duration::from_millis(40),
                max: Duration::from_millis(60),
            },
            receive_timeout: Duration::from_millis(10),
            seed: Some(seed),
            ..WorkerConfig::default()
        }
    }

    #[test]
    fn test_new_worker_is_red_and_idle() {
        let worker = PhaseWorker::default();
        assert_eq!(worker.current_phase(), Phase::Red);
        assert_eq!(worker.toggle_count(), 0);
        assert!(!worker.is_running());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = WorkerConfig {
            receive_timeout: Duration::ZERO,
            ..WorkerConfig::default()
        };
        assert!(PhaseWorker::new(config).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_is_error() {
        let worker = PhaseWorker::new(fast_config(1)).unwrap();
        worker.start().unwrap();
        assert_eq!(worker.start(), Err(PhaseError::AlreadyStarted));
        worker.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_after_stop_is_error() {
        let worker = PhaseWorker::new(fast_config(1)).unwrap();
        worker.start().unwrap();
        worker.stop().await;
        assert_eq!(worker.start(), Err(PhaseError::AlreadyStarted));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_green_then_current_is_green() {
        let worker = PhaseWorker::default();
        worker.start().unwrap();

        let started = Instant::now();
        worker
            .wait_for_phase(Phase::Green, Some(Duration::from_secs(7)))
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_secs(4));
        assert!(started.elapsed() <= Duration::from_secs(6) + Duration::from_millis(50));
        assert_eq!(worker.current_phase(), Phase::Green);

        worker.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_exceeded_is_not_success() {
        let worker = PhaseWorker::default();
        worker.start().unwrap();

        // First toggle cannot happen before 4s.
        let err = worker
            .wait_for_phase(Phase::Green, Some(Duration::from_millis(3500)))
            .await
            .unwrap_err();
        match err {
            PhaseError::DeadlineExceeded { target, waited } => {
                assert_eq!(target, Phase::Green);
                assert!(waited >= Duration::from_millis(3500));
            }
            other => panic!("expected DeadlineExceeded, got {other}"),
        }
        assert_eq!(worker.current_phase(), Phase::Red);

        worker.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_without_start_hits_deadline() {
        let worker = PhaseWorker::new(fast_config(2)).unwrap();
        let err = worker
            .wait_for_phase(Phase::Green, Some(Duration::from_millis(100)))
            .await
            .unwrap_err();
        assert!(matches!(err, PhaseError::DeadlineExceeded { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_wakes_waiters() {
        let worker = Arc::new(PhaseWorker::default());
        let waiter = {
            let worker = Arc::clone(&worker);
            tokio::spawn(async move { worker.wait_for_phase(Phase::Green, None).await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        worker.stop().await;

        let result = waiter.await.unwrap();
        assert_eq!(result, Err(PhaseError::Stopped { target: Phase::Green }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_joins_loop_and_is_idempotent() {
        let worker = PhaseWorker::new(fast_config(3)).unwrap();
        worker.start().unwrap();
        assert!(worker.is_running());

        tokio::time::sleep(Duration::from_millis(500)).await;
        worker.stop().await;
        assert!(!worker.is_running());

        let toggles = worker.toggle_count();
        assert!(toggles >= 8, "expected several toggles, got {toggles}");

        worker.stop().await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(worker.toggle_count(), toggles, "no toggles after stop");
    }

    #[tokio::test(start_paused = true)]
    async fn test_phase_matches_toggle_parity() {
        let worker = PhaseWorker::new(fast_config(4)).unwrap();
        worker.start().unwrap();
        tokio::time::sleep(Duration::from_millis(777)).await;
        worker.stop().await;

        let expected = if worker.toggle_count() % 2 == 0 {
            Phase::Red
        } else {
            Phase::Green
        };
        assert_eq!(worker.current_phase(), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_phase_from_config() {
        let config = WorkerConfig {
            initial_phase: Phase::Green,
            ..fast_config(5)
        };
        let worker = PhaseWorker::new(config).unwrap();
        assert_eq!(worker.current_phase(), Phase::Green);

        worker.start().unwrap();
        worker
            .wait_for_phase(Phase::Red, Some(Duration::from_secs(1)))
            .await
            .unwrap();
        worker.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_without_stop_aborts_loop() {
        let worker = PhaseWorker::new(fast_config(6)).unwrap();
        worker.start().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(worker);
        // Nothing left to observe directly; the runtime must stay healthy.
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_emitted_for_lifecycle() {
        let events = Arc::new(EventEmitter::noop());
        let worker = PhaseWorker::new(fast_config(7))
            .unwrap()
            .with_events(Arc::clone(&events));
        worker.start().unwrap();
        worker
            .wait_for_phase(Phase::Green, Some(Duration::from_secs(1)))
            .await
            .unwrap();
        worker.stop().await;

        // started + one per toggle + stopped
        assert!(events.event_count() >= 3);
        assert_eq!(events.event_count(), worker.toggle_count() + 2);
    }

    #[test]
    fn test_debug_output() {
        let debug = format!("{:?}", PhaseWorker::default());
        assert!(debug.contains("PhaseWorker"));
        assert!(debug.contains("current_phase: Red"));
    }
}
