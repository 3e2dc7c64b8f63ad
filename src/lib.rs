//! `trafficlight` - Two-phase light on a randomized schedule
//!
//! A [`PhaseWorker`](phase::PhaseWorker) flips between `Red` and `Green`
//! every 4 to 6 seconds from a background task and publishes each new phase
//! into a single-slot, last-write-wins [`SlotChannel`](channel::SlotChannel).
//! Callers poll the current phase or wait, with an optional deadline, for a
//! given phase to be published.
//!
//! ```no_run
//! # async fn demo() -> Result<(), trafficlight::error::TrafficLightError> {
//! use std::time::Duration;
//! use trafficlight::phase::{Phase, PhaseWorker};
//!
//! let worker = PhaseWorker::default();
//! worker.start()?;
//! worker.wait_for_phase(Phase::Green, Some(Duration::from_secs(7))).await?;
//! assert_eq!(worker.current_phase(), Phase::Green);
//! worker.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod cli;
pub mod config;
pub mod error;
pub mod observability;
pub mod phase;
