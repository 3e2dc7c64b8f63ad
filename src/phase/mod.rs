//! Phase worker
//!
//! Two-phase (`Red`/`Green`) light whose phase flips on a randomized
//! schedule from a background task.
//!
//! # Architecture
//!
//! - [`PhaseState`] - Lock-free atomic cell (current phase, toggle count)
//! - [`CycleSchedule`] - Uniform random cycle duration in `[min, max]`
//! - [`PhaseWorker`] - Owns the toggle loop, publishes each phase into a
//!   [`SlotChannel`](crate::channel::SlotChannel), lets callers wait for a phase

pub mod schedule;
pub mod state;
pub mod worker;

pub use schedule::CycleSchedule;
pub use state::{Phase, PhaseState, PhaseTransition};
pub use worker::PhaseWorker;
