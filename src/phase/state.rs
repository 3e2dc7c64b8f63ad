//! Phase value and the atomic state cell that holds it
//!
//! [`Phase`] is the two-valued light state. [`PhaseState`] is the
//! authoritative cell the toggle loop writes and readers poll; it is
//! lock-free so `current()` never blocks behind the loop.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Maximum Damerau-Levenshtein distance for a "did you mean" suggestion.
const SUGGESTION_DISTANCE: usize = 2;

/// The two states of the light.
///
/// Transitions only ever alternate `Red → Green → Red`; neither state is
/// terminal.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Stop
    #[default]
    Red,
    /// Go
    Green,
}

impl Phase {
    /// All phases in toggle order.
    pub const ALL: [Self; 2] = [Self::Red, Self::Green];

    /// Returns the other phase.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Red => Self::Green,
            Self::Green => Self::Red,
        }
    }

    /// Returns the lowercase name used in config files and on the CLI.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Green => "green",
        }
    }

    const fn to_bits(self) -> u8 {
        match self {
            Self::Red => 0,
            Self::Green => 1,
        }
    }

    // Only the low bit is meaningful, so no bit pattern maps to a third phase.
    const fn from_bits(bits: u8) -> Self {
        if bits & 1 == 0 { Self::Red } else { Self::Green }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|phase| phase.as_str() == normalized)
            .ok_or_else(|| {
                let expected = suggest_phase(&normalized).map_or_else(
                    || "one of 'red', 'green'".to_string(),
                    |p| format!("one of 'red', 'green' (did you mean '{p}'?)"),
                );
                ConfigError::InvalidValue {
                    field: "phase".to_string(),
                    value: s.to_string(),
                    expected,
                }
            })
    }
}

/// Suggests the closest phase name for typo correction.
#[must_use]
pub fn suggest_phase(input: &str) -> Option<Phase> {
    Phase::ALL
        .into_iter()
        .map(|p| (p, strsim::damerau_levenshtein(input, p.as_str())))
        .filter(|(_, dist)| *dist <= SUGGESTION_DISTANCE)
        .min_by_key(|(_, dist)| *dist)
        .map(|(p, _)| p)
}

/// Record of a single toggle, produced by [`PhaseState::toggle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    /// Phase before the toggle
    pub from: Phase,
    /// Phase after the toggle
    pub to: Phase,
    /// 1-based toggle number since the worker started
    pub toggle: u64,
    /// Time spent in `from` before this toggle
    pub cycle: Duration,
}

/// Lock-free phase cell.
///
/// Uses an `AtomicU8` for the phase and an `AtomicU64` toggle counter.
/// Only the toggle loop calls [`toggle`](Self::toggle); any thread may read.
pub struct PhaseState {
    current: AtomicU8,
    toggles: AtomicU64,
}

impl PhaseState {
    /// Creates a new state starting at `initial`.
    #[must_use]
    pub const fn new(initial: Phase) -> Self {
        Self {
            current: AtomicU8::new(initial.to_bits()),
            toggles: AtomicU64::new(0),
        }
    }

    /// Returns the current phase.
    #[must_use]
    pub fn current(&self) -> Phase {
        Phase::from_bits(self.current.load(Ordering::SeqCst))
    }

    /// Returns how many toggles have been committed.
    #[must_use]
    pub fn toggle_count(&self) -> u64 {
        self.toggles.load(Ordering::SeqCst)
    }

    /// Flips the phase and returns the committed transition.
    ///
    /// `cycle` is how long the previous phase lasted and is only recorded,
    /// not enforced.
    pub fn toggle(&self, cycle: Duration) -> PhaseTransition {
        let from = Phase::from_bits(self.current.fetch_xor(1, Ordering::SeqCst));
        let toggle = self.toggles.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        PhaseTransition {
            from,
            to: from.toggled(),
            toggle,
            cycle,
        }
    }
}

impl Default for PhaseState {
    fn default() -> Self {
        Self::new(Phase::default())
    }
}

impl fmt::Debug for PhaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseState")
            .field("current", &self.current())
            .field("toggles", &self.toggle_count())
            .finish()
    }
}
