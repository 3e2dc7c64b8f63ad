//! Randomized cycle schedule
//!
//! Each cycle of the light lasts a duration drawn uniformly from
//! `[min, max]`. A fresh duration is drawn for every cycle.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::ConfigError;

/// Shortest default cycle.
pub const DEFAULT_CYCLE_MIN: Duration = Duration::from_millis(4000);

/// Longest default cycle.
pub const DEFAULT_CYCLE_MAX: Duration = Duration::from_millis(6000);

/// Inclusive bounds for the randomized cycle duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSchedule {
    min: Duration,
    max: Duration,
}

impl CycleSchedule {
    /// Creates a schedule drawing from `[min, max]`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `min` is zero or greater
    /// than `max`.
    pub fn new(min: Duration, max: Duration) -> Result<Self, ConfigError> {
        if min.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "cycle.min".to_string(),
                value: humantime::format_duration(min).to_string(),
                expected: "a positive duration".to_string(),
            });
        }
        if min > max {
            return Err(ConfigError::InvalidValue {
                field: "cycle.max".to_string(),
                value: humantime::format_duration(max).to_string(),
                expected: format!(
                    "a duration of at least cycle.min ({})",
                    humantime::format_duration(min)
                ),
            });
        }
        Ok(Self { min, max })
    }

    /// Returns the lower bound.
    #[must_use]
    pub const fn min(&self) -> Duration {
        self.min
    }

    /// Returns the upper bound.
    #[must_use]
    pub const fn max(&self) -> Duration {
        self.max
    }

    /// Draws the duration of the next cycle.
    pub fn next_interval<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        rng.random_range(self.min..=self.max)
    }
}

impl Default for CycleSchedule {
    fn default() -> Self {
        Self {
            min: DEFAULT_CYCLE_MIN,
            max: DEFAULT_CYCLE_MAX,
        }
    }
}

/// Builds the RNG for a toggle loop: seeded when `seed` is given,
/// OS-seeded otherwise.
#[must_use]
pub fn schedule_rng(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64)
}
