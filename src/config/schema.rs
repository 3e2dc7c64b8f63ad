//! Configuration schema
//!
//! Typed configuration for a phase worker. Durations are written in
//! `humantime` notation (`4s`, `500ms`, `1m 30s`).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::phase::Phase;
use crate::phase::schedule::{CycleSchedule, DEFAULT_CYCLE_MAX, DEFAULT_CYCLE_MIN};

/// Default slice a waiter blocks on the channel before re-checking.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(1);

/// Phase worker configuration.
///
/// Every field has a default, so an empty file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkerConfig {
    /// Phase the light starts in
    pub initial_phase: Phase,

    /// Randomized cycle bounds
    pub cycle: CycleConfig,

    /// Slice used by `wait_for_phase` for each bounded receive
    #[serde(with = "duration_str")]
    pub receive_timeout: Duration,

    /// Seed for a reproducible schedule; OS entropy when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            initial_phase: Phase::Red,
            cycle: CycleConfig::default(),
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            seed: None,
        }
    }
}

impl WorkerConfig {
    /// Builds the cycle schedule described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the cycle bounds are invalid.
    pub fn schedule(&self) -> Result<CycleSchedule, ConfigError> {
        CycleSchedule::new(self.cycle.min, self.cycle.max)
    }

    /// Checks every field for semantic validity.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError::InvalidValue` found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.schedule()?;
        if self.receive_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "receive_timeout".to_string(),
                value: humantime::format_duration(self.receive_timeout).to_string(),
                expected: "a positive duration".to_string(),
            });
        }
        Ok(())
    }
}

/// Inclusive bounds for a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CycleConfig {
    /// Shortest cycle
    #[serde(with = "duration_str")]
    pub min: Duration,

    /// Longest cycle
    #[serde(with = "duration_str")]
    pub max: Duration,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            min: DEFAULT_CYCLE_MIN,
            max: DEFAULT_CYCLE_MAX,
        }
    }
}

/// Serde adapter for `humantime` duration strings.
mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim())
            .map_err(|e| D::Error::custom(format!("invalid duration '{raw}': {e}")))
    }
}
