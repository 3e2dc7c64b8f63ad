//! Error types for `trafficlight`
//!
//! Domain errors for the slot channel, the phase worker and configuration
//! loading, aggregated into [`TrafficLightError`] which maps onto process
//! exit codes for the CLI.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::phase::Phase;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `trafficlight` CLI operations.
///
/// These codes follow Unix conventions.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Phase worker error (already started, deadline exceeded, stopped)
    pub const PHASE_ERROR: i32 = 5;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `trafficlight` operations.
///
/// Aggregates all domain-specific errors and provides a unified
/// interface for exit code mapping.
#[derive(Debug, Error)]
pub enum TrafficLightError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Phase worker error
    #[error(transparent)]
    Phase(#[from] PhaseError),

    /// Slot channel error surfaced directly to a caller
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// Command-line usage error
    #[error("usage error: {0}")]
    Usage(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TrafficLightError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => ExitCode::CONFIG_ERROR,
            Self::Phase(_) | Self::Channel(_) => ExitCode::PHASE_ERROR,
            Self::Usage(_) => ExitCode::USAGE_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

/// Formats a duration for error messages (`1s 500ms`).
fn human(d: &Duration) -> humantime::FormattedDuration {
    humantime::format_duration(*d)
}

// ============================================================================
// Channel Errors
// ============================================================================

/// Errors returned by [`SlotChannel`](crate::channel::SlotChannel).
///
/// A timeout is an expected outcome of a bounded receive, not a failure of
/// the channel itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The bounded wait elapsed without a value becoming available
    #[error("receive timed out after {}", human(.waited))]
    TimedOut {
        /// How long the receiver waited
        waited: Duration,
    },
}

// ============================================================================
// Phase Worker Errors
// ============================================================================

/// Phase worker errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhaseError {
    /// `start()` was called on a worker that has already been started
    #[error("phase worker already started")]
    AlreadyStarted,

    /// The caller-supplied deadline elapsed before the target phase was observed
    #[error("phase '{target}' not reached within {}", human(.waited))]
    DeadlineExceeded {
        /// Phase the caller was waiting for
        target: Phase,
        /// Total time spent waiting
        waited: Duration,
    },

    /// The worker was stopped while a caller was waiting on it
    #[error("phase worker stopped while waiting for '{target}'")]
    Stopped {
        /// Phase the caller was waiting for
        target: Phase,
    },
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Referenced configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },
}
