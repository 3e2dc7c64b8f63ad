//! Shared integration-test harness for running the `trafficlight` binary.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Command, Output};

/// Helpers for spawning the compiled binary.
pub struct TrafficLightProcess;

impl TrafficLightProcess {
    /// Runs the binary with `args` to completion and returns its output.
    ///
    /// Environment overrides that would leak in from the developer's shell
    /// are cleared.
    #[allow(clippy::missing_panics_doc)]
    pub fn spawn_command(args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_trafficlight"))
            .args(args)
            .env_remove("TRAFFICLIGHT_CONFIG")
            .env_remove("TRAFFICLIGHT_LOG_LEVEL")
            .env_remove("TRAFFICLIGHT_METRICS_PORT")
            .env("TRAFFICLIGHT_COLOR", "never")
            .output()
            .expect("failed to spawn trafficlight")
    }

    /// Returns the absolute path of a file under `tests/fixtures`.
    pub fn fixture_path(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }
}
