//! CLI command dispatch and handlers
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod run;
pub mod version;
pub mod wait;

use tokio_util::sync::CancellationToken;

use crate::cli::args::{Cli, Commands};
use crate::error::TrafficLightError;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// `cancel` is triggered by the process signal handler; long-running
/// commands stop their light and return when it fires.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli, cancel: CancellationToken) -> Result<(), TrafficLightError> {
    match cli.command {
        Commands::Run(args) => run::run(&args, cli.quiet, cancel).await,
        Commands::Wait(args) => wait::run(&args, cli.quiet, cancel).await,
        Commands::Version(args) => {
            version::run(&args);
            Ok(())
        }
    }
}
