//! Logging initialization for `trafficlight`.
//!
//! `-v` raises the level of this crate's own targets while dependencies
//! stay one step quieter, so `-vv` shows receive slices and cycle draws
//! without runtime chatter. `TRAFFICLIGHT_LOG_LEVEL` replaces the whole
//! filter using `EnvFilter` syntax.
//!
//! The toggle loop runs inside a `light` span that carries `worker_id`.
//! Human output prints it as a span prefix; JSON records carry it under
//! `span`.

use std::io::IsTerminal;

use tracing::Subscriber;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::SubscriberInitExt;

use crate::cli::args::ColorChoice;

/// Environment variable that replaces the verbosity-derived filter.
pub const LOG_LEVEL_ENV: &str = "TRAFFICLIGHT_LOG_LEVEL";

/// Target prefix shared by every log line this crate emits.
const CRATE_TARGET: &str = env!("CARGO_CRATE_NAME");

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with optional ANSI colors.
    #[default]
    Human,
    /// Newline-delimited JSON for machine consumption.
    Json,
}

/// Returns the `(crate, dependencies)` levels for a `-v` count.
const fn levels(verbosity: u8) -> (LevelFilter, LevelFilter) {
    match verbosity {
        0 => (LevelFilter::WARN, LevelFilter::WARN),
        1 => (LevelFilter::INFO, LevelFilter::WARN),
        2 => (LevelFilter::DEBUG, LevelFilter::INFO),
        _ => (LevelFilter::TRACE, LevelFilter::DEBUG),
    }
}

/// Filter directives used when `TRAFFICLIGHT_LOG_LEVEL` is unset.
#[must_use]
pub fn default_directives(verbosity: u8) -> String {
    let (own, deps) = levels(verbosity);
    format!("{deps},{CRATE_TARGET}={own}")
}

/// Builds the filter, preferring `overridden` when it parses.
///
/// An unparseable override falls back to the `-v` level; the parse error
/// is handed back so it can be logged once a subscriber exists.
#[must_use]
pub fn build_filter(verbosity: u8, overridden: Option<&str>) -> (EnvFilter, Option<ParseError>) {
    let fallback = || EnvFilter::new(default_directives(verbosity));
    match overridden.map(EnvFilter::try_new) {
        Some(Ok(filter)) => (filter, None),
        Some(Err(e)) => (fallback(), Some(e)),
        None => (fallback(), None),
    }
}

const fn use_ansi(color: ColorChoice, stderr_is_terminal: bool, no_color: bool) -> bool {
    match color {
        ColorChoice::Auto => stderr_is_terminal && !no_color,
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    }
}

/// JSON subscriber: one flattened object per event with the enclosing
/// span's fields under `span`.
fn json_subscriber<W>(filter: EnvFilter, writer: W) -> impl Subscriber + Send + Sync
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .json()
        .flatten_event(true)
        .with_current_span(true)
        .with_span_list(false)
        .with_env_filter(filter)
        .with_writer(writer)
        .finish()
}

/// Initializes the global tracing subscriber on stderr.
///
/// Uses `try_init()` so calling this more than once (e.g. in tests) is safe.
pub fn init_logging(format: LogFormat, verbosity: u8, color: ColorChoice) {
    let overridden = std::env::var(LOG_LEVEL_ENV).ok();
    let (filter, rejected) = build_filter(verbosity, overridden.as_deref());

    let installed = match format {
        LogFormat::Human => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(use_ansi(
                color,
                std::io::stderr().is_terminal(),
                std::env::var_os("NO_COLOR").is_some(),
            ))
            .with_target(verbosity >= 2)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok(),
        LogFormat::Json => json_subscriber(filter, std::io::stderr).try_init().is_ok(),
    };

    if let (true, Some(e)) = (installed, rejected) {
        tracing::warn!(
            env = LOG_LEVEL_ENV,
            error = %e,
            "ignoring invalid log filter, using -v level"
        );
    }
}
