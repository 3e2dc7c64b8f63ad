//! Configuration loader
//!
//! Reads a YAML file into a [`WorkerConfig`] and validates it. A missing
//! path means "use defaults"; a path that does not exist is an error.

use std::path::Path;

use tracing::debug;

use crate::config::schema::WorkerConfig;
use crate::error::ConfigError;

/// Loads the configuration at `path`, or the defaults when `path` is `None`.
///
/// # Errors
///
/// Returns `ConfigError::MissingFile` if the file does not exist,
/// `ConfigError::ParseError` if it is not valid YAML for the schema, and
/// `ConfigError::InvalidValue` if a value fails validation.
pub fn load(path: Option<&Path>) -> Result<WorkerConfig, ConfigError> {
    let Some(path) = path else {
        debug!("no configuration file given, using defaults");
        return Ok(WorkerConfig::default());
    };

    let raw = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::MissingFile {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::ParseError {
                path: path.to_path_buf(),
                line: None,
                message: e.to_string(),
            }
        }
    })?;

    debug!(config = %path.display(), "loading configuration");
    parse_str(&raw, path)
}

/// Parses and validates configuration text. `path` is only used in errors.
///
/// # Errors
///
/// Same as [`load`], minus `MissingFile`.
pub fn parse_str(raw: &str, path: &Path) -> Result<WorkerConfig, ConfigError> {
    // An empty document is null to serde_yaml, not an empty mapping.
    if raw.trim().is_empty() {
        return Ok(WorkerConfig::default());
    }

    let config: WorkerConfig =
        serde_yaml::from_str(raw).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            line: e.location().map(|loc| loc.line()),
            message: e.to_string(),
        })?;

    config.validate()?;
    Ok(config)
}
