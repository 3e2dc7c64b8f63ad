//! Version information display
//!
//! Prints the package name and version in human or JSON format.

use crate::cli::args::{OutputFormat, VersionArgs};

/// Renders the version line for `format`.
#[must_use]
pub fn render(format: OutputFormat) -> String {
    let name = env!("CARGO_PKG_NAME");
    let version = env!("CARGO_PKG_VERSION");

    match format {
        OutputFormat::Human => format!("{name} {version}"),
        OutputFormat::Json => serde_json::json!({ "name": name, "version": version }).to_string(),
    }
}

/// Print version information.
pub fn run(args: &VersionArgs) {
    println!("{}", render(args.format));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_is_name_and_version() {
        assert_eq!(
            render(OutputFormat::Human),
            format!("trafficlight {}", env!("CARGO_PKG_VERSION"))
        );
    }

    #[test]
    fn json_is_parseable() {
        let parsed: serde_json::Value = serde_json::from_str(&render(OutputFormat::Json)).unwrap();
        assert_eq!(parsed["name"], "trafficlight");
        assert_eq!(parsed["version"], env!("CARGO_PKG_VERSION"));
    }
}
