//! Inspect command implementation.
//!
//! Shows the unified parameter list of one command, exactly as it would be
//! rendered into the generated signature.

use super::common::{ConfigArgs, load_registry, parse_route_path, report_failure};
use anyhow::Result;
use routegen_codegen::PackageBuilder;
use routegen_core::cli::{ExitCode, OutputFormat};
use tracing::info;

/// Runs the inspect command.
///
/// # Errors
///
/// Returns an error if configuration or registry cannot be loaded, or the
/// route path is malformed. A path without a command is reported with exit
/// code 2; unification failures keep their own exit codes.
pub fn run(path: &str, config: ConfigArgs, output_format: OutputFormat) -> Result<ExitCode> {
    let path = parse_route_path(path)?;
    let config = config.resolve()?;
    let registry = load_registry(&config)?;

    info!(path = %path, "Inspecting command");
    match PackageBuilder::new(&registry, config).inspect(&path) {
        Ok(schema) => {
            let formatted = crate::formatters::format_output(&schema, output_format)?;
            println!("{formatted}");
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => report_failure(&error, output_format),
    }
}
