//! Build command implementation.
//!
//! Generates the Python package for the configured registry. This command:
//! 1. Resolves configuration (file, then flags)
//! 2. Loads the registry
//! 3. Runs the package builder
//! 4. Prints the build report, or every diagnostic of a failed build

use super::common::{ConfigArgs, load_registry, parse_route_path, report_failure};
use anyhow::Result;
use clap::Args;
use routegen_codegen::{BuildOptions, PackageBuilder};
use routegen_core::cli::{ExitCode, OutputFormat};
use tracing::{info, warn};

/// Arguments of the `build` command.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildArgs {
    /// Configuration overrides
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Only emit modules at or under this route prefix (repeatable)
    #[arg(long = "path", num_args = 1, value_name = "PREFIX")]
    pub paths: Vec<String>,

    /// Render everything but write nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the configured formatters
    #[arg(long)]
    pub no_format: bool,
}

impl BuildArgs {
    /// Translates the flags into builder options.
    ///
    /// # Errors
    ///
    /// Returns an error if a `--path` value is not a valid route path.
    pub fn options(&self) -> Result<BuildOptions> {
        let paths = self
            .paths
            .iter()
            .map(|raw| parse_route_path(raw))
            .collect::<Result<Vec<_>>>()?;

        let mut options = BuildOptions::default().with_paths(paths);
        if self.dry_run {
            options = options.dry_run();
        }
        if self.no_format {
            options = options.without_formatters();
        }
        Ok(options)
    }
}

/// Runs the build command.
///
/// Generation failures are reported, not returned: the exit code carries the
/// most severe error class of the batch.
///
/// # Errors
///
/// Returns an error if configuration, registry or flags are invalid.
///
/// # Examples
///
/// ```no_run
/// use routegen_cli::commands::build::{self, BuildArgs};
/// use routegen_core::cli::{ExitCode, OutputFormat};
///
/// let code = build::run(BuildArgs::default(), OutputFormat::Text)?;
/// assert_eq!(code, ExitCode::SUCCESS);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn run(args: BuildArgs, output_format: OutputFormat) -> Result<ExitCode> {
    let config = args.config.resolve()?;
    let options = args.options()?;
    let registry = load_registry(&config)?;

    info!(
        registry = %config.registry.display(),
        output = %config.output_dir.display(),
        subset = options.is_subset(),
        dry_run = options.dry_run,
        "Building package"
    );

    match PackageBuilder::new(&registry, config).with_options(options).build() {
        Ok(report) => {
            for warning in &report.warnings {
                warn!("{warning}");
            }
            let formatted = crate::formatters::format_output(&report, output_format)?;
            println!("{formatted}");
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => report_failure(&error, output_format),
    }
}
