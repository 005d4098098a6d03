//! routegen CLI.
//!
//! Command-line interface for generating typed, lazily loaded Python client
//! packages from a route registry.
//!
//! # Architecture
//!
//! The CLI is organized around subcommands:
//! - `build` - Generate the package into the output directory
//! - `tree` - Print the route hierarchy and module identifiers
//! - `inspect` - Show the unified parameters of one command
//! - `completions` - Generate shell completions
//!
//! # Examples
//!
//! ```bash
//! # Build with ./routegen.toml (or defaults)
//! routegen build
//!
//! # Rebuild only the econ namespace, without formatters
//! routegen build --path /econ --no-format
//!
//! # Show the signature parameters of a command as JSON
//! routegen --format json inspect /econ/cpi
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use routegen_cli::LogFormat;
use routegen_cli::commands::build::BuildArgs;
use routegen_cli::commands::common::{ConfigArgs, exit_code_for};
use routegen_cli::commands::{build, completions, inspect, tree};
use routegen_core::cli::{ExitCode, OutputFormat};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Generate typed Python client packages from a route registry.
#[derive(Parser, Debug)]
#[command(name = "routegen")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (json, text, pretty)
    #[arg(long = "format", global = true, default_value = "pretty")]
    format: String,

    /// Log line format on stderr
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate the package.
    ///
    /// Validates the whole registry first; nothing is written unless every
    /// module renders cleanly.
    ///
    /// # Examples
    ///
    /// ```bash
    /// routegen build --registry routes.json --output extensions
    /// routegen build --path /equity --path /news --dry-run
    /// ```
    Build(BuildArgs),

    /// Print the route hierarchy with module identifiers.
    Tree {
        /// Configuration overrides
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Show the unified parameter list of one command.
    Inspect {
        /// Route path of the command, e.g. /econ/cpi
        path: String,

        /// Configuration overrides
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Generate shell completions.
    Completions {
        /// Target shell for completion generation
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_format)?;

    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{} {error:#}", "error:".red().bold());
            exit_code_for(&error)
        }
    };

    std::process::exit(exit_code.as_i32());
}

/// Initializes logging infrastructure.
///
/// `RUST_LOG` selects the filter (default `info`); `--verbose` forces
/// `debug`. Logs always go to stderr so stdout stays parseable.
fn init_logging(verbose: bool, format: LogFormat) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    }
    .context("failed to initialize logging")
}

fn run(cli: Cli) -> Result<ExitCode> {
    let output_format = cli.format.parse::<OutputFormat>()?;
    execute_command(cli.command, output_format)
}

/// Routes commands to their handlers and returns an exit code.
fn execute_command(command: Commands, output_format: OutputFormat) -> Result<ExitCode> {
    match command {
        Commands::Build(args) => build::run(args, output_format),
        Commands::Tree { config } => tree::run(config, output_format),
        Commands::Inspect { path, config } => inspect::run(&path, config, output_format),
        Commands::Completions { shell } => {
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            completions::run(shell, &mut cmd)
        }
    }
}
