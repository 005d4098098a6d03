//! Shared plumbing for commands: configuration resolution, registry loading
//! and error reporting.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use routegen_core::cli::{ExitCode, OutputFormat};
use routegen_core::{BuildConfig, Error, RoutePath, StaticRegistry};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration flags shared by every command that reads the registry.
///
/// Values given here override the configuration file.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigArgs {
    /// Configuration file (default: ./routegen.toml when present)
    #[arg(short, long, env = "ROUTEGEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Registry JSON document
    #[arg(short, long)]
    pub registry: Option<PathBuf>,

    /// Output directory of the generated package
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Provider treated as the common subset
    #[arg(long)]
    pub generic_provider: Option<String>,

    /// Keep files of a previous build even if their route is gone
    #[arg(long)]
    pub no_clean: bool,
}

impl ConfigArgs {
    /// Resolves the configuration relative to the current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the working directory is unavailable or the
    /// configuration cannot be loaded or is invalid.
    pub fn resolve(&self) -> Result<BuildConfig> {
        let working_dir = std::env::current_dir().context("failed to read the working directory")?;
        self.resolve_in(&working_dir)
    }

    /// Resolves the configuration relative to `working_dir`.
    ///
    /// # Errors
    ///
    /// See [`ConfigArgs::resolve`].
    pub fn resolve_in(&self, working_dir: &Path) -> Result<BuildConfig> {
        let mut config = BuildConfig::load(self.config.as_deref(), working_dir)?;

        if let Some(registry) = &self.registry {
            config.registry.clone_from(registry);
        }
        if let Some(output) = &self.output {
            config.output_dir.clone_from(output);
        }
        if let Some(provider) = &self.generic_provider {
            config.generic_provider.clone_from(provider);
        }
        if self.no_clean {
            config.clean_stale = false;
        }

        config.validate()?;
        debug!(
            registry = %config.registry.display(),
            output = %config.output_dir.display(),
            "Resolved configuration"
        );
        Ok(config)
    }
}

/// Loads the registry named by the configuration.
///
/// # Errors
///
/// Returns an error if the registry file cannot be read or parsed.
pub fn load_registry(config: &BuildConfig) -> Result<StaticRegistry> {
    let registry = StaticRegistry::from_file(&config.registry)?;
    Ok(registry)
}

/// Parses a route path given on the command line.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if the path is malformed.
pub fn parse_route_path(raw: &str) -> Result<RoutePath> {
    RoutePath::parse(raw)
        .map_err(|e| Error::InvalidArgument(format!("invalid route path '{raw}': {e}")).into())
}

/// Exit code for an error returned by a command.
///
/// Errors that originate in routegen map through [`ExitCode::from_error`];
/// anything else is a general failure.
#[must_use]
pub fn exit_code_for(error: &anyhow::Error) -> ExitCode {
    error
        .downcast_ref::<Error>()
        .map_or(ExitCode::ERROR, ExitCode::from_error)
}

/// One reported problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Error class
    pub kind: &'static str,
    /// Offending route, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Human-readable message
    pub message: String,
}

/// Every problem of a failed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticReport {
    /// Process exit code
    pub exit_code: i32,
    /// Problems in the order they were found
    pub errors: Vec<Diagnostic>,
}

impl DiagnosticReport {
    /// Flattens an error into a report.
    #[must_use]
    pub fn from_error(error: &Error) -> Self {
        let errors = error
            .diagnostics()
            .into_iter()
            .map(|e| Diagnostic {
                kind: kind_of(e),
                path: e.route_path().map(ToString::to_string),
                message: e.to_string(),
            })
            .collect();
        Self {
            exit_code: ExitCode::from_error(error).as_i32(),
            errors,
        }
    }
}

fn kind_of(error: &Error) -> &'static str {
    if error.is_schema_conflict() {
        "conflict"
    } else if error.is_structural_error() {
        "structural"
    } else if error.is_schema_error() {
        "schema"
    } else if error.is_config_error() {
        "config"
    } else if matches!(error, Error::InvalidArgument(_)) {
        "invalid_argument"
    } else {
        "error"
    }
}

/// Reports a failed operation and returns its exit code.
///
/// JSON output goes to stdout so callers can parse it; the other formats
/// write one line per problem to stderr.
///
/// # Errors
///
/// Returns an error if the report cannot be serialized.
pub fn report_failure(error: &Error, output_format: OutputFormat) -> Result<ExitCode> {
    let report = DiagnosticReport::from_error(error);
    match output_format {
        OutputFormat::Json => {
            println!("{}", crate::formatters::format_output(&report, output_format)?);
        }
        OutputFormat::Text => {
            for diagnostic in &report.errors {
                eprintln!("error: {}", diagnostic.message);
            }
        }
        OutputFormat::Pretty => {
            for diagnostic in &report.errors {
                eprintln!("{} {}", "error:".red().bold(), diagnostic.message);
            }
            if report.errors.len() > 1 {
                eprintln!("{}", format!("{} problems found", report.errors.len()).red());
            }
        }
    }
    Ok(ExitCode::from_i32(report.exit_code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_overrides_win_over_file() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("routegen.toml"),
            "output_dir = \"from_file\"\nregistry = \"file.json\"\n",
        )
        .unwrap();

        let args = ConfigArgs {
            output: Some(PathBuf::from("from_flag")),
            no_clean: true,
            ..ConfigArgs::default()
        };
        let config = args.resolve_in(temp.path()).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("from_flag"));
        assert_eq!(config.registry, PathBuf::from("file.json"));
        assert!(!config.clean_stale);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let temp = TempDir::new().unwrap();
        let args = ConfigArgs {
            generic_provider: Some("  ".to_string()),
            ..ConfigArgs::default()
        };
        let err = args.resolve_in(temp.path()).unwrap_err();
        assert_eq!(exit_code_for(&err), ExitCode::INVALID_INPUT);
    }

    #[test]
    fn test_parse_route_path() {
        assert_eq!(parse_route_path("/econ/cpi").unwrap().as_str(), "/econ/cpi");
        let err = parse_route_path("econ").unwrap_err();
        assert_eq!(exit_code_for(&err), ExitCode::INVALID_INPUT);
    }

    #[test]
    fn test_foreign_errors_are_general_failures() {
        let err = anyhow::anyhow!("boom");
        assert_eq!(exit_code_for(&err), ExitCode::ERROR);
    }

    #[test]
    fn test_context_keeps_exit_code() {
        let err = anyhow::Error::from(Error::Structural {
            path: "/a".to_string(),
            reason: "bad".to_string(),
        })
        .context("while building");
        assert_eq!(exit_code_for(&err), ExitCode::STRUCTURAL_ERROR);
    }

    #[test]
    fn test_diagnostic_report_flattens_batches() {
        let error = Error::Multiple(vec![
            Error::SchemaConflict {
                path: "/a".to_string(),
                field: "p".to_string(),
                types: vec!["x: int".to_string(), "y: Dict[str, Any]".to_string()],
            },
            Error::InvalidArgument("nope".to_string()),
        ]);
        let report = DiagnosticReport::from_error(&error);
        assert_eq!(report.exit_code, 4);
        let kinds: Vec<_> = report.errors.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec!["conflict", "invalid_argument"]);
        assert_eq!(report.errors[0].path.as_deref(), Some("/a"));
    }
}
