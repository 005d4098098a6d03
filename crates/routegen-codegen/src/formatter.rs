//! Best-effort post-processing with external formatters.
//!
//! Formatters are looked up on `PATH` with the `which` crate. A formatter
//! that is missing, cannot be started or exits unsuccessfully produces a
//! warning; it never fails the build.

use routegen_core::FormatterSpec;
use serde::Serialize;
use std::path::Path;
use std::process::Command;

/// What happened to one formatter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FormatterOutcome {
    /// The formatter ran and exited successfully
    Ran {
        /// Formatter program name
        program: String,
    },
    /// The formatter is not on `PATH`
    Missing {
        /// Formatter program name
        program: String,
    },
    /// The formatter could not be started or exited unsuccessfully
    Failed {
        /// Formatter program name
        program: String,
        /// Exit status or spawn error
        reason: String,
    },
}

impl FormatterOutcome {
    /// Returns `true` if the formatter ran successfully.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Ran { .. })
    }

    /// Warning text for unsuccessful outcomes.
    #[must_use]
    pub fn warning(&self) -> Option<String> {
        match self {
            Self::Ran { .. } => None,
            Self::Missing { program } => {
                Some(format!("formatter '{program}' not found on PATH, skipped"))
            }
            Self::Failed { program, reason } => {
                Some(format!("formatter '{program}' failed: {reason}"))
            }
        }
    }
}

/// Runs each formatter over `target` in order.
///
/// # Examples
///
/// ```
/// use routegen_codegen::formatter::{FormatterOutcome, run_formatters};
/// use routegen_core::FormatterSpec;
///
/// let outcomes = run_formatters(
///     &[FormatterSpec::new("routegen-no-such-formatter", ["--quiet"])],
///     std::path::Path::new("."),
/// );
/// assert!(matches!(outcomes[0], FormatterOutcome::Missing { .. }));
/// ```
#[must_use]
pub fn run_formatters(formatters: &[FormatterSpec], target: &Path) -> Vec<FormatterOutcome> {
    formatters.iter().map(|spec| run_formatter(spec, target)).collect()
}

fn run_formatter(spec: &FormatterSpec, target: &Path) -> FormatterOutcome {
    let program = spec.program.clone();
    let Ok(executable) = which::which(&spec.program) else {
        tracing::warn!(program = %program, "Formatter not found on PATH, skipping");
        return FormatterOutcome::Missing { program };
    };

    tracing::info!(program = %program, target = %target.display(), "Running formatter");
    match Command::new(&executable).args(&spec.args).arg(target).output() {
        Ok(output) if output.status.success() => FormatterOutcome::Ran { program },
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = match stderr.lines().next() {
                Some(line) if !line.trim().is_empty() => {
                    format!("{}: {}", output.status, line.trim())
                }
                _ => output.status.to_string(),
            };
            tracing::warn!(program = %program, reason = %reason, "Formatter failed");
            FormatterOutcome::Failed { program, reason }
        }
        Err(e) => {
            tracing::warn!(program = %program, error = %e, "Formatter could not be started");
            FormatterOutcome::Failed {
                program,
                reason: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_formatter_is_soft() {
        let outcome = run_formatter(
            &FormatterSpec::new("routegen-definitely-missing", Vec::<String>::new()),
            Path::new("."),
        );
        assert!(!outcome.is_success());
        assert!(outcome.warning().unwrap().contains("not found on PATH"));
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_formatter() {
        let outcome = run_formatter(
            &FormatterSpec::new("true", Vec::<String>::new()),
            Path::new("."),
        );
        assert_eq!(
            outcome,
            FormatterOutcome::Ran {
                program: "true".to_string()
            }
        );
        assert!(outcome.warning().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_formatter_is_soft() {
        let outcome = run_formatter(
            &FormatterSpec::new("false", Vec::<String>::new()),
            Path::new("."),
        );
        assert!(matches!(outcome, FormatterOutcome::Failed { .. }));
        assert!(outcome.warning().unwrap().starts_with("formatter 'false' failed"));
    }

    #[test]
    fn test_outcomes_keep_order() {
        let outcomes = run_formatters(
            &[
                FormatterSpec::new("routegen-missing-a", Vec::<String>::new()),
                FormatterSpec::new("routegen-missing-b", Vec::<String>::new()),
            ],
            Path::new("."),
        );
        let programs: Vec<_> = outcomes
            .iter()
            .map(|o| match o {
                FormatterOutcome::Missing { program } => program.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(programs, vec!["routegen-missing-a", "routegen-missing-b"]);
    }
}
