//! CLI-specific types shared by the binary and its tests.
//!
//! # Examples
//!
//! ```
//! use routegen_core::cli::{ExitCode, OutputFormat};
//!
//! let format: OutputFormat = "json".parse().unwrap();
//! assert_eq!(format, OutputFormat::Json);
//! assert_eq!(ExitCode::SCHEMA_ERROR.as_i32(), 3);
//! ```

use crate::Error;
use std::fmt;
use std::str::FromStr;

/// CLI output format.
///
/// # Examples
///
/// ```
/// use routegen_core::cli::OutputFormat;
///
/// assert_eq!(OutputFormat::Text.as_str(), "text");
/// assert_eq!("PRETTY".parse::<OutputFormat>().unwrap(), OutputFormat::Pretty);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    /// JSON output for machine parsing
    Json,
    /// Plain text output for scripts
    Text,
    /// Pretty-printed output with colors for human reading
    #[default]
    Pretty,
}

impl OutputFormat {
    /// Returns the string representation of the format.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "text",
            Self::Pretty => "pretty",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            "pretty" => Ok(Self::Pretty),
            _ => Err(Error::InvalidArgument(format!(
                "invalid output format: '{s}' (expected: json, text, or pretty)"
            ))),
        }
    }
}

/// CLI exit code with semantic meaning.
///
/// # Examples
///
/// ```
/// use routegen_core::cli::ExitCode;
/// use routegen_core::Error;
///
/// let err = Error::Structural {
///     path: "/econ".to_string(),
///     reason: "dangling namespace".to_string(),
/// };
/// assert_eq!(ExitCode::from_error(&err), ExitCode::STRUCTURAL_ERROR);
/// assert!(ExitCode::SUCCESS.is_success());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Successful execution (exit code 0).
    pub const SUCCESS: Self = Self(0);

    /// General error (exit code 1).
    pub const ERROR: Self = Self(1);

    /// Invalid input, arguments or configuration (exit code 2).
    pub const INVALID_INPUT: Self = Self(2);

    /// Malformed route path or provider schema (exit code 3).
    pub const SCHEMA_ERROR: Self = Self(3);

    /// Providers disagree on a field type (exit code 4).
    pub const CONFLICT_ERROR: Self = Self(4);

    /// Route tree cannot be emitted safely (exit code 5).
    pub const STRUCTURAL_ERROR: Self = Self(5);

    /// Creates an exit code from an integer value.
    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        Self(code)
    }

    /// Returns the exit code as an integer.
    #[must_use]
    pub const fn as_i32(&self) -> i32 {
        self.0
    }

    /// Checks if the exit code represents success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.0 == 0
    }

    /// Maps a build error onto its exit code.
    ///
    /// A batch maps to the code of its most severe class: structural beats
    /// conflict, conflict beats schema.
    #[must_use]
    pub fn from_error(error: &Error) -> Self {
        let diagnostics = error.diagnostics();
        if diagnostics.iter().any(|e| e.is_structural_error()) {
            Self::STRUCTURAL_ERROR
        } else if diagnostics.iter().any(|e| e.is_schema_conflict()) {
            Self::CONFLICT_ERROR
        } else if diagnostics.iter().any(|e| e.is_schema_error()) {
            Self::SCHEMA_ERROR
        } else if diagnostics
            .iter()
            .any(|e| e.is_config_error() || matches!(e, Error::InvalidArgument(_)))
        {
            Self::INVALID_INPUT
        } else {
            Self::ERROR
        }
    }
}

impl Default for ExitCode {
    fn default() -> Self {
        Self::SUCCESS
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("Text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("xml".parse::<OutputFormat>().is_err());
        assert!("".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Pretty);
        assert_eq!(OutputFormat::default().to_string(), "pretty");
    }

    #[test]
    fn test_exit_code_constants() {
        assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
        assert_eq!(ExitCode::ERROR.as_i32(), 1);
        assert_eq!(ExitCode::INVALID_INPUT.as_i32(), 2);
        assert_eq!(ExitCode::SCHEMA_ERROR.as_i32(), 3);
        assert_eq!(ExitCode::CONFLICT_ERROR.as_i32(), 4);
        assert_eq!(ExitCode::STRUCTURAL_ERROR.as_i32(), 5);
        let value: i32 = ExitCode::ERROR.into();
        assert_eq!(value, 1);
    }

    #[test]
    fn test_exit_code_from_error() {
        let schema = Error::Schema {
            path: "//x".to_string(),
            reason: "empty segment".to_string(),
        };
        let conflict = Error::SchemaConflict {
            path: "/a".to_string(),
            field: "x".to_string(),
            types: Vec::new(),
        };
        let structural = Error::Structural {
            path: "/b".to_string(),
            reason: "dangling".to_string(),
        };

        assert_eq!(ExitCode::from_error(&schema), ExitCode::SCHEMA_ERROR);
        assert_eq!(ExitCode::from_error(&conflict), ExitCode::CONFLICT_ERROR);
        assert_eq!(
            ExitCode::from_error(&Error::Multiple(vec![conflict, structural])),
            ExitCode::STRUCTURAL_ERROR
        );
        assert_eq!(
            ExitCode::from_error(&Error::Config {
                message: "bad".to_string()
            }),
            ExitCode::INVALID_INPUT
        );
        assert_eq!(
            ExitCode::from_error(&Error::Template {
                message: "bad".to_string()
            }),
            ExitCode::ERROR
        );
    }
}
