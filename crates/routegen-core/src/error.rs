//! Error types for routegen.
//!
//! The build distinguishes three fatal classes that callers map onto exit
//! codes: schema errors (malformed input), schema conflicts (providers that
//! disagree on a field in a way that cannot be widened) and structural errors
//! (trees that cannot be emitted safely). Batch diagnostics are carried by
//! [`Error::Multiple`].
//!
//! # Examples
//!
//! ```
//! use routegen_core::{Error, Result};
//!
//! fn check_segment(path: &str) -> Result<()> {
//!     if path.contains("//") {
//!         return Err(Error::Schema {
//!             path: path.to_string(),
//!             reason: "empty path segment".to_string(),
//!         });
//!     }
//!     Ok(())
//! }
//!
//! let err = check_segment("//x").unwrap_err();
//! assert!(err.is_schema_error());
//! assert_eq!(err.route_path(), Some("//x"));
//! ```

use thiserror::Error;

/// Main error type for routegen.
///
/// All crates in the workspace report failures through this type so the CLI
/// can translate them into a single exit-code policy.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed route path or malformed provider schema.
    ///
    /// Raised before anything is written; the build aborts immediately.
    #[error("Schema error at '{path}': {reason}")]
    Schema {
        /// Offending route path (or model name when no path applies)
        path: String,
        /// What is wrong with it
        reason: String,
    },

    /// Two or more providers declare incompatible types for one field.
    #[error(
        "Schema conflict at '{path}': field '{field}' cannot be widened across providers ({})",
        .types.join(", ")
    )]
    SchemaConflict {
        /// Route whose unification failed
        path: String,
        /// Field name shared by the conflicting providers
        field: String,
        /// `provider: type` pairs that could not be reconciled
        types: Vec<String>,
    },

    /// The route tree cannot be emitted safely.
    ///
    /// Covers dangling namespaces, unresolved naming collisions and import
    /// cycles in the emitted package.
    #[error("Structural error at '{path}': {reason}")]
    Structural {
        /// Route path where the problem was detected
        path: String,
        /// Description of the structural problem
        reason: String,
    },

    /// Several independent errors collected in one pass.
    #[error("Build failed with {} error(s):\n{}", .0.len(), format_list(.0))]
    Multiple(Vec<Error>),

    /// Template registration or rendering failed.
    #[error("Template error: {message}")]
    Template {
        /// Description of the template failure
        message: String,
    },

    /// Filesystem operation failed.
    #[error("I/O error at '{path}': {source}")]
    Io {
        /// File or directory involved
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure
        message: String,
        /// Underlying serde error
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Configuration is invalid or could not be loaded.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration problem
        message: String,
    },

    /// Invalid argument supplied by a caller.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

fn format_list(errors: &[Error]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl Error {
    /// Collapses a list of errors into one.
    ///
    /// A single error is returned unchanged; several are wrapped in
    /// [`Error::Multiple`]. Returns `None` for an empty list.
    ///
    /// # Examples
    ///
    /// ```
    /// use routegen_core::Error;
    ///
    /// assert!(Error::collect(Vec::new()).is_none());
    ///
    /// let one = Error::collect(vec![Error::InvalidArgument("x".into())]).unwrap();
    /// assert!(matches!(one, Error::InvalidArgument(_)));
    /// ```
    #[must_use]
    pub fn collect(mut errors: Vec<Self>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Multiple(errors)),
        }
    }

    /// Returns `true` if this is a schema error.
    #[must_use]
    pub const fn is_schema_error(&self) -> bool {
        matches!(self, Self::Schema { .. })
    }

    /// Returns `true` if this is a schema conflict, or a batch made only of
    /// schema conflicts.
    #[must_use]
    pub fn is_schema_conflict(&self) -> bool {
        match self {
            Self::SchemaConflict { .. } => true,
            Self::Multiple(errors) => {
                !errors.is_empty() && errors.iter().all(Self::is_schema_conflict)
            }
            _ => false,
        }
    }

    /// Returns `true` if this is a structural error.
    #[must_use]
    pub const fn is_structural_error(&self) -> bool {
        matches!(self, Self::Structural { .. })
    }

    /// Returns `true` if this is a configuration error.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    /// Returns the route path attached to this error, if any.
    ///
    /// # Examples
    ///
    /// ```
    /// use routegen_core::Error;
    ///
    /// let err = Error::Structural {
    ///     path: "/econ".to_string(),
    ///     reason: "dangling namespace".to_string(),
    /// };
    /// assert_eq!(err.route_path(), Some("/econ"));
    /// assert_eq!(Error::InvalidArgument("x".into()).route_path(), None);
    /// ```
    #[must_use]
    pub fn route_path(&self) -> Option<&str> {
        match self {
            Self::Schema { path, .. }
            | Self::SchemaConflict { path, .. }
            | Self::Structural { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Flattens nested [`Error::Multiple`] batches into individual errors.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<&Self> {
        match self {
            Self::Multiple(errors) => errors.iter().flat_map(Self::diagnostics).collect(),
            other => vec![other],
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Self::Serialization {
            message: source.to_string(),
            source: Some(source),
        }
    }
}

/// Result type alias for routegen operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn conflict(path: &str) -> Error {
        Error::SchemaConflict {
            path: path.to_string(),
            field: "x".to_string(),
            types: vec!["a: int".to_string(), "b: Dict".to_string()],
        }
    }

    #[test]
    fn test_schema_error_detection() {
        let err = Error::Schema {
            path: "//x".to_string(),
            reason: "empty segment".to_string(),
        };
        assert!(err.is_schema_error());
        assert!(!err.is_structural_error());
    }

    #[test]
    fn test_conflict_display_lists_types() {
        let display = conflict("/a").to_string();
        assert!(display.contains("field 'x'"));
        assert!(display.contains("a: int, b: Dict"));
    }

    #[test]
    fn test_multiple_of_conflicts_is_conflict() {
        let err = Error::Multiple(vec![conflict("/a"), conflict("/b")]);
        assert!(err.is_schema_conflict());
        assert_eq!(err.diagnostics().len(), 2);
    }

    #[test]
    fn test_mixed_batch_is_not_conflict() {
        let err = Error::Multiple(vec![
            conflict("/a"),
            Error::Structural {
                path: "/b".to_string(),
                reason: "dangling".to_string(),
            },
        ]);
        assert!(!err.is_schema_conflict());
    }

    #[test]
    fn test_multiple_display_lists_every_error() {
        let err = Error::Multiple(vec![conflict("/a"), conflict("/b")]);
        let display = err.to_string();
        assert!(display.contains("2 error(s)"));
        assert!(display.contains("'/a'"));
        assert!(display.contains("'/b'"));
    }

    #[test]
    fn test_collect() {
        assert!(Error::collect(vec![]).is_none());
        let single = Error::collect(vec![conflict("/a")]).unwrap();
        assert!(matches!(single, Error::SchemaConflict { .. }));
        let many = Error::collect(vec![conflict("/a"), conflict("/b")]).unwrap();
        assert!(matches!(many, Error::Multiple(ref v) if v.len() == 2));
    }

    #[test]
    fn test_nested_diagnostics_flatten() {
        let err = Error::Multiple(vec![Error::Multiple(vec![conflict("/a")]), conflict("/b")]);
        let paths: Vec<_> = err
            .diagnostics()
            .iter()
            .filter_map(|e| e.route_path())
            .collect();
        assert_eq!(paths, vec!["/a", "/b"]);
    }
}
