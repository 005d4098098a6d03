//! Build configuration.
//!
//! Configuration is read from TOML. Every field has a default, so an empty
//! file (or no file at all) yields a usable configuration.
//!
//! # Examples
//!
//! ```toml
//! registry = "routes.json"
//! output_dir = "extensions"
//! package_name = "extensions"
//! runtime_package = "routegen_runtime"
//! models_module = "routegen_runtime.models"
//! generic_provider = "standard"
//! provider_priority = ["fmp", "fred"]
//! clean_stale = true
//!
//! [[formatters]]
//! program = "black"
//! args = ["--quiet"]
//! ```

use crate::types::is_legal_identifier;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name probed in the working directory when no config is given.
pub const DEFAULT_CONFIG_FILE: &str = "routegen.toml";

/// External tool run over the output directory after a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatterSpec {
    /// Executable name, resolved through `PATH`
    pub program: String,
    /// Arguments placed before the output directory
    #[serde(default)]
    pub args: Vec<String>,
}

impl FormatterSpec {
    /// Creates a formatter spec.
    #[must_use]
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// Configuration for one package build.
///
/// # Examples
///
/// ```
/// use routegen_core::BuildConfig;
///
/// let config = BuildConfig::default();
/// assert_eq!(config.generic_provider, "standard");
/// assert!(config.clean_stale);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Registry JSON document.
    ///
    /// Default: `routes.json`
    pub registry: PathBuf,

    /// Directory receiving the generated package.
    ///
    /// Default: `extensions`
    pub output_dir: PathBuf,

    /// Import name of the generated package itself.
    ///
    /// Generated modules import their siblings relatively; this name is
    /// only used to reject configurations that would make the package
    /// import itself through an absolute path.
    /// Default: `extensions`
    pub package_name: String,

    /// Python package providing `Container`, `CommandResult`, `NoContent`,
    /// `Data` and `validate`.
    ///
    /// Default: `routegen_runtime`
    pub runtime_package: String,

    /// Module providing result-row classes.
    ///
    /// Default: `routegen_runtime.models`
    pub models_module: String,

    /// Provider whose schema acts as the common subset.
    ///
    /// Default: `standard`
    pub generic_provider: String,

    /// Providers listed right after the generic one; the rest follow
    /// alphabetically.
    pub provider_priority: Vec<String>,

    /// Remove files produced by a previous build that are no longer produced.
    ///
    /// Default: true
    pub clean_stale: bool,

    /// Formatters run after a successful build, in order.
    ///
    /// Default: `black` then `ruff check --fix`
    pub formatters: Vec<FormatterSpec>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            registry: PathBuf::from("routes.json"),
            output_dir: PathBuf::from("extensions"),
            package_name: "extensions".to_string(),
            runtime_package: "routegen_runtime".to_string(),
            models_module: "routegen_runtime.models".to_string(),
            generic_provider: "standard".to_string(),
            provider_priority: Vec::new(),
            clean_stale: true,
            formatters: vec![
                FormatterSpec::new("black", ["--quiet"]),
                FormatterSpec::new("ruff", ["check", "--fix", "--quiet"]),
            ],
        }
    }
}

impl BuildConfig {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```
    /// use routegen_core::BuildConfig;
    ///
    /// let config = BuildConfig::builder()
    ///     .output_dir("out")
    ///     .provider_priority(["fmp"])
    ///     .clean_stale(false)
    ///     .build();
    ///
    /// assert_eq!(config.output_dir.to_str(), Some("out"));
    /// assert!(!config.clean_stale);
    /// ```
    #[must_use]
    pub fn builder() -> BuildConfigBuilder {
        BuildConfigBuilder::new()
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the document is not valid TOML, has
    /// unknown keys, or fails [`BuildConfig::validate`].
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| Error::Config {
            message: format!("failed to parse config: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, otherwise see
    /// [`BuildConfig::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Loading build config");
        Self::from_toml_str(&content)
    }

    /// Resolves the configuration for a run.
    ///
    /// An explicit file wins; otherwise [`DEFAULT_CONFIG_FILE`] in
    /// `working_dir` is used when present; otherwise defaults apply.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`BuildConfig::from_file`].
    pub fn load(explicit: Option<&Path>, working_dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let candidate = working_dir.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            return Self::from_file(candidate);
        }
        tracing::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Serializes the configuration as pretty TOML.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config {
            message: format!("failed to serialize config: {e}"),
        })
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if:
    /// - a package or module name is empty or not a dotted identifier path
    /// - the generic provider name is empty
    /// - a provider is listed twice in `provider_priority`
    /// - a formatter has an empty program name
    ///
    /// # Examples
    ///
    /// ```
    /// use routegen_core::BuildConfig;
    ///
    /// let mut config = BuildConfig::default();
    /// config.runtime_package = "not a package".to_string();
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        if !is_legal_identifier(&self.package_name) {
            return Err(Error::Config {
                message: format!(
                    "package_name '{}' is not a valid identifier",
                    self.package_name
                ),
            });
        }
        validate_module_path("runtime_package", &self.runtime_package)?;
        validate_module_path("models_module", &self.models_module)?;

        if self.generic_provider.trim().is_empty() {
            return Err(Error::Config {
                message: "generic_provider cannot be empty".to_string(),
            });
        }

        let mut seen = std::collections::HashSet::new();
        for provider in &self.provider_priority {
            if !seen.insert(provider.as_str()) {
                return Err(Error::Config {
                    message: format!("provider '{provider}' is listed twice in provider_priority"),
                });
            }
        }

        if self.formatters.iter().any(|f| f.program.trim().is_empty()) {
            return Err(Error::Config {
                message: "formatter program cannot be empty".to_string(),
            });
        }

        Ok(())
    }
}

fn validate_module_path(key: &str, value: &str) -> Result<()> {
    if value.is_empty() || !value.split('.').all(is_legal_identifier) {
        return Err(Error::Config {
            message: format!("{key} '{value}' is not a valid dotted module path"),
        });
    }
    Ok(())
}

/// Builder for [`BuildConfig`].
#[derive(Debug)]
pub struct BuildConfigBuilder {
    config: BuildConfig,
}

impl BuildConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: BuildConfig::default(),
        }
    }

    /// Sets the registry document path.
    #[must_use]
    pub fn registry(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.registry = path.into();
        self
    }

    /// Sets the output directory.
    #[must_use]
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_dir = path.into();
        self
    }

    /// Sets the generated package's import name.
    #[must_use]
    pub fn package_name(mut self, name: impl Into<String>) -> Self {
        self.config.package_name = name.into();
        self
    }

    /// Sets the runtime package.
    #[must_use]
    pub fn runtime_package(mut self, package: impl Into<String>) -> Self {
        self.config.runtime_package = package.into();
        self
    }

    /// Sets the result models module.
    #[must_use]
    pub fn models_module(mut self, module: impl Into<String>) -> Self {
        self.config.models_module = module.into();
        self
    }

    /// Sets the generic provider name.
    #[must_use]
    pub fn generic_provider(mut self, provider: impl Into<String>) -> Self {
        self.config.generic_provider = provider.into();
        self
    }

    /// Sets the provider priority list.
    #[must_use]
    pub fn provider_priority<I, S>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.provider_priority = providers.into_iter().map(Into::into).collect();
        self
    }

    /// Enables or disables stale file cleanup.
    #[must_use]
    pub const fn clean_stale(mut self, enable: bool) -> Self {
        self.config.clean_stale = enable;
        self
    }

    /// Replaces the formatter list.
    #[must_use]
    pub fn formatters(mut self, formatters: Vec<FormatterSpec>) -> Self {
        self.config.formatters = formatters;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> BuildConfig {
        self.config
    }
}

impl Default for BuildConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = BuildConfig::default();
        assert_eq!(config.registry, PathBuf::from("routes.json"));
        assert_eq!(config.runtime_package, "routegen_runtime");
        assert_eq!(config.formatters.len(), 2);
        assert_eq!(config.formatters[0].program, "black");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config = BuildConfig::from_toml_str("").unwrap();
        assert_eq!(config, BuildConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = BuildConfig::from_toml_str(
            r#"
            output_dir = "pkg"
            provider_priority = ["fred", "fmp"]
            clean_stale = false
            formatters = []
            "#,
        )
        .unwrap();
        assert_eq!(config.output_dir, PathBuf::from("pkg"));
        assert_eq!(config.provider_priority, vec!["fred", "fmp"]);
        assert!(!config.clean_stale);
        assert!(config.formatters.is_empty());
        assert_eq!(config.generic_provider, "standard");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = BuildConfig::from_toml_str("outptu_dir = \"x\"").unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_invalid_module_path_rejected() {
        let config = BuildConfig::builder().models_module("models..row").build();
        assert!(config.validate().is_err());

        let config = BuildConfig::builder().runtime_package("").build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_generic_provider_rejected() {
        let config = BuildConfig::builder().generic_provider("  ").build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_priority_rejected() {
        let config = BuildConfig::builder()
            .provider_priority(["fmp", "fmp"])
            .build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = BuildConfig::builder()
            .provider_priority(["fmp"])
            .package_name("sdk")
            .build();
        let toml = config.to_toml_string().unwrap();
        assert_eq!(BuildConfig::from_toml_str(&toml).unwrap(), config);
    }

    #[test]
    fn test_load_prefers_explicit_then_working_dir() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            BuildConfig::load(None, dir.path()).unwrap(),
            BuildConfig::default()
        );

        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            "generic_provider = \"common\"",
        )
        .unwrap();
        let config = BuildConfig::load(None, dir.path()).unwrap();
        assert_eq!(config.generic_provider, "common");

        let explicit = dir.path().join("other.toml");
        std::fs::write(&explicit, "generic_provider = \"base\"").unwrap();
        let config = BuildConfig::load(Some(&explicit), dir.path()).unwrap();
        assert_eq!(config.generic_provider, "base");
    }

    #[test]
    fn test_missing_explicit_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.toml");
        let err = BuildConfig::load(Some(&missing), dir.path()).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
