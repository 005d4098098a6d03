//! Package assembly.
//!
//! [`PackageBuilder`] runs the whole pipeline. Everything that can fail
//! (validation, unification, emission) happens in memory during the `Init`
//! phase; files are only written once every module rendered cleanly, so a
//! failed build leaves the output directory untouched.
//!
//! # Examples
//!
//! ```no_run
//! use routegen_codegen::package::{BuildOptions, PackageBuilder};
//! use routegen_core::{BuildConfig, StaticRegistry};
//!
//! # fn example() -> routegen_core::Result<()> {
//! let registry = StaticRegistry::from_file("routes.json")?;
//! let report = PackageBuilder::new(&registry, BuildConfig::default())
//!     .with_options(BuildOptions::default().without_formatters())
//!     .build()?;
//! println!("wrote {} files", report.modules_written.len());
//! # Ok(())
//! # }
//! ```

use crate::allocator::{Allocator, ModuleMap};
use crate::docstring::generate;
use crate::emitter::{CodeEmitter, MethodDef};
use crate::formatter::{FormatterOutcome, run_formatters};
use crate::path_tree::{ModuleDescriptor, PathTree};
use crate::types::{GeneratedCode, GeneratedFile};
use crate::unifier::{UnifiedSchema, Unifier};
use routegen_core::registry::validate_registry;
use routegen_core::{BuildConfig, Error, Identifier, Result, RoutePath, RouteRegistry};
use routegen_files::{ExportOptions, FilesBuilder, remove_stale_files};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

/// File name of the module map artifact.
pub const MODULE_MAP_FILE: &str = "module_map.json";

/// Stages of a build, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildPhase {
    /// Validate inputs and render every module in memory
    Init,
    /// Write `module_map.json`
    WriteModuleMap,
    /// Write the generated modules
    EmitModules,
    /// Write `__init__.py`
    WritePackageInit,
    /// Run external formatters
    RunFormatters,
    /// Build finished
    Done,
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Init => "init",
            Self::WriteModuleMap => "write_module_map",
            Self::EmitModules => "emit_modules",
            Self::WritePackageInit => "write_package_init",
            Self::RunFormatters => "run_formatters",
            Self::Done => "done",
        })
    }
}

/// Per-invocation switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Emit only modules at or under these prefixes (plus their ancestors)
    pub paths: Vec<RoutePath>,
    /// Render everything but write nothing
    pub dry_run: bool,
    /// Run the configured formatters after writing
    pub run_formatters: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            dry_run: false,
            run_formatters: true,
        }
    }
}

impl BuildOptions {
    /// Restricts emission to the given prefixes.
    #[must_use]
    pub fn with_paths(mut self, paths: impl IntoIterator<Item = RoutePath>) -> Self {
        self.paths = paths.into_iter().collect();
        self
    }

    /// Enables dry-run mode.
    #[must_use]
    pub const fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Skips the formatter phase.
    #[must_use]
    pub const fn without_formatters(mut self) -> Self {
        self.run_formatters = false;
        self
    }

    /// Returns `true` when only part of the tree is emitted.
    #[must_use]
    pub fn is_subset(&self) -> bool {
        !self.paths.is_empty()
    }

    fn selects(&self, path: &RoutePath) -> bool {
        self.paths.is_empty()
            || self
                .paths
                .iter()
                .any(|prefix| path.is_within(prefix) || prefix.is_within(path))
    }
}

/// Everything a build would write, rendered in memory.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    /// Identifier to path index for the full tree
    pub module_map: ModuleMap,
    /// Rendered modules in path order
    pub modules: GeneratedCode,
    /// The package initializer
    pub init: GeneratedFile,
    /// Hand-written modules confirmed present, as file names
    pub native: Vec<String>,
    /// Soft warnings
    pub warnings: Vec<String>,
}

impl BuildPlan {
    /// Every file the plan writes, module map first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if the module map cannot be serialized.
    pub fn files(&self) -> Result<Vec<GeneratedFile>> {
        let mut files = Vec::with_capacity(self.modules.file_count() + 2);
        files.push(GeneratedFile::new(
            MODULE_MAP_FILE,
            self.module_map.to_json_string()?,
        ));
        files.extend(self.modules.files().cloned());
        files.push(self.init.clone());
        Ok(files)
    }
}

/// Outcome of a build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Output directory
    pub output_dir: String,
    /// Whether nothing was written
    pub dry_run: bool,
    /// Files written (or that would be written), relative to the output directory
    pub modules_written: Vec<String>,
    /// Hand-written modules left untouched
    pub modules_skipped_native: Vec<String>,
    /// Files of a previous build removed because their route is gone
    pub stale_removed: Vec<String>,
    /// Soft warnings
    pub warnings: Vec<String>,
    /// Formatters that ran successfully
    pub formatters_run: Vec<String>,
}

/// Orchestrates one package build.
#[derive(Debug)]
pub struct PackageBuilder<'r, R: RouteRegistry + ?Sized> {
    registry: &'r R,
    config: BuildConfig,
    options: BuildOptions,
}

enum Job {
    Navigator(ModuleDescriptor),
    Command(ModuleDescriptor, MethodDef),
}

impl<'r, R: RouteRegistry + ?Sized> PackageBuilder<'r, R> {
    /// Creates a builder with default options.
    pub fn new(registry: &'r R, config: BuildConfig) -> Self {
        Self {
            registry,
            config,
            options: BuildOptions::default(),
        }
    }

    /// Replaces the build options.
    #[must_use]
    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// The configuration of this build.
    #[must_use]
    pub const fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// The route tree of the registry.
    #[must_use]
    pub fn tree(&self) -> PathTree {
        PathTree::from_registry(self.registry)
    }

    /// The unified parameters of the command at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if no command is registered at
    /// `path`, otherwise any unification error.
    pub fn inspect(&self, path: &RoutePath) -> Result<UnifiedSchema> {
        let registration = self
            .registry
            .get_registration(path)
            .ok_or_else(|| {
                Error::InvalidArgument(format!("no command is registered at '{path}'"))
            })?;
        Unifier::from_config(&self.config).unify_registration(registration, self.registry)
    }

    /// Runs the `Init` phase: validates the registry and renders every
    /// selected module in memory.
    ///
    /// # Errors
    ///
    /// Returns the first [`Error::Schema`] or [`Error::Config`] found, or all
    /// schema conflicts and structural errors batched in [`Error::Multiple`].
    pub fn plan(&self) -> Result<BuildPlan> {
        self.config.validate()?;
        validate_registry(self.registry, &self.config.generic_provider)?;

        let mut errors = Vec::new();
        if self.registry.get_registration(&RoutePath::root()).is_some() {
            errors.push(Error::Structural {
                path: RoutePath::root().to_string(),
                reason: "a command cannot be bound to the root path".to_string(),
            });
        }

        let tree = self.tree();
        errors.extend(tree.structural_errors());
        for prefix in &self.options.paths {
            if !tree.contains(prefix) {
                errors.push(Error::InvalidArgument(format!(
                    "subset path '{prefix}' is not part of the route tree"
                )));
            }
        }

        let allocator = match Allocator::new(tree.paths()) {
            Ok(allocator) => allocator,
            Err(e) => {
                push_flat(&mut errors, e);
                return Err(Error::collect(errors).unwrap_or_else(|| {
                    Error::InvalidArgument("identifier allocation failed".to_string())
                }));
            }
        };
        let descriptors = tree.descriptors(|p| allocator.allocate(p))?;

        let emitter = CodeEmitter::new(&self.config)?;
        if let Err(e) = emitter.check_import_targets() {
            push_flat(&mut errors, e);
        }

        let unifier = Unifier::from_config(&self.config);
        let mut warnings = Vec::new();
        let mut native = Vec::new();
        let mut jobs = Vec::new();

        for descriptor in descriptors {
            if !descriptor.is_leaf() {
                if self.options.selects(&descriptor.path) {
                    jobs.push(Job::Navigator(descriptor));
                }
                continue;
            }

            let Some(registration) = self.registry.get_registration(&descriptor.path) else {
                errors.push(Error::Structural {
                    path: descriptor.path.to_string(),
                    reason: "leaf has no registration".to_string(),
                });
                continue;
            };

            if !registration.is_generated() {
                match self.check_native(&descriptor.identifier) {
                    Ok(file) => native.push(file),
                    Err(reason) => errors.push(Error::Structural {
                        path: descriptor.path.to_string(),
                        reason,
                    }),
                }
                continue;
            }

            let schema = match unifier.unify_registration(registration, self.registry) {
                Ok(schema) => schema,
                Err(e) => {
                    push_flat(&mut errors, e);
                    continue;
                }
            };
            if !self.options.selects(&descriptor.path) {
                continue;
            }

            let provider_schemas = registration
                .model_name
                .as_deref()
                .and_then(|m| self.registry.get_provider_schema(m));
            let (signature, docstring) = generate(registration, &schema, provider_schemas);
            for warning in &docstring.warnings {
                tracing::warn!(path = %descriptor.path, "{warning}");
                warnings.push(format!("{}: {warning}", descriptor.path));
            }
            let method = MethodDef::new(
                &schema,
                signature,
                docstring,
                registration.deprecated.clone(),
            );
            jobs.push(Job::Command(descriptor, method));
        }

        if let Some(error) = Error::collect(errors) {
            return Err(error);
        }

        let mut modules = GeneratedCode::new();
        let mut emit_errors = Vec::new();
        for rendered in render_jobs(&emitter, &tree, &allocator, jobs) {
            match rendered {
                Ok(file) => modules.add_file(file),
                Err(e) => push_flat(&mut emit_errors, e),
            }
        }
        if let Some(error) = Error::collect(emit_errors) {
            return Err(error);
        }

        tracing::info!(
            modules = modules.file_count(),
            native = native.len(),
            warnings = warnings.len(),
            "Rendered package in memory"
        );

        Ok(BuildPlan {
            module_map: allocator.module_map(),
            modules,
            init: emitter.render_init(&allocator)?,
            native,
            warnings,
        })
    }

    /// Runs the full build.
    ///
    /// # Errors
    ///
    /// Returns any error from [`PackageBuilder::plan`], or an I/O error while
    /// writing. Formatter problems are reported as warnings, never errors.
    pub fn build(&self) -> Result<BuildReport> {
        let output_dir = self.config.output_dir.as_path();
        tracing::info!(phase = %BuildPhase::Init, output = %output_dir.display(), "Starting build");
        let plan = self.plan()?;

        let mut report = BuildReport {
            output_dir: output_dir.display().to_string(),
            dry_run: self.options.dry_run,
            modules_skipped_native: plan.native.clone(),
            warnings: plan.warnings.clone(),
            ..BuildReport::default()
        };

        if self.options.dry_run {
            report.modules_written = plan.files()?.into_iter().map(|f| f.path).collect();
            tracing::info!(files = report.modules_written.len(), "Dry run, nothing written");
            return Ok(report);
        }

        let previous = if self.config.clean_stale && !self.options.is_subset() {
            read_previous_map(output_dir, &mut report.warnings)
        } else {
            None
        };

        let options = ExportOptions::default();

        tracing::info!(
            phase = %BuildPhase::WriteModuleMap,
            entries = plan.module_map.len(),
            "Writing module map"
        );
        let map_file = GeneratedFile::new(MODULE_MAP_FILE, plan.module_map.to_json_string()?);
        write_files(output_dir, std::slice::from_ref(&map_file), &options, &mut report)?;

        tracing::info!(
            phase = %BuildPhase::EmitModules,
            modules = plan.modules.file_count(),
            "Writing modules"
        );
        write_files(output_dir, &plan.modules.files, &options, &mut report)?;

        tracing::info!(phase = %BuildPhase::WritePackageInit, "Writing package initializer");
        write_files(output_dir, std::slice::from_ref(&plan.init), &options, &mut report)?;

        if let Some(previous) = previous {
            let current: BTreeSet<&Identifier> = plan.module_map.identifiers().collect();
            let stale: Vec<String> = previous
                .identifiers()
                .filter(|id| !current.contains(id))
                .map(|id| format!("{id}.py"))
                .filter(|file| !plan.native.contains(file))
                .collect();
            report.stale_removed = remove_stale_files(output_dir, &stale)?;
            if !report.stale_removed.is_empty() {
                tracing::info!(removed = report.stale_removed.len(), "Removed stale modules");
            }
        }

        if self.options.run_formatters && !self.config.formatters.is_empty() {
            tracing::info!(phase = %BuildPhase::RunFormatters, "Running formatters");
            for outcome in run_formatters(&self.config.formatters, output_dir) {
                match outcome {
                    FormatterOutcome::Ran { program } => report.formatters_run.push(program),
                    other => report.warnings.extend(other.warning()),
                }
            }
        }

        tracing::info!(
            phase = %BuildPhase::Done,
            written = report.modules_written.len(),
            stale = report.stale_removed.len(),
            "Build complete"
        );
        Ok(report)
    }

    fn check_native(&self, identifier: &Identifier) -> std::result::Result<String, String> {
        let file = format!("{identifier}.py");
        if self.config.output_dir.join(&file).is_file() {
            Ok(file)
        } else {
            Err(format!(
                "native command module '{file}' is missing from '{}'",
                self.config.output_dir.display()
            ))
        }
    }
}

fn push_flat(errors: &mut Vec<Error>, error: Error) {
    match error {
        Error::Multiple(inner) => {
            for e in inner {
                push_flat(errors, e);
            }
        }
        other => errors.push(other),
    }
}

fn render_jobs(
    emitter: &CodeEmitter<'_>,
    tree: &PathTree,
    allocator: &Allocator,
    jobs: Vec<Job>,
) -> Vec<Result<GeneratedFile>> {
    let render = |job: Job| match job {
        Job::Navigator(descriptor) => emitter.emit_navigator(&descriptor, tree, allocator),
        Job::Command(descriptor, method) => emitter.emit_command(&descriptor, allocator, method),
    };

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        jobs.into_par_iter().map(render).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        jobs.into_iter().map(render).collect()
    }
}

fn read_previous_map(output_dir: &Path, warnings: &mut Vec<String>) -> Option<ModuleMap> {
    let path = output_dir.join(MODULE_MAP_FILE);
    let content = std::fs::read_to_string(&path).ok()?;
    match ModuleMap::from_json_str(&content) {
        Ok(map) => Some(map),
        Err(e) => {
            let warning = format!(
                "previous module map '{}' is unreadable, stale cleanup skipped: {e}",
                path.display()
            );
            tracing::warn!("{warning}");
            warnings.push(warning);
            None
        }
    }
}

fn write_files(
    output_dir: &Path,
    files: &[GeneratedFile],
    options: &ExportOptions,
    report: &mut BuildReport,
) -> Result<()> {
    let fs = FilesBuilder::from_relative(
        "/",
        files.iter().map(|f| (f.path.as_str(), f.content.as_str())),
    )
    .build()?;

    #[cfg(feature = "parallel")]
    fs.export_to_filesystem_parallel(output_dir, options)?;
    #[cfg(not(feature = "parallel"))]
    fs.export_to_filesystem_with_options(output_dir, options)?;

    report
        .modules_written
        .extend(files.iter().map(|f| f.path.clone()));
    Ok(())
}
