//! Python client package generation for routegen.
//!
//! Turns a route registry into a package of lazily loaded navigator modules
//! and typed command modules, rendered through Handlebars templates.
//!
//! # Pipeline
//!
//! 1. [`path_tree`] builds the route hierarchy
//! 2. [`allocator`] assigns module and class identifiers
//! 3. [`unifier`] merges provider schemas into one parameter list per command
//! 4. [`docstring`] derives signatures and documentation
//! 5. [`emitter`] renders modules
//! 6. [`package`] orchestrates the build and writes the output

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

pub mod allocator;
pub mod docstring;
pub mod emitter;
pub mod formatter;
pub mod package;
pub mod path_tree;
pub mod python;
pub mod template_engine;
pub mod types;
pub mod unifier;

pub use allocator::{Allocator, ModuleMap};
pub use package::{BuildOptions, BuildPhase, BuildPlan, BuildReport, PackageBuilder};
pub use path_tree::{NodeKind, PathTree};
pub use types::{GeneratedCode, GeneratedFile};
pub use unifier::{UnifiedParameter, UnifiedSchema, Unifier};
