//! Command implementations for the routegen CLI.
//!
//! Each command module resolves its configuration, runs the operation and
//! formats output according to the requested format.

pub mod build;
pub mod common;
pub mod completions;
pub mod inspect;
pub mod tree;
