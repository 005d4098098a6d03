//! Core types, registry interface, and errors for routegen.
//!
//! This crate provides the foundational types used across the routegen
//! workspace.
//!
//! # Architecture
//!
//! The core consists of:
//! - Strong domain types (`RoutePath`, `Identifier`, `ProviderName`)
//! - The provider schema data model (`Field`, `ProviderSchemaSet`)
//! - The `RouteRegistry` trait and its JSON-backed `StaticRegistry`
//! - Error hierarchy with route-level context
//! - Build configuration and CLI support types

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

mod config;
mod error;
mod types;

pub mod cli;
pub mod registry;
pub mod schema;

pub use config::{BuildConfig, BuildConfigBuilder, DEFAULT_CONFIG_FILE, FormatterSpec};
pub use error::{Error, Result};
pub use registry::{HandlerKind, RouteRegistration, RouteRegistry, StaticRegistry};
pub use schema::{Field, FieldType, ProviderSchema, ProviderSchemaSet};
pub use types::{Identifier, ProviderName, RESERVED_WORDS, RoutePath, is_legal_identifier};
