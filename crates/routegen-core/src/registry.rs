//! Route registry interface.
//!
//! The generator consumes routes through [`RouteRegistry`] and never cares
//! how they were discovered. [`StaticRegistry`] is the stock implementation,
//! loaded from a JSON document or assembled in code.
//!
//! # Examples
//!
//! ```
//! use routegen_core::registry::{RouteRegistration, RouteRegistry, StaticRegistry};
//! use routegen_core::schema::{Field, FieldType, ProviderSchema, ProviderSchemaSet};
//! use routegen_core::RoutePath;
//!
//! let registry = StaticRegistry::new()
//!     .with_namespace(RoutePath::parse("/econ").unwrap())
//!     .with_route(
//!         RouteRegistration::new(RoutePath::parse("/econ/cpi").unwrap())
//!             .with_summary("Consumer Price Index.")
//!             .with_model("ConsumerPriceIndex"),
//!     )
//!     .with_model(
//!         "ConsumerPriceIndex",
//!         ProviderSchemaSet::new().provider(
//!             "fred",
//!             ProviderSchema::new().query(Field::new("country", FieldType::Str)),
//!         ),
//!     );
//!
//! assert_eq!(registry.list_paths().len(), 2);
//! assert!(registry.get_provider_schema("ConsumerPriceIndex").is_some());
//! ```

use crate::schema::{Field, ProviderSchemaSet, validate_fields};
use crate::{Error, Result, RoutePath, is_legal_identifier};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Read-only view of the application's routes.
pub trait RouteRegistry {
    /// Every known route path, leaves and explicit namespaces alike.
    fn list_paths(&self) -> BTreeSet<RoutePath>;

    /// The command bound to `path`, if any.
    fn get_registration(&self, path: &RoutePath) -> Option<&RouteRegistration>;

    /// Provider schemas for a model referenced by a registration.
    fn get_provider_schema(&self, model_name: &str) -> Option<&ProviderSchemaSet>;
}

/// Who owns the implementation of a command module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    /// The generator writes the module.
    #[default]
    Generated,
    /// The module is hand-written and must already exist in the output
    /// directory; the generator never overwrites it.
    Native,
}

/// Deprecation notice attached to a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deprecation {
    /// Version in which the command was deprecated
    pub since: String,
    /// What to use instead
    pub message: String,
}

/// A usage example rendered into the command documentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageExample {
    /// Optional one-line explanation shown above the call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Argument values keyed by parameter name
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,
}

/// A command bound to a route path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRegistration {
    /// Route path of the command
    pub path: RoutePath,
    /// One-line summary, used verbatim as the first docstring line
    #[serde(default)]
    pub summary: String,
    /// Implementation ownership
    #[serde(default)]
    pub handler: HandlerKind,
    /// Model whose provider schemas define parameters and results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    /// Result row class; `None` means the command returns no content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_model: Option<String>,
    /// Parameters of a command that has no providers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Field>,
    /// Deprecation notice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<Deprecation>,
    /// Usage examples
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<UsageExample>,
}

impl RouteRegistration {
    /// Creates a generated command with no model and no parameters.
    #[must_use]
    pub fn new(path: RoutePath) -> Self {
        Self {
            path,
            summary: String::new(),
            handler: HandlerKind::Generated,
            model_name: None,
            result_model: None,
            parameters: Vec::new(),
            deprecated: None,
            examples: Vec::new(),
        }
    }

    /// Sets the one-line summary.
    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Binds the command to a provider model.
    #[must_use]
    pub fn with_model(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = Some(model_name.into());
        self
    }

    /// Sets the result row class.
    #[must_use]
    pub fn with_result(mut self, result_model: impl Into<String>) -> Self {
        self.result_model = Some(result_model.into());
        self
    }

    /// Adds a provider-independent parameter.
    #[must_use]
    pub fn with_parameter(mut self, field: Field) -> Self {
        self.parameters.push(field);
        self
    }

    /// Marks the module as hand-written.
    #[must_use]
    pub const fn native(mut self) -> Self {
        self.handler = HandlerKind::Native;
        self
    }

    /// Attaches a deprecation notice.
    #[must_use]
    pub fn deprecated(mut self, since: impl Into<String>, message: impl Into<String>) -> Self {
        self.deprecated = Some(Deprecation {
            since: since.into(),
            message: message.into(),
        });
        self
    }

    /// Adds a usage example.
    #[must_use]
    pub fn with_example(mut self, example: UsageExample) -> Self {
        self.examples.push(example);
        self
    }

    /// Returns `true` if the generator owns this command's module.
    #[must_use]
    pub const fn is_generated(&self) -> bool {
        matches!(self.handler, HandlerKind::Generated)
    }
}

/// On-disk layout of a registry document.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    routes: Vec<RouteRegistration>,
    #[serde(default)]
    namespaces: Vec<RoutePath>,
    #[serde(default)]
    models: BTreeMap<String, ProviderSchemaSet>,
}

/// In-memory registry backed by ordered maps.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    registrations: BTreeMap<RoutePath, RouteRegistration>,
    namespaces: BTreeSet<RoutePath>,
    models: BTreeMap<String, ProviderSchemaSet>,
}

impl StaticRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a command registration, replacing any previous one at that path.
    #[must_use]
    pub fn with_route(mut self, registration: RouteRegistration) -> Self {
        self.registrations
            .insert(registration.path.clone(), registration);
        self
    }

    /// Adds an explicit namespace path.
    #[must_use]
    pub fn with_namespace(mut self, path: RoutePath) -> Self {
        self.namespaces.insert(path);
        self
    }

    /// Adds a provider model.
    #[must_use]
    pub fn with_model(mut self, name: impl Into<String>, schemas: ProviderSchemaSet) -> Self {
        self.models.insert(name.into(), schemas);
        self
    }

    /// Parses a registry from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] if the document is malformed (including
    /// invalid route paths and missing field descriptors) or registers the
    /// same path twice.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let document: RegistryDocument =
            serde_json::from_str(json).map_err(|e| Error::Schema {
                path: "<registry>".to_string(),
                reason: format!("malformed registry document: {e}"),
            })?;

        let mut registrations = BTreeMap::new();
        for registration in document.routes {
            let path = registration.path.clone();
            if registrations.insert(path.clone(), registration).is_some() {
                return Err(Error::Schema {
                    path: path.to_string(),
                    reason: "route registered more than once".to_string(),
                });
            }
        }

        tracing::debug!(
            routes = registrations.len(),
            models = document.models.len(),
            "Loaded route registry"
        );

        Ok(Self {
            registrations,
            namespaces: document.namespaces.into_iter().collect(),
            models: document.models,
        })
    }

    /// Reads and parses a registry file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, otherwise see
    /// [`StaticRegistry::from_json_str`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Serializes the registry back into its JSON document form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if serialization fails.
    pub fn to_json_string(&self) -> Result<String> {
        let document = RegistryDocument {
            routes: self.registrations.values().cloned().collect(),
            namespaces: self.namespaces.iter().cloned().collect(),
            models: self.models.clone(),
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Iterates over all registrations in path order.
    pub fn registrations(&self) -> impl Iterator<Item = &RouteRegistration> {
        self.registrations.values()
    }
}

impl RouteRegistry for StaticRegistry {
    fn list_paths(&self) -> BTreeSet<RoutePath> {
        self.registrations
            .keys()
            .chain(self.namespaces.iter())
            .cloned()
            .collect()
    }

    fn get_registration(&self, path: &RoutePath) -> Option<&RouteRegistration> {
        self.registrations.get(path)
    }

    fn get_provider_schema(&self, model_name: &str) -> Option<&ProviderSchemaSet> {
        self.models.get(model_name)
    }
}

/// Validates every registration of a registry against its models.
///
/// Fails fast on the first malformed entry: schema errors abort the build
/// before anything else happens.
///
/// # Errors
///
/// Returns [`Error::Schema`] if a registration references an unknown model,
/// names a result model that is not a legal identifier, declares both a
/// model and inline parameters, or carries a malformed schema.
pub fn validate_registry<R: RouteRegistry + ?Sized>(
    registry: &R,
    generic_provider: &str,
) -> Result<()> {
    let mut checked_models = BTreeSet::new();

    for path in registry.list_paths() {
        let Some(registration) = registry.get_registration(&path) else {
            continue;
        };

        if registration.path != path {
            return Err(Error::Schema {
                path: path.to_string(),
                reason: format!(
                    "registration is stored under '{path}' but declares '{}'",
                    registration.path
                ),
            });
        }

        if let Some(result) = registration
            .result_model
            .as_deref()
            .filter(|m| !is_legal_identifier(m))
        {
            return Err(Error::Schema {
                path: path.to_string(),
                reason: format!("result model '{result}' is not a legal identifier"),
            });
        }

        match &registration.model_name {
            Some(model) => {
                if !registration.parameters.is_empty() {
                    return Err(Error::Schema {
                        path: path.to_string(),
                        reason: "route declares both a model and inline parameters".to_string(),
                    });
                }
                let schemas =
                    registry
                        .get_provider_schema(model)
                        .ok_or_else(|| Error::Schema {
                            path: path.to_string(),
                            reason: format!("unknown model '{model}'"),
                        })?;
                if checked_models.insert(model.clone()) {
                    schemas.validate(model)?;
                }
            }
            None => validate_fields(
                path.as_str(),
                generic_provider,
                "query",
                &registration.parameters,
            )?,
        }
    }

    Ok(())
}
