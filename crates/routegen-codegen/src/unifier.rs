//! Schema unification.
//!
//! Providers of one route each declare their own query fields. The unifier
//! merges them into a single parameter list: every field name appears once,
//! types that differ across providers are widened to a union, a small fixed
//! table of expansions is applied, and the list is closed by the `provider`
//! selector and the `**extra` bag.
//!
//! # Examples
//!
//! ```
//! use routegen_codegen::unifier::Unifier;
//! use routegen_core::schema::{Field, FieldType, ProviderSchema, ProviderSchemaSet};
//! use routegen_core::RoutePath;
//!
//! let set = ProviderSchemaSet::new()
//!     .provider("a", ProviderSchema::new()
//!         .query(Field::new("x", FieldType::Int))
//!         .query(Field::new("y", FieldType::Str)))
//!     .provider("b", ProviderSchema::new()
//!         .query(Field::new("x", FieldType::Str))
//!         .query(Field::new("z", FieldType::Bool)));
//!
//! let unified = Unifier::new("standard")
//!     .unify(&RoutePath::parse("/demo").unwrap(), "Demo", &set)
//!     .unwrap();
//!
//! let names: Vec<_> = unified.parameters.iter().map(|p| p.name.as_str()).collect();
//! assert_eq!(names, vec!["x", "y", "z", "provider", "extra"]);
//! assert_eq!(unified.parameters[0].ty.render(), "Optional[Union[int, str]]");
//! ```

use crate::python::TypeExpr;
use routegen_core::schema::{Field, FieldType, ProviderSchema, ProviderSchemaSet};
use routegen_core::{
    BuildConfig, Error, ProviderName, Result, RouteRegistration, RouteRegistry, RoutePath,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;

/// Name of the parameter that receives tabular input.
pub const DATA_PARAMETER: &str = "data";

/// Name of the provider selector parameter.
pub const PROVIDER_PARAMETER: &str = "provider";

/// Name of the keyword bag for provider-specific fields.
pub const EXTRA_PARAMETER: &str = "extra";

/// Role of a unified parameter in the signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    /// A field declared by at least one provider
    Concrete,
    /// The closed enumeration of providers
    Provider,
    /// The `**extra` keyword bag
    Extra,
}

/// One logical parameter merged across providers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnifiedParameter {
    /// Parameter name
    pub name: String,
    /// Final annotation, widened and expanded
    #[serde(serialize_with = "serialize_type")]
    pub ty: TypeExpr,
    /// Default value; `None` renders as Python `None` for optional parameters
    pub default: Option<Value>,
    /// Whether the caller must pass the parameter
    pub required: bool,
    /// First non-empty description in provider order
    pub description: String,
    /// Providers declaring the field, in provider order
    pub providers: Vec<ProviderName>,
    /// Role in the signature
    pub kind: ParameterKind,
    /// Position in the signature
    pub rank: usize,
}

fn serialize_type<S: serde::Serializer>(
    ty: &TypeExpr,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&ty.render())
}

impl UnifiedParameter {
    /// Returns `true` for fields declared by providers.
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        self.kind == ParameterKind::Concrete
    }
}

/// The merged parameter list of one route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnifiedSchema {
    /// Route the schema belongs to
    pub path: RoutePath,
    /// Model the providers come from; `None` for inline parameters
    pub model_name: Option<String>,
    /// Providers in documentation order, generic first when present
    pub providers: Vec<ProviderName>,
    /// Generic provider of the build
    pub generic_provider: ProviderName,
    /// Parameters in signature order
    pub parameters: Vec<UnifiedParameter>,
}

impl UnifiedSchema {
    /// Concrete parameters in signature order.
    pub fn concrete(&self) -> impl Iterator<Item = &UnifiedParameter> {
        self.parameters.iter().filter(|p| p.is_concrete())
    }

    /// Looks up a parameter by name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&UnifiedParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Providers a caller may select: every provider except the generic one.
    pub fn selectable_providers(&self) -> impl Iterator<Item = &ProviderName> {
        self.providers
            .iter()
            .filter(|p| **p != self.generic_provider)
    }

    /// Returns `true` when the signature carries a `provider` parameter.
    #[must_use]
    pub fn has_provider_parameter(&self) -> bool {
        self.parameters
            .iter()
            .any(|p| p.kind == ParameterKind::Provider)
    }
}

/// Merges provider schemas into unified parameter lists.
#[derive(Debug, Clone)]
pub struct Unifier {
    generic: ProviderName,
    priority: Vec<ProviderName>,
}

impl Unifier {
    /// Creates a unifier with no provider priority.
    #[must_use]
    pub fn new(generic_provider: impl Into<ProviderName>) -> Self {
        Self {
            generic: generic_provider.into(),
            priority: Vec::new(),
        }
    }

    /// Sets the providers surfaced right after the generic one.
    #[must_use]
    pub fn with_priority<I, S>(mut self, priority: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ProviderName>,
    {
        self.priority = priority.into_iter().map(Into::into).collect();
        self
    }

    /// Creates a unifier from the build configuration.
    #[must_use]
    pub fn from_config(config: &BuildConfig) -> Self {
        Self::new(config.generic_provider.as_str())
            .with_priority(config.provider_priority.iter().map(String::as_str))
    }

    /// The generic provider name.
    #[must_use]
    pub const fn generic_provider(&self) -> &ProviderName {
        &self.generic
    }

    /// Orders the providers of a set: generic first, then the configured
    /// priority, then the rest alphabetically.
    ///
    /// The order never depends on how the set was built.
    ///
    /// # Examples
    ///
    /// ```
    /// use routegen_codegen::unifier::Unifier;
    /// use routegen_core::schema::{ProviderSchema, ProviderSchemaSet};
    ///
    /// let set = ProviderSchemaSet::new()
    ///     .provider("polygon", ProviderSchema::new())
    ///     .provider("standard", ProviderSchema::new())
    ///     .provider("fmp", ProviderSchema::new())
    ///     .provider("intrinio", ProviderSchema::new());
    ///
    /// let order = Unifier::new("standard").with_priority(["intrinio"]).provider_order(&set);
    /// let names: Vec<_> = order.iter().map(|p| p.as_str()).collect();
    /// assert_eq!(names, vec!["standard", "intrinio", "fmp", "polygon"]);
    /// ```
    #[must_use]
    pub fn provider_order(&self, set: &ProviderSchemaSet) -> Vec<ProviderName> {
        let mut order = Vec::with_capacity(set.providers.len());
        if set.providers.contains_key(&self.generic) {
            order.push(self.generic.clone());
        }
        for name in &self.priority {
            if set.providers.contains_key(name) && !order.contains(name) {
                order.push(name.clone());
            }
        }
        for name in set.provider_names() {
            if !order.contains(name) {
                order.push(name.clone());
            }
        }
        order
    }

    /// Unifies the provider schemas of a model for the route at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaConflict`] for every field whose types cannot be
    /// widened, batched in [`Error::Multiple`] when there are several.
    pub fn unify(
        &self,
        path: &RoutePath,
        model_name: &str,
        set: &ProviderSchemaSet,
    ) -> Result<UnifiedSchema> {
        let providers = self.provider_order(set);
        let parameters = self.merge(path, set, &providers)?;
        Ok(UnifiedSchema {
            path: path.clone(),
            model_name: Some(model_name.to_string()),
            providers,
            generic_provider: self.generic.clone(),
            parameters,
        })
    }

    /// Unifies the inline parameters of a route without providers.
    ///
    /// The fields are treated as the generic provider's, so the route gets
    /// no `provider` parameter.
    ///
    /// # Errors
    ///
    /// See [`Unifier::unify`].
    pub fn unify_inline(&self, path: &RoutePath, fields: &[Field]) -> Result<UnifiedSchema> {
        let set = ProviderSchemaSet::new().provider(
            self.generic.clone(),
            ProviderSchema {
                query: fields.to_vec(),
                result: Vec::new(),
            },
        );
        let providers = vec![self.generic.clone()];
        let parameters = self.merge(path, &set, &providers)?;
        Ok(UnifiedSchema {
            path: path.clone(),
            model_name: None,
            providers,
            generic_provider: self.generic.clone(),
            parameters,
        })
    }

    /// Unifies whatever a registration declares: its model or its inline
    /// parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] if the model is unknown, otherwise see
    /// [`Unifier::unify`].
    pub fn unify_registration<R: RouteRegistry + ?Sized>(
        &self,
        registration: &RouteRegistration,
        registry: &R,
    ) -> Result<UnifiedSchema> {
        match &registration.model_name {
            Some(model) => {
                let set = registry
                    .get_provider_schema(model)
                    .ok_or_else(|| Error::Schema {
                        path: registration.path.to_string(),
                        reason: format!("unknown model '{model}'"),
                    })?;
                self.unify(&registration.path, model, set)
            }
            None => self.unify_inline(&registration.path, &registration.parameters),
        }
    }

    fn merge(
        &self,
        path: &RoutePath,
        set: &ProviderSchemaSet,
        providers: &[ProviderName],
    ) -> Result<Vec<UnifiedParameter>> {
        let mut names: Vec<&str> = Vec::new();
        let mut seen = BTreeSet::new();
        for provider in providers {
            if let Some(schema) = set.get(provider) {
                for field in &schema.query {
                    if seen.insert(field.name.as_str()) {
                        names.push(field.name.as_str());
                    }
                }
            }
        }

        let mut parameters = Vec::with_capacity(names.len() + 2);
        let mut conflicts = Vec::new();
        for name in names {
            let declarations: Vec<(&ProviderName, &Field)> = providers
                .iter()
                .filter_map(|provider| {
                    set.get(provider)
                        .and_then(|schema| schema.query.iter().find(|f| f.name == name))
                        .map(|field| (provider, field))
                })
                .collect();

            match self.merge_field(path, name, &declarations, providers.len()) {
                Ok(mut parameter) => {
                    parameter.rank = parameters.len();
                    parameters.push(parameter);
                }
                Err(conflict) => conflicts.push(conflict),
            }
        }

        if let Some(error) = Error::collect(conflicts) {
            return Err(error);
        }

        let selectable: Vec<String> = providers
            .iter()
            .filter(|p| **p != self.generic)
            .map(|p| p.as_str().to_string())
            .collect();
        if !selectable.is_empty() {
            parameters.push(UnifiedParameter {
                name: PROVIDER_PARAMETER.to_string(),
                ty: TypeExpr::optional(TypeExpr::Literal(selectable)),
                default: None,
                required: false,
                description: "The provider to use; defaults to the first available.".to_string(),
                providers: Vec::new(),
                kind: ParameterKind::Provider,
                rank: parameters.len(),
            });
        }
        parameters.push(UnifiedParameter {
            name: EXTRA_PARAMETER.to_string(),
            ty: TypeExpr::Any,
            default: None,
            required: false,
            description: "Provider-specific parameters.".to_string(),
            providers: Vec::new(),
            kind: ParameterKind::Extra,
            rank: parameters.len(),
        });

        tracing::debug!(
            path = %path,
            parameters = parameters.len(),
            providers = providers.len(),
            "Unified route parameters"
        );

        Ok(parameters)
    }

    fn merge_field(
        &self,
        path: &RoutePath,
        name: &str,
        declarations: &[(&ProviderName, &Field)],
        provider_count: usize,
    ) -> Result<UnifiedParameter> {
        let mut widened: Option<TypeExpr> = None;
        for (_, field) in declarations {
            let ty = base_type(field);
            widened = match widened {
                None => Some(ty),
                Some(current) => match widen(&current, &ty) {
                    Some(next) => Some(next),
                    None => {
                        return Err(Error::SchemaConflict {
                            path: path.to_string(),
                            field: name.to_string(),
                            types: declarations
                                .iter()
                                .map(|(p, f)| format!("{p}: {}", base_type(f).render()))
                                .collect(),
                        });
                    }
                },
            };
        }
        let widened = widened.unwrap_or(TypeExpr::Any);

        let generic = declarations
            .iter()
            .find(|(p, _)| **p == self.generic)
            .map(|(_, f)| *f);

        let required = match generic {
            Some(field) => field.required,
            None => {
                declarations.len() == provider_count && declarations.iter().all(|(_, f)| f.required)
            }
        };

        let default = if required {
            None
        } else {
            match generic {
                Some(field) => field.default.clone(),
                None => agreed_default(declarations),
            }
        };

        let multiple = declarations.iter().any(|(_, f)| f.multiple_items_allowed);
        let mut ty = expand(name, widened, multiple);
        if !required && default.as_ref().is_none_or(Value::is_null) {
            ty = TypeExpr::optional(ty);
        }

        Ok(UnifiedParameter {
            name: name.to_string(),
            ty,
            default,
            required,
            description: declarations
                .iter()
                .map(|(_, f)| f.description.trim())
                .find(|d| !d.is_empty())
                .unwrap_or_default()
                .to_string(),
            providers: declarations.iter().map(|(p, _)| (*p).clone()).collect(),
            kind: ParameterKind::Concrete,
            rank: 0,
        })
    }
}

fn agreed_default(declarations: &[(&ProviderName, &Field)]) -> Option<Value> {
    let mut defaults = declarations.iter().map(|(_, f)| &f.default);
    let first = defaults.next()?.clone();
    defaults.all(|d| *d == first).then_some(first).flatten()
}

/// Annotation of a single provider's declaration.
///
/// # Examples
///
/// ```
/// use routegen_codegen::unifier::base_type;
/// use routegen_core::schema::{Field, FieldType};
///
/// let units = Field::new("units", FieldType::Str).with_choices(["lin", "pch"]);
/// assert_eq!(base_type(&units).render(), "Literal[\"lin\", \"pch\"]");
/// ```
#[must_use]
pub fn base_type(field: &Field) -> TypeExpr {
    if field.field_type == FieldType::Str && !field.choices.is_empty() {
        return TypeExpr::Literal(field.choices.clone());
    }
    from_field_type(&field.field_type)
}

fn from_field_type(field_type: &FieldType) -> TypeExpr {
    match field_type {
        FieldType::Str => TypeExpr::Str,
        FieldType::Int => TypeExpr::Int,
        FieldType::Float => TypeExpr::Float,
        FieldType::Bool => TypeExpr::Bool,
        FieldType::Date => TypeExpr::Date,
        FieldType::Datetime => TypeExpr::Datetime,
        FieldType::Any => TypeExpr::Any,
        FieldType::Dict => TypeExpr::Dict,
        FieldType::List { item } => TypeExpr::list(from_field_type(item)),
        FieldType::Model { name } => TypeExpr::Model(name.clone()),
    }
}

/// Widens two declarations of one field into a type accepting both.
///
/// Returns `None` when the declarations cannot be reconciled: two different
/// models, a container against a scalar, or a mapping against a list.
///
/// # Examples
///
/// ```
/// use routegen_codegen::python::TypeExpr;
/// use routegen_codegen::unifier::widen;
///
/// assert_eq!(
///     widen(&TypeExpr::Int, &TypeExpr::Str),
///     Some(TypeExpr::Union(vec![TypeExpr::Int, TypeExpr::Str])),
/// );
/// assert_eq!(widen(&TypeExpr::Dict, &TypeExpr::Int), None);
/// ```
#[must_use]
pub fn widen(a: &TypeExpr, b: &TypeExpr) -> Option<TypeExpr> {
    if a == b {
        return Some(a.clone());
    }
    match (a, b) {
        (TypeExpr::Any, _) | (_, TypeExpr::Any) => Some(TypeExpr::Any),
        (TypeExpr::List(x), TypeExpr::List(y)) => widen(x, y).map(TypeExpr::list),
        _ if a.is_scalar() && b.is_scalar() => Some(merge_scalars(a, b)),
        _ => None,
    }
}

fn merge_scalars(a: &TypeExpr, b: &TypeExpr) -> TypeExpr {
    let members: Vec<TypeExpr> = a.members().into_iter().chain(b.members()).collect();
    let has_str = members.contains(&TypeExpr::Str);

    let mut merged: Vec<TypeExpr> = Vec::with_capacity(members.len());
    let mut literal_at: Option<usize> = None;
    for member in members {
        match member {
            TypeExpr::Literal(_) if has_str => {}
            TypeExpr::Literal(choices) => match literal_at {
                Some(index) => {
                    if let TypeExpr::Literal(existing) = &mut merged[index] {
                        for choice in choices {
                            if !existing.contains(&choice) {
                                existing.push(choice);
                            }
                        }
                    }
                }
                None => {
                    literal_at = Some(merged.len());
                    merged.push(TypeExpr::Literal(choices));
                }
            },
            other => merged.push(other),
        }
    }
    TypeExpr::union(merged)
}

/// Applies the fixed expansion table to a widened type.
///
/// Dates and datetimes also accept strings, fields allowing multiple items
/// also accept a list, and the `data` parameter also accepts tabular input.
#[must_use]
pub fn expand(name: &str, ty: TypeExpr, multiple_items_allowed: bool) -> TypeExpr {
    if ty == TypeExpr::Any {
        return ty;
    }

    let mut ty = TypeExpr::union(ty.members().into_iter().flat_map(|member| match member {
        TypeExpr::Date | TypeExpr::Datetime => vec![member, TypeExpr::Str],
        other => vec![other],
    }));

    if multiple_items_allowed {
        ty = TypeExpr::union([ty.clone(), TypeExpr::list(ty)]);
    }

    if name == DATA_PARAMETER {
        ty = TypeExpr::union([
            ty,
            TypeExpr::Data,
            TypeExpr::list(TypeExpr::Data),
            TypeExpr::list(TypeExpr::Dict),
            TypeExpr::Dict,
        ]);
    }
    ty
}
