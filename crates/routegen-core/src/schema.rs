//! Provider schema data model.
//!
//! A route's parameters and results are described per provider as ordered
//! lists of [`Field`] records. These are plain data: the generator never
//! introspects anything at runtime, it only transforms these records.
//!
//! # Examples
//!
//! ```
//! use routegen_core::schema::{Field, FieldType, ProviderSchema, ProviderSchemaSet};
//!
//! let fred = ProviderSchema::new()
//!     .query(Field::new("country", FieldType::Str).required())
//!     .query(Field::new("units", FieldType::Str).with_choices(["lin", "pch"]));
//!
//! let set = ProviderSchemaSet::new().provider("fred", fred);
//! assert!(set.validate("ConsumerPriceIndex").is_ok());
//! assert_eq!(set.provider_names().count(), 1);
//! ```

use crate::types::is_legal_identifier;
use crate::{Error, ProviderName, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Parameter names the generator reserves for itself.
pub const RESERVED_PARAMETER_NAMES: &[&str] = &["self", "provider", "extra"];

/// Semantic type of a field as declared by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldType {
    /// Free-form text
    Str,
    /// Whole number
    Int,
    /// Floating point number
    Float,
    /// Boolean flag
    Bool,
    /// Calendar date
    Date,
    /// Date with time of day
    Datetime,
    /// Untyped value
    Any,
    /// Open key/value mapping
    Dict,
    /// Homogeneous list
    List {
        /// Element type
        item: Box<FieldType>,
    },
    /// Named structured type (a record class or tabular container)
    Model {
        /// Class name of the model
        name: String,
    },
}

impl FieldType {
    /// Convenience constructor for `List { item }`.
    #[must_use]
    pub fn list(item: Self) -> Self {
        Self::List {
            item: Box::new(item),
        }
    }

    /// Convenience constructor for `Model { name }`.
    #[must_use]
    pub fn model(name: impl Into<String>) -> Self {
        Self::Model { name: name.into() }
    }
}

/// One input or output field of a provider schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Field name, used verbatim as the parameter name
    pub name: String,
    /// Declared semantic type
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Default value, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Whether the caller must supply the field
    #[serde(default)]
    pub required: bool,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Whether a list of values (or comma-separated string) is accepted
    #[serde(default)]
    pub multiple_items_allowed: bool,
    /// Enumerated choices for string fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
}

impl Field {
    /// Creates an optional field with no default and no description.
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            default: None,
            required: false,
            description: String::new(),
            multiple_items_allowed: false,
            choices: Vec::new(),
        }
    }

    /// Marks the field as required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn with_default(mut self, value: serde_json::Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the enumerated choices.
    #[must_use]
    pub fn with_choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    /// Allows multiple items for this field.
    #[must_use]
    pub const fn multiple(mut self) -> Self {
        self.multiple_items_allowed = true;
        self
    }
}

/// Input and output fields for one provider of a model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderSchema {
    /// Query parameters, in declaration order
    #[serde(default)]
    pub query: Vec<Field>,
    /// Result row fields, in declaration order
    #[serde(default)]
    pub result: Vec<Field>,
}

impl ProviderSchema {
    /// Creates an empty provider schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a query field.
    #[must_use]
    pub fn query(mut self, field: Field) -> Self {
        self.query.push(field);
        self
    }

    /// Appends a result field.
    #[must_use]
    pub fn result(mut self, field: Field) -> Self {
        self.result.push(field);
        self
    }
}

/// Provider schemas of one model, keyed by provider name.
///
/// Keys are kept in a sorted map; any meaningful provider order is imposed
/// later by the generator's priority rules, never by insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderSchemaSet {
    /// Schemas per provider
    pub providers: BTreeMap<ProviderName, ProviderSchema>,
}

impl ProviderSchemaSet {
    /// Creates an empty schema set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a provider schema.
    #[must_use]
    pub fn provider(mut self, name: impl Into<ProviderName>, schema: ProviderSchema) -> Self {
        self.providers.insert(name.into(), schema);
        self
    }

    /// Returns the schema of one provider.
    #[must_use]
    pub fn get(&self, name: &ProviderName) -> Option<&ProviderSchema> {
        self.providers.get(name)
    }

    /// Iterates over provider names in sorted order.
    pub fn provider_names(&self) -> impl Iterator<Item = &ProviderName> {
        self.providers.keys()
    }

    /// Checks that the schema set is well formed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] (with `model_name` as the path) if the set has
    /// no providers, a field name is not a legal identifier or is reserved,
    /// a provider declares a field twice, a model type has no name, or
    /// choices are attached to a non-string field.
    pub fn validate(&self, model_name: &str) -> Result<()> {
        if self.providers.is_empty() {
            return Err(Error::Schema {
                path: model_name.to_string(),
                reason: "model declares no providers".to_string(),
            });
        }

        for (provider, schema) in &self.providers {
            if provider.as_str().is_empty() {
                return Err(Error::Schema {
                    path: model_name.to_string(),
                    reason: "provider name cannot be empty".to_string(),
                });
            }
            validate_fields(model_name, provider.as_str(), "query", &schema.query)?;
            validate_fields(model_name, provider.as_str(), "result", &schema.result)?;
        }

        Ok(())
    }
}

/// Validates a list of fields declared by one provider.
///
/// # Errors
///
/// See [`ProviderSchemaSet::validate`].
pub fn validate_fields(owner: &str, provider: &str, section: &str, fields: &[Field]) -> Result<()> {
    let mut seen = HashSet::new();
    for field in fields {
        let context = format!("{provider} {section} field '{}'", field.name);
        if !is_legal_identifier(&field.name) {
            return Err(Error::Schema {
                path: owner.to_string(),
                reason: format!("{context} is not a legal identifier"),
            });
        }
        if section == "query" && RESERVED_PARAMETER_NAMES.contains(&field.name.as_str()) {
            return Err(Error::Schema {
                path: owner.to_string(),
                reason: format!("{context} uses a reserved parameter name"),
            });
        }
        if !seen.insert(field.name.as_str()) {
            return Err(Error::Schema {
                path: owner.to_string(),
                reason: format!("{context} is declared more than once"),
            });
        }
        validate_type(owner, &context, &field.field_type)?;
        if !field.choices.is_empty() && field.field_type != FieldType::Str {
            return Err(Error::Schema {
                path: owner.to_string(),
                reason: format!("{context} declares choices but is not a string"),
            });
        }
    }
    Ok(())
}

fn validate_type(owner: &str, context: &str, field_type: &FieldType) -> Result<()> {
    match field_type {
        FieldType::Model { name } if !is_legal_identifier(name) => Err(Error::Schema {
            path: owner.to_string(),
            reason: format!("{context} references model type '{name}' with an invalid name"),
        }),
        FieldType::List { item } => validate_type(owner, context, item),
        _ => Ok(()),
    }
}
