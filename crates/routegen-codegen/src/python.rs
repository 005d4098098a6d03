//! Python type expressions, literals and import sets.
//!
//! Everything the emitter writes into a type annotation is a [`TypeExpr`],
//! so rendering and import collection are two views of the same value and
//! can never disagree.
//!
//! # Examples
//!
//! ```
//! use routegen_codegen::python::{ImportSet, TypeExpr};
//!
//! let ty = TypeExpr::optional(TypeExpr::union([
//!     TypeExpr::Date,
//!     TypeExpr::Str,
//! ]));
//! assert_eq!(ty.render(), "Optional[Union[datetime.date, str]]");
//!
//! let mut imports = ImportSet::new();
//! ty.collect_imports(&mut imports, "routegen_runtime", "models");
//! assert_eq!(
//!     imports.render(),
//!     vec!["import datetime", "from typing import Optional, Union"],
//! );
//! ```

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

/// A Python type annotation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    /// `str`
    Str,
    /// `int`
    Int,
    /// `float`
    Float,
    /// `bool`
    Bool,
    /// `datetime.date`
    Date,
    /// `datetime.datetime`
    Datetime,
    /// `Any`
    Any,
    /// `Dict[str, Any]`
    Dict,
    /// The runtime's tabular `Data` type
    Data,
    /// `List[T]`
    List(Box<TypeExpr>),
    /// A class from the models module
    Model(String),
    /// `Literal[...]` over string choices
    Literal(Vec<String>),
    /// `Union[...]`; never nested, never fewer than two members
    Union(Vec<TypeExpr>),
    /// `Optional[T]`
    Optional(Box<TypeExpr>),
}

impl TypeExpr {
    /// `List[item]`.
    #[must_use]
    pub fn list(item: Self) -> Self {
        Self::List(Box::new(item))
    }

    /// `Optional[inner]`; `Any` and already optional types are returned as is.
    #[must_use]
    pub fn optional(inner: Self) -> Self {
        match inner {
            Self::Any | Self::Optional(_) => inner,
            other => Self::Optional(Box::new(other)),
        }
    }

    /// A flattened, de-duplicated union that keeps first-seen order.
    ///
    /// A single member collapses to that member.
    #[must_use]
    pub fn union(members: impl IntoIterator<Item = Self>) -> Self {
        let mut flat: Vec<Self> = Vec::new();
        for member in members {
            let parts = match member {
                Self::Union(inner) => inner,
                other => vec![other],
            };
            for part in parts {
                if !flat.contains(&part) {
                    flat.push(part);
                }
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            Self::Union(flat)
        }
    }

    /// Members of a union, or the type itself.
    #[must_use]
    pub fn members(&self) -> Vec<Self> {
        match self {
            Self::Union(members) => members.clone(),
            other => vec![other.clone()],
        }
    }

    /// Returns `true` for types that carry no structure (scalars and literals).
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        match self {
            Self::Str
            | Self::Int
            | Self::Float
            | Self::Bool
            | Self::Date
            | Self::Datetime
            | Self::Literal(_) => true,
            Self::Union(members) => members.iter().all(Self::is_scalar),
            _ => false,
        }
    }

    /// Renders the annotation.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Str => "str".to_string(),
            Self::Int => "int".to_string(),
            Self::Float => "float".to_string(),
            Self::Bool => "bool".to_string(),
            Self::Date => "datetime.date".to_string(),
            Self::Datetime => "datetime.datetime".to_string(),
            Self::Any => "Any".to_string(),
            Self::Dict => "Dict[str, Any]".to_string(),
            Self::Data => "Data".to_string(),
            Self::List(item) => format!("List[{}]", item.render()),
            Self::Model(name) => name.clone(),
            Self::Literal(choices) => format!(
                "Literal[{}]",
                choices
                    .iter()
                    .map(|c| python_string(c))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::Union(members) => format!(
                "Union[{}]",
                members
                    .iter()
                    .map(Self::render)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::Optional(inner) => format!("Optional[{}]", inner.render()),
        }
    }

    /// Adds every import the rendered annotation needs.
    pub fn collect_imports(
        &self,
        imports: &mut ImportSet,
        runtime_package: &str,
        models_module: &str,
    ) {
        match self {
            Self::Str | Self::Int | Self::Float | Self::Bool => {}
            Self::Date | Self::Datetime => imports.module("datetime"),
            Self::Any => imports.typing("Any"),
            Self::Dict => {
                imports.typing("Dict");
                imports.typing("Any");
            }
            Self::Data => imports.from(format!("{runtime_package}.data"), "Data"),
            Self::List(item) => {
                imports.typing("List");
                item.collect_imports(imports, runtime_package, models_module);
            }
            Self::Model(name) => imports.from(models_module, name),
            Self::Literal(_) => imports.typing("Literal"),
            Self::Union(members) => {
                imports.typing("Union");
                for member in members {
                    member.collect_imports(imports, runtime_package, models_module);
                }
            }
            Self::Optional(inner) => {
                imports.typing("Optional");
                inner.collect_imports(imports, runtime_package, models_module);
            }
        }
    }
}

/// Imports of one module, kept sorted so rendering is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSet {
    modules: BTreeSet<String>,
    aliased: BTreeSet<(String, String)>,
    typing: BTreeSet<String>,
    from: BTreeMap<String, BTreeSet<String>>,
}

impl ImportSet {
    /// Creates an empty import set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `import <module>`.
    pub fn module(&mut self, module: impl Into<String>) {
        self.modules.insert(module.into());
    }

    /// `import <module> as <alias>`.
    pub fn module_as(&mut self, module: impl Into<String>, alias: impl Into<String>) {
        self.aliased.insert((module.into(), alias.into()));
    }

    /// `from typing import <name>`.
    pub fn typing(&mut self, name: impl Into<String>) {
        self.typing.insert(name.into());
    }

    /// `from <module> import <name>`.
    pub fn from(&mut self, module: impl Into<String>, name: impl Into<String>) {
        self.from
            .entry(module.into())
            .or_default()
            .insert(name.into());
    }

    /// Every bound name paired with the module it comes from.
    #[must_use]
    pub fn bound_names(&self) -> Vec<(String, String)> {
        let mut names: Vec<(String, String)> = self
            .modules
            .iter()
            .map(|m| (m.split('.').next().unwrap_or(m).to_string(), m.clone()))
            .collect();
        names.extend(self.aliased.iter().map(|(m, a)| (a.clone(), m.clone())));
        names.extend(self.typing.iter().map(|n| (n.clone(), "typing".to_string())));
        for (module, items) in &self.from {
            names.extend(items.iter().map(|n| (n.clone(), module.clone())));
        }
        names
    }

    /// Names bound by more than one import, with the modules that bind them.
    #[must_use]
    pub fn conflicts(&self) -> Vec<(String, Vec<String>)> {
        let mut owners: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, module) in self.bound_names() {
            owners.entry(name).or_default().push(module);
        }
        owners.into_iter().filter(|(_, m)| m.len() > 1).collect()
    }

    /// Modules imported with `from ... import`, in sorted order.
    pub fn source_modules(&self) -> impl Iterator<Item = &String> {
        self.from.keys()
    }

    /// Rendered import lines: plain imports, then `typing`, then the rest.
    #[must_use]
    pub fn render(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .modules
            .iter()
            .map(|m| (m.as_str(), format!("import {m}")))
            .chain(
                self.aliased
                    .iter()
                    .map(|(m, a)| (m.as_str(), format!("import {m} as {a}"))),
            )
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|(_, line)| line)
            .collect();
        if !self.typing.is_empty() {
            lines.push(format!(
                "from typing import {}",
                self.typing.iter().cloned().collect::<Vec<_>>().join(", ")
            ));
        }
        for (module, names) in &self.from {
            lines.push(format!(
                "from {module} import {}",
                names.iter().cloned().collect::<Vec<_>>().join(", ")
            ));
        }
        lines
    }
}

/// Renders a double-quoted Python string literal.
///
/// # Examples
///
/// ```
/// use routegen_codegen::python::python_string;
///
/// assert_eq!(python_string("lin"), "\"lin\"");
/// assert_eq!(python_string("a\"b\n"), "\"a\\\"b\\n\"");
/// ```
#[must_use]
pub fn python_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\x{:02x}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Renders a JSON value as a Python literal.
///
/// # Examples
///
/// ```
/// use routegen_codegen::python::python_literal;
/// use serde_json::json;
///
/// assert_eq!(python_literal(&json!(null)), "None");
/// assert_eq!(python_literal(&json!(true)), "True");
/// assert_eq!(python_literal(&json!(["a", 1])), "[\"a\", 1]");
/// assert_eq!(python_literal(&json!({"k": false})), "{\"k\": False}");
/// ```
#[must_use]
pub fn python_literal(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => python_string(s),
        Value::Array(items) => format!(
            "[{}]",
            items.iter().map(python_literal).collect::<Vec<_>>().join(", ")
        ),
        Value::Object(map) => format!(
            "{{{}}}",
            map.iter()
                .map(|(k, v)| format!("{}: {}", python_string(k), python_literal(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// Escapes text for use inside a triple-quoted docstring.
#[must_use]
pub fn docstring_text(text: &str) -> String {
    text.replace('\\', "\\\\").replace("\"\"\"", "\\\"\\\"\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_flattens_and_dedupes() {
        let ty = TypeExpr::union([
            TypeExpr::Int,
            TypeExpr::union([TypeExpr::Str, TypeExpr::Int]),
            TypeExpr::Str,
        ]);
        assert_eq!(ty, TypeExpr::Union(vec![TypeExpr::Int, TypeExpr::Str]));
        assert_eq!(TypeExpr::union([TypeExpr::Bool]), TypeExpr::Bool);
    }

    #[test]
    fn test_optional_of_any_is_any() {
        assert_eq!(TypeExpr::optional(TypeExpr::Any), TypeExpr::Any);
        let once = TypeExpr::optional(TypeExpr::Int);
        assert_eq!(TypeExpr::optional(once.clone()), once);
    }

    #[test]
    fn test_render_nested() {
        let ty = TypeExpr::union([
            TypeExpr::Data,
            TypeExpr::list(TypeExpr::Dict),
            TypeExpr::Literal(vec!["a".to_string(), "b".to_string()]),
        ]);
        assert_eq!(
            ty.render(),
            "Union[Data, List[Dict[str, Any]], Literal[\"a\", \"b\"]]"
        );
    }

    #[test]
    fn test_imports_only_what_is_referenced() {
        let mut imports = ImportSet::new();
        TypeExpr::list(TypeExpr::Model("CpiData".to_string())).collect_imports(
            &mut imports,
            "rt",
            "rt.models",
        );
        assert_eq!(
            imports.render(),
            vec!["from typing import List", "from rt.models import CpiData"]
        );
    }

    #[test]
    fn test_scalar_detection() {
        assert!(TypeExpr::union([TypeExpr::Int, TypeExpr::Date]).is_scalar());
        assert!(!TypeExpr::Dict.is_scalar());
        assert!(!TypeExpr::list(TypeExpr::Int).is_scalar());
    }

    #[test]
    fn test_import_conflicts() {
        let mut imports = ImportSet::new();
        imports.from("rt.data", "Data");
        imports.from("rt.models", "Data");
        imports.typing("Any");
        let conflicts = imports.conflicts();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].0, "Data");
    }

    #[test]
    fn test_aliased_module_import() {
        let mut imports = ImportSet::new();
        imports.module("datetime");
        imports.module_as("warnings", "_warnings");
        imports.typing("Any");
        assert_eq!(
            imports.render(),
            vec![
                "import datetime",
                "import warnings as _warnings",
                "from typing import Any",
            ]
        );
        assert!(
            imports
                .bound_names()
                .contains(&("_warnings".to_string(), "warnings".to_string()))
        );
        assert!(imports.conflicts().is_empty());
    }

    #[test]
    fn test_docstring_escaping() {
        assert_eq!(docstring_text(r"a\b"), r"a\\b");
        assert_eq!(docstring_text("say \"\"\"hi"), "say \\\"\\\"\\\"hi");
    }
}
