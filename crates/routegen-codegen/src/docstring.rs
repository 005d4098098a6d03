//! Signatures and documentation of command methods.
//!
//! [`generate`] turns a unified schema into the method [`Signature`] and its
//! numpy-style [`Docstring`]. Both are plain data; the emitter decides where
//! they land in the module.

use crate::allocator::sanitize;
use crate::python::{ImportSet, TypeExpr, docstring_text, python_literal};
use crate::unifier::{ParameterKind, UnifiedSchema, base_type};
use routegen_core::registry::{Deprecation, UsageExample};
use routegen_core::schema::{Field, ProviderSchemaSet};
use routegen_core::{ProviderName, RouteRegistration};
use std::collections::BTreeSet;
use std::fmt::Write as _;

/// Name of the command result envelope class.
pub const ENVELOPE_CLASS: &str = "CommandResult";

/// Name of the empty result class.
pub const NO_CONTENT_CLASS: &str = "NoContent";

/// Variable name used for the root object in docstring examples.
pub const EXAMPLE_ROOT: &str = "ext";

/// Envelope attributes documented under `Returns`.
const ENVELOPE_FIELDS: &[(&str, &str, &str)] = &[
    ("results", "List[{model}]", "Result rows."),
    ("provider", "Optional[str]", "Provider that served the request."),
    ("warnings", "Optional[List[str]]", "Warnings raised while running the command."),
    ("chart", "Optional[Any]", "Chart artifact, if one was produced."),
    ("extra", "Dict[str, Any]", "Extra metadata attached to the result."),
];

/// How a signature parameter is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamStyle {
    /// `name: T` or `name: T = default`
    Named,
    /// `**name: T`
    VarKeyword,
}

/// One parameter of a generated method.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureParam {
    /// Parameter name
    pub name: String,
    /// Annotation
    pub ty: TypeExpr,
    /// Rendered default; `None` for required parameters
    pub default: Option<String>,
    /// Named or variadic
    pub style: ParamStyle,
}

impl SignatureParam {
    fn render(&self) -> String {
        match (self.style, &self.default) {
            (ParamStyle::VarKeyword, _) => format!("**{}: {}", self.name, self.ty.render()),
            (ParamStyle::Named, Some(default)) => {
                format!("{}: {} = {default}", self.name, self.ty.render())
            }
            (ParamStyle::Named, None) => format!("{}: {}", self.name, self.ty.render()),
        }
    }
}

/// Return annotation of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnType {
    /// The command returns nothing
    NoContent,
    /// `CommandResult[List[<model>]]`
    Envelope(String),
}

impl ReturnType {
    /// Renders the annotation.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::NoContent => NO_CONTENT_CLASS.to_string(),
            Self::Envelope(model) => format!("{ENVELOPE_CLASS}[List[{model}]]"),
        }
    }

    /// Returns `true` for [`ReturnType::NoContent`].
    #[must_use]
    pub const fn is_no_content(&self) -> bool {
        matches!(self, Self::NoContent)
    }
}

/// Signature of a generated command method.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    /// Method name
    pub name: String,
    /// Parameters after `self`, in order
    pub params: Vec<SignatureParam>,
    /// Index of the first keyword-only parameter, if a `*` marker is needed
    pub keyword_only_from: Option<usize>,
    /// Return annotation
    pub returns: ReturnType,
}

impl Signature {
    /// Builds the signature of a command from its unified schema.
    ///
    /// A required parameter that follows an optional one cannot be written
    /// positionally in Python, so from that point on the parameters are made
    /// keyword-only with a bare `*`.
    ///
    /// # Examples
    ///
    /// ```
    /// use routegen_codegen::docstring::Signature;
    /// use routegen_codegen::unifier::Unifier;
    /// use routegen_core::schema::{Field, FieldType};
    /// use routegen_core::RoutePath;
    ///
    /// let schema = Unifier::new("standard")
    ///     .unify_inline(
    ///         &RoutePath::parse("/a").unwrap(),
    ///         &[Field::new("x", FieldType::Int), Field::new("y", FieldType::Int).required()],
    ///     )
    ///     .unwrap();
    ///
    /// let signature = Signature::from_schema("a", &schema, None);
    /// assert_eq!(signature.keyword_only_from, Some(1));
    /// assert!(signature.render("").contains("    *,\n    y: int,\n"));
    /// ```
    #[must_use]
    pub fn from_schema(name: &str, schema: &UnifiedSchema, result_model: Option<&str>) -> Self {
        let params: Vec<SignatureParam> = schema
            .parameters
            .iter()
            .map(|p| SignatureParam {
                name: p.name.clone(),
                ty: p.ty.clone(),
                default: match (p.kind, p.required) {
                    (ParameterKind::Extra, _) | (_, true) => None,
                    _ => Some(
                        p.default
                            .as_ref()
                            .map_or_else(|| "None".to_string(), python_literal),
                    ),
                },
                style: if p.kind == ParameterKind::Extra {
                    ParamStyle::VarKeyword
                } else {
                    ParamStyle::Named
                },
            })
            .collect();

        let first_optional = params
            .iter()
            .position(|p| p.style == ParamStyle::Named && p.default.is_some());
        let keyword_only_from = first_optional.and_then(|start| {
            params
                .iter()
                .enumerate()
                .skip(start)
                .find(|(_, p)| p.style == ParamStyle::Named && p.default.is_none())
                .map(|(i, _)| i)
        });

        Self {
            name: name.to_string(),
            params,
            keyword_only_from,
            returns: result_model.map_or(ReturnType::NoContent, |m| {
                ReturnType::Envelope(m.to_string())
            }),
        }
    }

    /// Renders the `def` line block, one parameter per line, with every line
    /// prefixed by `indent`.
    #[must_use]
    pub fn render(&self, indent: &str) -> String {
        let mut out = format!("{indent}def {}(\n{indent}    self,\n", self.name);
        for (i, param) in self.params.iter().enumerate() {
            if self.keyword_only_from == Some(i) {
                let _ = writeln!(out, "{indent}    *,");
            }
            let _ = writeln!(out, "{indent}    {},", param.render());
        }
        let _ = write!(out, "{indent}) -> {}:", self.returns.render());
        out
    }

    /// Adds every import the signature needs.
    pub fn collect_imports(
        &self,
        imports: &mut ImportSet,
        runtime_package: &str,
        models_module: &str,
    ) {
        for param in &self.params {
            param.ty.collect_imports(imports, runtime_package, models_module);
        }
        match &self.returns {
            ReturnType::NoContent => {
                imports.from(format!("{runtime_package}.envelope"), NO_CONTENT_CLASS);
            }
            ReturnType::Envelope(model) => {
                imports.from(format!("{runtime_package}.envelope"), ENVELOPE_CLASS);
                TypeExpr::list(TypeExpr::Model(model.clone())).collect_imports(
                    imports,
                    runtime_package,
                    models_module,
                );
            }
        }
    }
}

/// Generated documentation of one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Docstring {
    /// Unescaped, unindented text
    pub text: String,
    /// Soft warnings raised while documenting
    pub warnings: Vec<String>,
}

impl Docstring {
    /// Renders the docstring as a triple-quoted literal indented by `indent`.
    ///
    /// # Examples
    ///
    /// ```
    /// use routegen_codegen::docstring::Docstring;
    ///
    /// let doc = Docstring { text: "Summary.\n\nMore.".to_string(), warnings: vec![] };
    /// assert_eq!(doc.render("    "), "    \"\"\"Summary.\n\n    More.\n    \"\"\"");
    /// ```
    #[must_use]
    pub fn render(&self, indent: &str) -> String {
        let text = docstring_text(&self.text);
        let mut out = format!("{indent}\"\"\"");
        for (i, line) in text.lines().enumerate() {
            if i > 0 {
                out.push('\n');
                if !line.is_empty() {
                    out.push_str(indent);
                }
            }
            out.push_str(line);
        }
        if text.lines().count() > 1 {
            let _ = write!(out, "\n{indent}\"\"\"");
        } else {
            out.push_str("\"\"\"");
        }
        out
    }
}

/// Generates the signature and docstring of a command.
///
/// `provider_schemas` is the model's schema set, or `None` for commands with
/// inline parameters.
#[must_use]
pub fn generate(
    registration: &RouteRegistration,
    schema: &UnifiedSchema,
    provider_schemas: Option<&ProviderSchemaSet>,
) -> (Signature, Docstring) {
    let method = registration
        .path
        .last_segment()
        .map_or_else(|| "__call__".to_string(), sanitize);
    let signature = Signature::from_schema(&method, schema, registration.result_model.as_deref());

    let mut writer = DocWriter::default();
    writer.summary(&registration.summary);
    if let Some(deprecation) = &registration.deprecated {
        writer.deprecation(deprecation);
    }
    writer.parameters(schema);
    if let Some(set) = provider_schemas {
        writer.provider_parameters(schema, set);
    }
    writer.returns(&signature.returns);
    if let (Some(model), Some(set)) = (registration.result_model.as_deref(), provider_schemas) {
        writer.result_model(model, schema, set);
    }
    writer.examples(registration, &signature);

    (
        signature,
        Docstring {
            text: writer.out.trim_end().to_string(),
            warnings: writer.warnings,
        },
    )
}

#[derive(Default)]
struct DocWriter {
    out: String,
    warnings: Vec<String>,
}

impl DocWriter {
    fn summary(&mut self, summary: &str) {
        let summary = summary.trim();
        self.out
            .push_str(if summary.is_empty() { "Run the command." } else { summary });
        self.out.push('\n');
    }

    fn heading(&mut self, title: &str) {
        let _ = write!(self.out, "\n{title}\n{}\n", "-".repeat(title.chars().count()));
    }

    fn entry(&mut self, name: &str, ty: &str, description: &str) {
        let _ = writeln!(self.out, "{name} : {ty}");
        for line in description.lines().map(str::trim_end).filter(|l| !l.is_empty()) {
            let _ = writeln!(self.out, "    {line}");
        }
    }

    fn deprecation(&mut self, deprecation: &Deprecation) {
        let _ = writeln!(self.out, "\n.. deprecated:: {}", deprecation.since);
        for line in deprecation.message.lines() {
            let _ = writeln!(self.out, "    {line}");
        }
    }

    fn parameters(&mut self, schema: &UnifiedSchema) {
        let documented: Vec<_> = schema
            .parameters
            .iter()
            .filter(|p| p.kind != ParameterKind::Extra)
            .collect();
        if documented.is_empty() {
            return;
        }
        self.heading("Parameters");
        for param in documented {
            self.entry(&param.name, &param.ty.render(), &param.description);
        }
    }

    fn provider_parameters(&mut self, schema: &UnifiedSchema, set: &ProviderSchemaSet) {
        let generic: BTreeSet<&str> = set
            .get(&schema.generic_provider)
            .map(|s| s.query.iter().map(|f| f.name.as_str()).collect())
            .unwrap_or_default();

        for provider in schema.selectable_providers() {
            let Some(provider_schema) = set.get(provider) else {
                continue;
            };
            self.heading(&format!("Parameters ({provider})"));
            if provider_schema.query.is_empty() {
                self.warnings.push(format!(
                    "provider '{provider}' of {} declares no query fields",
                    schema.model_name.as_deref().unwrap_or(schema.path.as_str())
                ));
            }
            let own: Vec<&Field> = provider_schema
                .query
                .iter()
                .filter(|f| !generic.contains(f.name.as_str()))
                .collect();
            if own.is_empty() {
                self.out.push_str("All fields are standardized.\n");
                continue;
            }
            for field in own {
                self.entry(&field.name, &base_type(field).render(), &field.description);
            }
        }
    }

    fn returns(&mut self, returns: &ReturnType) {
        self.heading("Returns");
        match returns {
            ReturnType::NoContent => {
                let _ = writeln!(
                    self.out,
                    "{NO_CONTENT_CLASS}\n    The command returns no content."
                );
            }
            ReturnType::Envelope(model) => {
                let _ = writeln!(self.out, "{ENVELOPE_CLASS}");
                for (name, ty, description) in ENVELOPE_FIELDS {
                    let _ = writeln!(
                        self.out,
                        "    {name} : {}\n        {description}",
                        ty.replace("{model}", model)
                    );
                }
            }
        }
    }

    fn result_model(&mut self, model: &str, schema: &UnifiedSchema, set: &ProviderSchemaSet) {
        let Some(default) = default_provider(schema) else {
            return;
        };
        let Some(default_schema) = set.get(default) else {
            return;
        };
        let known: BTreeSet<&str> = default_schema.result.iter().map(|f| f.name.as_str()).collect();

        self.heading(model);
        if default_schema.result.is_empty() {
            self.out.push_str("No fields documented.\n");
        }
        for field in &default_schema.result {
            self.entry(&field.name, &base_type(field).render(), &field.description);
        }

        for provider in schema.providers.iter().filter(|p| *p != default) {
            let Some(provider_schema) = set.get(provider) else {
                continue;
            };
            let additional: Vec<&Field> = provider_schema
                .result
                .iter()
                .filter(|f| !known.contains(f.name.as_str()))
                .collect();
            if additional.is_empty() {
                continue;
            }
            self.heading(&format!("{model} ({provider})"));
            for field in additional {
                self.entry(&field.name, &base_type(field).render(), &field.description);
            }
        }
    }

    fn examples(&mut self, registration: &RouteRegistration, signature: &Signature) {
        if registration.examples.is_empty() {
            return;
        }
        self.heading("Examples");
        let accessor = std::iter::once(EXAMPLE_ROOT.to_string())
            .chain(registration.path.segments().map(sanitize))
            .collect::<Vec<_>>()
            .join(".");
        for example in &registration.examples {
            if let Some(description) = &example.description {
                let _ = writeln!(self.out, ">>> # {}", description.trim());
            }
            let _ = writeln!(self.out, ">>> {accessor}({})", example_arguments(example, signature));
        }
    }
}

/// Provider whose result fields document the model: the generic provider if
/// the model has one, else the first provider.
fn default_provider(schema: &UnifiedSchema) -> Option<&ProviderName> {
    schema
        .providers
        .iter()
        .find(|p| **p == schema.generic_provider)
        .or_else(|| schema.providers.first())
}

/// Example arguments in signature order, then any others sorted by name.
fn example_arguments(example: &UsageExample, signature: &Signature) -> String {
    let mut args: Vec<String> = signature
        .params
        .iter()
        .filter_map(|p| {
            example
                .parameters
                .get(&p.name)
                .map(|v| format!("{}={}", p.name, python_literal(v)))
        })
        .collect();
    let known: BTreeSet<&str> = signature.params.iter().map(|p| p.name.as_str()).collect();
    args.extend(
        example
            .parameters
            .iter()
            .filter(|(name, _)| !known.contains(name.as_str()))
            .map(|(name, value)| format!("{name}={}", python_literal(value))),
    );
    args.join(", ")
}
