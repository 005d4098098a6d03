//! Python module emission.
//!
//! Every node of the route tree becomes one module holding one class. The
//! emitter first builds a small module representation ([`ModuleIr`]) and only
//! then renders it through the templates, so structural checks (name
//! collisions, import conflicts) run on data rather than on text.
//!
//! Navigators import nothing but `Container` at module level. Children are
//! imported inside the accessor bodies, so loading the root module never
//! loads a command module.

use crate::allocator::{Allocator, sanitize};
use crate::docstring::{Docstring, ENVELOPE_CLASS, NO_CONTENT_CLASS, Signature};
use crate::path_tree::{ModuleDescriptor, NodeKind, PathTree};
use crate::python::{ImportSet, python_string};
use crate::template_engine::TemplateEngine;
use crate::types::GeneratedFile;
use crate::unifier::{ParameterKind, UnifiedSchema};
use routegen_core::registry::Deprecation;
use routegen_core::{BuildConfig, Error, Identifier, Result, RoutePath};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// First line of every generated file.
pub const GENERATED_HEADER: &str = "### THIS FILE IS AUTO-GENERATED. DO NOT EDIT. ###";

/// File name of the package initializer.
pub const PACKAGE_INIT: &str = "__init__.py";

/// Attribute names the runtime `Container` base class uses itself.
const CONTAINER_ATTRIBUTES: &[&str] = &["_run", "_command_runner"];

/// Local name of the `warnings` module in deprecated command modules, so a
/// parameter called `warnings` cannot shadow it.
const WARNINGS_ALIAS: &str = "_warnings";

/// A lazily evaluated child accessor of a navigator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessorDef {
    /// Property name
    pub name: String,
    /// Child module identifier
    pub module: Identifier,
    /// Child class identifier
    pub class_name: Identifier,
    /// Bound method returned for leaf children
    pub method: Option<String>,
}

/// A command method together with everything its body needs.
#[derive(Debug, Clone)]
pub struct MethodDef {
    /// Route path forwarded to the runtime
    pub path: RoutePath,
    /// Signature of the method
    pub signature: Signature,
    /// Documentation of the method
    pub docstring: Docstring,
    /// Names of the concrete parameters, in signature order
    pub params: Vec<String>,
    /// Whether the signature has a `provider` parameter
    pub has_provider: bool,
    /// Deprecation notice, if any
    pub deprecation: Option<Deprecation>,
}

impl MethodDef {
    /// Builds a method from a unified schema and its generated documentation.
    #[must_use]
    pub fn new(
        schema: &UnifiedSchema,
        signature: Signature,
        docstring: Docstring,
        deprecation: Option<Deprecation>,
    ) -> Self {
        Self {
            path: schema.path.clone(),
            params: schema.concrete().map(|p| p.name.clone()).collect(),
            has_provider: schema
                .parameters
                .iter()
                .any(|p| p.kind == ParameterKind::Provider),
            signature,
            docstring,
            deprecation,
        }
    }
}

/// The class emitted into a module.
#[derive(Debug, Clone)]
pub struct ClassDef {
    /// Class identifier
    pub name: Identifier,
    /// Class docstring
    pub docstring: Docstring,
    /// Child accessors (navigators only)
    pub accessors: Vec<AccessorDef>,
    /// Command methods (leaves only)
    pub methods: Vec<MethodDef>,
}

/// One module ready to render.
#[derive(Debug, Clone)]
pub struct ModuleIr {
    /// Route path of the module
    pub path: RoutePath,
    /// Module identifier
    pub identifier: Identifier,
    /// Module-level imports
    pub imports: ImportSet,
    /// The single class of the module
    pub class: ClassDef,
}

impl ModuleIr {
    /// File name of the module inside the package.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.py", self.identifier)
    }
}

/// Renders route tree nodes into Python modules.
#[derive(Debug)]
pub struct CodeEmitter<'a> {
    engine: TemplateEngine<'a>,
    runtime_package: String,
    models_module: String,
    package_name: String,
}

impl CodeEmitter<'_> {
    /// Creates an emitter for the packages named in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Template`] if the built-in templates fail to load.
    pub fn new(config: &BuildConfig) -> Result<Self> {
        Ok(Self {
            engine: TemplateEngine::new()?,
            runtime_package: config.runtime_package.clone(),
            models_module: config.models_module.clone(),
            package_name: config.package_name.clone(),
        })
    }

    /// Rejects runtime or model modules that live inside the generated
    /// package: the emitted modules would import their own package.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Structural`] for each offending module.
    pub fn check_import_targets(&self) -> Result<()> {
        let errors: Vec<Error> = [&self.runtime_package, &self.models_module]
            .into_iter()
            .filter(|module| {
                *module == &self.package_name
                    || module.starts_with(&format!("{}.", self.package_name))
            })
            .map(|module| Error::Structural {
                path: RoutePath::root().to_string(),
                reason: format!(
                    "import cycle: generated modules would import '{module}' \
                     from the generated package '{}'",
                    self.package_name
                ),
            })
            .collect();
        Error::collect(errors).map_or(Ok(()), Err)
    }

    /// Builds the module representation of a namespace node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Structural`] if two children share an accessor name
    /// or a child name shadows a `Container` attribute.
    pub fn navigator_ir(
        &self,
        descriptor: &ModuleDescriptor,
        tree: &PathTree,
        allocator: &Allocator,
    ) -> Result<ModuleIr> {
        let mut accessors = Vec::with_capacity(descriptor.children.len());
        for child in &descriptor.children {
            let name = child.last_segment().map(sanitize).unwrap_or_default();
            accessors.push(AccessorDef {
                method: tree.is_leaf(child).then(|| name.clone()),
                name,
                module: allocator.allocate(child)?,
                class_name: allocator.allocate_class(child)?,
            });
        }
        check_member_names(&descriptor.path, accessors.iter().map(|a| a.name.as_str()))?;

        let mut imports = ImportSet::new();
        imports.from(format!("{}.container", self.runtime_package), "Container");

        Ok(ModuleIr {
            path: descriptor.path.clone(),
            identifier: descriptor.identifier.clone(),
            imports,
            class: ClassDef {
                name: allocator.allocate_class(&descriptor.path)?,
                docstring: class_docstring(
                    &descriptor.path,
                    accessors.iter().map(|a| a.name.as_str()),
                ),
                accessors,
                methods: Vec::new(),
            },
        })
    }

    /// Builds the module representation of a command node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Structural`] if the method name shadows a
    /// `Container` attribute or two imports bind the same name.
    pub fn command_ir(
        &self,
        descriptor: &ModuleDescriptor,
        allocator: &Allocator,
        method: MethodDef,
    ) -> Result<ModuleIr> {
        check_member_names(&descriptor.path, [method.signature.name.as_str()])?;

        let mut imports = ImportSet::new();
        imports.from(format!("{}.container", self.runtime_package), "Container");
        imports.from(format!("{}.validation", self.runtime_package), "validate");
        if method.deprecation.is_some() {
            imports.module_as("warnings", WARNINGS_ALIAS);
        }
        method
            .signature
            .collect_imports(&mut imports, &self.runtime_package, &self.models_module);

        let conflicts = imports.conflicts();
        if !conflicts.is_empty() {
            return Err(Error::Structural {
                path: descriptor.path.to_string(),
                reason: conflicts
                    .iter()
                    .map(|(name, modules)| {
                        format!("name '{name}' is imported from {}", modules.join(" and "))
                    })
                    .collect::<Vec<_>>()
                    .join("; "),
            });
        }

        Ok(ModuleIr {
            path: descriptor.path.clone(),
            identifier: descriptor.identifier.clone(),
            imports,
            class: ClassDef {
                name: allocator.allocate_class(&descriptor.path)?,
                docstring: class_docstring(&descriptor.path, [method.signature.name.as_str()]),
                accessors: Vec::new(),
                methods: vec![method],
            },
        })
    }

    /// Renders a module.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Template`] if rendering fails.
    pub fn render(&self, module: &ModuleIr) -> Result<GeneratedFile> {
        let mut members = String::new();
        for accessor in &module.class.accessors {
            let rendered = self.engine.render(
                "accessor",
                &AccessorContext {
                    name: &accessor.name,
                    module: accessor.module.as_str(),
                    class_name: accessor.class_name.as_str(),
                    member: accessor
                        .method
                        .as_ref()
                        .map(|m| format!(".{m}"))
                        .unwrap_or_default(),
                },
            )?;
            let _ = write!(members, "\n{}\n", rendered.trim_end());
        }
        for method in &module.class.methods {
            let rendered = self.engine.render(
                "command",
                &CommandContext {
                    signature: method.signature.render("    "),
                    docstring: method.docstring.render("        "),
                    deprecation: method
                        .deprecation
                        .as_ref()
                        .map(deprecation_call)
                        .unwrap_or_default(),
                    call: run_call(method),
                },
            )?;
            let _ = write!(members, "\n{}\n", rendered.trim_end());
        }

        let content = self.engine.render(
            "module",
            &ModuleContext {
                header: GENERATED_HEADER,
                imports: render_imports(&module.imports),
                class_name: module.class.name.as_str(),
                docstring: module.class.docstring.render("    "),
                members: members.trim_end().to_string(),
            },
        )?;

        tracing::debug!(path = %module.path, file = %module.file_name(), "Rendered module");
        Ok(GeneratedFile::new(module.file_name(), content))
    }

    /// Renders the package initializer, which exports only the root class.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Template`] if rendering fails.
    pub fn render_init(&self, allocator: &Allocator) -> Result<GeneratedFile> {
        let root = RoutePath::root();
        let module = allocator.allocate(&root)?;
        let class = allocator.allocate_class(&root)?;
        let content = self.engine.render(
            "init",
            &InitContext {
                header: GENERATED_HEADER,
                root_module: module.as_str(),
                root_class: class.as_str(),
            },
        )?;
        Ok(GeneratedFile::new(PACKAGE_INIT, content))
    }

    /// Builds and renders a namespace module.
    ///
    /// # Errors
    ///
    /// See [`CodeEmitter::navigator_ir`] and [`CodeEmitter::render`].
    pub fn emit_navigator(
        &self,
        descriptor: &ModuleDescriptor,
        tree: &PathTree,
        allocator: &Allocator,
    ) -> Result<GeneratedFile> {
        debug_assert_eq!(descriptor.kind, NodeKind::Namespace);
        self.render(&self.navigator_ir(descriptor, tree, allocator)?)
    }

    /// Builds and renders a command module.
    ///
    /// # Errors
    ///
    /// See [`CodeEmitter::command_ir`] and [`CodeEmitter::render`].
    pub fn emit_command(
        &self,
        descriptor: &ModuleDescriptor,
        allocator: &Allocator,
        method: MethodDef,
    ) -> Result<GeneratedFile> {
        debug_assert_eq!(descriptor.kind, NodeKind::Leaf);
        self.render(&self.command_ir(descriptor, allocator, method)?)
    }
}

#[derive(Serialize)]
struct ModuleContext<'a> {
    header: &'a str,
    imports: String,
    class_name: &'a str,
    docstring: String,
    members: String,
}

#[derive(Serialize)]
struct AccessorContext<'a> {
    name: &'a str,
    module: &'a str,
    class_name: &'a str,
    member: String,
}

#[derive(Serialize)]
struct CommandContext {
    signature: String,
    docstring: String,
    deprecation: String,
    call: String,
}

#[derive(Serialize)]
struct InitContext<'a> {
    header: &'a str,
    root_module: &'a str,
    root_class: &'a str,
}

fn check_member_names<'n>(
    path: &RoutePath,
    names: impl IntoIterator<Item = &'n str>,
) -> Result<()> {
    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
    for name in names {
        *seen.entry(name).or_default() += 1;
    }
    let errors: Vec<Error> = seen
        .into_iter()
        .filter_map(|(name, count)| {
            if count > 1 {
                Some(format!("{count} children share the member name '{name}'"))
            } else if CONTAINER_ATTRIBUTES.contains(&name) {
                Some(format!("member name '{name}' shadows a Container attribute"))
            } else if name.starts_with("__") {
                Some(format!(
                    "member name '{name}' starts with '__' and would be a dunder or a mangled name"
                ))
            } else {
                None
            }
        })
        .map(|reason| Error::Structural {
            path: path.to_string(),
            reason,
        })
        .collect();
    Error::collect(errors).map_or(Ok(()), Err)
}

fn class_docstring<'n>(path: &RoutePath, members: impl IntoIterator<Item = &'n str>) -> Docstring {
    let mut text = path.to_string();
    for member in members {
        text.push('\n');
        text.push_str(member);
    }
    text.push('\n');
    Docstring {
        text,
        warnings: Vec::new(),
    }
}

/// Standard-library imports first, then everything else, separated by a
/// blank line.
fn render_imports(imports: &ImportSet) -> String {
    let (stdlib, other): (Vec<String>, Vec<String>) = imports
        .render()
        .into_iter()
        .partition(|line| line.starts_with("import ") || line.starts_with("from typing "));
    [stdlib.join("\n"), other.join("\n")]
        .into_iter()
        .filter(|block| !block.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn deprecation_call(deprecation: &Deprecation) -> String {
    let message = python_string(&format!(
        "Deprecated since {}. {}",
        deprecation.since, deprecation.message
    ));
    format!(
        "        {WARNINGS_ALIAS}.warn(\n            {message},\n            \
         category=DeprecationWarning,\n            stacklevel=2,\n        )\n"
    )
}

fn run_call(method: &MethodDef) -> String {
    let mut call = String::from("result = self._run(\n");
    let _ = writeln!(call, "            {},", python_string(method.path.as_str()));
    if method.has_provider {
        call.push_str("            provider=provider,\n");
    }
    if method.params.is_empty() {
        call.push_str("            params={},\n");
    } else {
        call.push_str("            params={\n");
        for param in &method.params {
            let _ = writeln!(call, "                {}: {param},", python_string(param));
        }
        call.push_str("            },\n");
    }
    call.push_str("            extra=extra,\n        )\n");
    if method.signature.returns.is_no_content() {
        let _ = write!(call, "        return {NO_CONTENT_CLASS}()");
    } else {
        let _ = write!(call, "        return {ENVELOPE_CLASS}.from_raw(result)");
    }
    call
}
