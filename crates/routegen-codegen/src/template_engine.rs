//! Template engine for Python emission using Handlebars.
//!
//! Templates lay out the fixed skeleton of each file; structured pieces
//! (signatures, docstrings, import blocks) are rendered in Rust first and
//! passed in as plain strings. HTML escaping is disabled because the output
//! is source code.
//!
//! # Examples
//!
//! ```
//! use routegen_codegen::template_engine::TemplateEngine;
//! use serde_json::json;
//!
//! let engine = TemplateEngine::new().unwrap();
//! let init = engine
//!     .render(
//!         "init",
//!         &json!({"header": "# h", "root_module": "__extensions__", "root_class": "Extensions"}),
//!     )
//!     .unwrap();
//! assert!(init.contains("from .__extensions__ import Extensions"));
//! ```

use handlebars::Handlebars;
use routegen_core::{Error, Result};
use serde::Serialize;

const TEMPLATES: &[(&str, &str)] = &[
    ("module", include_str!("../templates/module.py.hbs")),
    ("accessor", include_str!("../templates/accessor.py.hbs")),
    ("command", include_str!("../templates/command.py.hbs")),
    ("init", include_str!("../templates/init.py.hbs")),
];

/// Template engine for code generation.
///
/// # Thread Safety
///
/// This type is `Send` and `Sync`, so one engine can serve every worker of a
/// parallel build.
#[derive(Debug)]
pub struct TemplateEngine<'a> {
    handlebars: Handlebars<'a>,
}

impl TemplateEngine<'_> {
    /// Creates a new template engine with the built-in templates registered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Template`] if a built-in template fails to parse.
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();

        // Strict mode: fail on missing variables
        handlebars.set_strict_mode(true);
        handlebars.register_escape_fn(handlebars::no_escape);

        for (name, source) in TEMPLATES {
            handlebars
                .register_template_string(name, *source)
                .map_err(|e| Error::Template {
                    message: format!("Failed to register {name} template: {e}"),
                })?;
        }

        Ok(Self { handlebars })
    }

    /// Renders a template with the given context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Template`] if the template is unknown, a variable is
    /// missing from the context, or rendering fails.
    pub fn render<T: Serialize>(&self, template_name: &str, context: &T) -> Result<String> {
        self.handlebars
            .render(template_name, context)
            .map_err(|e| Error::Template {
                message: format!("Template rendering failed: {e}"),
            })
    }

    /// Registers an additional template, replacing any with the same name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Template`] if the template string is invalid.
    pub fn register_template_string(&mut self, name: &str, template: &str) -> Result<()> {
        self.handlebars
            .register_template_string(name, template)
            .map_err(|e| Error::Template {
                message: format!("Failed to register template '{name}': {e}"),
            })
    }

    /// Returns `true` if a template is registered under `name`.
    #[must_use]
    pub fn has_template(&self, name: &str) -> bool {
        self.handlebars.has_template(name)
    }
}
