//! Tree command implementation.
//!
//! Prints the route hierarchy of the registry with the module identifier each
//! node is emitted as. Namespaces end in `/`, commands in `()`.

use super::common::{ConfigArgs, load_registry};
use anyhow::Result;
use colored::Colorize;
use routegen_codegen::{Allocator, NodeKind, PathTree};
use routegen_core::cli::{ExitCode, OutputFormat};
use serde::Serialize;
use tracing::warn;

/// One node of the printed tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeEntry {
    /// Route path
    pub path: String,
    /// Namespace or command
    pub kind: NodeKind,
    /// Module identifier
    pub identifier: String,
    /// Distance from the root
    pub depth: usize,
}

/// The whole tree, in path order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeView {
    /// Nodes, root first
    pub nodes: Vec<TreeEntry>,
    /// Structural problems found while building the tree
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub problems: Vec<String>,
}

impl TreeView {
    /// Builds the view of a route tree.
    ///
    /// # Errors
    ///
    /// Returns an error if identifiers cannot be allocated.
    pub fn new(tree: &PathTree) -> Result<Self> {
        let allocator = Allocator::new(tree.paths())?;
        let nodes = tree
            .paths()
            .map(|path| {
                Ok(TreeEntry {
                    path: path.to_string(),
                    kind: tree.kind(path).unwrap_or(NodeKind::Namespace),
                    identifier: allocator.allocate(path)?.to_string(),
                    depth: path.depth(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let problems = tree.structural_errors().iter().map(ToString::to_string).collect();
        Ok(Self { nodes, problems })
    }

    /// Renders the view as an indented outline.
    #[must_use]
    pub fn render(&self, colored_output: bool) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            let indent = "  ".repeat(node.depth);
            let name = if node.depth == 0 {
                "/".to_string()
            } else {
                let segment = node.path.rsplit('/').next().unwrap_or_default();
                match node.kind {
                    NodeKind::Namespace => format!("{segment}/"),
                    NodeKind::Leaf => format!("{segment}()"),
                }
            };

            if colored_output {
                let name = match node.kind {
                    NodeKind::Namespace => name.blue().bold().to_string(),
                    NodeKind::Leaf => name.green().to_string(),
                };
                out.push_str(&format!("{indent}{name}  {}\n", node.identifier.dimmed()));
            } else {
                out.push_str(&format!("{indent}{name}  {}\n", node.identifier));
            }
        }
        for problem in &self.problems {
            out.push_str(&format!("! {problem}\n"));
        }
        out
    }
}

/// Runs the tree command.
///
/// # Errors
///
/// Returns an error if configuration or registry cannot be loaded.
pub fn run(config: ConfigArgs, output_format: OutputFormat) -> Result<ExitCode> {
    let config = config.resolve()?;
    let registry = load_registry(&config)?;
    let view = TreeView::new(&PathTree::from_registry(&registry))?;

    for problem in &view.problems {
        warn!("{problem}");
    }

    match output_format {
        OutputFormat::Json => {
            println!("{}", crate::formatters::format_output(&view, output_format)?);
        }
        OutputFormat::Text => print!("{}", view.render(false)),
        OutputFormat::Pretty => print!("{}", view.render(true)),
    }
    Ok(ExitCode::SUCCESS)
}
