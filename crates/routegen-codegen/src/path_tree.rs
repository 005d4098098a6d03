//! Route hierarchy.
//!
//! [`PathTree`] turns the flat set of registered paths into a tree. Every
//! strict prefix of a registered path becomes a namespace node, the root is
//! always present, and a node is a leaf exactly when a command is bound to it.
//!
//! # Examples
//!
//! ```
//! use routegen_codegen::path_tree::{NodeKind, PathTree};
//! use routegen_core::RoutePath;
//! use std::collections::BTreeSet;
//!
//! let cpi = RoutePath::parse("/econ/cpi").unwrap();
//! let leaves = BTreeSet::from([cpi.clone()]);
//! let tree = PathTree::build([cpi.clone()], &leaves);
//!
//! let econ = RoutePath::parse("/econ").unwrap();
//! assert_eq!(tree.kind(&econ), Some(NodeKind::Namespace));
//! assert_eq!(tree.children_of(&econ).collect::<Vec<_>>(), vec![&cpi]);
//! assert!(tree.structural_errors().is_empty());
//! ```

use routegen_core::{Error, Identifier, RoutePath, RouteRegistry};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Role of a node in the route tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Pure namespace; emitted as a navigator
    Namespace,
    /// Bound command; emitted as a callable
    Leaf,
}

#[derive(Debug, Clone)]
struct TreeNode {
    kind: NodeKind,
    children: BTreeSet<RoutePath>,
}

impl TreeNode {
    const fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: BTreeSet::new(),
        }
    }
}

/// The route hierarchy with synthesized ancestors.
#[derive(Debug, Clone)]
pub struct PathTree {
    nodes: BTreeMap<RoutePath, TreeNode>,
}

impl PathTree {
    /// Builds the tree from route paths and the subset bound to commands.
    ///
    /// Leaves missing from `paths` are added. Paths are already validated by
    /// [`RoutePath::parse`], so building never fails; structural problems
    /// are reported by [`PathTree::structural_errors`].
    pub fn build(
        paths: impl IntoIterator<Item = RoutePath>,
        leaves: &BTreeSet<RoutePath>,
    ) -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(RoutePath::root(), TreeNode::new(NodeKind::Namespace));

        for path in paths.into_iter().chain(leaves.iter().cloned()) {
            if path.is_root() {
                continue;
            }
            let kind = if leaves.contains(&path) {
                NodeKind::Leaf
            } else {
                NodeKind::Namespace
            };
            nodes
                .entry(path.clone())
                .or_insert_with(|| TreeNode::new(kind));

            let mut child = path;
            while let Some(parent) = child.parent() {
                let node = nodes
                    .entry(parent.clone())
                    .or_insert_with(|| TreeNode::new(NodeKind::Namespace));
                node.children.insert(child);
                child = parent;
            }
        }

        Self { nodes }
    }

    /// Builds the tree from a registry: every listed path is a node, and
    /// paths with a registration are leaves.
    pub fn from_registry<R: RouteRegistry + ?Sized>(registry: &R) -> Self {
        let paths = registry.list_paths();
        let leaves: BTreeSet<_> = paths
            .iter()
            .filter(|p| !p.is_root() && registry.get_registration(p).is_some())
            .cloned()
            .collect();
        Self::build(paths, &leaves)
    }

    /// Kind of the node at `path`, or `None` if absent.
    #[must_use]
    pub fn kind(&self, path: &RoutePath) -> Option<NodeKind> {
        self.nodes.get(path).map(|n| n.kind)
    }

    /// Returns `true` if `path` is a node of the tree.
    #[must_use]
    pub fn contains(&self, path: &RoutePath) -> bool {
        self.nodes.contains_key(path)
    }

    /// Returns `true` if `path` is a leaf.
    #[must_use]
    pub fn is_leaf(&self, path: &RoutePath) -> bool {
        self.kind(path) == Some(NodeKind::Leaf)
    }

    /// Direct children of `path`, ordered lexicographically by full path.
    pub fn children_of(&self, path: &RoutePath) -> impl Iterator<Item = &RoutePath> {
        self.nodes
            .get(path)
            .into_iter()
            .flat_map(|n| n.children.iter())
    }

    /// All nodes including the root, in path order.
    pub fn paths(&self) -> impl Iterator<Item = &RoutePath> {
        self.nodes.keys()
    }

    /// All leaves, in path order.
    pub fn leaves(&self) -> impl Iterator<Item = &RoutePath> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.kind == NodeKind::Leaf)
            .map(|(p, _)| p)
    }

    /// Number of nodes, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the tree holds only the root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Every structural problem in the tree.
    ///
    /// A non-root namespace without children is dangling, and a leaf with
    /// children cannot be both a callable and a navigator.
    #[must_use]
    pub fn structural_errors(&self) -> Vec<Error> {
        self.nodes
            .iter()
            .filter(|(path, _)| !path.is_root())
            .filter_map(|(path, node)| match node.kind {
                NodeKind::Namespace if node.children.is_empty() => Some(Error::Structural {
                    path: path.to_string(),
                    reason: "namespace has neither a command nor child routes".to_string(),
                }),
                NodeKind::Leaf if !node.children.is_empty() => Some(Error::Structural {
                    path: path.to_string(),
                    reason: format!(
                        "command route also has child routes ({})",
                        node.children
                            .iter()
                            .map(RoutePath::as_str)
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                }),
                _ => None,
            })
            .collect()
    }

    /// Describes every node with its allocated identifier.
    ///
    /// `identify` must return the module identifier for any node in the tree.
    ///
    /// # Errors
    ///
    /// Propagates the first error returned by `identify`.
    pub fn descriptors<F>(&self, mut identify: F) -> routegen_core::Result<Vec<ModuleDescriptor>>
    where
        F: FnMut(&RoutePath) -> routegen_core::Result<Identifier>,
    {
        self.nodes
            .iter()
            .map(|(path, node)| {
                Ok(ModuleDescriptor {
                    path: path.clone(),
                    identifier: identify(path)?,
                    children: node.children.iter().cloned().collect(),
                    kind: node.kind,
                })
            })
            .collect()
    }
}

/// Everything the emitter needs to know about one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleDescriptor {
    /// Route path of the node
    pub path: RoutePath,
    /// Module identifier
    pub identifier: Identifier,
    /// Direct children in path order
    pub children: Vec<RoutePath>,
    /// Leaf or namespace
    pub kind: NodeKind,
}

impl ModuleDescriptor {
    /// Returns `true` for leaf nodes.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.kind == NodeKind::Leaf
    }
}
