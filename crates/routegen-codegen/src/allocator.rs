//! Identifier allocation and the module map.
//!
//! Every non-root path is sanitized into a module identifier: the leading
//! slash is dropped, separators and hyphens become underscores, a leading
//! digit gets a `_` prefix and a reserved word gets a `_` suffix. Paths whose
//! sanitized forms collide (or that collide with a reserved module name) all
//! receive a suffix derived from a BLAKE3 hash of the full path, so the result
//! depends only on the set of paths and never on iteration order.
//!
//! # Examples
//!
//! ```
//! use routegen_codegen::allocator::Allocator;
//! use routegen_core::RoutePath;
//!
//! let a = RoutePath::parse("/equity/price").unwrap();
//! let b = RoutePath::parse("/equity-price").unwrap();
//! let allocator = Allocator::new([&a, &b]).unwrap();
//!
//! let ia = allocator.allocate(&a).unwrap();
//! let ib = allocator.allocate(&b).unwrap();
//! assert_ne!(ia, ib);
//! assert!(ia.as_str().starts_with("equity_price_"));
//!
//! let class = allocator.allocate_class(&RoutePath::root()).unwrap();
//! assert_eq!(class.as_str(), "Extensions");
//! ```

use routegen_core::{Error, Identifier, RESERVED_WORDS, Result, RoutePath};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Module identifier of the root navigator.
pub const ROOT_MODULE: &str = "__extensions__";

/// Class identifier of the root navigator.
pub const ROOT_CLASS: &str = "Extensions";

/// Prefix that separates class identifiers from module identifiers.
pub const CLASS_PREFIX: &str = "CLASS_";

/// Module names the package already uses for its own files.
const RESERVED_MODULES: &[&str] = &[ROOT_MODULE, "__init__", "__main__"];

/// Hex digits of the collision suffix.
const HASH_SUFFIX_LEN: usize = 8;

/// Sanitizes a path (or a single segment) into an identifier candidate.
///
/// # Examples
///
/// ```
/// use routegen_codegen::allocator::sanitize;
///
/// assert_eq!(sanitize("/equity/price-target"), "equity_price_target");
/// assert_eq!(sanitize("/3m"), "_3m");
/// assert_eq!(sanitize("class"), "class_");
/// ```
#[must_use]
pub fn sanitize(raw: &str) -> String {
    let mut out: String = raw
        .trim_start_matches('/')
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    if RESERVED_WORDS.contains(&out.as_str()) {
        out.push('_');
    }
    out
}

fn hash_suffix(path: &RoutePath) -> String {
    let hash = blake3::hash(path.as_str().as_bytes()).to_hex();
    hash.as_str()[..HASH_SUFFIX_LEN].to_string()
}

/// Maps every path of one build to its module identifier.
///
/// Allocation happens once, up front, over the complete path set; lookups
/// never mutate the allocator.
#[derive(Debug, Clone)]
pub struct Allocator {
    modules: BTreeMap<RoutePath, Identifier>,
}

impl Allocator {
    /// Allocates identifiers for a complete path set.
    ///
    /// The root may be included or not; it always maps to [`ROOT_MODULE`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Structural`] (batched in [`Error::Multiple`]) for any
    /// identifier that is still illegal or still colliding after hashing.
    pub fn new<'a>(paths: impl IntoIterator<Item = &'a RoutePath>) -> Result<Self> {
        let paths: BTreeSet<&RoutePath> = paths.into_iter().filter(|p| !p.is_root()).collect();

        let mut groups: BTreeMap<String, Vec<&RoutePath>> = BTreeMap::new();
        for &path in &paths {
            groups.entry(sanitize(path.as_str())).or_default().push(path);
        }

        let mut candidates: BTreeMap<&RoutePath, String> = BTreeMap::new();
        for (base, members) in groups {
            let needs_suffix = members.len() > 1 || RESERVED_MODULES.contains(&base.as_str());
            for path in members {
                let name = if needs_suffix {
                    format!("{base}_{}", hash_suffix(path))
                } else {
                    base.clone()
                };
                candidates.insert(path, name);
            }
        }

        let mut owners: BTreeMap<&str, &RoutePath> = BTreeMap::new();
        let mut errors = Vec::new();
        for (path, name) in &candidates {
            if let Some(other) = owners.insert(name.as_str(), *path) {
                errors.push(Error::Structural {
                    path: path.to_string(),
                    reason: format!("identifier '{name}' is also allocated to '{other}'"),
                });
            }
        }

        let mut modules = BTreeMap::new();
        modules.insert(RoutePath::root(), Identifier::new(ROOT_MODULE)?);
        for (path, name) in candidates {
            let class_ok = Identifier::new(format!("{CLASS_PREFIX}{name}")).is_ok();
            match Identifier::new(name) {
                Ok(ident) if class_ok => {
                    modules.insert(path.clone(), ident);
                }
                _ => errors.push(Error::Structural {
                    path: path.to_string(),
                    reason: "path cannot be turned into a legal identifier".to_string(),
                }),
            }
        }

        match Error::collect(errors) {
            Some(error) => Err(error),
            None => Ok(Self { modules }),
        }
    }

    /// Module identifier of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Structural`] if `path` was not part of the allocated set.
    pub fn allocate(&self, path: &RoutePath) -> Result<Identifier> {
        self.modules
            .get(path)
            .cloned()
            .ok_or_else(|| Error::Structural {
                path: path.to_string(),
                reason: "path has no allocated identifier".to_string(),
            })
    }

    /// Class identifier of `path`.
    ///
    /// # Errors
    ///
    /// See [`Allocator::allocate`].
    pub fn allocate_class(&self, path: &RoutePath) -> Result<Identifier> {
        if path.is_root() {
            return Identifier::new(ROOT_CLASS);
        }
        let module = self.allocate(path)?;
        Identifier::new(format!("{CLASS_PREFIX}{module}"))
    }

    /// The identifier to path index for every non-root path.
    #[must_use]
    pub fn module_map(&self) -> ModuleMap {
        ModuleMap {
            entries: self
                .modules
                .iter()
                .filter(|(path, _)| !path.is_root())
                .map(|(path, ident)| (ident.clone(), path.clone()))
                .collect(),
        }
    }
}

/// Identifier to path index persisted as `module_map.json`.
///
/// # Examples
///
/// ```
/// use routegen_codegen::allocator::{Allocator, ModuleMap};
/// use routegen_core::RoutePath;
///
/// let cpi = RoutePath::parse("/econ/cpi").unwrap();
/// let econ = RoutePath::parse("/econ").unwrap();
/// let map = Allocator::new([&econ, &cpi]).unwrap().module_map();
///
/// let json = map.to_json_string().unwrap();
/// assert!(json.ends_with("}\n"));
/// assert_eq!(ModuleMap::from_json_str(&json).unwrap(), map);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleMap {
    entries: BTreeMap<Identifier, RoutePath>,
}

impl ModuleMap {
    /// Path of a module identifier.
    #[must_use]
    pub fn get(&self, identifier: &Identifier) -> Option<&RoutePath> {
        self.entries.get(identifier)
    }

    /// Returns `true` if the identifier is mapped.
    #[must_use]
    pub fn contains(&self, identifier: &Identifier) -> bool {
        self.entries.contains_key(identifier)
    }

    /// Iterates over `(identifier, path)` pairs in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&Identifier, &RoutePath)> {
        self.entries.iter()
    }

    /// Iterates over identifiers in sorted order.
    pub fn identifiers(&self) -> impl Iterator<Item = &Identifier> {
        self.entries.keys()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes as pretty JSON with sorted keys and a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if serialization fails.
    pub fn to_json_string(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Parses a previously written module map.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if the document is not a valid map.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(raw: &str) -> RoutePath {
        RoutePath::parse(raw).unwrap()
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("/econ/cpi"), "econ_cpi");
        assert_eq!(sanitize("/equity-price"), "equity_price");
        assert_eq!(sanitize("/1d/bars"), "_1d_bars");
        assert_eq!(sanitize("/import"), "import_");
        assert_eq!(sanitize("/"), "_");
    }

    #[test]
    fn test_plain_paths_keep_sanitized_name() {
        let econ = path("/econ");
        let cpi = path("/econ/cpi");
        let allocator = Allocator::new([&econ, &cpi]).unwrap();
        assert_eq!(allocator.allocate(&econ).unwrap().as_str(), "econ");
        assert_eq!(allocator.allocate(&cpi).unwrap().as_str(), "econ_cpi");
        assert_eq!(
            allocator.allocate_class(&cpi).unwrap().as_str(),
            "CLASS_econ_cpi"
        );
    }

    #[test]
    fn test_root_is_reserved() {
        let allocator = Allocator::new(std::iter::empty()).unwrap();
        assert_eq!(
            allocator.allocate(&RoutePath::root()).unwrap().as_str(),
            ROOT_MODULE
        );
        assert!(allocator.module_map().is_empty());
    }

    #[test]
    fn test_collision_suffixes_every_member() {
        let a = path("/equity/price");
        let b = path("/equity-price");
        let c = path("/equity_price");
        let allocator = Allocator::new([&a, &b, &c]).unwrap();
        let ids: BTreeSet<_> = [&a, &b, &c]
            .iter()
            .map(|p| allocator.allocate(p).unwrap())
            .collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.iter().all(|i| i.as_str().len() == "equity_price_".len() + 8));
    }

    #[test]
    fn test_reserved_module_names_are_suffixed() {
        let init = path("/__init__");
        let ext = path("/__extensions__");
        let allocator = Allocator::new([&init, &ext]).unwrap();
        assert_ne!(allocator.allocate(&init).unwrap().as_str(), "__init__");
        assert_ne!(allocator.allocate(&ext).unwrap().as_str(), ROOT_MODULE);
    }

    #[test]
    fn test_allocation_is_order_independent() {
        let a = path("/equity/price");
        let b = path("/equity-price");
        let forward = Allocator::new([&a, &b]).unwrap();
        let backward = Allocator::new([&b, &a]).unwrap();
        assert_eq!(forward.module_map(), backward.module_map());
    }

    #[test]
    fn test_unknown_path_is_structural() {
        let allocator = Allocator::new(std::iter::empty()).unwrap();
        let err = allocator.allocate(&path("/missing")).unwrap_err();
        assert!(err.is_structural_error());
    }

    #[test]
    fn test_module_map_excludes_root() {
        let econ = path("/econ");
        let map = Allocator::new([&RoutePath::root(), &econ])
            .unwrap()
            .module_map();
        assert_eq!(map.len(), 1);
        let ident = Identifier::new("econ").unwrap();
        assert_eq!(map.get(&ident), Some(&econ));
    }

    #[test]
    fn test_module_map_json_is_sorted() {
        let map = Allocator::new([&path("/b"), &path("/a")])
            .unwrap()
            .module_map();
        let json = map.to_json_string().unwrap();
        assert_eq!(json, "{\n  \"a\": \"/a\",\n  \"b\": \"/b\"\n}\n");
    }
}
