//! Strong domain types for routegen.
//!
//! Route paths, generated identifiers and provider names are all strings at
//! heart; wrapping them keeps them from being mixed up and lets each one
//! enforce its own invariants at construction.
//!
//! # Examples
//!
//! ```
//! use routegen_core::{Identifier, ProviderName, RoutePath};
//!
//! let path = RoutePath::parse("/equity/price/historical").unwrap();
//! assert_eq!(path.last_segment(), Some("historical"));
//!
//! let ident = Identifier::new("equity_price").unwrap();
//! assert_eq!(ident.as_str(), "equity_price");
//!
//! let provider = ProviderName::new("fmp");
//! assert_eq!(provider.as_str(), "fmp");
//! ```

use crate::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));
static SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid regex"));

/// Reserved words of the target language.
///
/// Generated identifiers, accessor names and parameter names must never be
/// one of these.
pub const RESERVED_WORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

/// Returns `true` if `name` is a legal identifier in the target language.
///
/// # Examples
///
/// ```
/// use routegen_core::is_legal_identifier;
///
/// assert!(is_legal_identifier("equity_price"));
/// assert!(!is_legal_identifier("1st"));
/// assert!(!is_legal_identifier("class"));
/// assert!(!is_legal_identifier("a-b"));
/// ```
#[must_use]
pub fn is_legal_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name) && !RESERVED_WORDS.contains(&name)
}

/// A normalized, slash-delimited route path.
///
/// The root is represented as `"/"`. Every other path starts with a slash and
/// has one or more non-empty segments made of ASCII letters, digits, `_` and
/// `-`. Ordering is lexicographic on the full string.
///
/// # Examples
///
/// ```
/// use routegen_core::RoutePath;
///
/// let path = RoutePath::parse("/econ/cpi").unwrap();
/// assert_eq!(path.segments().collect::<Vec<_>>(), vec!["econ", "cpi"]);
/// assert_eq!(path.parent().unwrap().as_str(), "/econ");
///
/// assert!(RoutePath::parse("").unwrap().is_root());
/// assert!(RoutePath::parse("//x").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoutePath(String);

impl RoutePath {
    /// Returns the root path.
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Parses and validates a route path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] if the path does not start with `/`, has an
    /// empty segment (`"//x"`, `"/x/"`) or a segment with characters outside
    /// `[A-Za-z0-9_-]`.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() || raw == "/" {
            return Ok(Self::root());
        }

        let Some(rest) = raw.strip_prefix('/') else {
            return Err(Error::Schema {
                path: raw.to_string(),
                reason: "route path must start with '/'".to_string(),
            });
        };

        for segment in rest.split('/') {
            if segment.is_empty() {
                return Err(Error::Schema {
                    path: raw.to_string(),
                    reason: "route path contains an empty segment".to_string(),
                });
            }
            if !SEGMENT_RE.is_match(segment) {
                return Err(Error::Schema {
                    path: raw.to_string(),
                    reason: format!(
                        "segment '{segment}' may only contain letters, digits, '_' and '-'"
                    ),
                });
            }
        }

        Ok(Self(raw.to_string()))
    }

    /// Returns `true` for the root path.
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Returns the path as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterates over the path segments. The root has none.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Number of segments below the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Last segment, or `None` for the root.
    #[must_use]
    pub fn last_segment(&self) -> Option<&str> {
        self.segments().last()
    }

    /// Parent path, or `None` for the root.
    ///
    /// # Examples
    ///
    /// ```
    /// use routegen_core::RoutePath;
    ///
    /// let path = RoutePath::parse("/econ").unwrap();
    /// assert!(path.parent().unwrap().is_root());
    /// assert!(RoutePath::root().parent().is_none());
    /// ```
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) | None => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
        }
    }

    /// All strict ancestors, nearest first, ending with the root.
    #[must_use]
    pub fn ancestors(&self) -> Vec<Self> {
        let mut out = Vec::new();
        let mut current = self.parent();
        while let Some(path) = current {
            current = path.parent();
            out.push(path);
        }
        out
    }

    /// Returns a child path with one more segment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] if `segment` is not a valid path segment.
    pub fn join(&self, segment: &str) -> Result<Self> {
        if self.is_root() {
            Self::parse(&format!("/{segment}"))
        } else {
            Self::parse(&format!("{}/{segment}", self.0))
        }
    }

    /// Returns `true` if `self` equals `prefix` or lies underneath it.
    ///
    /// # Examples
    ///
    /// ```
    /// use routegen_core::RoutePath;
    ///
    /// let prefix = RoutePath::parse("/equity").unwrap();
    /// assert!(RoutePath::parse("/equity/price").unwrap().is_within(&prefix));
    /// assert!(!RoutePath::parse("/equity-price").unwrap().is_within(&prefix));
    /// ```
    #[must_use]
    pub fn is_within(&self, prefix: &Self) -> bool {
        if prefix.is_root() || self == prefix {
            return true;
        }
        self.0
            .strip_prefix(prefix.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

impl fmt::Display for RoutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RoutePath {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<RoutePath> for String {
    fn from(path: RoutePath) -> Self {
        path.0
    }
}

/// A legal identifier in the generated package.
///
/// Construction checks the identifier grammar and the reserved-word list, so
/// an `Identifier` can always be emitted verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    /// Creates a validated identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `name` is not a legal identifier.
    ///
    /// # Examples
    ///
    /// ```
    /// use routegen_core::Identifier;
    ///
    /// assert!(Identifier::new("CLASS_econ").is_ok());
    /// assert!(Identifier::new("9lives").is_err());
    /// ```
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if is_legal_identifier(&name) {
            Ok(Self(name))
        } else {
            Err(Error::InvalidArgument(format!(
                "'{name}' is not a legal identifier"
            )))
        }
    }

    /// Returns the identifier as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Identifier {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Identifier> for String {
    fn from(ident: Identifier) -> Self {
        ident.0
    }
}

/// Name of a data provider (e.g. `fmp`, `polygon`, or the generic provider).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderName(String);

impl ProviderName {
    /// Creates a provider name.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the provider name as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ProviderName {
    fn from(s: String) -> Self {
        Self(s)
    }
}
