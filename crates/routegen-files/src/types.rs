//! Core types for in-memory file sets.
//!
//! # Examples
//!
//! ```
//! use routegen_files::{FileEntry, FilePath};
//!
//! let path = FilePath::new("/econ_cpi.py").unwrap();
//! let file = FileEntry::new("class CLASS_econ_cpi: ...");
//!
//! assert_eq!(path.as_str(), "/econ_cpi.py");
//! assert_eq!(path.relative(), "econ_cpi.py");
//! assert_eq!(file.size(), 25);
//! ```

use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while building or exporting a file set.
///
/// # Examples
///
/// ```
/// use routegen_files::FilesError;
///
/// let error = FilesError::FileNotFound {
///     path: "/missing.py".to_string(),
/// };
///
/// assert!(error.is_not_found());
/// ```
#[derive(Error, Debug)]
pub enum FilesError {
    /// File not found at the specified path
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// Path is empty or not valid UTF-8
    #[error("Invalid path: {path}")]
    InvalidPath {
        /// The invalid path
        path: String,
    },

    /// Path is not absolute (must start with '/')
    #[error("Path must be absolute: {path}")]
    PathNotAbsolute {
        /// The relative path
        path: String,
    },

    /// Path contains invalid components (e.g., '..')
    #[error("Path contains invalid components: {path}")]
    InvalidPathComponent {
        /// The path with invalid components
        path: String,
    },

    /// Disk operation failed
    #[error("I/O error at {path}: {source}")]
    Io {
        /// File or directory involved
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl FilesError {
    /// Returns `true` if this is a file not found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::FileNotFound { .. })
    }

    /// Returns `true` if this is an invalid path error.
    ///
    /// # Examples
    ///
    /// ```
    /// use routegen_files::FilesError;
    ///
    /// let error = FilesError::PathNotAbsolute {
    ///     path: "x.py".to_string(),
    /// };
    ///
    /// assert!(error.is_invalid_path());
    /// ```
    #[must_use]
    pub const fn is_invalid_path(&self) -> bool {
        matches!(
            self,
            Self::InvalidPath { .. }
                | Self::PathNotAbsolute { .. }
                | Self::InvalidPathComponent { .. }
        )
    }

    /// Returns `true` if this is an I/O error.
    #[must_use]
    pub const fn is_io_error(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

impl From<FilesError> for routegen_core::Error {
    fn from(error: FilesError) -> Self {
        match error {
            FilesError::Io { path, source } => Self::Io { path, source },
            FilesError::FileNotFound { path } => Self::Io {
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
                path,
            },
            other => Self::InvalidArgument(other.to_string()),
        }
    }
}

/// A validated path inside a file set.
///
/// Paths use Unix conventions on every platform: they start with `/`, are
/// separated by `/` and never contain `..`.
///
/// # Examples
///
/// ```
/// use routegen_files::FilePath;
///
/// assert!(FilePath::new("/pkg/__init__.py").is_ok());
/// assert!(FilePath::new("relative.py").is_err());
/// assert!(FilePath::new("/../escape.py").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilePath(String);

impl FilePath {
    /// Creates a validated file path.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidPath`] if the path is empty or not UTF-8,
    /// [`FilesError::PathNotAbsolute`] if it does not start with `/`, and
    /// [`FilesError::InvalidPathComponent`] if it contains `..`.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = path.to_str().ok_or_else(|| FilesError::InvalidPath {
            path: path.display().to_string(),
        })?;

        let normalized = if cfg!(target_os = "windows") {
            raw.replace(std::path::MAIN_SEPARATOR, "/")
        } else {
            raw.to_string()
        };

        if normalized.is_empty() {
            return Err(FilesError::InvalidPath {
                path: String::new(),
            });
        }
        if !normalized.starts_with('/') {
            return Err(FilesError::PathNotAbsolute { path: normalized });
        }
        if normalized.split('/').any(|part| part == "..") {
            return Err(FilesError::InvalidPathComponent { path: normalized });
        }

        Ok(Self(normalized))
    }

    /// Returns the path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the path without its leading slash.
    #[must_use]
    pub fn relative(&self) -> &str {
        self.0.strip_prefix('/').unwrap_or(&self.0)
    }
}

impl fmt::Display for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<Path> for FilePath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

/// A file held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    content: String,
}

impl FileEntry {
    /// Creates a file with the given content.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    /// Returns the file content.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Size of the content in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.content.len()
    }
}

/// Result alias for file set operations.
pub type Result<T> = std::result::Result<T, FilesError>;
