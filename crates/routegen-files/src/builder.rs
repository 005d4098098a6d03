//! Builder for in-memory file sets.
//!
//! # Examples
//!
//! ```
//! use routegen_files::FilesBuilder;
//!
//! let fs = FilesBuilder::new()
//!     .add_file("/module_map.json", "{}\n")
//!     .add_file("/__init__.py", "")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(fs.file_count(), 2);
//! ```

use crate::types::{FilesError, Result};
use crate::vfs::FileSystem;
use std::path::Path;

/// Fluent builder for a [`FileSystem`].
///
/// Path errors are collected and reported by [`FilesBuilder::build`] so a
/// chain of `add_file` calls never has to be interrupted.
#[derive(Debug, Default)]
pub struct FilesBuilder {
    fs: FileSystem,
    errors: Vec<FilesError>,
}

impl FilesBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder whose files live under `base`.
    ///
    /// Each item is a path relative to `base` and its content.
    ///
    /// # Examples
    ///
    /// ```
    /// use routegen_files::FilesBuilder;
    ///
    /// let fs = FilesBuilder::from_relative("/pkg", [("a.py", "pass\n")])
    ///     .build()
    ///     .unwrap();
    ///
    /// assert!(fs.exists("/pkg/a.py"));
    /// ```
    #[must_use]
    pub fn from_relative<P, C>(base: &str, files: impl IntoIterator<Item = (P, C)>) -> Self
    where
        P: AsRef<str>,
        C: Into<String>,
    {
        let base = base.trim_end_matches('/');
        let mut builder = Self::new();
        for (path, content) in files {
            let full = format!("{base}/{}", path.as_ref().trim_start_matches('/'));
            builder = builder.add_file(full.as_str(), content);
        }
        builder
    }

    /// Adds a file.
    #[must_use]
    pub fn add_file(mut self, path: impl AsRef<Path>, content: impl Into<String>) -> Self {
        if let Err(e) = self.fs.add_file(path, content) {
            self.errors.push(e);
        }
        self
    }

    /// Adds several files.
    #[must_use]
    pub fn add_files<P, C>(mut self, files: impl IntoIterator<Item = (P, C)>) -> Self
    where
        P: AsRef<Path>,
        C: Into<String>,
    {
        for (path, content) in files {
            if let Err(e) = self.fs.add_file(path, content) {
                self.errors.push(e);
            }
        }
        self
    }

    /// Number of files added so far.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.fs.file_count()
    }

    /// Consumes the builder and returns the file set.
    ///
    /// # Errors
    ///
    /// Returns the first path error encountered while adding files.
    ///
    /// # Examples
    ///
    /// ```
    /// use routegen_files::FilesBuilder;
    ///
    /// let result = FilesBuilder::new()
    ///     .add_file("relative.py", "")
    ///     .build();
    ///
    /// assert!(result.is_err());
    /// ```
    pub fn build(self) -> Result<FileSystem> {
        if let Some(error) = self.errors.into_iter().next() {
            return Err(error);
        }
        Ok(self.fs)
    }
}
