//! In-memory file set.
//!
//! Files are kept in an ordered map so iteration (and therefore export and
//! any report built from it) always follows path order.
//!
//! # Examples
//!
//! ```
//! use routegen_files::FileSystem;
//!
//! let mut fs = FileSystem::new();
//! fs.add_file("/__init__.py", "from .__extensions__ import Extensions\n").unwrap();
//!
//! assert!(fs.exists("/__init__.py"));
//! assert_eq!(fs.file_count(), 1);
//! ```

use crate::types::{FileEntry, FilePath, FilesError, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// An in-memory set of files keyed by [`FilePath`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSystem {
    files: BTreeMap<FilePath, FileEntry>,
}

impl FileSystem {
    /// Creates an empty file set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file, replacing any previous content at that path.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is invalid (not absolute, contains '..').
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) -> Result<()> {
        let path = FilePath::new(path)?;
        self.files.insert(path, FileEntry::new(content));
        Ok(())
    }

    /// Reads the content of a file.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::FileNotFound`] if no file exists at `path`, or
    /// a path error if `path` is invalid.
    ///
    /// # Examples
    ///
    /// ```
    /// use routegen_files::FileSystem;
    ///
    /// let mut fs = FileSystem::new();
    /// fs.add_file("/a.py", "pass\n").unwrap();
    ///
    /// assert_eq!(fs.read_file("/a.py").unwrap(), "pass\n");
    /// assert!(fs.read_file("/b.py").unwrap_err().is_not_found());
    /// ```
    pub fn read_file(&self, path: impl AsRef<Path>) -> Result<&str> {
        let path = FilePath::new(path)?;
        self.files
            .get(&path)
            .map(FileEntry::content)
            .ok_or_else(|| FilesError::FileNotFound {
                path: path.as_str().to_string(),
            })
    }

    /// Checks if a file exists. Returns `false` for invalid paths.
    #[must_use]
    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        FilePath::new(path)
            .ok()
            .is_some_and(|p| self.files.contains_key(&p))
    }

    /// Removes a file, returning its entry if it existed.
    pub fn remove_file(&mut self, path: impl AsRef<Path>) -> Option<FileEntry> {
        let path = FilePath::new(path).ok()?;
        self.files.remove(&path)
    }

    /// Number of files in the set.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Total size of all file contents in bytes.
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.files.values().map(FileEntry::size).sum()
    }

    /// All file paths, in sorted order.
    #[must_use]
    pub fn all_paths(&self) -> Vec<&FilePath> {
        self.files.keys().collect()
    }

    /// Iterates over files in sorted path order.
    pub fn files(&self) -> impl Iterator<Item = (&FilePath, &FileEntry)> {
        self.files.iter()
    }
}
