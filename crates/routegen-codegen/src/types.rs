//! Generated output containers.
//!
//! # Examples
//!
//! ```
//! use routegen_codegen::{GeneratedCode, GeneratedFile};
//!
//! let mut code = GeneratedCode::new();
//! code.add_file(GeneratedFile::new("econ.py", "pass\n"));
//!
//! assert_eq!(code.file_count(), 1);
//! let fs = code.to_filesystem().unwrap();
//! assert!(fs.exists("/econ.py"));
//! ```

use routegen_files::{FileSystem, FilesBuilder};
use serde::{Deserialize, Serialize};

/// Every file produced by one build, in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedCode {
    /// Generated files with paths relative to the output directory
    pub files: Vec<GeneratedFile>,
}

impl GeneratedCode {
    /// Creates an empty container.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Adds a file.
    pub fn add_file(&mut self, file: GeneratedFile) {
        self.files.push(file);
    }

    /// Number of files.
    #[inline]
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Iterates over the files.
    #[inline]
    pub fn files(&self) -> impl Iterator<Item = &GeneratedFile> {
        self.files.iter()
    }

    /// Looks up a file by its relative path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&GeneratedFile> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Loads the files into an in-memory file system rooted at `/`.
    ///
    /// # Errors
    ///
    /// Returns a path error if a file path is not a plain relative path.
    pub fn to_filesystem(&self) -> routegen_files::Result<FileSystem> {
        FilesBuilder::from_relative(
            "/",
            self.files.iter().map(|f| (f.path.as_str(), f.content.as_str())),
        )
        .build()
    }
}

impl Extend<GeneratedFile> for GeneratedCode {
    fn extend<T: IntoIterator<Item = GeneratedFile>>(&mut self, iter: T) {
        self.files.extend(iter);
    }
}

/// One generated file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFile {
    /// Path relative to the output directory
    pub path: String,
    /// File content
    pub content: String,
}

impl GeneratedFile {
    /// Creates a file.
    #[must_use]
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Returns the file path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the file content.
    #[inline]
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_by_path() {
        let mut code = GeneratedCode::new();
        code.extend([
            GeneratedFile::new("a.py", "a"),
            GeneratedFile::new("b.py", "b"),
        ]);
        assert_eq!(code.get("b.py").map(GeneratedFile::content), Some("b"));
        assert!(code.get("c.py").is_none());
    }

    #[test]
    fn test_invalid_path_rejected() {
        let mut code = GeneratedCode::new();
        code.add_file(GeneratedFile::new("../escape.py", ""));
        assert!(code.to_filesystem().is_err());
    }
}
