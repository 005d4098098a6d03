//! In-memory file sets and disk export for routegen.
//!
//! A build renders every module into a [`FileSystem`] first and only then
//! exports it, so a failed build never leaves partial output behind.
//!
//! # Features
//!
//! - **Ordered storage**: files are kept sorted by path, so export and
//!   reports are deterministic
//! - **Atomic export**: temp file plus rename for every file
//! - **Stale cleanup**: removal of files a previous build produced
//! - **Parallel export**: opt-in through the `parallel` feature
//!
//! # Examples
//!
//! ```
//! use routegen_files::FilesBuilder;
//! # use tempfile::TempDir;
//!
//! # let temp = TempDir::new().unwrap();
//! let fs = FilesBuilder::new()
//!     .add_file("/module_map.json", "{}\n")
//!     .add_file("/__init__.py", "")
//!     .build()
//!     .unwrap();
//!
//! fs.export_to_filesystem(temp.path()).unwrap();
//! assert!(temp.path().join("module_map.json").exists());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

pub mod builder;
pub mod filesystem;
pub mod types;
pub mod vfs;

pub use builder::FilesBuilder;
pub use filesystem::{ExportOptions, remove_stale_files};
pub use types::{FileEntry, FilePath, FilesError, Result};
pub use vfs::FileSystem;
