//! Export of in-memory file sets to disk.
//!
//! Directories are created in a single pass before any file is written, and
//! each file is written to a sibling temp file and renamed into place, so a
//! reader never observes a half-written module.
//!
//! # Examples
//!
//! ```
//! use routegen_files::FilesBuilder;
//! # use tempfile::TempDir;
//!
//! # let temp_dir = TempDir::new().unwrap();
//! # let output_dir = temp_dir.path().join("pkg");
//! let fs = FilesBuilder::new()
//!     .add_file("/econ.py", "class CLASS_econ: ...\n")
//!     .add_file("/econ_cpi.py", "class CLASS_econ_cpi: ...\n")
//!     .build()
//!     .unwrap();
//!
//! fs.export_to_filesystem(&output_dir).unwrap();
//!
//! assert!(output_dir.join("econ_cpi.py").exists());
//! ```

use crate::types::{FilePath, FilesError, Result};
use crate::vfs::FileSystem;
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Options for export operations.
///
/// # Examples
///
/// ```
/// use routegen_files::ExportOptions;
///
/// let options = ExportOptions::default()
///     .with_atomic_writes(true)
///     .with_overwrite(false);
/// assert!(!options.overwrite);
/// ```
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Use atomic writes (write to temp file, then rename)
    pub atomic: bool,
    /// Overwrite existing files
    pub overwrite: bool,
}

impl ExportOptions {
    /// Creates export options with atomic writes and overwriting enabled.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            atomic: true,
            overwrite: true,
        }
    }

    /// Sets whether to use atomic writes.
    #[must_use]
    pub const fn with_atomic_writes(mut self, atomic: bool) -> Self {
        self.atomic = atomic;
        self
    }

    /// Sets whether to overwrite existing files.
    #[must_use]
    pub const fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem {
    /// Writes every file under `base_path`, creating it if absent.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::Io`] if a directory cannot be created or a file
    /// cannot be written.
    pub fn export_to_filesystem(&self, base_path: impl AsRef<Path>) -> Result<()> {
        self.export_to_filesystem_with_options(base_path, &ExportOptions::default())
    }

    /// Writes every file under `base_path` with custom options.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::Io`] if a directory cannot be created or a file
    /// cannot be written.
    pub fn export_to_filesystem_with_options(
        &self,
        base_path: impl AsRef<Path>,
        options: &ExportOptions,
    ) -> Result<()> {
        let base = prepare_base(base_path.as_ref())?;

        let dirs = self.collect_directories(&base);
        create_directories(&dirs)?;

        for (path, file) in self.files() {
            write_file_atomic(&to_disk_path(path, &base), file.content(), options)?;
        }

        tracing::debug!(
            files = self.file_count(),
            base = %base.display(),
            "Exported file set"
        );
        Ok(())
    }

    /// Writes every file under `base_path` using rayon.
    ///
    /// Every file targets a distinct path, so write order does not affect
    /// the result.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::Io`] if a directory cannot be created or a file
    /// cannot be written.
    #[cfg(feature = "parallel")]
    pub fn export_to_filesystem_parallel(
        &self,
        base_path: impl AsRef<Path>,
        options: &ExportOptions,
    ) -> Result<()> {
        use rayon::prelude::*;

        let base = prepare_base(base_path.as_ref())?;

        let dirs = self.collect_directories(&base);
        create_directories(&dirs)?;

        let files: Vec<_> = self.files().collect();
        files.par_iter().try_for_each(|(path, file)| {
            write_file_atomic(&to_disk_path(path, &base), file.content(), options)
        })
    }

    fn collect_directories(&self, base: &Path) -> BTreeSet<PathBuf> {
        let mut dirs = BTreeSet::new();
        for (path, _) in self.files() {
            let disk_path = to_disk_path(path, base);
            let mut current = disk_path.parent();
            while let Some(dir) = current {
                if dir == base || !dirs.insert(dir.to_path_buf()) {
                    break;
                }
                current = dir.parent();
            }
        }
        dirs
    }
}

/// Removes files previously produced under `base_path`.
///
/// `relative_paths` are file names relative to the base. Missing files are
/// ignored; anything that is not a regular file is left alone. Returns the
/// paths actually removed, in sorted order.
///
/// # Errors
///
/// Returns a path error if an entry would escape `base_path`, or
/// [`FilesError::Io`] if a removal fails.
///
/// # Examples
///
/// ```
/// use routegen_files::remove_stale_files;
/// # use tempfile::TempDir;
///
/// # let temp = TempDir::new().unwrap();
/// # let base = temp.path();
/// std::fs::write(base.join("old.py"), "").unwrap();
///
/// let removed = remove_stale_files(base, ["old.py", "never_existed.py"]).unwrap();
/// assert_eq!(removed, vec!["old.py".to_string()]);
/// assert!(!base.join("old.py").exists());
/// ```
pub fn remove_stale_files<I, S>(
    base_path: impl AsRef<Path>,
    relative_paths: I,
) -> Result<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let base = base_path.as_ref();
    let targets: BTreeSet<FilePath> = relative_paths
        .into_iter()
        .map(|p| FilePath::new(format!("/{}", p.as_ref().trim_start_matches('/'))))
        .collect::<Result<_>>()?;

    let mut removed = Vec::new();
    for target in targets {
        let disk_path = to_disk_path(&target, base);
        match fs::symlink_metadata(&disk_path) {
            Ok(meta) if meta.is_file() => {
                fs::remove_file(&disk_path).map_err(|source| FilesError::Io {
                    path: disk_path.display().to_string(),
                    source,
                })?;
                tracing::debug!(path = %disk_path.display(), "Removed stale file");
                removed.push(target.relative().to_string());
            }
            Ok(_) => {
                tracing::warn!(
                    path = %disk_path.display(),
                    "Stale entry is not a regular file, leaving it"
                );
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(FilesError::Io {
                    path: disk_path.display().to_string(),
                    source,
                });
            }
        }
    }

    Ok(removed)
}

fn prepare_base(base: &Path) -> Result<PathBuf> {
    fs::create_dir_all(base).map_err(io_error(base))?;
    base.canonicalize().map_err(io_error(base))
}

fn create_directories(dirs: &BTreeSet<PathBuf>) -> Result<()> {
    for dir in dirs {
        fs::create_dir_all(dir).map_err(io_error(dir))?;
    }
    Ok(())
}

fn to_disk_path(path: &FilePath, base: &Path) -> PathBuf {
    path.relative()
        .split('/')
        .filter(|part| !part.is_empty())
        .fold(base.to_path_buf(), |acc, part| acc.join(part))
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> FilesError {
    let path = path.display().to_string();
    move |source| FilesError::Io { path, source }
}

/// Writes `content` to `path`, via a temp file and rename when atomic.
fn write_file_atomic(path: &Path, content: &str, options: &ExportOptions) -> Result<()> {
    if !options.overwrite && path.exists() {
        return Ok(());
    }

    if options.atomic {
        let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
        temp_name.push(".tmp");
        let temp_path = path.with_file_name(temp_name);

        let mut file = fs::File::create(&temp_path).map_err(io_error(&temp_path))?;
        file.write_all(content.as_bytes())
            .map_err(io_error(&temp_path))?;
        file.sync_all().map_err(io_error(&temp_path))?;
        fs::rename(&temp_path, path).map_err(io_error(path))?;
    } else {
        fs::write(path, content).map_err(io_error(path))?;
    }

    Ok(())
}
