use std::fmt::Debug;
use std::path::{Path, PathBuf};

use crate::kernel::error::Result;

/// Filesystem capability used by the cache store. Paths are relative to
/// the provider's base path.
pub trait StorageProvider: Send + Sync + Debug {
    /// Get the name of this provider
    fn name(&self) -> &str;

    /// Absolute location of `path`, for diagnostics
    fn resolve(&self, path: &Path) -> PathBuf;

    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool;

    /// Create a directory and all its parent directories
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Read a file to a vector of bytes
    fn read_to_bytes(&self, path: &Path) -> Result<Vec<u8>>;

    /// Read a file, mapping "not found" to `None`. Other I/O errors propagate.
    fn read_if_exists(&self, path: &Path) -> Result<Option<Vec<u8>>>;

    /// Write bytes to a file atomically, creating parent directories
    fn write_bytes(&self, path: &Path, contents: &[u8]) -> Result<()>;

    /// Remove a file
    fn remove_file(&self, path: &Path) -> Result<()>;

    /// Remove a file; a missing file is success. Returns whether one was removed.
    fn remove_if_exists(&self, path: &Path) -> Result<bool>;
}
