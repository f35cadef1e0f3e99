//! Backend filesystem seam: the handle trait, the provider registry that
//! opens handles, and the bundled local-disk driver.
//!
//! A [`FileSystem`] is an opened, reusable session for one storage cluster.
//! Handles are safe for concurrent use by contract of the driver; the core
//! adds no per-handle locking. All paths crossing this seam are
//! backend-native (already protocol-stripped for local storage).

pub mod bootstrap;
pub mod local;

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};

pub use bootstrap::{Bootstrap, HadoopEnvBootstrap};
pub use local::LocalFileSystem;

use crate::error::{GvfsError, Result};
use crate::storage::StorageType;

/// Whether an entry is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
}

/// Metadata for one filesystem entry. The facade rewrites `path` from
/// backend-native to virtual form before returning it to callers.
#[derive(Debug, Clone)]
pub struct FileStatus {
    pub path: String,
    pub size: u64,
    pub kind: FileKind,
    pub modified: Option<DateTime<Utc>>,
}

/// An opened backend filesystem handle.
///
/// Driver semantics intentionally differ between backends and are routed,
/// not unified: see the capability flags on
/// [`StorageType`](crate::storage::StorageType).
pub trait FileSystem: Send + Sync {
    fn list_status(&self, path: &str) -> Result<Vec<FileStatus>>;

    fn file_status(&self, path: &str) -> Result<FileStatus>;

    fn exists(&self, path: &str) -> Result<bool>;

    fn copy_file(&self, src: &str, dst: &str) -> Result<()>;

    /// Move `src` to `dst`. Distributed drivers cover directories natively.
    fn rename(&self, src: &str, dst: &str) -> Result<()>;

    /// Move with recursion controls. Only meaningful for drivers whose
    /// native move does not cover directories; the default ignores the
    /// controls and delegates to [`FileSystem::rename`].
    fn rename_recursive(
        &self,
        src: &str,
        dst: &str,
        _recursive: bool,
        _max_depth: Option<usize>,
    ) -> Result<()> {
        self.rename(src, dst)
    }

    /// Remove a file, or a directory when `recursive` is set.
    fn delete(&self, path: &str, recursive: bool, max_depth: Option<usize>) -> Result<()>;

    fn delete_file(&self, path: &str) -> Result<()>;

    /// Remove a directory. Recursive and unconditional on distributed
    /// drivers; refuses a non-empty directory on the local driver.
    fn delete_dir(&self, path: &str) -> Result<()>;

    fn open(&self, path: &str) -> Result<Box<dyn Read + Send>>;

    fn create(&self, path: &str) -> Result<Box<dyn Write + Send>>;

    fn append(&self, path: &str) -> Result<Box<dyn Write + Send>>;

    fn mkdir(&self, path: &str, create_parents: bool) -> Result<()>;

    fn makedirs(&self, path: &str, exist_ok: bool) -> Result<()>;

    /// Creation timestamp. Only the local driver answers this.
    fn created(&self, path: &str) -> Result<DateTime<Utc>>;

    fn modified(&self, path: &str) -> Result<DateTime<Utc>>;

    /// Read file content, optionally restricted to the byte range
    /// `[start, end)`.
    fn cat_file(&self, path: &str, start: Option<u64>, end: Option<u64>) -> Result<Bytes>;

    /// Copy a remote file to a local destination path.
    fn get_file(&self, remote: &str, local: &str) -> Result<()>;
}

/// Opens backend handles for one storage type.
///
/// Opening is the expensive step the backend filesystem cache exists to
/// amortize; providers are only invoked on a cache miss.
pub trait FileSystemProvider: Send + Sync {
    /// Open a handle able to serve `actual_path`. The path is
    /// scheme-qualified; drivers that need the authority read it from here.
    fn open_filesystem(
        &self,
        storage_type: StorageType,
        actual_path: &str,
    ) -> Result<Arc<dyn FileSystem>>;
}

/// Registry of filesystem providers keyed by storage type.
///
/// The local driver is registered out of the box. Distributed drivers are
/// external collaborators; embedding applications register them before
/// first use.
pub struct ProviderRegistry {
    providers: HashMap<StorageType, Arc<dyn FileSystemProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        let mut registry = ProviderRegistry {
            providers: HashMap::new(),
        };
        registry.register(StorageType::Local, Arc::new(local::LocalFsProvider));
        registry
    }

    pub fn register(&mut self, storage_type: StorageType, provider: Arc<dyn FileSystemProvider>) {
        self.providers.insert(storage_type, provider);
    }

    pub fn open_filesystem(
        &self,
        storage_type: StorageType,
        actual_path: &str,
    ) -> Result<Arc<dyn FileSystem>> {
        let provider = self.providers.get(&storage_type).ok_or_else(|| {
            GvfsError::UnsupportedStorage(format!(
                "no filesystem provider registered for storage type `{storage_type}`"
            ))
        })?;
        provider.open_filesystem(storage_type, actual_path)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
