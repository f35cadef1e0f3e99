//! The public operation surface.
//!
//! Every verb is an independent transaction over the shared caches: resolve
//! the virtual path through the metadata service, recognize the storage
//! backend, fetch a ready handle, delegate, and translate result paths back
//! to virtual form. There is no per-session state.

use std::io::{Read, Write};
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::debug;

use crate::backend::{
    Bootstrap, FileStatus, FileSystem, FileSystemProvider, HadoopEnvBootstrap, ProviderRegistry,
};
use crate::cache::HandleCache;
use crate::catalog::{Catalog, MetadataService};
use crate::config::{CATALOG_CACHE_CAPACITY, GvfsConfig, ValidatedConfig};
use crate::context::{ClientDiagnostics, ContextPair, OperationContext, OperationKind};
use crate::error::{GvfsError, Result};
use crate::path::{self, CatalogId, Identifier};
use crate::storage::StorageType;

/// Virtual filesystem facade over heterogeneous storage backends.
///
/// Callers address data by virtual path
/// (`[filesetfs://]fileset/{catalog}/{schema}/{fileset}/{sub_path}`); the
/// facade resolves each call through the metadata service and delegates to
/// the backend that currently holds the bytes. Safe to share across
/// threads; every call blocks the calling thread until the backend
/// completes or fails.
pub struct VirtualFileSystem {
    config: ValidatedConfig,
    service: Arc<dyn MetadataService>,
    diagnostics: ClientDiagnostics,
    catalog_cache: HandleCache<CatalogId, Arc<dyn Catalog>>,
    filesystem_cache: HandleCache<String, Arc<dyn FileSystem>>,
    providers: ProviderRegistry,
    bootstrap: Arc<dyn Bootstrap>,
    // Single-flight guard: the first caller runs the bootstrap while
    // holding the lock, concurrent callers block until it completes. On
    // failure the flag stays clear and the next use retries.
    bootstrapped: Mutex<bool>,
}

impl VirtualFileSystem {
    /// Validate `config` and build the facade around a metadata-service
    /// client. Fails fast on invalid configuration, before any cache or
    /// handle exists.
    pub fn new(config: GvfsConfig, service: Arc<dyn MetadataService>) -> Result<Self> {
        let config = config.validate()?;
        let catalog_capacity =
            std::num::NonZeroUsize::new(CATALOG_CACHE_CAPACITY).expect("non-zero constant");
        Ok(VirtualFileSystem {
            catalog_cache: HandleCache::new(catalog_capacity, None),
            filesystem_cache: HandleCache::new(config.cache_capacity, config.cache_ttl),
            config,
            service,
            diagnostics: ClientDiagnostics::detect(),
            providers: ProviderRegistry::new(),
            bootstrap: Arc::new(HadoopEnvBootstrap),
            bootstrapped: Mutex::new(false),
        })
    }

    /// Register the driver for a storage type. The local driver is present
    /// by default; distributed drivers must be registered before first use.
    pub fn register_provider(
        &mut self,
        storage_type: StorageType,
        provider: Arc<dyn FileSystemProvider>,
    ) {
        self.providers.register(storage_type, provider);
    }

    /// Replace the environment bootstrap run before the first distributed
    /// handle is opened.
    pub fn with_bootstrap(mut self, bootstrap: Arc<dyn Bootstrap>) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn metalake(&self) -> &str {
        &self.config.metalake
    }

    /// List entries under a virtual path, with paths translated back to
    /// virtual form.
    pub fn list_status(&self, virtual_path: &str) -> Result<Vec<FileStatus>> {
        let resolved = self.resolve(virtual_path, OperationKind::ListStatus)?;
        let (actual, fs) = resolved.pair.primary();
        let storage_type = StorageType::recognize(actual)?;
        let prefix = storage_type.native_prefix(&resolved.pair.context.storage_location)?;
        let entries = fs.list_status(&storage_type.strip_protocol(actual))?;
        entries
            .into_iter()
            .map(|mut entry| {
                entry.path =
                    path::actual_to_virtual(&entry.path, &prefix, &resolved.identifier)?;
                Ok(entry)
            })
            .collect()
    }

    /// File or directory metadata, with the path in virtual form.
    pub fn file_status(&self, virtual_path: &str) -> Result<FileStatus> {
        let resolved = self.resolve(virtual_path, OperationKind::GetFileStatus)?;
        let (actual, fs) = resolved.pair.primary();
        let storage_type = StorageType::recognize(actual)?;
        let prefix = storage_type.native_prefix(&resolved.pair.context.storage_location)?;
        let mut status = fs.file_status(&storage_type.strip_protocol(actual))?;
        status.path = path::actual_to_virtual(&status.path, &prefix, &resolved.identifier)?;
        Ok(status)
    }

    pub fn exists(&self, virtual_path: &str) -> Result<bool> {
        let resolved = self.resolve(virtual_path, OperationKind::Exists)?;
        let (actual, fs) = resolved.pair.primary();
        let storage_type = StorageType::recognize(actual)?;
        fs.exists(&storage_type.strip_protocol(actual))
    }

    /// Copy a file within one fileset. Source and destination must resolve
    /// to the same fileset identifier.
    pub fn copy_file(&self, src: &str, dst: &str) -> Result<()> {
        let (src_path, dst_path) = self.check_same_fileset(src, dst)?;
        let src_resolved = self.resolve(&src_path, OperationKind::CopyFile)?;
        let dst_resolved = self.resolve(&dst_path, OperationKind::CopyFile)?;
        let (src_actual, fs) = src_resolved.pair.primary();
        let (dst_actual, _) = dst_resolved.pair.primary();
        let storage_type = StorageType::recognize(src_actual)?;
        fs.copy_file(
            &storage_type.strip_protocol(src_actual),
            &storage_type.strip_protocol(dst_actual),
        )
    }

    /// Move within one fileset. The recursion controls only reach backends
    /// whose native move needs them (local storage); distributed backends
    /// move directories natively.
    pub fn rename(
        &self,
        src: &str,
        dst: &str,
        recursive: bool,
        max_depth: Option<usize>,
    ) -> Result<()> {
        let (src_path, dst_path) = self.check_same_fileset(src, dst)?;
        let src_resolved = self.resolve(&src_path, OperationKind::Rename)?;
        let dst_resolved = self.resolve(&dst_path, OperationKind::Rename)?;
        let (src_actual, fs) = src_resolved.pair.primary();
        let (dst_actual, _) = dst_resolved.pair.primary();
        let storage_type = StorageType::recognize(src_actual)?;
        let src_native = storage_type.strip_protocol(src_actual);
        let dst_native = storage_type.strip_protocol(dst_actual);
        if storage_type.supports_recursive_move() {
            fs.rename_recursive(&src_native, &dst_native, recursive, max_depth)
        } else {
            fs.rename(&src_native, &dst_native)
        }
    }

    /// Remove a file, or a directory when `recursive` is set.
    pub fn delete(
        &self,
        virtual_path: &str,
        recursive: bool,
        max_depth: Option<usize>,
    ) -> Result<()> {
        let resolved = self.resolve(virtual_path, OperationKind::Delete)?;
        let (actual, fs) = resolved.pair.primary();
        let storage_type = StorageType::recognize(actual)?;
        fs.delete(&storage_type.strip_protocol(actual), recursive, max_depth)
    }

    pub fn delete_file(&self, virtual_path: &str) -> Result<()> {
        let resolved = self.resolve(virtual_path, OperationKind::Delete)?;
        let (actual, fs) = resolved.pair.primary();
        let storage_type = StorageType::recognize(actual)?;
        fs.delete_file(&storage_type.strip_protocol(actual))
    }

    /// Remove a directory. Deletes contents unconditionally on distributed
    /// backends; refuses a non-empty directory on local storage.
    pub fn delete_dir(&self, virtual_path: &str) -> Result<()> {
        let resolved = self.resolve(virtual_path, OperationKind::Delete)?;
        let (actual, fs) = resolved.pair.primary();
        let storage_type = StorageType::recognize(actual)?;
        fs.delete_dir(&storage_type.strip_protocol(actual))
    }

    /// Open a file for reading.
    pub fn open(&self, virtual_path: &str) -> Result<Box<dyn Read + Send>> {
        let resolved = self.resolve(virtual_path, OperationKind::OpenRead)?;
        let (actual, fs) = resolved.pair.primary();
        let storage_type = StorageType::recognize(actual)?;
        fs.open(&storage_type.strip_protocol(actual))
    }

    /// Open a file for writing, creating or truncating it.
    pub fn create(&self, virtual_path: &str) -> Result<Box<dyn Write + Send>> {
        let resolved = self.resolve(virtual_path, OperationKind::Create)?;
        let (actual, fs) = resolved.pair.primary();
        let storage_type = StorageType::recognize(actual)?;
        fs.create(&storage_type.strip_protocol(actual))
    }

    /// Open a file for appending.
    pub fn append(&self, virtual_path: &str) -> Result<Box<dyn Write + Send>> {
        let resolved = self.resolve(virtual_path, OperationKind::Append)?;
        let (actual, fs) = resolved.pair.primary();
        let storage_type = StorageType::recognize(actual)?;
        fs.append(&storage_type.strip_protocol(actual))
    }

    pub fn mkdir(&self, virtual_path: &str, create_parents: bool) -> Result<()> {
        let resolved = self.resolve(virtual_path, OperationKind::Mkdirs)?;
        let (actual, fs) = resolved.pair.primary();
        let storage_type = StorageType::recognize(actual)?;
        fs.mkdir(&storage_type.strip_protocol(actual), create_parents)
    }

    pub fn makedirs(&self, virtual_path: &str, exist_ok: bool) -> Result<()> {
        let resolved = self.resolve(virtual_path, OperationKind::Mkdirs)?;
        let (actual, fs) = resolved.pair.primary();
        let storage_type = StorageType::recognize(actual)?;
        fs.makedirs(&storage_type.strip_protocol(actual), exist_ok)
    }

    /// Creation timestamp. Only supported on local storage; other backends
    /// do not track it.
    pub fn created(&self, virtual_path: &str) -> Result<DateTime<Utc>> {
        let resolved = self.resolve(virtual_path, OperationKind::CreatedTime)?;
        let (actual, fs) = resolved.pair.primary();
        let storage_type = StorageType::recognize(actual)?;
        if !storage_type.supports_created_time() {
            return Err(GvfsError::UnsupportedOperation(format!(
                "created-time query is not supported on `{storage_type}` storage"
            )));
        }
        fs.created(&storage_type.strip_protocol(actual))
    }

    pub fn modified(&self, virtual_path: &str) -> Result<DateTime<Utc>> {
        let resolved = self.resolve(virtual_path, OperationKind::ModifiedTime)?;
        let (actual, fs) = resolved.pair.primary();
        let storage_type = StorageType::recognize(actual)?;
        fs.modified(&storage_type.strip_protocol(actual))
    }

    /// Read file content, optionally restricted to the byte range
    /// `[start, end)`.
    pub fn cat_file(
        &self,
        virtual_path: &str,
        start: Option<u64>,
        end: Option<u64>,
    ) -> Result<Bytes> {
        let resolved = self.resolve(virtual_path, OperationKind::CatFile)?;
        let (actual, fs) = resolved.pair.primary();
        let storage_type = StorageType::recognize(actual)?;
        fs.cat_file(&storage_type.strip_protocol(actual), start, end)
    }

    /// Copy a virtual file to a local destination path. The destination
    /// must be local (`/...` or `file:` prefixed); copying to another
    /// remote path is not supported.
    pub fn get_file(&self, virtual_path: &str, local_path: &str) -> Result<()> {
        if !local_path.starts_with("file:") && !local_path.starts_with('/') {
            return Err(GvfsError::UnsupportedOperation(format!(
                "get_file destination `{local_path}` must be a local path"
            )));
        }
        let local_native = local_path.strip_prefix("file:").unwrap_or(local_path);
        let resolved = self.resolve(virtual_path, OperationKind::GetFile)?;
        let (actual, fs) = resolved.pair.primary();
        let storage_type = StorageType::recognize(actual)?;
        fs.get_file(&storage_type.strip_protocol(actual), local_native)
    }

    /// Resolve one virtual path for one operation: normalize, extract the
    /// identifier, load the catalog through the catalog cache, ask the
    /// service for actual paths, and bind a backend handle to each.
    fn resolve(&self, virtual_path: &str, operation: OperationKind) -> Result<Resolved> {
        let normalized = path::normalize(virtual_path)?;
        let identifier = path::extract_identifier(&self.config.metalake, &normalized)?;
        debug!(?operation, %identifier, path = %normalized, "resolving virtual path");

        let catalog_id = identifier.catalog_id();
        let catalog = self.catalog_cache.get_or_load(&catalog_id, || {
            debug!(%catalog_id, "loading catalog handle");
            self.service.load_catalog(&catalog_id)
        })?;

        let ctx = OperationContext::new(
            path::sub_path(&normalized, &identifier),
            operation,
            &self.diagnostics,
        );
        let context = catalog.resolve_fileset(&identifier, &ctx)?;
        if context.actual_paths.is_empty() {
            return Err(GvfsError::Service(
                format!("metadata service resolved no actual paths for `{identifier}`").into(),
            ));
        }

        let filesystems = context
            .actual_paths
            .iter()
            .map(|actual| self.filesystem_for(actual))
            .collect::<Result<Vec<_>>>()?;

        Ok(Resolved {
            identifier,
            pair: ContextPair {
                context,
                filesystems,
            },
        })
    }

    /// Fetch the backend handle for an actual path, opening it on a cache
    /// miss. The handle is keyed by backend authority only, so every
    /// fileset on the same cluster shares it.
    fn filesystem_for(&self, actual_path: &str) -> Result<Arc<dyn FileSystem>> {
        let storage_type = StorageType::recognize(actual_path)?;
        let key = storage_type.backend_key(actual_path)?;
        self.filesystem_cache.get_or_load(&key, || {
            if storage_type.requires_bootstrap() {
                self.ensure_bootstrapped()?;
            }
            debug!(%key, "opening backend filesystem handle");
            self.providers.open_filesystem(storage_type, actual_path)
        })
    }

    fn ensure_bootstrapped(&self) -> Result<()> {
        let mut done = self.bootstrapped.lock();
        if *done {
            return Ok(());
        }
        self.bootstrap.run()?;
        *done = true;
        Ok(())
    }

    /// Cross-identifier guard for copy and move: both virtual paths must
    /// name the same fileset. Checked before any resolution or backend
    /// call, so a mismatch has no side effect.
    fn check_same_fileset(&self, src: &str, dst: &str) -> Result<(String, String)> {
        let src_path = path::normalize(src)?;
        let dst_path = path::normalize(dst)?;
        let src_ident = path::extract_identifier(&self.config.metalake, &src_path)?;
        let dst_ident = path::extract_identifier(&self.config.metalake, &dst_path)?;
        if src_ident != dst_ident {
            return Err(GvfsError::CrossFileset(format!(
                "destination fileset identifier `{dst_ident}` differs from source `{src_ident}`"
            )));
        }
        Ok((src_path, dst_path))
    }
}

/// Outcome of resolving one virtual path for one operation.
struct Resolved {
    identifier: Identifier,
    pair: ContextPair,
}
