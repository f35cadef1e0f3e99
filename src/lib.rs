//! Virtual fileset filesystem client.
//!
//! Callers address data through a stable, storage-agnostic virtual path
//! (`fileset/{catalog}/{schema}/{fileset}/{sub_path}`) while the bytes live
//! on heterogeneous backends. A metadata service resolves each virtual path
//! to concrete backend paths per operation; this crate dispatches the
//! requested verb to the right backend driver and caches the expensive
//! handles (catalogs, backend filesystems) under concurrent access.

pub mod backend;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod fs;
pub mod path;
pub mod storage;

pub use backend::{
    Bootstrap, FileKind, FileStatus, FileSystem, FileSystemProvider, LocalFileSystem,
    ProviderRegistry,
};
pub use catalog::{Catalog, MetadataService};
pub use config::{AuthMode, GvfsConfig};
pub use context::{ClientDiagnostics, OperationContext, OperationKind, ResolvedContext, SourceEngine};
pub use error::{GvfsError, Result};
pub use fs::VirtualFileSystem;
pub use path::{CatalogId, Identifier};
pub use storage::StorageType;
