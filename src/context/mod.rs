//! Per-call operation context and its resolution result.
//!
//! Resolution is deliberately uncached: the metadata service may resolve the
//! same fileset differently per operation kind or caller identity (for
//! example routing writes to a different replica than reads), so every
//! public call builds a fresh [`OperationContext`] and receives a fresh
//! [`ResolvedContext`] whose lifetime is that one operation.

pub mod diagnostics;

use std::collections::HashMap;
use std::sync::Arc;

pub use diagnostics::{ClientDiagnostics, SourceEngine};

use crate::backend::FileSystem;

/// Semantic intent of a call, sent to the metadata service so it can
/// resolve per operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    ListStatus,
    GetFileStatus,
    Exists,
    CopyFile,
    Rename,
    Delete,
    OpenRead,
    Create,
    Append,
    GetFile,
    Mkdirs,
    CreatedTime,
    ModifiedTime,
    CatFile,
}

/// Which client implementation issued the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientType {
    RustClient,
}

/// Operation-scoped request metadata sent along with a resolution request.
/// The diagnostic fields are best-effort and never influence control flow.
#[derive(Debug, Clone)]
pub struct OperationContext {
    /// Virtual path minus the fileset identifier prefix; may be empty.
    pub sub_path: String,
    pub operation: OperationKind,
    pub client_type: ClientType,
    pub source_engine: SourceEngine,
    pub client_address: String,
    pub app_id: String,
    /// Free-form environment-derived attributes (client build metadata,
    /// platform job details).
    pub extra: HashMap<String, String>,
}

impl OperationContext {
    pub fn new(
        sub_path: String,
        operation: OperationKind,
        diagnostics: &ClientDiagnostics,
    ) -> Self {
        OperationContext {
            sub_path,
            operation,
            client_type: ClientType::RustClient,
            source_engine: diagnostics.source_engine,
            client_address: diagnostics.client_address.clone(),
            app_id: diagnostics.app_id.clone(),
            extra: diagnostics.extra.clone(),
        }
    }
}

/// What the metadata service resolved a virtual path to. Never cached;
/// always fetched fresh for each operation.
#[derive(Debug, Clone)]
pub struct ResolvedContext {
    /// The fileset's declared storage location.
    pub storage_location: String,
    /// Concrete backend paths for the requested sub-path, in resolution
    /// order. Non-empty; multi-location filesets yield more than one.
    pub actual_paths: Vec<String>,
}

/// A resolved context bound to the backend handle for each of its actual
/// paths. Created and discarded per call.
pub struct ContextPair {
    pub context: ResolvedContext,
    pub filesystems: Vec<Arc<dyn FileSystem>>,
}

impl ContextPair {
    /// The primary actual path and its backend handle.
    pub fn primary(&self) -> (&str, &Arc<dyn FileSystem>) {
        (&self.context.actual_paths[0], &self.filesystems[0])
    }
}
