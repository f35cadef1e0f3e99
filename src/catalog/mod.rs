//! Metadata-service seam.
//!
//! The catalog service is consumed as a black box: it owns authorization,
//! retries, and its network protocol. The facade only needs to load catalog
//! handles (which it caches) and ask each catalog to resolve a fileset for
//! one operation.

use std::sync::Arc;

use crate::context::{OperationContext, ResolvedContext};
use crate::error::Result;
use crate::path::{CatalogId, Identifier};

/// Client of the metadata service. Implementations decide transport and
/// authentication from the validated configuration they were built with.
pub trait MetadataService: Send + Sync {
    /// Load a catalog handle. Expensive; the facade caches the result by
    /// catalog identifier.
    fn load_catalog(&self, catalog_id: &CatalogId) -> Result<Arc<dyn Catalog>>;
}

/// A loaded catalog handle.
pub trait Catalog: Send + Sync {
    /// Resolve a fileset for one operation, returning its storage location
    /// and the concrete backend paths for the requested sub-path.
    ///
    /// Results are operation-scoped and must not be reused across calls:
    /// resolution may depend on the operation kind and caller identity
    /// carried in `ctx`.
    fn resolve_fileset(
        &self,
        identifier: &Identifier,
        ctx: &OperationContext,
    ) -> Result<ResolvedContext>;
}
