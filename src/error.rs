use thiserror::Error;

/// Error taxonomy for the virtual fileset filesystem.
///
/// Construction-time problems surface as `Configuration`; everything else is
/// raised per call, before any backend side effect where validation applies.
/// Backend and metadata-service failures pass through unmodified as `Io` or
/// `Service` — the core performs no retries and no silent recovery.
#[derive(Debug, Error)]
pub enum GvfsError {
    /// Missing or invalid construction parameters (metalake, server URI,
    /// auth token, cache capacity/expiry).
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Malformed virtual path, failed identifier extraction, actual-path
    /// prefix mismatch, or malformed backend authority.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// The actual path's scheme does not match any recognized backend.
    #[error("unsupported storage type: {0}")]
    UnsupportedStorage(String),

    /// The verb is not supported on the recognized backend.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Copy/move between virtual paths of differing fileset identifiers.
    #[error("cross-fileset operation: {0}")]
    CrossFileset(String),

    /// One-time backend environment discovery failed. Not cached; the next
    /// use retries.
    #[error("environment bootstrap failed: {0}")]
    Bootstrap(String),

    /// A backend I/O failure, passed through unmodified.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A metadata-service failure, passed through unmodified.
    #[error("metadata service error: {0}")]
    Service(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl GvfsError {
    /// Wrap an arbitrary collaborator error as a service error.
    pub fn service<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        GvfsError::Service(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, GvfsError>;
