use std::num::NonZeroUsize;
use std::time::Duration;

use crate::error::{GvfsError, Result};

/// Environment variable consulted when no metalake name is passed in.
pub const METALAKE_ENV: &str = "FILESETFS_METALAKE";
/// Environment variable consulted when no server URI is passed in.
pub const SERVER_ENV: &str = "FILESETFS_SERVER";

/// Default capacity of the backend filesystem handle cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 20;
/// Default expiry of backend filesystem handles, in seconds.
pub const DEFAULT_CACHE_EXPIRY_SECS: i64 = 3600;
/// Capacity of the catalog handle cache. Not configurable.
pub const CATALOG_CACHE_CAPACITY: usize = 100;

/// How the metadata-service client authenticates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// Ambient user identity, no credentials.
    Simple,
    /// Bearer token; the value must be non-empty.
    Token(String),
}

impl Default for AuthMode {
    fn default() -> Self {
        AuthMode::Simple
    }
}

/// Construction parameters for [`VirtualFileSystem`](crate::fs::VirtualFileSystem).
///
/// Metalake and server URI fall back to the `FILESETFS_METALAKE` and
/// `FILESETFS_SERVER` environment variables when not set; a value resolvable
/// from neither place is a fatal construction error.
#[derive(Debug, Clone, Default)]
pub struct GvfsConfig {
    pub server_uri: Option<String>,
    pub metalake: Option<String>,
    pub auth: AuthMode,
    /// Backend handle cache capacity; must be greater than zero.
    pub cache_capacity: Option<usize>,
    /// Backend handle cache expiry in seconds. Negative selects pure LRU
    /// (no expiry); zero is rejected.
    pub cache_expiry_secs: Option<i64>,
}

impl GvfsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_server_uri(mut self, uri: impl Into<String>) -> Self {
        self.server_uri = Some(uri.into());
        self
    }

    pub fn with_metalake(mut self, metalake: impl Into<String>) -> Self {
        self.metalake = Some(metalake.into());
        self
    }

    pub fn with_auth(mut self, auth: AuthMode) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = Some(capacity);
        self
    }

    pub fn with_cache_expiry_secs(mut self, secs: i64) -> Self {
        self.cache_expiry_secs = Some(secs);
        self
    }

    /// Validate and resolve the configuration. All construction-time errors
    /// of the facade originate here, before any cache or client is built.
    pub fn validate(self) -> Result<ValidatedConfig> {
        let metalake = resolve(self.metalake, METALAKE_ENV, "metalake name")?;
        let server_uri = resolve(self.server_uri, SERVER_ENV, "server URI")?;

        if let AuthMode::Token(token) = &self.auth {
            if token.trim().is_empty() {
                return Err(GvfsError::Configuration(
                    "token auth requires a non-empty token value".to_string(),
                ));
            }
        }

        let capacity = self.cache_capacity.unwrap_or(DEFAULT_CACHE_CAPACITY);
        let capacity = NonZeroUsize::new(capacity).ok_or_else(|| {
            GvfsError::Configuration("cache capacity must be greater than 0".to_string())
        })?;

        let expiry_secs = self.cache_expiry_secs.unwrap_or(DEFAULT_CACHE_EXPIRY_SECS);
        if expiry_secs == 0 {
            return Err(GvfsError::Configuration(
                "cache expiry cannot be 0; use a negative value to disable expiry".to_string(),
            ));
        }
        let cache_ttl = if expiry_secs < 0 {
            None
        } else {
            Some(Duration::from_secs(expiry_secs as u64))
        };

        Ok(ValidatedConfig {
            server_uri,
            metalake,
            auth: self.auth,
            cache_capacity: capacity,
            cache_ttl,
        })
    }
}

/// A [`GvfsConfig`] that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub server_uri: String,
    pub metalake: String,
    pub auth: AuthMode,
    pub cache_capacity: NonZeroUsize,
    pub cache_ttl: Option<Duration>,
}

fn resolve(value: Option<String>, env_key: &str, what: &str) -> Result<String> {
    if let Some(v) = value {
        if !v.trim().is_empty() {
            return Ok(v);
        }
    }
    match std::env::var(env_key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(GvfsError::Configuration(format!(
            "no {what} provided; set the '{env_key}' environment variable or pass it as a parameter"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> GvfsConfig {
        GvfsConfig::new()
            .with_server_uri("http://localhost:8090")
            .with_metalake("test_metalake")
    }

    #[test]
    fn test_defaults_validate() {
        let cfg = base().validate().unwrap();
        assert_eq!(cfg.metalake, "test_metalake");
        assert_eq!(cfg.cache_capacity.get(), DEFAULT_CACHE_CAPACITY);
        assert_eq!(
            cfg.cache_ttl,
            Some(Duration::from_secs(DEFAULT_CACHE_EXPIRY_SECS as u64))
        );
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = base().with_cache_capacity(0).validate().unwrap_err();
        assert!(matches!(err, GvfsError::Configuration(_)));
    }

    #[test]
    fn test_zero_expiry_rejected() {
        let err = base().with_cache_expiry_secs(0).validate().unwrap_err();
        assert!(matches!(err, GvfsError::Configuration(_)));
    }

    #[test]
    fn test_negative_expiry_disables_ttl() {
        let cfg = base().with_cache_expiry_secs(-1).validate().unwrap();
        assert_eq!(cfg.cache_ttl, None);
    }

    #[test]
    fn test_empty_token_rejected() {
        let err = base()
            .with_auth(AuthMode::Token("  ".to_string()))
            .validate()
            .unwrap_err();
        assert!(matches!(err, GvfsError::Configuration(_)));
    }

    #[test]
    fn test_missing_metalake_rejected() {
        // The fallback env var is intentionally not set in the test
        // environment.
        let err = GvfsConfig::new()
            .with_server_uri("http://localhost:8090")
            .validate()
            .unwrap_err();
        assert!(matches!(err, GvfsError::Configuration(_)));
    }
}
