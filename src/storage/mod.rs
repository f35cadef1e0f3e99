//! Storage backend recognition and per-backend path handling.
//!
//! Every actual path carries a scheme prefix that selects the backend
//! adapter. The variants differ in how handles are keyed, how much of the
//! URI the native driver wants to see, and which verbs they support; those
//! differences are captured here as a dispatch table rather than scattered
//! per-verb conditionals.

use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{GvfsError, Result};

/// Cache key shared by all local-filesystem paths.
pub const LOCAL_BACKEND_KEY: &str = "local";

static HDFS_AUTHORITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^hdfs://([^/]+)").unwrap());
static VIEWFS_AUTHORITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^viewfs://([^/]+)").unwrap());

/// Closed enumeration of recognized storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageType {
    /// Distributed filesystem, `hdfs://host[:port]/path`.
    Hdfs,
    /// Federated distributed filesystem, `viewfs://cluster/path`.
    Viewfs,
    /// Local filesystem, `file:/absolute/path`.
    Local,
}

impl StorageType {
    /// Recognize the backend from an actual path's scheme prefix.
    pub fn recognize(path: &str) -> Result<StorageType> {
        if path.starts_with("hdfs://") {
            Ok(StorageType::Hdfs)
        } else if path.starts_with("viewfs://") {
            Ok(StorageType::Viewfs)
        } else if path.starts_with("file:/") {
            Ok(StorageType::Local)
        } else {
            Err(GvfsError::UnsupportedStorage(format!(
                "no recognized storage scheme in path `{path}`"
            )))
        }
    }

    /// The scheme marker for this backend, as it appears in actual paths.
    pub fn scheme(&self) -> &'static str {
        match self {
            StorageType::Hdfs => "hdfs://",
            StorageType::Viewfs => "viewfs://",
            StorageType::Local => "file:",
        }
    }

    /// Extract the backend-instance cache key from an actual path.
    ///
    /// The key depends only on the backend authority (`host[:port]`), never
    /// on fileset identity: all filesets on one cluster share a handle.
    /// Local storage maps to a single constant key.
    pub fn backend_key(&self, path: &str) -> Result<String> {
        let authority = match self {
            StorageType::Local => return Ok(LOCAL_BACKEND_KEY.to_string()),
            StorageType::Hdfs => &HDFS_AUTHORITY,
            StorageType::Viewfs => &VIEWFS_AUTHORITY,
        };
        authority
            .captures(path)
            .map(|c| format!("{}{}", self.scheme(), &c[1]))
            .ok_or_else(|| {
                GvfsError::InvalidPath(format!(
                    "cannot extract a backend authority from `{path}`"
                ))
            })
    }

    /// Normalize an actual path for the native driver.
    ///
    /// Distributed drivers want the full scheme-qualified URI; the local
    /// driver wants a bare filesystem path.
    pub fn strip_protocol<'a>(&self, path: &'a str) -> Cow<'a, str> {
        match self {
            StorageType::Hdfs | StorageType::Viewfs => Cow::Borrowed(path),
            StorageType::Local => match path.strip_prefix("file:") {
                Some(stripped) => Cow::Borrowed(stripped),
                None => Cow::Borrowed(path),
            },
        }
    }

    /// The backend-native form of a fileset's storage location, used as the
    /// actual-prefix when translating backend result paths to virtual form.
    ///
    /// Distributed drivers report result paths without scheme or authority;
    /// the local driver reports bare paths.
    pub fn native_prefix(&self, storage_location: &str) -> Result<String> {
        match self {
            StorageType::Hdfs | StorageType::Viewfs => {
                let rest = storage_location
                    .strip_prefix(self.scheme())
                    .ok_or_else(|| {
                        GvfsError::InvalidPath(format!(
                            "storage location `{storage_location}` does not match scheme `{}`",
                            self.scheme()
                        ))
                    })?;
                match rest.find('/') {
                    Some(slash) => Ok(rest[slash..].to_string()),
                    None => Err(GvfsError::InvalidPath(format!(
                        "storage location `{storage_location}` has no path after the authority"
                    ))),
                }
            }
            StorageType::Local => Ok(self.strip_protocol(storage_location).into_owned()),
        }
    }

    /// Whether opening a handle requires the one-time environment bootstrap.
    pub fn requires_bootstrap(&self) -> bool {
        matches!(self, StorageType::Hdfs | StorageType::Viewfs)
    }

    /// Created-time queries are only answered by the local driver.
    pub fn supports_created_time(&self) -> bool {
        matches!(self, StorageType::Local)
    }

    /// Whether move recursion-control parameters reach the driver. The
    /// distributed drivers' native move already covers directories and
    /// takes no recursion flag.
    pub fn supports_recursive_move(&self) -> bool {
        matches!(self, StorageType::Local)
    }

    /// Directory-delete semantics: distributed drivers delete a directory
    /// and its contents unconditionally; the local driver refuses a
    /// non-empty directory. Documented, not unified.
    pub fn recursive_dir_delete(&self) -> bool {
        matches!(self, StorageType::Hdfs | StorageType::Viewfs)
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageType::Hdfs => "hdfs",
            StorageType::Viewfs => "viewfs",
            StorageType::Local => "local",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognize() {
        assert_eq!(
            StorageType::recognize("hdfs://nn:8020/data").unwrap(),
            StorageType::Hdfs
        );
        assert_eq!(
            StorageType::recognize("viewfs://cluster/data").unwrap(),
            StorageType::Viewfs
        );
        assert_eq!(
            StorageType::recognize("file:/var/data").unwrap(),
            StorageType::Local
        );
    }

    #[test]
    fn test_recognize_rejects_unknown_scheme() {
        let err = StorageType::recognize("s3://bucket/key").unwrap_err();
        assert!(matches!(err, GvfsError::UnsupportedStorage(_)));
        assert!(StorageType::recognize("/bare/path").is_err());
    }

    #[test]
    fn test_backend_key() {
        assert_eq!(
            StorageType::Hdfs.backend_key("hdfs://nn:8020/data/fs1").unwrap(),
            "hdfs://nn:8020"
        );
        assert_eq!(
            StorageType::Viewfs
                .backend_key("viewfs://cluster/data")
                .unwrap(),
            "viewfs://cluster"
        );
        assert_eq!(
            StorageType::Local.backend_key("file:/var/data").unwrap(),
            LOCAL_BACKEND_KEY
        );
    }

    #[test]
    fn test_backend_key_shared_across_filesets() {
        let a = StorageType::Hdfs.backend_key("hdfs://nn:8020/data/fs1").unwrap();
        let b = StorageType::Hdfs.backend_key("hdfs://nn:8020/other/fs2").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_backend_key_malformed_authority() {
        let err = StorageType::Hdfs.backend_key("hdfs:///no-authority").unwrap_err();
        assert!(matches!(err, GvfsError::InvalidPath(_)));
    }

    #[test]
    fn test_strip_protocol() {
        assert_eq!(
            StorageType::Hdfs.strip_protocol("hdfs://nn:8020/data/x"),
            "hdfs://nn:8020/data/x"
        );
        assert_eq!(StorageType::Local.strip_protocol("file:/var/data/x"), "/var/data/x");
    }

    #[test]
    fn test_native_prefix() {
        assert_eq!(
            StorageType::Hdfs.native_prefix("hdfs://nn:8020/data/fs1").unwrap(),
            "/data/fs1"
        );
        assert_eq!(
            StorageType::Local.native_prefix("file:/var/data/fs2").unwrap(),
            "/var/data/fs2"
        );
    }

    #[test]
    fn test_capability_flags() {
        assert!(StorageType::Hdfs.requires_bootstrap());
        assert!(!StorageType::Local.requires_bootstrap());
        assert!(StorageType::Local.supports_created_time());
        assert!(!StorageType::Hdfs.supports_created_time());
        assert!(StorageType::Hdfs.recursive_dir_delete());
        assert!(!StorageType::Local.recursive_dir_delete());
    }
}
