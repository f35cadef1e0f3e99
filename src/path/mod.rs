//! Virtual path grammar and identifier translation.
//!
//! A virtual path has the form
//! `[filesetfs://]fileset/{catalog}/{schema}/{fileset}[/{subpath...}]` and
//! names data independently of where the bytes live. This module parses and
//! validates that grammar and converts backend result paths back to virtual
//! form.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{GvfsError, Result};

/// Optional protocol marker stripped before parsing.
pub const PROTOCOL_PREFIX: &str = "filesetfs://";
/// Every virtual path starts with this segment once normalized.
pub const FILESET_PREFIX: &str = "fileset/";

// Matches exactly three segments after `fileset/`, with an arbitrary
// sub-path after them.
static IDENTIFIER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^fileset/([^/]+)/([^/]+)/([^/]+)(?:/[^/]+)*/?$").unwrap()
});

/// Uniquely names a fileset: (metalake, catalog, schema, fileset).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    metalake: String,
    catalog: String,
    schema: String,
    fileset: String,
}

impl Identifier {
    pub fn new(
        metalake: impl Into<String>,
        catalog: impl Into<String>,
        schema: impl Into<String>,
        fileset: impl Into<String>,
    ) -> Self {
        Identifier {
            metalake: metalake.into(),
            catalog: catalog.into(),
            schema: schema.into(),
            fileset: fileset.into(),
        }
    }

    pub fn metalake(&self) -> &str {
        &self.metalake
    }

    pub fn catalog(&self) -> &str {
        &self.catalog
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn fileset(&self) -> &str {
        &self.fileset
    }

    /// Project out the catalog-level identifier used as the catalog cache
    /// key. Independent of schema and fileset.
    pub fn catalog_id(&self) -> CatalogId {
        CatalogId {
            metalake: self.metalake.clone(),
            catalog: self.catalog.clone(),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.metalake, self.catalog, self.schema, self.fileset
        )
    }
}

/// Names a catalog within a metalake.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CatalogId {
    pub metalake: String,
    pub catalog: String,
}

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.metalake, self.catalog)
    }
}

/// Strip the optional protocol prefix and require the `fileset/` marker.
pub fn normalize(path: &str) -> Result<String> {
    let stripped = path.strip_prefix(PROTOCOL_PREFIX).unwrap_or(path);
    if !stripped.starts_with(FILESET_PREFIX) {
        return Err(GvfsError::InvalidPath(format!(
            "invalid virtual path `{path}`: expected it to start with `{FILESET_PREFIX}`, \
             e.g. fileset/{{catalog}}/{{schema}}/{{fileset}}/{{sub_path}}"
        )));
    }
    Ok(stripped.to_string())
}

/// Extract the fileset identifier from a normalized virtual path.
pub fn extract_identifier(metalake: &str, path: &str) -> Result<Identifier> {
    let captures = IDENTIFIER_PATTERN.captures(path).ok_or_else(|| {
        GvfsError::InvalidPath(format!(
            "virtual path `{path}` does not contain a valid fileset identifier"
        ))
    })?;
    Ok(Identifier::new(
        metalake,
        &captures[1],
        &captures[2],
        &captures[3],
    ))
}

/// Reconstruct the virtual location of a fileset:
/// `fileset/{catalog}/{schema}/{fileset}`.
pub fn virtual_location(identifier: &Identifier) -> String {
    format!(
        "fileset/{}/{}/{}",
        identifier.catalog(),
        identifier.schema(),
        identifier.fileset()
    )
}

/// The portion of a normalized virtual path after the fileset identifier.
/// May be empty when the path names the fileset root itself.
pub fn sub_path(path: &str, identifier: &Identifier) -> String {
    let location = virtual_location(identifier);
    path[location.len()..].to_string()
}

/// Map a backend result path back to virtual form.
///
/// `actual_prefix` is the backend-native form of the fileset's storage
/// location. A result path outside the prefix signals a metadata/storage
/// inconsistency and fails hard rather than falling back.
pub fn actual_to_virtual(
    actual_path: &str,
    actual_prefix: &str,
    identifier: &Identifier,
) -> Result<String> {
    let rest = actual_path.strip_prefix(actual_prefix).ok_or_else(|| {
        GvfsError::InvalidPath(format!(
            "actual path `{actual_path}` does not start with prefix `{actual_prefix}`"
        ))
    })?;
    Ok(format!("{}{}", virtual_location(identifier), rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_protocol() {
        let path = normalize("filesetfs://fileset/cat1/sch1/fs1/a.txt").unwrap();
        assert_eq!(path, "fileset/cat1/sch1/fs1/a.txt");
    }

    #[test]
    fn test_normalize_plain_path() {
        let path = normalize("fileset/cat1/sch1/fs1").unwrap();
        assert_eq!(path, "fileset/cat1/sch1/fs1");
    }

    #[test]
    fn test_normalize_rejects_foreign_prefix() {
        assert!(normalize("/cat1/sch1/fs1").is_err());
        assert!(normalize("hdfs://nn:8020/data").is_err());
        assert!(normalize("").is_err());
    }

    #[test]
    fn test_extract_identifier() {
        let ident =
            extract_identifier("m1", "fileset/cat1/sch1/fs1/sub/dir/file.txt").unwrap();
        assert_eq!(ident.metalake(), "m1");
        assert_eq!(ident.catalog(), "cat1");
        assert_eq!(ident.schema(), "sch1");
        assert_eq!(ident.fileset(), "fs1");
    }

    #[test]
    fn test_extract_identifier_fileset_root() {
        let ident = extract_identifier("m1", "fileset/cat1/sch1/fs1").unwrap();
        assert_eq!(ident.fileset(), "fs1");
        let ident = extract_identifier("m1", "fileset/cat1/sch1/fs1/").unwrap();
        assert_eq!(ident.fileset(), "fs1");
    }

    #[test]
    fn test_extract_identifier_rejects_short_paths() {
        assert!(extract_identifier("m1", "fileset/cat1/sch1").is_err());
        assert!(extract_identifier("m1", "fileset/cat1").is_err());
        assert!(extract_identifier("m1", "fileset//sch1/fs1").is_err());
    }

    #[test]
    fn test_virtual_location() {
        let ident = Identifier::new("m1", "cat1", "sch1", "fs1");
        assert_eq!(virtual_location(&ident), "fileset/cat1/sch1/fs1");
    }

    #[test]
    fn test_sub_path() {
        let ident = Identifier::new("m1", "cat1", "sch1", "fs1");
        assert_eq!(sub_path("fileset/cat1/sch1/fs1/a/b", &ident), "/a/b");
        assert_eq!(sub_path("fileset/cat1/sch1/fs1", &ident), "");
    }

    #[test]
    fn test_actual_to_virtual() {
        let ident = Identifier::new("m1", "cat1", "sch1", "fs1");
        let virtual_path =
            actual_to_virtual("/data/fs1/dir/x.txt", "/data/fs1", &ident).unwrap();
        assert_eq!(virtual_path, "fileset/cat1/sch1/fs1/dir/x.txt");
    }

    #[test]
    fn test_actual_to_virtual_prefix_mismatch_fails() {
        let ident = Identifier::new("m1", "cat1", "sch1", "fs1");
        let err = actual_to_virtual("/other/fs1/x", "/data/fs1", &ident).unwrap_err();
        assert!(matches!(err, GvfsError::InvalidPath(_)));
    }

    #[test]
    fn test_round_trip_preserves_identifier() {
        let ident = Identifier::new("m1", "cat1", "sch1", "fs1");
        let virtual_path =
            actual_to_virtual("/data/fs1/sub/y", "/data/fs1", &ident).unwrap();
        let parsed = extract_identifier("m1", &normalize(&virtual_path).unwrap()).unwrap();
        assert_eq!(parsed, ident);
    }

    #[test]
    fn test_catalog_id_independent_of_fileset() {
        let a = Identifier::new("m1", "cat1", "sch1", "fs1");
        let b = Identifier::new("m1", "cat1", "sch2", "fs2");
        assert_eq!(a.catalog_id(), b.catalog_id());
    }
}
