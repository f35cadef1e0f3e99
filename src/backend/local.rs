//! Local-disk driver backed by `std::fs`.
//!
//! This is the one driver the crate bundles; distributed drivers are
//! external. Its semantic quirks are part of the contract: `delete_dir`
//! refuses non-empty directories, directory moves require the recursion
//! flag, and it is the only driver that answers created-time queries.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use super::{FileKind, FileStatus, FileSystem, FileSystemProvider};
use crate::error::{GvfsError, Result};
use crate::storage::StorageType;

pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        LocalFileSystem
    }

    fn status_of(path: &Path) -> Result<FileStatus> {
        let metadata = fs::metadata(path)?;
        Ok(FileStatus {
            path: path.to_string_lossy().into_owned(),
            size: if metadata.is_dir() { 0 } else { metadata.len() },
            kind: if metadata.is_dir() {
                FileKind::Directory
            } else {
                FileKind::File
            },
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        })
    }
}

impl Default for LocalFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for LocalFileSystem {
    fn list_status(&self, path: &str) -> Result<Vec<FileStatus>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            entries.push(Self::status_of(&entry.path())?);
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    fn file_status(&self, path: &str) -> Result<FileStatus> {
        Self::status_of(Path::new(path))
    }

    fn exists(&self, path: &str) -> Result<bool> {
        Ok(Path::new(path).exists())
    }

    fn copy_file(&self, src: &str, dst: &str) -> Result<()> {
        fs::copy(src, dst)?;
        Ok(())
    }

    fn rename(&self, src: &str, dst: &str) -> Result<()> {
        fs::rename(src, dst)?;
        Ok(())
    }

    fn rename_recursive(
        &self,
        src: &str,
        dst: &str,
        recursive: bool,
        _max_depth: Option<usize>,
    ) -> Result<()> {
        if !recursive && fs::metadata(src)?.is_dir() {
            return Err(GvfsError::UnsupportedOperation(format!(
                "moving directory `{src}` on local storage requires recursive=true"
            )));
        }
        self.rename(src, dst)
    }

    fn delete(&self, path: &str, recursive: bool, _max_depth: Option<usize>) -> Result<()> {
        if fs::metadata(path)?.is_dir() {
            if !recursive {
                return Err(GvfsError::UnsupportedOperation(format!(
                    "deleting directory `{path}` requires recursive=true"
                )));
            }
            fs::remove_dir_all(path)?;
        } else {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn delete_file(&self, path: &str) -> Result<()> {
        fs::remove_file(path)?;
        Ok(())
    }

    fn delete_dir(&self, path: &str) -> Result<()> {
        // remove_dir fails on a non-empty directory, which is exactly the
        // local-storage contract.
        fs::remove_dir(path)?;
        Ok(())
    }

    fn open(&self, path: &str) -> Result<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(path)?))
    }

    fn create(&self, path: &str) -> Result<Box<dyn Write + Send>> {
        Ok(Box::new(File::create(path)?))
    }

    fn append(&self, path: &str) -> Result<Box<dyn Write + Send>> {
        Ok(Box::new(
            OpenOptions::new().append(true).create(true).open(path)?,
        ))
    }

    fn mkdir(&self, path: &str, create_parents: bool) -> Result<()> {
        if create_parents {
            fs::create_dir_all(path)?;
        } else {
            fs::create_dir(path)?;
        }
        Ok(())
    }

    fn makedirs(&self, path: &str, exist_ok: bool) -> Result<()> {
        if !exist_ok && Path::new(path).exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("directory `{path}` already exists"),
            )
            .into());
        }
        fs::create_dir_all(path)?;
        Ok(())
    }

    fn created(&self, path: &str) -> Result<DateTime<Utc>> {
        Ok(DateTime::<Utc>::from(fs::metadata(path)?.created()?))
    }

    fn modified(&self, path: &str) -> Result<DateTime<Utc>> {
        Ok(DateTime::<Utc>::from(fs::metadata(path)?.modified()?))
    }

    fn cat_file(&self, path: &str, start: Option<u64>, end: Option<u64>) -> Result<Bytes> {
        let mut file = File::open(path)?;
        let len = file.metadata()?.len();
        let start = start.unwrap_or(0).min(len);
        let end = end.unwrap_or(len).min(len);
        if end <= start {
            return Ok(Bytes::new());
        }
        file.seek(SeekFrom::Start(start))?;
        let mut buf = vec![0u8; (end - start) as usize];
        file.read_exact(&mut buf)?;
        Ok(Bytes::from(buf))
    }

    fn get_file(&self, remote: &str, local: &str) -> Result<()> {
        fs::copy(remote, local)?;
        Ok(())
    }
}

/// Provider for [`LocalFileSystem`]. One handle serves all local paths.
pub struct LocalFsProvider;

impl FileSystemProvider for LocalFsProvider {
    fn open_filesystem(
        &self,
        _storage_type: StorageType,
        _actual_path: &str,
    ) -> Result<Arc<dyn FileSystem>> {
        Ok(Arc::new(LocalFileSystem::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_file(dir: &Path, name: &str, content: &[u8]) -> String {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_list_and_status() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(tmp.path(), "a.txt", b"hello");
        fs::create_dir(tmp.path().join("sub")).unwrap();

        let fs_impl = LocalFileSystem::new();
        let entries = fs_impl
            .list_status(&tmp.path().to_string_lossy())
            .unwrap();
        assert_eq!(entries.len(), 2);
        let file = entries.iter().find(|e| e.path.ends_with("a.txt")).unwrap();
        assert_eq!(file.kind, FileKind::File);
        assert_eq!(file.size, 5);
        assert!(file.modified.is_some());
        let dir = entries.iter().find(|e| e.path.ends_with("sub")).unwrap();
        assert_eq!(dir.kind, FileKind::Directory);
    }

    #[test]
    fn test_cat_file_byte_range() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_file(tmp.path(), "data.bin", b"0123456789");

        let fs_impl = LocalFileSystem::new();
        assert_eq!(fs_impl.cat_file(&path, None, None).unwrap(), &b"0123456789"[..]);
        assert_eq!(fs_impl.cat_file(&path, Some(2), Some(5)).unwrap(), &b"234"[..]);
        assert_eq!(fs_impl.cat_file(&path, Some(7), None).unwrap(), &b"789"[..]);
        assert_eq!(fs_impl.cat_file(&path, Some(20), None).unwrap(), Bytes::new());
    }

    #[test]
    fn test_delete_dir_refuses_non_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let sub = tmp.path().join("sub");
        fs::create_dir(&sub).unwrap();
        write_file(&sub, "x.txt", b"x");

        let fs_impl = LocalFileSystem::new();
        assert!(fs_impl.delete_dir(&sub.to_string_lossy()).is_err());
        fs::remove_file(sub.join("x.txt")).unwrap();
        fs_impl.delete_dir(&sub.to_string_lossy()).unwrap();
    }

    #[test]
    fn test_rename_directory_requires_recursive() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src_dir");
        fs::create_dir(&src).unwrap();
        let dst = tmp.path().join("dst_dir");

        let fs_impl = LocalFileSystem::new();
        let err = fs_impl
            .rename_recursive(
                &src.to_string_lossy(),
                &dst.to_string_lossy(),
                false,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, GvfsError::UnsupportedOperation(_)));
        fs_impl
            .rename_recursive(&src.to_string_lossy(), &dst.to_string_lossy(), true, None)
            .unwrap();
        assert!(dst.exists());
    }

    #[test]
    fn test_append_and_timestamps() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_file(tmp.path(), "log.txt", b"one");

        let fs_impl = LocalFileSystem::new();
        {
            let mut writer = fs_impl.append(&path).unwrap();
            writer.write_all(b" two").unwrap();
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "one two");
        assert!(fs_impl.created(&path).is_ok());
        assert!(fs_impl.modified(&path).is_ok());
    }

    #[test]
    fn test_makedirs_exist_ok() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a/b/c");
        let nested_str = nested.to_string_lossy();

        let fs_impl = LocalFileSystem::new();
        fs_impl.makedirs(&nested_str, true).unwrap();
        fs_impl.makedirs(&nested_str, true).unwrap();
        assert!(fs_impl.makedirs(&nested_str, false).is_err());
    }
}
