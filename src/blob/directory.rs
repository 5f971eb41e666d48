//! Object store backed by a local directory laid out as `<root>/<bucket>/<key>`

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{BlobStore, validate_key};
use crate::Result;

pub struct DirectoryBlobStore {
    root: PathBuf,
    bucket: String,
}

impl DirectoryBlobStore {
    pub fn new(root: impl Into<PathBuf>, bucket: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            bucket: bucket.into(),
        }
    }

    pub fn container_path(&self) -> PathBuf {
        self.root.join(&self.bucket)
    }

    fn object_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(key
            .split('/')
            .fold(self.container_path(), |path, segment| path.join(segment)))
    }
}

impl BlobStore for DirectoryBlobStore {
    fn ensure_container(&self) -> Result<()> {
        fs::create_dir_all(self.container_path())?;
        Ok(())
    }

    fn fetch(&self, key: &str, dest: &Path) -> Result<bool> {
        let source = self.object_path(key)?;
        match fs::copy(&source, dest) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound && !source.exists() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fetch_copies_object() {
        let tmp = TempDir::new().unwrap();
        let store = DirectoryBlobStore::new(tmp.path().join("s3"), "engine-wizard");
        store.ensure_container().unwrap();
        assert!(tmp.path().join("s3/engine-wizard").is_dir());

        let object = store.container_path().join("documents");
        fs::create_dir_all(&object).unwrap();
        fs::write(object.join("d1"), b"report").unwrap();

        let dest = tmp.path().join("d1.out");
        assert!(store.fetch("documents/d1", &dest).unwrap());
        assert_eq!(fs::read(&dest).unwrap(), b"report");
    }

    #[test]
    fn test_missing_object_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let store = DirectoryBlobStore::new(tmp.path(), "bucket");
        store.ensure_container().unwrap();
        assert!(!store.fetch("documents/none", &tmp.path().join("x")).unwrap());
        assert!(!tmp.path().join("x").exists());
    }

    #[test]
    fn test_traversal_key_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let store = DirectoryBlobStore::new(tmp.path(), "bucket");
        assert!(store.fetch("../secret", &tmp.path().join("x")).is_err());
    }
}
