//! Blob Synchronizer - copies the binary assets referenced by exported rows
//! into the package's `app/` mirror.
//!
//! Object keys come from a descriptor's blob path template. The
//! synchronizer makes sure the container exists (once), applies the tenant
//! prefix for multi-tenant deployments and retries transient failures.
//! A missing object is not an error: `sync` reports `false`.

pub mod directory;

pub use directory::DirectoryBlobStore;

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::retry::RetryPolicy;
use crate::{Error, Result};

/// Directory inside a seed package holding the blob mirror
pub const MIRROR_DIR: &str = "app";

/// Access to the object store
pub trait BlobStore {
    /// Create the container if it does not exist yet
    fn ensure_container(&self) -> Result<()>;

    /// Copy the object stored under `key` to `dest`.
    ///
    /// Returns `Ok(false)` when no such object exists.
    fn fetch(&self, key: &str, dest: &Path) -> Result<bool>;
}

impl<T: BlobStore + ?Sized> BlobStore for &T {
    fn ensure_container(&self) -> Result<()> {
        (**self).ensure_container()
    }

    fn fetch(&self, key: &str, dest: &Path) -> Result<bool> {
        (**self).fetch(key, dest)
    }
}

/// Reject keys that could escape the container or the mirror directory
pub fn validate_key(key: &str) -> Result<()> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if bad {
        return Err(Error::InvalidObjectKey(key.to_string()));
    }
    Ok(())
}

/// Where the blob stored under `key` lands inside a package
pub fn mirror_path(package_dir: &Path, key: &str) -> PathBuf {
    key.split('/')
        .fold(package_dir.join(MIRROR_DIR), |path, segment| path.join(segment))
}

pub struct BlobSynchronizer<S> {
    store: S,
    retry: RetryPolicy,
    tenant: Option<String>,
    container_ready: Cell<bool>,
}

impl<S: BlobStore> BlobSynchronizer<S> {
    pub fn new(store: S, retry: RetryPolicy) -> Self {
        Self {
            store,
            retry,
            tenant: None,
            container_ready: Cell::new(false),
        }
    }

    /// Prefix every object key with `<tenant>/`
    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    /// Key as stored in the container
    pub fn stored_key(&self, key: &str) -> String {
        match &self.tenant {
            Some(tenant) => format!("{}/{}", tenant, key),
            None => key.to_string(),
        }
    }

    /// Fetch `key` into `dest`, creating parent directories.
    ///
    /// Returns whether the object existed. On failure no partial file is
    /// left behind.
    pub fn sync(&self, key: &str, dest: &Path) -> Result<bool> {
        validate_key(key)?;
        self.ensure_container()?;

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        let stored = self.stored_key(key);
        match self.retry.run("blob fetch", || self.store.fetch(&stored, dest)) {
            Ok(true) => {
                debug!(key = %stored, dest = %dest.display(), "Fetched blob");
                Ok(true)
            }
            Ok(false) => {
                debug!(key = %stored, "Blob not found");
                Ok(false)
            }
            Err(e) => {
                if dest.exists() {
                    if let Err(cleanup) = fs::remove_file(dest) {
                        warn!(dest = %dest.display(), error = %cleanup, "Failed to remove partial blob");
                    }
                }
                Err(e)
            }
        }
    }

    fn ensure_container(&self) -> Result<()> {
        if self.container_ready.get() {
            return Ok(());
        }
        self.retry.run("ensure container", || self.store.ensure_container())?;
        self.container_ready.set(true);
        Ok(())
    }
}
