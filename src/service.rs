//! Wiring shared by the CLI and the web layer: opens the configured stores
//! and runs listings and exports against them.

use std::path::Path;

use tracing::debug;

use crate::blob::{BlobSynchronizer, DirectoryBlobStore};
use crate::catalog::{self, Catalog};
use crate::config::SeedMakerConfig;
use crate::package::{ExportOptions, ExportReport, ExportRequest, PackageAssembler};
use crate::registry::Registry;
use crate::resource::ResourceType;
use crate::storage::SqliteStore;
use crate::{Error, Result};

/// Open the configured database snapshot read-only
pub fn open_store(config: &SeedMakerConfig) -> Result<SqliteStore> {
    let path = &config.database.path;
    if !path.is_file() {
        return Err(Error::Config(format!("database {} does not exist", path.display())));
    }
    debug!(database = %path.display(), "Opening database");
    SqliteStore::open(path)
}

/// Blob synchronizer for the configured object store
pub fn blob_synchronizer(config: &SeedMakerConfig) -> Result<BlobSynchronizer<DirectoryBlobStore>> {
    let store = DirectoryBlobStore::new(&config.storage.blob_root, config.storage.bucket.clone());
    let sync = BlobSynchronizer::new(store, config.retry.policy());
    Ok(match config.tenant_prefix()? {
        Some(tenant) => sync.with_tenant(tenant),
        None => sync,
    })
}

pub fn list(config: &SeedMakerConfig, registry: &Registry, only: Option<ResourceType>) -> Result<Catalog> {
    let store = open_store(config)?;
    catalog::list_resources(registry, &store, only)
}

pub fn export(
    config: &SeedMakerConfig,
    registry: &Registry,
    request: &ExportRequest,
    output_dir: &Path,
    options: ExportOptions,
) -> Result<ExportReport> {
    let store = open_store(config)?;
    let blobs = blob_synchronizer(config)?;
    PackageAssembler::new(registry, &store, blobs)
        .with_retry(config.retry.policy())
        .with_info(config.package.clone())
        .export(request, output_dir, options)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::storage::schema;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Config pointing at a scenario database and an empty blob root
    pub(crate) fn scenario_config(dir: &Path) -> SeedMakerConfig {
        let db = dir.join("dsw.db");
        let conn = rusqlite::Connection::open(&db).unwrap();
        conn.execute_batch(schema::CREATE_TABLES).unwrap();
        conn.execute_batch(schema::SCENARIO_ROWS).unwrap();

        let mut config = SeedMakerConfig::default();
        config.database.path = db;
        config.storage.blob_root = dir.join("s3");
        config.server.output_root = dir.join("packages");
        config.retry.attempts = 1;
        config
    }

    #[test]
    fn test_missing_database_is_a_config_error() {
        let mut config = SeedMakerConfig::default();
        config.database.path = PathBuf::from("/nonexistent/dsw.db");
        assert!(matches!(open_store(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_export_through_configured_stores() {
        let tmp = TempDir::new().unwrap();
        let mut config = scenario_config(tmp.path());
        config.package.name = "Scenario".into();
        let registry = Registry::builtin().unwrap();

        let request = ExportRequest::new().with(ResourceType::Documents, schema::D1);
        let out = tmp.path().join("out");
        let report = export(&config, &registry, &request, &out, ExportOptions::default()).unwrap();

        assert_eq!(report.emitted.len(), 6);
        assert_eq!(report.blobs.missing, 2);
        let recipe = crate::package::Recipe::load(&out).unwrap().unwrap();
        assert_eq!(recipe.name, "Scenario");
    }

    #[test]
    fn test_tenant_prefix_reaches_the_synchronizer() {
        let mut config = SeedMakerConfig::default();
        config.storage.multi_tenant = true;
        config.storage.tenant = Some("t1".into());
        let sync = blob_synchronizer(&config).unwrap();
        assert_eq!(sync.stored_key("documents/d1"), "t1/documents/d1");

        config.storage.tenant = None;
        assert!(blob_synchronizer(&config).is_err());
    }
}
