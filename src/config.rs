//! `seed-maker.toml` and environment overrides
//!
//! Precedence: command-line flags > `SEED_MAKER_*` environment > file >
//! defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::package::PackageInfo;
use crate::retry::{DEFAULT_ATTEMPTS, DEFAULT_BASE_DELAY_MS, RetryPolicy};

pub const ENV_DATABASE: &str = "SEED_MAKER_DATABASE";
pub const ENV_BLOB_ROOT: &str = "SEED_MAKER_BLOB_ROOT";
pub const ENV_BUCKET: &str = "SEED_MAKER_BUCKET";
pub const ENV_TENANT: &str = "SEED_MAKER_TENANT";
pub const ENV_OUTPUT_ROOT: &str = "SEED_MAKER_OUTPUT_ROOT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SeedMakerConfig {
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub retry: RetryConfig,
    pub package: PackageInfo,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite snapshot of the application database
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("dsw.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one subdirectory per bucket
    pub blob_root: PathBuf,
    pub bucket: String,
    pub multi_tenant: bool,
    pub tenant: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            blob_root: PathBuf::from("s3"),
            bucket: "engine-wizard".to_string(),
            multi_tenant: false,
            tenant: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub attempts: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Packages requested over HTTP are written below this directory
    pub output_root: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("output"),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.attempts, Duration::from_millis(self.base_delay_ms), self.multiplier)
    }
}

impl SeedMakerConfig {
    /// Apply `SEED_MAKER_*` overrides read through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(ENV_DATABASE) {
            self.database.path = PathBuf::from(path);
        }
        if let Some(root) = lookup(ENV_BLOB_ROOT) {
            self.storage.blob_root = PathBuf::from(root);
        }
        if let Some(bucket) = lookup(ENV_BUCKET) {
            self.storage.bucket = bucket;
        }
        if let Some(tenant) = lookup(ENV_TENANT) {
            self.storage.multi_tenant = true;
            self.storage.tenant = Some(tenant);
        }
        if let Some(root) = lookup(ENV_OUTPUT_ROOT) {
            self.server.output_root = PathBuf::from(root);
        }
    }

    /// Tenant prefix for object keys, if the deployment is multi-tenant
    pub fn tenant_prefix(&self) -> crate::Result<Option<&str>> {
        if !self.storage.multi_tenant {
            return Ok(None);
        }
        match self.storage.tenant.as_deref() {
            Some(tenant) if !tenant.is_empty() => Ok(Some(tenant)),
            _ => Err(crate::Error::Config(
                "storage.multi_tenant is set but storage.tenant is empty".to_string(),
            )),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("seed-maker.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<SeedMakerConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: SeedMakerConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

/// Load the file (or defaults) and apply the process environment
pub fn resolve_config(path: Option<&Path>) -> anyhow::Result<SeedMakerConfig> {
    let mut config = load_config(path)?.unwrap_or_default();
    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}

pub fn write_config(path: &Path, config: &SeedMakerConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_blob_root(config: &SeedMakerConfig) -> anyhow::Result<()> {
    let container = config.storage.blob_root.join(&config.storage.bucket);
    if !container.exists() {
        std::fs::create_dir_all(container)?;
    }
    Ok(())
}
