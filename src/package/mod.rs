//! Package Assembler - writes a seed package for a set of requested roots.
//!
//! Layout of the output directory:
//! - `add_<type>.sql`: one insert statement per line, in emission order
//! - `recipe.json`: the scripts in apply order
//! - `exported.json`: every node the package contains
//! - `app/<key>`: mirrored blobs
//!
//! Scripts are registered following the registry's script plan, so
//! replaying them in manifest order never violates a foreign key. The
//! manifest is written last.
//!
//! Appending continues a package: nodes listed in `exported.json` count as
//! present and are not written again, and the manifest is re-planned over
//! the old and new types together.

pub mod ledger;
pub mod manifest;
pub mod report;
pub mod request;

pub use ledger::{Ledger, LEDGER_FILE};
pub use manifest::{PackageInfo, Recipe, RECIPE_FILE};
pub use report::{BlobStats, ExportReport};
pub use request::{ExportRequest, RootSelector};

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::blob::{self, BlobStore, BlobSynchronizer};
use crate::registry::Registry;
use crate::resolver::{NodeKey, ResolveOptions, ResourceNode, Resolver};
use crate::resource::ResourceType;
use crate::retry::RetryPolicy;
use crate::serializer;
use crate::storage::RowSource;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct ExportOptions {
    /// Continue an existing package instead of recreating it
    pub append: bool,
    /// Leave built-in sentinel rows out of the package
    pub skip_sentinels: bool,
}

pub struct PackageAssembler<'a, S, B> {
    registry: &'a Registry,
    source: S,
    blobs: BlobSynchronizer<B>,
    retry: RetryPolicy,
    info: PackageInfo,
}

impl<'a, S: RowSource, B: BlobStore> PackageAssembler<'a, S, B> {
    pub fn new(registry: &'a Registry, source: S, blobs: BlobSynchronizer<B>) -> Self {
        Self {
            registry,
            source,
            blobs,
            retry: RetryPolicy::default(),
            info: PackageInfo::default(),
        }
    }

    /// Retry policy for row lookups
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_info(mut self, info: PackageInfo) -> Self {
        self.info = info;
        self
    }

    /// Export `request` into `output_dir`.
    ///
    /// Per-node problems end up in the report; only configuration errors and
    /// failures to write the package itself are returned as `Err`.
    pub fn export(&self, request: &ExportRequest, output_dir: &Path, options: ExportOptions) -> Result<ExportReport> {
        let roots = request.roots(self.registry)?;

        fs::create_dir_all(output_dir).map_err(|source| Error::Output {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let previous = if options.append {
            self.load_previous(output_dir)?
        } else {
            self.remove_stale_scripts(output_dir)?;
            Previous::default()
        };

        let mut planned = previous.types.clone();
        planned.extend(request.types());
        let plan = self.registry.script_plan(&planned)?;

        info!(
            output = %output_dir.display(),
            roots = roots.len(),
            append = options.append,
            "Exporting seed package"
        );

        let mut scripts = ScriptWriters::new(output_dir);
        let mut blob_stats = BlobStats::default();
        let mut resolver = Resolver::new(self.registry, &self.source)
            .with_retry(self.retry)
            .with_options(ResolveOptions {
                skip_sentinels: options.skip_sentinels,
            })
            .with_present(previous.ledger.nodes.iter().cloned());

        let mut sink = |node: &ResourceNode| -> Result<()> {
            let descriptor = self.registry.descriptor(node.resource_type())?;
            let statement = serializer::serialize(&node.row, descriptor.table_name)?;

            if let Some(key) = descriptor.object_key(&node.row) {
                if descriptor.is_sentinel(node.identifier()) {
                    debug!(node = %node.key, "Sentinel, blob not synchronized");
                    blob_stats.skipped += 1;
                } else {
                    let dest = blob::mirror_path(output_dir, &key);
                    let found = self.blobs.sync(&key, &dest).map_err(|e| match e {
                        Error::InvalidObjectKey(_) => e,
                        other => Error::Blob {
                            key: key.clone(),
                            reason: other.to_string(),
                        },
                    })?;
                    if found {
                        blob_stats.fetched += 1;
                    } else {
                        warn!(node = %node.key, key = %key, "Blob not found, exporting row without it");
                        blob_stats.missing += 1;
                    }
                }
            }

            scripts.append(node.resource_type(), &statement)
        };

        let mut root_keys = Vec::with_capacity(roots.len());
        for (resource_type, identifier) in &roots {
            resolver.resolve_into(*resource_type, identifier, &mut sink)?;
            let value = self.registry.descriptor(*resource_type)?.key_value(identifier);
            root_keys.push(NodeKey::new(*resource_type, value.to_string()));
        }

        let written = scripts.finish()?;
        let mut recipe = Recipe::new(&self.info);
        for name in &previous.foreign_scripts {
            recipe.add_script(name);
        }
        for resource_type in &plan {
            if written.contains(resource_type) || previous.types.contains(resource_type) {
                recipe.add_script(&resource_type.script_file_name());
            }
        }

        let (emitted, failures) = resolver.into_outcome();
        let mut ledger = previous.ledger;
        ledger.extend(emitted.iter().cloned());
        ledger.write(output_dir)?;
        recipe.write(output_dir)?;

        let report = ExportReport {
            output_dir: output_dir.to_path_buf(),
            scripts: recipe.script_names(),
            roots: root_keys,
            emitted,
            failures,
            blobs: blob_stats,
        };
        info!(
            emitted = report.emitted.len(),
            failures = report.failures.len(),
            scripts = report.scripts.len(),
            blobs_fetched = report.blobs.fetched,
            blobs_missing = report.blobs.missing,
            "Seed package written"
        );
        Ok(report)
    }

    fn remove_stale_scripts(&self, output_dir: &Path) -> Result<()> {
        for resource_type in self.registry.types() {
            let path = output_dir.join(resource_type.script_file_name());
            if path.is_file() {
                debug!(path = %path.display(), "Removing stale script");
                fs::remove_file(&path).map_err(|source| Error::Output { path, source })?;
            }
        }
        Ok(())
    }

    /// Scripts and nodes of the package being continued
    fn load_previous(&self, output_dir: &Path) -> Result<Previous> {
        let mut previous = Previous::default();
        let recipe = Recipe::load(output_dir)?;
        let names = recipe.as_ref().map(Recipe::script_names).unwrap_or_default();
        for name in names {
            match ResourceType::from_script_file_name(&name) {
                Some(ty) => previous.types.push(ty),
                None => previous.foreign_scripts.push(name),
            }
        }
        for resource_type in self.registry.types() {
            if !previous.types.contains(&resource_type)
                && output_dir.join(resource_type.script_file_name()).is_file()
            {
                previous.types.push(resource_type);
            }
        }

        match Ledger::load(output_dir)? {
            Some(ledger) => previous.ledger = ledger,
            None if !previous.types.is_empty() => {
                warn!(
                    output = %output_dir.display(),
                    "No {} in the package, rows written earlier may be repeated",
                    LEDGER_FILE
                );
            }
            None => {}
        }
        debug!(
            scripts = previous.types.len(),
            nodes = previous.ledger.nodes.len(),
            "Continuing existing package"
        );
        Ok(previous)
    }
}

/// State of an existing package read before appending to it
#[derive(Debug, Default)]
struct Previous {
    types: Vec<ResourceType>,
    /// Scripts listed in the recipe that no resource type produces
    foreign_scripts: Vec<String>,
    ledger: Ledger,
}

/// Lazily opened script files, one per resource type
struct ScriptWriters {
    dir: PathBuf,
    open: HashMap<ResourceType, BufWriter<File>>,
}

impl ScriptWriters {
    fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            open: HashMap::new(),
        }
    }

    fn append(&mut self, resource_type: ResourceType, statement: &str) -> Result<()> {
        let path = self.dir.join(resource_type.script_file_name());
        let output_error = |source: std::io::Error| Error::Output {
            path: path.clone(),
            source,
        };

        let writer = match self.open.entry(resource_type) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .map_err(output_error)?;
                entry.insert(BufWriter::new(file))
            }
        };
        writeln!(writer, "{}", statement).map_err(output_error)
    }

    /// Flush everything, returning the types that received statements
    fn finish(self) -> Result<Vec<ResourceType>> {
        let mut written = Vec::with_capacity(self.open.len());
        for (resource_type, mut writer) in self.open {
            writer.flush().map_err(|source| Error::Output {
                path: self.dir.join(resource_type.script_file_name()),
                source,
            })?;
            written.push(resource_type);
        }
        written.sort();
        Ok(written)
    }
}
