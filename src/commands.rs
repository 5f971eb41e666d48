use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use seed_maker::config::{self, SeedMakerConfig};
use seed_maker::ui::{self, Icons, TableBuilder};
use seed_maker::{service, ExportOptions, ExportRequest, Registry, ResourceType};

/// Global flags that take precedence over config file and environment
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub database: Option<PathBuf>,
    pub blob_root: Option<PathBuf>,
}

impl Overrides {
    pub fn resolve(&self) -> anyhow::Result<SeedMakerConfig> {
        let mut config = config::resolve_config(self.config.as_deref())?;
        if let Some(database) = &self.database {
            config.database.path = database.clone();
        }
        if let Some(blob_root) = &self.blob_root {
            config.storage.blob_root = blob_root.clone();
        }
        Ok(config)
    }

    fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(config::default_config_path)
    }
}

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == "-"
}

pub fn run_list(overrides: &Overrides, resource_type: &str, output: &Path) -> anyhow::Result<()> {
    let config = overrides.resolve()?;
    let registry = Registry::builtin()?;
    let only = match resource_type {
        "all" => None,
        name => Some(name.parse::<ResourceType>()?),
    };

    let catalog = service::list(&config, &registry, only)?;
    let json = serde_json::to_string_pretty(&catalog)?;

    if is_stdio(output) {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", json)?;
    } else {
        std::fs::write(output, format!("{}\n", json))?;
        ui::success(&format!(
            "Listed {} resources into {}",
            catalog.total(),
            output.display()
        ));
    }
    Ok(())
}

pub fn run_make_seed(
    overrides: &Overrides,
    input: &Path,
    output_dir: &Path,
    options: ExportOptions,
    json: bool,
) -> anyhow::Result<()> {
    let config = overrides.resolve()?;
    let registry = Registry::builtin()?;

    let raw = if is_stdio(input) {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(input)?
    };
    let request = ExportRequest::from_json(&raw)?;
    if request.is_empty() {
        ui::warn("Request names no resources, writing an empty package");
    }

    if !json {
        ui::header("Creating seed package");
        ui::status(Icons::DATABASE, "Database", &config.database.path.display().to_string());
        ui::status(Icons::FOLDER, "Output", &output_dir.display().to_string());
    }

    let started = Instant::now();
    let report = service::export(&config, &registry, &request, output_dir, options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        ui::section("Summary");
        let mut table = TableBuilder::new();
        for (resource_type, count) in report.emitted_by_type() {
            table.add_row(&resource_type, &count.to_string());
        }
        let rendered = table.build();
        if !rendered.is_empty() {
            println!("{}", rendered);
        }
        ui::summary_row("Scripts:", &report.scripts.join(", "));
        ui::summary_row(
            "Blobs:",
            &format!(
                "{} fetched, {} missing, {} skipped",
                report.blobs.fetched, report.blobs.missing, report.blobs.skipped
            ),
        );
        ui::status(Icons::CLOCK, "Elapsed", &format!("{:.2?}", started.elapsed()));

        if report.is_success() {
            ui::success(&format!(
                "Seed package with {} resources written to {}",
                report.emitted.len(),
                output_dir.display()
            ));
        } else {
            ui::section("Failures");
            println!("{}", ui::failures_table(&report.failures));
            ui::error(&format!(
                "{} resources could not be exported",
                report.failures.len()
            ));
        }
    }

    if !report.is_success() {
        std::process::exit(2);
    }
    Ok(())
}

pub fn run_init(overrides: &Overrides, force: bool) -> anyhow::Result<()> {
    let path = overrides.config_path();
    let config = SeedMakerConfig::default();
    config::write_config(&path, &config, force)?;
    config::ensure_blob_root(&config)?;

    ui::success(&format!("Wrote {}", path.display()));
    ui::info("Database", &config.database.path.display().to_string());
    ui::info(
        "Object store",
        &config.storage.blob_root.join(&config.storage.bucket).display().to_string(),
    );
    Ok(())
}
