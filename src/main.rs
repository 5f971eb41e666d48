//! Seed Maker CLI - builds replayable seed packages from a DSW database
//! snapshot and its object store

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "seed-maker")]
#[command(version)]
#[command(about = "Export DSW resources into replayable seed packages")]
#[command(long_about = r#"
Seed Maker exports users, projects, documents, knowledge models, locales and
document templates into a seed package:
  • add_<type>.sql insert scripts, prerequisites first
  • recipe.json listing the scripts in apply order
  • app/ mirror of the referenced blobs

Example usage:
  seed-maker list -t documents -o resources.json
  seed-maker make-seed -i resources.json -o ./seed
  seed-maker serve --port 8000
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database snapshot (overrides config and environment)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Root directory of the object store (overrides config and environment)
    #[arg(long, global = true)]
    blob_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List resources available for export
    List {
        /// Resource type to list (defaults to all)
        #[arg(short = 't', long = "type", default_value = "all")]
        resource_type: String,

        /// Output file (JSON), `-` for stdout
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Create a seed package from a JSON request
    MakeSeed {
        /// Input file (JSON), `-` for stdin
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Continue an existing package instead of recreating it
        #[arg(long)]
        append: bool,

        /// Leave built-in rows such as the default locale out of the package
        #[arg(long)]
        skip_sentinels: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the HTTP API
    Serve {
        /// Port to bind to
        #[arg(short, long, default_value = "8000")]
        port: u16,
    },

    /// Write a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let overrides = commands::Overrides {
        config: cli.config,
        database: cli.database,
        blob_root: cli.blob_root,
    };

    match cli.command {
        Commands::List { resource_type, output } => commands::run_list(&overrides, &resource_type, &output),
        Commands::MakeSeed {
            input,
            output_dir,
            append,
            skip_sentinels,
            json,
        } => commands::run_make_seed(
            &overrides,
            &input,
            &output_dir,
            seed_maker::ExportOptions { append, skip_sentinels },
            json,
        ),
        Commands::Serve { port } => {
            let config = overrides.resolve()?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(seed_maker::server::start_server(port, config))
        }
        Commands::Init { force } => commands::run_init(&overrides, force),
    }
}
