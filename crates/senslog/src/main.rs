use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use senslog_core::config::IngestConfig;
use senslog_core::events::TracingSink;
use senslog_core::ingestion::{plan_sessions, run_ingest, CancellationFlag, IngestOptions};
use senslog_core::store::{MemoryStore, SensorStore, SqliteStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DB_PATH_ENV: &str = "SENSLOG_DB_PATH";

#[derive(Parser, Debug)]
#[command(author, version, about = "Sensor log ingestion CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Discover, consolidate and persist sensor logs for the configured events
    Ingest(IngestArgs),
    /// List the session groups a config would select, without reading file contents
    Discover(DiscoverArgs),
}

#[derive(Args, Debug)]
struct IngestArgs {
    /// Path to a JSON or TOML run config
    #[arg(long)]
    config: PathBuf,
    /// Consolidate into memory only; nothing is written to the store
    #[arg(long)]
    dry_run: bool,
    /// Also write each selected group as a parquet file into this directory
    #[arg(long)]
    export_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DiscoverArgs {
    /// Path to a JSON or TOML run config
    #[arg(long)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Ingest(args) => ingest(args).await,
        Command::Discover(args) => {
            let config = load_config(&args.config)?;
            let plan = plan_sessions(&config, &TracingSink)?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
            Ok(())
        }
    }
}

fn load_config(path: &Path) -> Result<IngestConfig> {
    let mut config = IngestConfig::load(path)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    if let Ok(db_path) = std::env::var(DB_PATH_ENV) {
        info!(db_path = %db_path, "Store path overridden from {DB_PATH_ENV}");
        config.db_path = PathBuf::from(db_path);
    }
    Ok(config)
}

async fn ingest(args: IngestArgs) -> Result<()> {
    let config = load_config(&args.config)?;

    if let Some(dir) = &args.export_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create export dir {}", dir.display()))?;
    }
    let options = IngestOptions {
        export_dir: args.export_dir,
    };

    let cancel = CancellationFlag::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; stopping after the current group");
            on_signal.cancel();
        }
    });

    let mut store: Box<dyn SensorStore> = if args.dry_run {
        info!("Dry run: records are consolidated in memory only");
        Box::new(MemoryStore::new())
    } else {
        let store = SqliteStore::open(&config.db_path)
            .await
            .with_context(|| format!("failed to open store {}", config.db_path.display()))?;
        Box::new(store)
    };

    let outcome = run_ingest(&config, store.as_mut(), &TracingSink, &cancel, &options).await;
    let closed = store.close().await;

    let report = outcome?;
    closed.context("failed to close store")?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
