use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fitment_import::{
    config::Config,
    database::Database,
    importer::{ImportService, ImportStateManager},
};

#[derive(Parser)]
#[command(name = "fitment-import")]
#[command(version = "0.1.0")]
#[command(about = "Hierarchical bulk importer for vehicle fitment reference data")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Database URL (overrides config file)
    #[arg(short = 'd', long, value_name = "URL")]
    database_url: Option<String>,

    /// Directory containing the delimited source files
    #[arg(short = 's', long, value_name = "DIR")]
    source_dir: Option<PathBuf>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a full import of all four source files
    Run {
        /// Kits older than this model year are dropped
        #[arg(long)]
        min_year: Option<i32>,

        /// Print the final progress record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Drop and recreate the fitment tables
    Reset,
    /// Show row counts for the imported tables
    Stats {
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("fitment_import={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting fitment importer v{}", env!("CARGO_PKG_VERSION"));

    std::env::set_var("CONFIG_FILE", &cli.config);
    let mut config = Config::load()?;
    info!("Configuration loaded from: {}", cli.config);

    if let Some(database_url) = cli.database_url {
        config.database.url = database_url;
    }
    if let Some(source_dir) = cli.source_dir {
        config.sources.dir = source_dir;
    }

    info!("Using database: {}", config.database.url);

    let database = Database::new(&config.database).await?;
    let state_manager = ImportStateManager::new();
    let service = Arc::new(ImportService::new(database, state_manager, &config));

    match cli.command {
        Command::Run { min_year, json } => {
            let min_year = min_year.unwrap_or(config.import.min_year);
            run_and_watch(service, min_year, json).await
        }
        Command::Reset => {
            service.reset_tables().await?;
            info!("Tables reset");
            Ok(())
        }
        Command::Stats { json } => {
            let Some(stats) = service.get_db_stats().await else {
                anyhow::bail!("Database is unreachable");
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                info!(
                    "brands: {}, models: {}, kits: {}, tyre sizes: {}",
                    stats.brands, stats.models, stats.kits, stats.tyre_sizes
                );
            }
            Ok(())
        }
    }
}

/// Spawns the import as a background task and polls the progress record
/// until it reaches a terminal state.
async fn run_and_watch(service: Arc<ImportService>, min_year: i32, json: bool) -> Result<()> {
    let runner = {
        let service = service.clone();
        tokio::spawn(async move { service.run_import(min_year).await })
    };

    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    while !runner.is_finished() {
        ticker.tick().await;
        let progress = service.get_progress().await;
        if progress.stage.is_terminal() {
            break;
        }
        match &progress.current_table {
            Some(table) if progress.total_rows > 0 => info!(
                "{}: {} ({}/{} rows)",
                progress.stage, table, progress.processed_rows, progress.total_rows
            ),
            Some(table) => info!(
                "{}: {} ({} rows)",
                progress.stage, table, progress.processed_rows
            ),
            None => info!("{}", progress.stage),
        }
    }

    let result = runner.await?;
    let progress = service.get_progress().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&progress)?);
    } else if result.is_ok() {
        let stats = &progress.stats;
        info!(
            "Imported {} brands, {} models, {} kits, {} tyre sizes",
            stats.brands, stats.models, stats.kits, stats.tyre_sizes
        );
        info!(
            "Kept {} of {} kit rows and {} of {} tyre size rows",
            stats.kits,
            stats.kits_filtered_from,
            stats.tyre_sizes,
            stats.tyre_sizes_filtered_from
        );
    }

    result
}
