//! TABS-Harvest main entry point
//!
//! This is the command-line interface for the TABS-Harvest project scraper.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tabs_harvest::config::{load_config, validate, Config};
use tabs_harvest::output::{format_search_results, load_statistics, print_run_statistics, print_statistics};
use tabs_harvest::pipeline::run_scrape;
use tabs_harvest::storage::{open_store, RecordStore, SqliteStore};
use tracing_subscriber::EnvFilter;

/// TABS-Harvest: a polite construction project harvester
///
/// Pages through the TDLR TABS project search, enriches every project from
/// its detail page and keeps a deduplicated local SQLite copy.
#[derive(Parser, Debug)]
#[command(name = "tabs-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A polite TDLR TABS project harvester", long_about = None)]
struct Cli {
    /// Path to an optional TOML configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape the listing and store every project
    Scrape(ScrapeArgs),

    /// Search stored projects
    Search(SearchArgs),

    /// Show database statistics and recent runs
    Stats(DbArgs),
}

#[derive(Args, Debug)]
struct DbArgs {
    /// SQLite database path
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ScrapeArgs {
    #[command(flatten)]
    db: DbArgs,

    /// Records per listing page (the service caps this at 15)
    #[arg(long, value_name = "N")]
    page_size: Option<u32>,

    /// Minimum delay between request starts, in seconds
    #[arg(long, value_name = "SECS")]
    delay: Option<f64>,

    /// Stop after this many records have been attempted
    #[arg(long, value_name = "N")]
    max_records: Option<u64>,

    /// Maximum concurrent detail fetches
    #[arg(long, value_name = "N")]
    concurrency: Option<u32>,
}

#[derive(Args, Debug)]
struct SearchArgs {
    #[command(flatten)]
    db: DbArgs,

    /// Text to look for in project number, name, facility, city or county
    query: String,

    /// Maximum number of results
    #[arg(long, default_value_t = 50)]
    limit: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("failed to load configuration {}", path.display()))?
        }
        None => Config::default(),
    };

    match cli.command {
        Command::Scrape(args) => {
            apply_scrape_overrides(&mut config, &args)?;
            validate(&config).context("invalid configuration")?;
            handle_scrape(&config).await
        }
        Command::Search(args) => {
            apply_db_override(&mut config, &args.db);
            handle_search(&config, &args.query, args.limit)
        }
        Command::Stats(args) => {
            apply_db_override(&mut config, &args);
            handle_stats(&config)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tabs_harvest=info,warn"),
            1 => EnvFilter::new("tabs_harvest=debug,info"),
            2 => EnvFilter::new("tabs_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn apply_db_override(config: &mut Config, args: &DbArgs) {
    if let Some(db) = &args.db {
        config.output.database_path = db.to_string_lossy().into_owned();
    }
}

/// Layers command-line flags over the file configuration
fn apply_scrape_overrides(config: &mut Config, args: &ScrapeArgs) -> anyhow::Result<()> {
    apply_db_override(config, &args.db);

    if let Some(page_size) = args.page_size {
        config.scrape.page_size = page_size;
    }
    if let Some(delay) = args.delay {
        if !delay.is_finite() || delay < 0.0 {
            bail!("--delay must be a non-negative number of seconds, got {}", delay);
        }
        config.scrape.delay_ms = (delay * 1000.0).round() as u64;
    }
    if let Some(max_records) = args.max_records {
        config.scrape.max_records = Some(max_records);
    }
    if let Some(concurrency) = args.concurrency {
        config.scrape.max_concurrency = concurrency;
    }
    Ok(())
}

/// Handles the `scrape` command
async fn handle_scrape(config: &Config) -> anyhow::Result<()> {
    tracing::info!(
        "Scraping into {} (page size {}, delay {}ms, concurrency {}, max records {})",
        config.output.database_path,
        config.scrape.page_size,
        config.scrape.delay_ms,
        config.scrape.max_concurrency,
        config
            .scrape
            .max_records
            .map_or_else(|| "all".to_string(), |n| n.to_string())
    );

    match run_scrape(config).await {
        Ok(stats) => {
            print_run_statistics(&stats);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Scrape failed: {}", e);
            Err(e).context("scrape aborted")
        }
    }
}

/// Handles the `search` command
fn handle_search(config: &Config, query: &str, limit: usize) -> anyhow::Result<()> {
    let store = open_existing(&config.output.database_path)?;
    let results = store.search(query, limit)?;
    print!("{}", format_search_results(query, &results));
    Ok(())
}

/// Handles the `stats` command
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);
    let store = open_existing(&config.output.database_path)?;
    let stats = load_statistics(&store)?;
    print_statistics(&stats);
    Ok(())
}

/// Opens a database that a previous scrape created
fn open_existing(path: &str) -> anyhow::Result<SqliteStore> {
    if !Path::new(path).exists() {
        bail!("database {} does not exist; run `tabs-harvest scrape` first", path);
    }
    open_store(Path::new(path)).with_context(|| format!("failed to open database {}", path))
}
