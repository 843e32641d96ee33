//! Profile-Harvest main entry point
//!
//! This is the command-line interface for the Profile-Harvest scraper.

use clap::Parser;
use profile_harvest::config::{hash_content, load_config_with_hash, validate, Config};
use profile_harvest::harvest::{harvest, PipelineMode};
use profile_harvest::output::{
    build_sinks, load_run_statistics, print_statistics, print_summary, write_outcome,
    HarvestSummary,
};
use profile_harvest::storage::open_storage;
use profile_harvest::url::normalize_handle;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Profile-Harvest: a profile-scoped content scraper
///
/// Profile-Harvest scrolls a creator's profile to discover their items,
/// visits each one to read likes, comments, shares, caption and upload time,
/// and writes one CSV row per item.
#[derive(Parser, Debug)]
#[command(name = "profile-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A profile-scoped content scraper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Profile handle to harvest (a leading '@' is ignored)
    #[arg(long)]
    handle: Option<String>,

    /// Number of items to harvest
    #[arg(short = 'n', long)]
    count: Option<u32>,

    /// Pipeline mode: "batch" or "streaming"
    #[arg(long)]
    mode: Option<PipelineMode>,

    /// Run the browser without a window
    #[arg(long)]
    headless: bool,

    /// Directory the CSV file is written to
    #[arg(long, value_name = "DIR")]
    csv_dir: Option<PathBuf>,

    /// Also record the run in this SQLite database
    #[arg(long, value_name = "PATH")]
    database: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Show statistics for the latest stored run and exit
    #[arg(long)]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load configuration, or start from defaults
    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            match load_config_with_hash(path) {
                Ok((cfg, hash)) => {
                    tracing::info!("Configuration loaded successfully (hash: {})", hash);
                    (cfg, hash)
                }
                Err(e) => {
                    tracing::error!("Failed to load configuration: {}", e);
                    return Err(e.into());
                }
            }
        }
        None => (Config::default(), hash_content("")),
    };

    apply_overrides(&mut config, &cli);

    if cli.stats {
        return handle_stats(&config);
    }

    resolve_target(&mut config, &cli)?;

    if let Err(e) = validate(&config) {
        tracing::error!("Invalid configuration: {}", e);
        return Err(e.into());
    }

    handle_harvest(&config, &config_hash).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("profile_harvest=info,warn"),
            1 => EnvFilter::new("profile_harvest=debug,info"),
            2 => EnvFilter::new("profile_harvest=trace,debug"),
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

/// Applies command-line flags on top of the loaded configuration
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(handle) = &cli.handle {
        config.target.handle = handle.clone();
    }
    if let Some(count) = cli.count {
        config.target.count = count;
    }
    if let Some(mode) = cli.mode {
        config.pipeline.mode = mode;
    }
    if cli.headless {
        config.browser.headless = true;
    }
    if let Some(dir) = &cli.csv_dir {
        config.output.csv_dir = Some(dir.clone());
    }
    if let Some(path) = &cli.database {
        config.output.database_path = Some(path.clone());
    }
}

/// Fills in the target, asking on stdin when no handle was supplied
fn resolve_target(config: &mut Config, cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if normalize_handle(&config.target.handle).is_empty() {
        config.target.handle = prompt("Enter the profile handle: ")?;

        if cli.count.is_none() {
            let answer = prompt("How many items should be harvested? ")?;
            config.target.count = parse_count(&answer);
        }
    }

    config.target.handle = normalize_handle(&config.target.handle);
    Ok(())
}

/// Reads a typed item count; anything that is not a non-negative integer means 0
fn parse_count(answer: &str) -> u32 {
    match answer.trim().parse() {
        Ok(count) => count,
        Err(_) => {
            tracing::warn!("'{}' is not a valid item count, using 0", answer.trim());
            0
        }
    }
}

/// Prints a question and reads one line from stdin
fn prompt(question: &str) -> io::Result<String> {
    print!("{}", question);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end().to_string())
}

/// Handles the --stats mode: shows the latest run from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = &config.output.database_path else {
        return Err("--stats needs a database (use --database or [output] database-path)".into());
    };

    println!("Database: {}\n", path.display());

    // Open the database
    let storage = open_storage(path)?;

    // Load statistics
    match load_run_statistics(&storage)? {
        Some(stats) => print_statistics(&stats),
        None => println!("No runs recorded yet"),
    }

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(
    config: &Config,
    config_hash: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Harvesting {} items from @{} ({} mode)",
        config.target.count,
        config.target.handle,
        config.pipeline.mode
    );

    // Open sinks before launching any browser so bad paths fail fast
    let mut sinks = build_sinks(config, &config.target.handle, config_hash)?;

    // Run the harvest
    let outcome = match harvest(config).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            return Err(e.into());
        }
    };

    let outputs = match write_outcome(&mut sinks, &outcome) {
        Ok(outputs) => outputs,
        Err(e) => {
            tracing::error!("Failed to write results: {}", e);
            return Err(e.into());
        }
    };

    if outcome.is_partial() {
        tracing::warn!(
            "Harvest finished with partial results: {} of {} requested",
            outcome.records.len(),
            config.target.count
        );
    } else {
        tracing::info!("Harvest completed successfully");
    }

    print_summary(&HarvestSummary::from_outcome(&outcome, outputs));

    Ok(())
}
