//! Ripple-Harvest main entry point
//!
//! This is the command-line interface for the Ripple-Harvest paginated harvester.

use anyhow::{bail, Context};
use clap::Parser;
use ripple_harvest::config::{load_config_with_hash, Config};
use ripple_harvest::harvest::Harvester;
use ripple_harvest::output::{print_dry_run, print_summary};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Ripple-Harvest: a resumable paginated harvester
///
/// Ripple-Harvest walks a remote listing API unit by unit (geographic
/// points or event/category pairs), appends every record to one CSV
/// dataset, and checkpoints progress so an interrupted run picks up where
/// it stopped.
#[derive(Parser, Debug)]
#[command(name = "ripple-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A resumable paginated harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Delete the checkpoint before starting; the dataset is kept
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be harvested without any network I/O
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let harvester = Harvester::with_cancellation(config, CancellationToken::new());

    if cli.dry_run {
        if cli.fresh {
            tracing::info!("Dry run: --fresh would clear the checkpoint, leaving it untouched");
        }
        return handle_dry_run(&harvester);
    }

    if cli.fresh {
        harvester.reset_checkpoint()?;
    }

    handle_harvest(&harvester).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ripple_harvest=info,warn"),
            1 => EnvFilter::new("ripple_harvest=debug,info"),
            2 => EnvFilter::new("ripple_harvest=trace,debug"),
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

/// Handles the --dry-run mode: loads units and checkpoint, reports the plan
fn handle_dry_run(harvester: &Harvester) -> anyhow::Result<()> {
    print_settings(harvester.config());

    let report = harvester.plan()?;
    print_dry_run(&report);

    println!("\n✓ Configuration is valid");
    Ok(())
}

fn print_settings(config: &Config) {
    println!("Harvester:");
    println!("  Input: {} ({:?})", config.input.path, config.input.kind);
    println!("  Concurrency: {}", config.harvester.concurrency);
    println!("  Inter-page delay: {}ms", config.harvester.inter_page_delay_ms);
    match config.harvester.max_pages {
        Some(max) => println!("  Max pages per unit: {}", max),
        None => println!("  Max pages per unit: unlimited"),
    }
    println!(
        "  Retries: {} attempts, {}ms base delay, {}s timeout",
        config.retry.max_attempts, config.retry.base_delay_ms, config.retry.request_timeout_secs
    );

    println!("\nOutput:");
    println!("  Dataset: {}", config.output.dataset_path);
    println!("  Checkpoint: {}", config.output.checkpoint_path);
    if let Some(raw) = &config.output.raw_dir {
        println!("  Raw pages: {}", raw);
    }
    println!();
}

/// Handles the main harvest operation
async fn handle_harvest(harvester: &Harvester) -> anyhow::Result<()> {
    let cancel = harvester.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight pages...");
            cancel.cancel();
        }
    });

    let summary = harvester.run().await.context("Harvest failed")?;
    print_summary(&summary);

    if let Some(reason) = &summary.aborted {
        bail!("Harvest aborted: {}", reason);
    }

    tracing::info!("Harvest finished");
    Ok(())
}
