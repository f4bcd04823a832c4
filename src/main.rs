//! Attribute-Miner main entry point
//!
//! This is the command-line interface for the attribute rule miner.

use anyhow::{Context, Result};
use attribute_miner::catalog::{Catalog, SqliteCatalog};
use attribute_miner::config::{load_config_with_hash, Config};
use attribute_miner::consolidate::{consolidate, write_library};
use attribute_miner::orchestrator::{
    cleanup, select_categories, watch_interrupts, CleanupSummary, ResumableOrchestrator,
    RunOptions, INTERRUPT_EXIT_CODE,
};
use attribute_miner::output::format_duration;
use attribute_miner::rules::RuleStore;
use attribute_miner::state::CheckpointStore;
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Categories processed by `--batch`
const BATCH_SIZE: usize = 20;

/// Attribute-Miner: learns product attribute extraction rules
///
/// Attribute-Miner searches a shopping site for every catalog category,
/// learns extraction rules from sample product pages, extracts and validates
/// attributes, and records progress so interrupted runs resume where they
/// stopped.
#[derive(Parser, Debug)]
#[command(name = "attribute-miner")]
#[command(version = "1.0.0")]
#[command(about = "Learns product attribute extraction rules", long_about = None)]
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

    /// Show what would be processed (or removed, with --cleanup) without doing it
    #[arg(long, conflicts_with = "consolidate")]
    dry_run: bool,

    /// Remove unproductive category logs and evict them from the checkpoint
    #[arg(long, conflicts_with = "consolidate")]
    cleanup: bool,

    /// Merge every stored rule set into the consolidated library and exit
    #[arg(long, conflicts_with_all = ["dry_run", "cleanup"])]
    consolidate: bool,

    /// Process only these categories, ignoring the checkpoint
    #[arg(long, value_name = "NAME", num_args = 1..)]
    categories: Vec<String>,

    /// Skip this many pending categories
    #[arg(long, value_name = "N", default_value_t = 0)]
    start_from: usize,

    /// Process at most this many categories
    #[arg(long, value_name = "N")]
    max_categories: Option<usize>,

    /// Process one batch of 20 categories
    #[arg(long, conflicts_with = "max_categories")]
    batch: bool,

    /// Do not ask before removing logs
    #[arg(long)]
    auto_confirm: bool,
}

impl Cli {
    fn run_options(&self) -> RunOptions {
        RunOptions {
            start_from: self.start_from,
            max_categories: if self.batch {
                Some(BATCH_SIZE)
            } else {
                self.max_categories
            },
            target_names: self.categories.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.cleanup {
        handle_cleanup(&config, cli.dry_run, cli.auto_confirm)?;
    } else if cli.consolidate {
        handle_consolidate(&config)?;
    } else if cli.dry_run {
        handle_dry_run(&config, &cli.run_options())?;
    } else {
        handle_run(&config, &config_hash, &cli.run_options()).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("attribute_miner=info,warn"),
            1 => EnvFilter::new("attribute_miner=debug,info"),
            2 => EnvFilter::new("attribute_miner=trace,debug"),
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

/// Handles the --dry-run mode: validates config and lists the categories a run would process
fn handle_dry_run(config: &Config, options: &RunOptions) -> Result<()> {
    println!("=== Attribute-Miner Dry Run ===\n");

    println!("Site:");
    println!("  Id: {}", config.site.id);
    println!("  Base URL: {}", config.site.base_url);
    println!("  Search path: {}", config.site.search_path);
    println!("  Extra fields: {}", config.site.fields.len());

    println!("\nLearner:");
    println!("  Sample size: {}", config.learner.sample_size);
    println!("  Min confidence: {}", config.learner.min_confidence);

    println!("\nFetcher:");
    println!("  Timeout: {}s", config.fetcher.timeout_secs);
    println!("  Max retries: {}", config.fetcher.max_retries);
    println!(
        "  Min request interval: {}ms",
        config.fetcher.min_request_interval_ms
    );

    println!("\nOutput:");
    println!("  Catalog: {}", config.output.catalog_path.display());
    println!("  Logs: {}", config.output.output_dir.display());
    println!("  Rules: {}", config.output.rules_dir.display());
    println!("  Checkpoint: {}", config.output.checkpoint_path.display());

    let catalog = SqliteCatalog::open(&config.output.catalog_path)
        .context("failed to open catalog")?;
    let categories = catalog.load_categories().context("failed to read categories")?;
    let total = categories.len();
    let record = CheckpointStore::new(&config.output.checkpoint_path)
        .load()
        .context("failed to read checkpoint")?;
    let selected = select_categories(categories, &record, options);

    println!(
        "\nCategories ({} in catalog, {} already processed):",
        total,
        record.len()
    );
    for category in &selected {
        println!("  - {} (id {})", category.name, category.id);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would process {} categories", selected.len());

    Ok(())
}

/// Handles the --cleanup mode: previews removals, confirms, then applies them
fn handle_cleanup(config: &Config, dry_run: bool, auto_confirm: bool) -> Result<()> {
    println!("=== Cleaning Up Category Logs ===\n");

    let checkpoints = CheckpointStore::new(&config.output.checkpoint_path);
    let preview = cleanup(&config.output.output_dir, &checkpoints, true)
        .context("failed to scan category logs")?;
    print_cleanup(&preview);

    if dry_run || preview.removed.is_empty() {
        return Ok(());
    }

    if !auto_confirm && !confirm("Remove these logs and evict them from the checkpoint?")? {
        println!("Aborted, nothing changed");
        return Ok(());
    }

    let summary = cleanup(&config.output.output_dir, &checkpoints, false)
        .context("cleanup failed")?;
    println!(
        "\n✓ Removed {} logs, evicted {} checkpoint entries ({} remain)",
        summary.removed.len(),
        summary.evicted.len(),
        summary.remaining
    );

    Ok(())
}

fn print_cleanup(summary: &CleanupSummary) {
    println!("Logs scanned: {}", summary.logs_scanned);
    println!("Logs kept: {}", summary.logs_kept);
    if summary.logs_unreadable > 0 {
        println!("Unreadable logs skipped: {}", summary.logs_unreadable);
    }

    println!("\nTo remove ({}):", summary.removed.len());
    for (reason, count) in &summary.by_reason {
        println!("  {}: {}", reason, count);
    }
    for removed in &summary.removed {
        println!("  - {} [{}]", removed.category, removed.reason);
    }

    println!(
        "\nCheckpoint: {} entries evicted, {} would remain",
        summary.evicted.len(),
        summary.remaining
    );
}

fn confirm(question: &str) -> Result<bool> {
    print!("\n{} [y/N] ", question);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Handles the --consolidate mode: merges all stored rule sets into one library
fn handle_consolidate(config: &Config) -> Result<()> {
    println!("=== Consolidating Rules ===\n");
    println!("Rules: {}", config.output.rules_dir.display());
    println!("Library: {}", config.output.library_path.display());
    println!();

    let store = RuleStore::new(&config.output.rules_dir);
    let rule_sets = store.load_all().context("failed to read rule documents")?;
    let library = consolidate(&rule_sets);

    write_library(&library, &config.output.library_path)
        .context("failed to write rule library")?;

    println!(
        "✓ {} categories ({} with patterns) merged into {} unique rules",
        library.total_categories_processed,
        library.categories_with_patterns,
        library.unique_patterns_count
    );

    Ok(())
}

/// Handles the main batch run
async fn handle_run(config: &Config, config_hash: &str, options: &RunOptions) -> Result<()> {
    let mut orchestrator =
        ResumableOrchestrator::new(config, config_hash).context("failed to start run")?;

    let stop = orchestrator.stop_handle();
    tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, stop).await {
            std::process::exit(INTERRUPT_EXIT_CODE);
        }
    });

    let report = orchestrator.run(options).await.context("run aborted")?;

    println!(
        "\n✓ {} categories processed, {} with patterns, {} failed in {}",
        report.categories_processed,
        report.categories_with_patterns,
        report.categories_failed,
        format_duration(report.duration_seconds as u64)
    );
    println!("✓ Report written to {}", config.output.report_path.display());

    Ok(())
}
