//! Blogroll main entry point
//!
//! This is the command-line interface for the blogroll feed ingestion pipeline.

use blogroll::config::{load_config_with_hash, Config};
use blogroll::crawler::{shutdown_on, Coordinator, Scheduler};
use blogroll::notify::CompletionNotifier;
use blogroll::output::{load_statistics, print_crawl_result, print_statistics};
use blogroll::storage::{open_storage, seed_sources, SqliteStorage};
use blogroll::{CrawlingResult, SourceStatus};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Blogroll: a tech-blog feed ingester
///
/// Blogroll crawls the RSS, Atom and JSON feeds of a directory of blogs,
/// stores every new post once per normalized URL, and reports each run to
/// the configured listeners.
#[derive(Parser, Debug)]
#[command(name = "blogroll")]
#[command(version = "1.0.0")]
#[command(about = "A tech-blog feed ingester", long_about = None)]
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

    /// Crawl a single source by id instead of all active sources
    #[arg(long, value_name = "ID", conflicts_with = "watch")]
    source: Option<i64>,

    /// Keep crawling on the configured schedule until interrupted
    #[arg(long)]
    watch: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "source", "watch"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "source", "watch"])]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else if cli.watch {
        handle_watch(&config).await
    } else {
        handle_crawl(&config, cli.source).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("blogroll=info,warn"),
            1 => EnvFilter::new("blogroll=debug,info"),
            2 => EnvFilter::new("blogroll=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Blogroll Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Request timeout: {}ms", config.crawler.request_timeout_ms);
    println!(
        "  Max concurrent sources: {}",
        config.crawler.max_concurrent_sources
    );
    println!("  Max posts per feed: {}", config.crawler.max_posts_per_feed);
    match config.crawler.run_deadline_secs {
        Some(secs) => println!("  Run deadline: {}s", secs),
        None => println!("  Run deadline: none"),
    }

    println!("\nRetry:");
    println!("  Max attempts: {}", config.retry.max_attempts);
    println!(
        "  Backoff: {}ms doubling, capped at {}ms",
        config.retry.base_delay_ms, config.retry.max_delay_ms
    );

    println!("\nProxy:");
    if config.proxy.enabled {
        println!(
            "  Base URL: {}",
            config.proxy.base_url.as_deref().unwrap_or("(not set)")
        );
        println!("  Domains: {}", config.proxy.domains.join(", "));
    } else {
        println!("  Disabled");
    }

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    println!("\nNotifications:");
    println!("  Log summary: {}", config.notify.log_summary);
    if let Some(url) = &config.notify.webhook_url {
        println!("  Webhook: {}", url);
    }

    println!("\nSchedule:");
    println!("  Interval: {}s", config.schedule.interval_secs);

    println!("\nSources ({}):", config.sources.len());
    for source in &config.sources {
        println!("  - {} [{}] {}", source.name, source.status, source.feed_url);
    }

    let active = config.sources.iter().filter(|s| s.status == SourceStatus::Active).count();
    println!("\n✓ Configuration is valid");
    println!("✓ Would crawl {} active sources", active);

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.storage.database_path);

    let storage = open_storage(Path::new(&config.storage.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Opens storage, seeds configured sources and wires the coordinator
fn build_coordinator(
    config: &Config,
) -> Result<(Arc<SqliteStorage>, Arc<Coordinator>), Box<dyn std::error::Error>> {
    let storage = Arc::new(open_storage(Path::new(&config.storage.database_path))?);

    let seeded = seed_sources(&storage, &config.sources)?;
    tracing::info!("Source directory holds {} configured sources", seeded.len());

    let notifier = CompletionNotifier::from_config(&config.notify)?;
    let coordinator = Coordinator::from_config(config, Arc::clone(&storage), notifier)?;

    Ok((storage, Arc::new(coordinator)))
}

/// Records a finished run in the history table
fn record_run(storage: &SqliteStorage, result: &CrawlingResult) {
    match storage.record_run(result) {
        Ok(id) => tracing::debug!("Recorded run #{}", id),
        Err(e) => tracing::warn!("Failed to record run: {}", e),
    }
}

/// Handles a one-shot crawl of all active sources, or of one source
async fn handle_crawl(config: &Config, source: Option<i64>) -> Result<(), Box<dyn std::error::Error>> {
    let (storage, coordinator) = build_coordinator(config)?;

    let outcome = match source {
        Some(id) => coordinator.crawl_source(id).await,
        None => coordinator.crawl_all_active().await,
    };
    coordinator.flush_notifications().await;

    match outcome {
        Ok(result) => {
            record_run(&storage, &result);
            print_crawl_result(&result);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

/// Handles the --watch mode: crawls on the configured interval until Ctrl-C
async fn handle_watch(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let (storage, coordinator) = build_coordinator(config)?;
    let interval = Duration::from_secs(config.schedule.interval_secs);

    tracing::info!("Crawling every {}s, press Ctrl-C to stop", interval.as_secs());
    let scheduler = Scheduler::new(Arc::clone(&coordinator), interval);

    let shutdown = shutdown_on(tokio::signal::ctrl_c());
    let runs = scheduler
        .run_until(shutdown, |result| {
            record_run(&storage, result);
            print_crawl_result(result);
        })
        .await;

    coordinator.flush_notifications().await;
    tracing::info!("Stopped after {} runs", runs);

    Ok(())
}
