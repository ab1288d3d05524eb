//! Listing Harvester main entry point
//!
//! This is the command-line interface for the listing harvester.

use anyhow::{bail, Context};
use clap::Parser;
use listing_harvester::config::{load_config_with_hash, Config};
use listing_harvester::url::build_seed_url;
use listing_harvester::Harvester;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Listing Harvester: scrapes paginated search results into CSV files
///
/// For every keyword the harvester discovers the result pages of the search,
/// extracts one record per listing card and appends unique records to
/// `<output-directory>/<keyword>.csv`.
#[derive(Parser, Debug)]
#[command(name = "listing-harvester")]
#[command(version)]
#[command(about = "Scrapes paginated search results into CSV files", long_about = None)]
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

    /// Crawl these keywords instead of the configured ones (repeatable)
    #[arg(short, long = "keyword", value_name = "KEYWORD")]
    keywords: Vec<String>,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if !cli.keywords.is_empty() {
        config = config
            .with_keywords(cli.keywords.clone())
            .context("Invalid --keyword override")?;
    }

    if cli.dry_run {
        return handle_dry_run(&config);
    }

    handle_crawl(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_harvester=info,warn"),
            1 => EnvFilter::new("listing_harvester=debug,info"),
            2 => EnvFilter::new("listing_harvester=trace,debug"),
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

/// Handles the --dry-run mode: shows the planned jobs
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let harvester = Harvester::new(config.clone())?;

    println!("=== Listing Harvester Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Locale: {}", config.crawler.locale);
    println!("  Max pages per keyword: {}", config.crawler.max_pages);
    println!("  Max retries per page: {}", config.crawler.max_retries);
    println!("  Workers: {}", config.crawler.max_workers);
    println!("  Batch size: {}", config.output.batch_size);
    match &config.proxy {
        Some(proxy) => println!("  Proxy: {}", proxy.endpoint),
        None => println!("  Proxy: none"),
    }

    println!("\nKeywords ({}):", config.keywords.len());
    for keyword in &config.keywords {
        let seed = build_seed_url(&config.site, keyword)?;
        println!("  - {}", keyword);
        println!("    seed:   {}", seed);
        println!("    output: {}", harvester.output_for(keyword).display());
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    let harvester = Harvester::new(config)?;
    let outcomes = harvester.run_all().await;

    let mut failed = 0;
    for (keyword, outcome) in &outcomes {
        match outcome {
            Ok(report) => println!(
                "✓ {}: {} pages, {} records written ({} duplicates) -> {}",
                keyword,
                report.crawl.pages,
                report.pipeline.written,
                report.pipeline.duplicates,
                report.output.display()
            ),
            Err(e) => {
                failed += 1;
                println!("✗ {}: {}", keyword, e);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} keywords failed", failed, outcomes.len());
    }
    Ok(())
}
