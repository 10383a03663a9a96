//! Scopecrawl main entry point
//!
//! This is the command-line interface for the Scopecrawl page crawler and
//! asset harvester.

use anyhow::Context;
use clap::Parser;
use scopecrawl::config::{
    load_config_with_hash, prepare_output_directory, Config, ConfigOverrides, CrawlMode,
    RendererEngine, StorageMode,
};
use scopecrawl::crawler::crawl;
use scopecrawl::output::print_summary;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Scopecrawl: a domain-scoped page crawler
///
/// Scopecrawl discovers every in-scope page under a web domain, renders it
/// (executing scripts when needed), persists each page exactly once under a
/// deterministic file name, and can separately queue linked documents for
/// bulk download.
#[derive(Parser, Debug)]
#[command(name = "scopecrawl")]
#[command(version)]
#[command(about = "A domain-scoped page crawler and asset harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Root directory for persisted pages
    #[arg(long, value_name = "DIR")]
    output_directory: Option<PathBuf>,

    /// Maximum link depth from the seeds (0 = unlimited)
    #[arg(long, value_name = "N")]
    depth_limit: Option<u32>,

    /// Persist pages or harvest assets
    #[arg(long, value_enum)]
    crawl_mode: Option<CrawlMode>,

    /// On-disk naming of persisted pages
    #[arg(long, value_enum)]
    storage_mode: Option<StorageMode>,

    /// Seed URL (repeatable); replaces configured seeds
    #[arg(long = "seed", value_name = "URL")]
    seeds: Vec<String>,

    /// Scope pattern regex (repeatable); replaces configured patterns
    #[arg(long = "pattern", value_name = "REGEX")]
    patterns: Vec<String>,

    /// Number of concurrent fetch workers
    #[arg(long, value_name = "N")]
    concurrency: Option<u32>,

    /// Rendering engine
    #[arg(long, value_enum)]
    renderer: Option<RendererEngine>,

    /// Do not capture page snapshots
    #[arg(long)]
    no_screenshots: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            output_directory: self.output_directory.clone(),
            depth_limit: self.depth_limit,
            crawl_mode: self.crawl_mode,
            storage_mode: self.storage_mode,
            seeds: self.seeds.clone(),
            patterns: self.patterns.clone(),
            concurrency: self.concurrency,
            renderer: self.renderer,
            no_screenshots: self.no_screenshots,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match load_effective_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
        return ExitCode::SUCCESS;
    }

    match handle_crawl(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Crawl failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("scopecrawl=info,warn"),
            1 => EnvFilter::new("scopecrawl=debug,info"),
            2 => EnvFilter::new("scopecrawl=trace,debug"),
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

/// Loads the config file (if any), applies CLI overrides and prepares the
/// output directory
fn load_effective_config(cli: &Cli) -> anyhow::Result<Config> {
    let base = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::info!("No configuration file given, using built-in defaults");
            Config::default()
        }
    };

    let config = cli
        .overrides()
        .apply(base)
        .context("Invalid configuration")?;

    if !cli.dry_run {
        prepare_output_directory(&config)?;
    }

    Ok(config)
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Scopecrawl Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Mode: {}", config.crawler.mode);
    match config.active_depth_limit() {
        0 => println!("  Max depth: unlimited"),
        depth => println!("  Max depth: {}", depth),
    }
    println!("  Concurrency: {}", config.crawler.concurrency);

    match config.crawler.mode {
        CrawlMode::Page => {
            println!("\nScope Patterns ({}):", config.scope.patterns.len());
            for pattern in &config.scope.patterns {
                println!("  - {}", pattern);
            }
            println!("\nScope Domains ({}):", config.scope.domains.len());
            for domain in &config.scope.domains {
                println!("  - {}", domain);
            }
        }
        CrawlMode::Asset => {
            println!("\nAssets:");
            println!("  Domain: {}", config.assets.domain);
            println!("  Extensions: {}", config.assets.extensions.join(", "));
            println!("  Queue file: {}", config.assets.queue_file);
        }
    }

    println!("\nRenderer:");
    println!("  Engine: {}", config.renderer.engine);
    println!("  Timeout: {}s", config.renderer.timeout_secs);
    println!("  Max attempts: {}", config.renderer.max_attempts);
    if let Some(selector) = &config.renderer.wait_for_selector {
        println!("  Wait for: {}", selector);
    }
    println!("  Screenshots: {}", config.renderer.screenshots);

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory.display());
    println!("  Storage mode: {}", config.output.storage_mode);
    println!("  Extension: {}", config.output.extension);

    let seeds = config.active_seeds();
    println!("\nSeeds ({}):", seeds.len());
    for seed in seeds {
        println!("  * {}", seed);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling with {} seed URLs", seeds.len());
}

/// Waits for SIGINT or, on Unix, SIGTERM and returns which one arrived
#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|()| "Interrupt"),
        _ = terminate.recv() => Ok("Termination signal"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|()| "Interrupt")
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();

    let signal = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match shutdown_signal().await {
                Ok(name) => {
                    tracing::warn!("{} received, finishing in-flight pages", name);
                    cancel.cancel();
                }
                Err(e) => tracing::warn!("Failed to install signal handlers: {}", e),
            }
        })
    };

    let result = crawl(config, cancel).await;
    signal.abort();

    let summary = result?;
    print_summary(&summary);
    Ok(())
}
