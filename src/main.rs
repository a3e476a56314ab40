//! Ripple-Crawl main entry point
//!
//! This is the command-line interface for the Ripple-Crawl crawler.

use clap::Parser;
use ripple_crawl::config::{load_config_with_hash, Config};
use ripple_crawl::crawler::{CrawlSettings, Crawler};
use ripple_crawl::model::crawl_id;
use ripple_crawl::pipeline::{FnStep, LinkExtractor, PipelineStep};
use ripple_crawl::PropertyBag;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Ripple-Crawl: a polite, resumable web crawler
///
/// Ripple-Crawl walks a site from a seed URL while respecting robots.txt,
/// following the links of every HTML page it downloads. The work queue and
/// the visited history can be persisted so an interrupted crawl resumes.
#[derive(Parser, Debug)]
#[command(name = "ripple-crawl")]
#[command(version)]
#[command(about = "A polite, resumable web crawler", long_about = None)]
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

    /// Continue the persisted queue and history of a previous run
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Discard persisted state and start from the seed
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, _config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.resume {
        config.crawler.resume = true;
    } else if cli.fresh {
        config.crawler.resume = false;
    }

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else {
        handle_crawl(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ripple_crawl=info,warn"),
            1 => EnvFilter::new("ripple_crawl=debug,info"),
            2 => EnvFilter::new("ripple_crawl=trace,debug"),
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
    let crawler = &config.crawler;
    let settings = CrawlSettings::from_config(crawler)?;

    println!("=== Ripple-Crawl Dry Run ===\n");

    println!("Crawl:");
    println!("  Seed: {}", crawler.seed);
    println!("  Crawl id: {}", crawl_id(&crawler.seed));
    match crawler.max_depth {
        0 => println!("  Max depth: unlimited"),
        depth => println!("  Max depth: {}", depth),
    }
    println!("  Max threads: {}", crawler.max_threads);
    if let Some(secs) = crawler.max_crawl_time_secs {
        println!("  Max crawl time: {}s", secs);
    }
    if let Some(count) = crawler.max_crawl_count {
        println!("  Max crawl count: {}", count);
    }
    println!("  Robots.txt: {}", if crawler.adhere_to_robots { "honored" } else { "ignored" });
    println!("  Dedup components: {}", settings.sensitivity);
    println!("  Resume: {}", crawler.resume);

    println!("\nFilters:");
    for pattern in &crawler.include {
        println!("  + {}", pattern);
    }
    for pattern in &crawler.include_hosts {
        println!("  + host {}", pattern);
    }
    for pattern in &crawler.exclude {
        println!("  - {}", pattern);
    }
    for pattern in &crawler.exclude_hosts {
        println!("  - host {}", pattern);
    }

    println!("\nDownloader:");
    println!("  User agent: {}", config.downloader.user_agent);
    println!("  Cookies: {}", config.downloader.use_cookies);
    println!("  Retries: {}", config.downloader.retry_count);

    println!("\nStorage:");
    println!("  Backend: {:?}", config.storage.backend);
    if let Some(path) = &config.storage.path {
        println!("  Path: {}", path.display());
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    if config.crawler.resume {
        tracing::info!("Resuming persisted crawl state if present");
    } else {
        tracing::info!("Starting fresh crawl (ignoring previous state)");
    }

    let console = FnStep::new("console", |_: &Crawler, bag: &PropertyBag| {
        println!(
            "{} {} {}",
            bag.status().as_u16(),
            bag.step().url(),
            bag.title().unwrap_or_default()
        );
        Ok(())
    });
    let pipeline: Vec<Arc<dyn PipelineStep>> =
        vec![Arc::new(LinkExtractor::new()), Arc::new(console)];

    let crawler = Crawler::from_config(&config, pipeline)?;

    let interrupt = crawler.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, finishing in-flight downloads");
            if let Err(e) = interrupt.cancel() {
                tracing::warn!("Could not cancel crawl: {}", e);
            }
        }
    });

    match crawler.crawl().await {
        Ok(summary) => {
            println!("\n{}", summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
