use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use hijackfinder::batch::{self, BatchScheduler};
use hijackfinder::cli::Cli;
use hijackfinder::config::{self, AppConfig};
use hijackfinder::counters::RunCounters;
use hijackfinder::fingerprint::FingerprintCatalog;
use hijackfinder::logger::{ScanLogger, VerbosityLevel};
use hijackfinder::result_sink::{self, ResultSink};
use hijackfinder::scanner::Scanner;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| Path::new(config::CONFIG_PATH).to_path_buf());

    // Handle --init flag first (before any other processing)
    if cli.init {
        match AppConfig::create_default_config_at(&config_path) {
            Ok(path) => {
                println!("Created default configuration file at: {}", path.display());
                println!("   Edit this file to customize settings, then run hijackfinder again.");
                return Ok(());
            }
            Err(e) => {
                eprintln!("Failed to create configuration file: {}", e);
                std::process::exit(1);
            }
        }
    }

    let app_config = match AppConfig::load_or_default(&config_path)
        .and_then(|c| c.with_scan_overrides(cli.batch_size, cli.concurrency))
    {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    debug!("Using configuration from {}", config_path.display());

    let logger = ScanLogger::new(VerbosityLevel::from_verbose_count(cli.verbose));

    let Some(wordlist_path) = cli.filepath.as_deref() else {
        anyhow::bail!("A wordlist is required (-f/--filepath)");
    };
    let mut subdomains = batch::read_wordlist(wordlist_path)?;
    info!("Read {} subdomains from {}", subdomains.len(), wordlist_path.display());

    if cli.resume {
        let recorded = result_sink::recorded_subdomains(&cli.outfile)?;
        let before = subdomains.len();
        subdomains = batch::remaining_subdomains(subdomains, &recorded);
        logger.info(&format!(
            "Resuming: {} of {} subdomains already recorded in {}",
            before - subdomains.len(),
            before,
            cli.outfile.display()
        ));
    }

    let catalog = FingerprintCatalog::load(&cli.fingerprints)?;
    if catalog.is_empty() {
        warn!(
            "{} has no usable fingerprints; only registry checks will run",
            cli.fingerprints.display()
        );
    }

    if subdomains.is_empty() {
        logger.info("No subdomains left to scan");
        logger.print_final_summary(&RunCounters::new().snapshot(), Duration::ZERO, &cli.outfile.display().to_string());
        return Ok(());
    }

    let scanner = Scanner::from_config(&app_config, catalog)
        .await
        .context("Failed to initialize scanner")?;

    let scheduler = BatchScheduler::new(app_config.scan.batch_size, app_config.scan.concurrency);
    let sink = ResultSink::new(&cli.outfile, cli.is_verbose());
    let counters = RunCounters::new();

    let started = Instant::now();
    let scanner = &scanner;
    let report = scheduler
        .run(&subdomains, |subdomain| async move { scanner.scan(&subdomain).await }, &sink, &counters, &logger)
        .await;

    if report.write_failures > 0 {
        logger.error(&format!(
            "{} of {} batches could not be written to {}",
            report.write_failures,
            report.batches,
            cli.outfile.display()
        ));
    }

    logger.print_final_summary(&counters.snapshot(), started.elapsed(), &cli.outfile.display().to_string());

    Ok(())
}
