//! Olympiad listing crawler CLI
//!
//! Local execution entry point.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use olymp_crawler::{
    error::Result,
    models::Config,
    pipeline,
    services::HttpTransport,
    storage::LocalStorage,
    utils::http,
};
use tokio_util::sync::CancellationToken;

/// olymp-crawler - Olympiad listing crawler for olimpiada.ru
#[derive(Parser, Debug)]
#[command(
    name = "olymp-crawler",
    version,
    about = "Discovers and ingests olympiad listings"
)]
struct Cli {
    /// Path to storage directory containing config and output files
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Probe a range of ids and save the live ones
    Probe {
        /// First id to probe (default: probe.start)
        #[arg(long)]
        start: Option<u32>,

        /// Id to stop before (default: probe.end)
        #[arg(long)]
        end: Option<u32>,
    },

    /// Crawl every listing on the id list into the listings file
    Crawl {
        /// Path to id list (default: {storage_dir}/ids.txt)
        #[arg(long)]
        ids: Option<PathBuf>,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Cancel `token` on Ctrl-C; in-flight listings still finish.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, finishing in-flight listings...");
            token.cancel();
        }
    });
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("olymp-crawler starting...");

    let config_path = cli.storage_dir.join("config.toml");
    let config = Config::load_or_default(&config_path);
    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {}", e);
        return Err(e);
    }
    log::info!("Loaded configuration from {}", cli.storage_dir.display());

    let base = config.crawler.listing_base()?;
    http::ensure_resolvable(&base).await?;

    let storage = LocalStorage::from_config(&cli.storage_dir, &config);
    let transport = Arc::new(HttpTransport::from_config(&config.crawler)?);
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    match cli.command {
        Command::Probe { start, end } => {
            let range = start.unwrap_or(config.probe.start)..end.unwrap_or(config.probe.end);
            let report = pipeline::run_probe(&config, &storage, transport, cancel, range).await?;
            log::info!("Probe summary: {}", report.summary);
        }

        Command::Crawl { ids } => {
            let ids = match ids {
                Some(path) => Some(LocalStorage::load_ids_from(&path).await?),
                None => None,
            };
            let summary = pipeline::run_crawl(&config, &storage, transport, cancel, ids).await?;
            log::info!("Crawl summary: {}", summary);
        }
    }

    log::info!("Done!");

    Ok(())
}
