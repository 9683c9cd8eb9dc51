pub mod clients;
pub mod config;
pub mod db;
pub mod entities;
pub mod models;
pub mod parser;
pub mod scoring;
pub mod search;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use clients::nyaa::NyaaClient;
use clients::qbittorrent::QBitClient;
use clients::shoko::ShokoClient;
pub use config::Config;
use db::Store;
use search::{feed_urls_from_config, CachedFeedFetcher, SearchService};
use services::auto_download::AutoDownloadService;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;
    config.validate()?;

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "check" | "-c" | "--check" => run_single_check(config).await,

        "daemon" | "-d" | "--daemon" => run_daemon(config).await,

        "missing" | "m" => cmd_missing(&config).await,

        "search" | "s" => {
            if args.len() < 3 {
                println!("Usage: shokarr search <query>");
                return Ok(());
            }
            let query = args[2..].join(" ");
            cmd_search(&config, &query).await
        }

        "init" => {
            if Config::create_default_if_missing()? {
                println!("Default config written to config.toml");
            } else {
                println!("config.toml already exists, nothing to do");
            }
            Ok(())
        }

        "help" | "-h" | "--help" => {
            print_help();
            Ok(())
        }

        other => {
            println!("Unknown command: {other}");
            println!();
            print_help();
            Ok(())
        }
    }
}

fn print_help() {
    println!("Shokarr - Missing-episode auto-downloader for Shoko");
    println!();
    println!("USAGE:");
    println!("  shokarr <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("  check             Run a single acquisition cycle");
    println!("  daemon            Run cycles on a schedule until interrupted");
    println!("  missing           List episodes Shoko reports as missing");
    println!("  search <query>    Run a feed search and print ranked results");
    println!("  init              Create default config file");
    println!("  help              Show this help message");
    println!();
    println!("EXAMPLES:");
    println!("  shokarr check                       # One cycle, then exit");
    println!("  shokarr search \"Frieren S01E12\"     # Inspect candidates for a query");
}

async fn build_auto_download(config: &Config) -> anyhow::Result<AutoDownloadService> {
    let store = Store::new(&config.cache.database_path, config.cache_ttl_seconds()).await?;

    let nyaa_client = NyaaClient::new(Duration::from_secs(config.nyaa.request_timeout_seconds))?;
    let fetcher = Arc::new(CachedFeedFetcher::new(nyaa_client, store.clone()));
    let search = SearchService::new(
        fetcher,
        feed_urls_from_config(&config.nyaa),
        config.preferences.clone(),
        Duration::from_secs(config.nyaa.rate_limit_seconds),
    );

    let shoko = ShokoClient::new(&config.shoko)?;

    let qbit = if config.qbittorrent.enabled {
        Some(QBitClient::new(
            config.qbittorrent.clone(),
            config.general.dry_run,
        )?)
    } else {
        None
    };

    Ok(AutoDownloadService::new(
        config.clone(),
        store,
        shoko,
        search,
        qbit,
    ))
}

async fn run_single_check(config: Config) -> anyhow::Result<()> {
    let service = build_auto_download(&config).await?;
    let stats = service.run_cycle().await?;
    println!(
        "Cycle complete: {} missing, {} processed, {} added, {} not found, {} skipped",
        stats.missing, stats.processed, stats.added, stats.not_found, stats.skipped
    );
    Ok(())
}

async fn run_daemon(config: Config) -> anyhow::Result<()> {
    info!(
        "Shokarr v{} starting in daemon mode",
        env!("CARGO_PKG_VERSION")
    );

    let schedule_hours = config.general.schedule_hours;
    let service = build_auto_download(&config).await?;

    loop {
        if let Err(err) = service.run_cycle().await {
            error!(error = %err, "Cycle failed");
        }

        if schedule_hours == 0 {
            info!("No schedule configured, exiting after single cycle");
            return Ok(());
        }

        info!(hours = schedule_hours, "Next cycle scheduled");

        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Shutdown signal received");
                return Ok(());
            }
            () = tokio::time::sleep(Duration::from_secs(schedule_hours * 3600)) => {}
        }
    }
}

async fn cmd_missing(config: &Config) -> anyhow::Result<()> {
    let shoko = ShokoClient::new(&config.shoko)?;
    let episodes = shoko.missing_episodes().await?;

    if episodes.is_empty() {
        println!("No missing episodes.");
        return Ok(());
    }

    println!("Missing episodes ({}):", episodes.len());
    for episode in &episodes {
        let series = shoko
            .series_name(episode.series_id)
            .await?
            .unwrap_or_else(|| format!("series #{}", episode.series_id));
        println!(
            "  {series} - E{:02}  (episode id {})",
            episode.episode_number, episode.episode_id
        );
    }
    Ok(())
}

async fn cmd_search(config: &Config, query: &str) -> anyhow::Result<()> {
    let store = Store::new(&config.cache.database_path, config.cache_ttl_seconds()).await?;
    let nyaa_client = NyaaClient::new(Duration::from_secs(config.nyaa.request_timeout_seconds))?;
    let fetcher = Arc::new(CachedFeedFetcher::new(nyaa_client, store));
    let service = SearchService::new(
        fetcher,
        feed_urls_from_config(&config.nyaa),
        config.preferences.clone(),
        Duration::from_secs(config.nyaa.rate_limit_seconds),
    );

    let results = service.search(&[query.to_string()], false).await;

    if results.is_empty() {
        println!("No results for '{query}'");
        return Ok(());
    }

    println!("Results for '{query}' ({}):", results.len());
    for result in &results {
        let quality = result
            .parsed
            .quality
            .map_or("?", crate::models::release::Quality::as_str);
        let magnet = if result.magnet.is_some() { "magnet" } else { "no link" };
        println!(
            "  [{:>4}] {}  ({quality}, v{}, {magnet})",
            result.score,
            result.title,
            result.parsed.effective_version()
        );
    }
    Ok(())
}
