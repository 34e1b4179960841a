use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use site_watch::cache::{AlertedSites, DailyCache};
use site_watch::config;
use site_watch::detector::{detect_new_offline, is_offline};
use site_watch::model::DayKey;
use site_watch::source::{HttpStatusSource, StatusSource};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Fetch the status page once and print what the monitor would see, without alerting"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Override the configured status page URL
    #[arg(long)]
    url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let monitor = config::load_monitor(Some(&args.config))?;
    let url = args.url.unwrap_or_else(|| monitor.target_url.clone());
    let tz = monitor.tz()?;

    let source = HttpStatusSource::new(monitor.fetch_timeout())?;
    let rows = source.fetch(&url).await?;
    info!(url = %url, rows = rows.len(), "status page fetched");

    for row in &rows {
        let marker = if is_offline(row) { "OFFLINE" } else { "ok" };
        println!(
            "{:<8} {:<50} {}",
            marker,
            row.site,
            row.status_text.as_deref().unwrap_or("-")
        );
    }

    // Read-only: the cache is never written from here.
    let day = DayKey::from_datetime(&Utc::now().with_timezone(&tz));
    let cache = DailyCache::new(monitor.cache_path()).load().await;
    let no_sites = AlertedSites::new();
    let pending = detect_new_offline(&rows, cache.alerted(&day).unwrap_or(&no_sites));
    println!();
    if pending.is_empty() {
        println!("{}: nothing new to alert", day);
    } else {
        println!("{}: would alert on {} site(s):", day, pending.len());
        for site in pending {
            println!("  {}", site);
        }
    }
    Ok(())
}
