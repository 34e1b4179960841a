use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use site_watch::cache::DailyCache;
use site_watch::config;
use site_watch::cycle::{CheckCycle, CycleSettings};
use site_watch::notify::TwilioClient;
use site_watch::scheduler::Scheduler;
use site_watch::source::HttpStatusSource;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Run a single check and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    cfg.ensure_dirs()?;

    let settings = CycleSettings::from_config(&cfg.monitor)?;
    let source = HttpStatusSource::new(settings.fetch_timeout)?;
    let sink = TwilioClient::from_config(&cfg.twilio, settings.send_timeout)?;
    let cache = DailyCache::new(cfg.monitor.cache_path());
    let cycle = CheckCycle::new(cache, Box::new(source), Box::new(sink), settings);
    let scheduler = Scheduler::new(cycle, cfg.monitor.poll_interval());

    if args.once {
        info!(url = %cfg.monitor.target_url, "running single check");
        scheduler.tick().await;
        return Ok(());
    }

    info!(
        url = %cfg.monitor.target_url,
        interval_secs = cfg.monitor.poll_interval_seconds,
        timezone = %cfg.monitor.timezone,
        "monitoring started"
    );
    tokio::select! {
        _ = scheduler.run_forever() => {}
        res = tokio::signal::ctrl_c() => {
            if let Err(err) = res {
                warn!(?err, "failed to listen for ctrl-c");
            }
            info!("shutting down");
        }
    }
    Ok(())
}
