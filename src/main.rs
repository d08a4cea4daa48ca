use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tracing::{error, info};

use gh_stats_cache::{StatsService, load_config, logging};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Bypass the cache and force a fresh upstream fetch
    #[arg(short, long, default_value = "false")]
    force: bool,

    /// Run as a daemon, refreshing on every TTL expiry
    #[arg(short, long, default_value = "false")]
    daemon: bool,

    /// Also write logs to debug.log
    #[arg(long, default_value = "false")]
    log_file: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.log_file {
        logging::init_dual_logging();
    } else {
        logging::init_logging();
    }

    let config = load_config(&args.config)?;
    let ttl = config.cache.ttl();
    let service = StatsService::new(&config)?;

    if args.daemon {
        run_daemon(&service, ttl).await
    } else {
        let stats = service.get_stats(args.force).await?;
        println!("{}", serde_json::to_string_pretty(&stats)?);
        Ok(())
    }
}

/// Keep the cache warm: refresh once immediately, then on every TTL
/// expiry, until interrupted.
async fn run_daemon(service: &StatsService, ttl: std::time::Duration) -> Result<()> {
    info!("refresh daemon starting (interval {:?})", ttl);

    let mut interval = tokio::time::interval(ttl);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                match service.get_stats(true).await {
                    Ok(stats) => info!(
                        "refreshed: {} commits, {} repos, {} stars",
                        stats.commit_count, stats.repo_count, stats.star_count
                    ),
                    // Stale data stays served; try again next interval
                    Err(e) => error!("scheduled refresh failed: {}", e),
                }
            }
            _ = signal::ctrl_c() => {
                info!("shutting down");
                return Ok(());
            }
        }
    }
}
