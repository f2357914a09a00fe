// src/main.rs
use clap::Parser;
use env_logger::Builder;
use log::{error, info, LevelFilter};
use portfolio_tracker::config::{Config, StoreBackend};
use portfolio_tracker::db::ScyllaHoldingStore;
use portfolio_tracker::portfolio::{PortfolioService, PortfolioSettings};
use portfolio_tracker::quotes::build_provider;
use portfolio_tracker::store::{HoldingStore, MemoryHoldingStore};
use portfolio_tracker::{api, worker, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tokio::time::Duration;

#[derive(Parser)]
#[command(name = "portfolio_tracker")]
#[command(about = "Stock portfolio tracker API")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "portfolio_tracker.toml")]
    config: PathBuf,
}

async fn build_store(config: &Config) -> Result<Arc<dyn HoldingStore>> {
    Ok(match config.store.backend {
        StoreBackend::Memory => Arc::new(MemoryHoldingStore::new()),
        StoreBackend::Scylla => Arc::new(ScyllaHoldingStore::connect(&config.store).await?),
    })
}

async fn run(config: Config) -> Result<()> {
    let store = build_store(&config).await?;
    let quotes = build_provider(&config.quotes)?;
    let service = Arc::new(PortfolioService::new(
        store,
        quotes,
        PortfolioSettings::from(&config),
    ));

    if config.portfolio.refresh_interval_secs > 0 {
        let interval = Duration::from_secs(config.portfolio.refresh_interval_secs);
        let _refresh = worker::spawn(service.clone(), interval);
        info!("Snapshot refresh every {:?}", interval);
    }

    let addr = config.server.socket_addr()?;
    info!("Server running on http://{}", addr);
    warp::serve(api::api(service)).run(addr).await;
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = match Config::load_or_default(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    Builder::new()
        .filter_level(LevelFilter::from_str(&config.log_level).unwrap_or(LevelFilter::Info))
        .format_timestamp_secs()
        .parse_default_env()
        .init();

    info!("Starting the portfolio tracker...");
    if let Err(e) = run(config).await {
        error!("Failed to start portfolio tracker: {}", e);
        std::process::exit(1);
    }
}
