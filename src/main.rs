mod api;
mod config;
mod error;
mod lookup;
mod merge;
mod refresh;
mod sources;
mod state;
mod types;
mod valuation;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::api::routes::{router, ApiState};
use crate::config::{Config, CHANNEL_CAPACITY};
use crate::error::Result;
use crate::refresh::CardRefresher;
use crate::sources::{MarketSource, WeightSource};
use crate::state::ValuationCache;
use crate::types::{CacheUpdate, RefreshMsg};

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    info!(
        "Starting valuator: league={} leagues=[{}] prices={} weights={}",
        cfg.league,
        cfg.leagues.join(", "),
        cfg.ninja_api_url,
        cfg.weights_url,
    );

    // --- Sources ---
    let weights = WeightSource::new(&cfg.weights_url, Duration::from_secs(cfg.weights_timeout_secs))?;
    let market = MarketSource::new(&cfg.ninja_api_url, Duration::from_secs(cfg.market_timeout_secs))?;

    // --- Shared state ---
    let cache = ValuationCache::new(&cfg.league);
    let health = Arc::new(HealthState::new());
    let latency = Arc::new(LatencyStats::new());

    // Change notifications: subscribe before the first snapshot lands
    let updates = cache.subscribe();
    tokio::spawn(async move { update_logger(updates).await });

    // --- Refresher ---
    let (control_tx, control_rx) = mpsc::channel::<RefreshMsg>(CHANNEL_CAPACITY);
    let refresher = CardRefresher::new(
        weights,
        market,
        Arc::clone(&cache),
        Arc::clone(&health),
        Arc::clone(&latency),
        Duration::from_secs(cfg.refresh_interval_secs),
    );
    // Warm-up runs before the loop so the first interval tick is not a duplicate.
    let leagues = cfg.leagues.clone();
    tokio::spawn(async move {
        refresher.warm_up(&leagues).await;
        refresher.run(control_rx).await;
    });

    // HTTP API server
    let api_state = ApiState {
        cache: Arc::clone(&cache),
        control_tx,
        health,
        latency,
        leagues: Arc::new(cfg.leagues.clone()),
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Consumes cache notifications and logs each snapshot replacement.
async fn update_logger(mut rx: broadcast::Receiver<CacheUpdate>) {
    loop {
        match rx.recv().await {
            Ok(update) => info!(
                event = "CACHE_UPDATE",
                league = %update.league,
                generation = update.generation,
                cards = update.card_count,
                active = update.active,
                "CACHE UPDATE | league: {} | generation: {} | cards: {}{}",
                update.league,
                update.generation,
                update.card_count,
                if update.active { " | active" } else { "" },
            ),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Update logger lagged, skipped {skipped} notifications");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
