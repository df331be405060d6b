use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use futures_util::future::join_all;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::merge::merge;
use crate::sources::{MarketSource, WeightSource};
use crate::state::ValuationCache;
use crate::types::{RefreshInputs, RefreshMsg, RefreshResult};

/// Drives refresh cycles: fetch both sources concurrently, merge, value
/// every card, publish the snapshot. Runs on a timer and on request.
pub struct CardRefresher {
    weights: WeightSource,
    market: MarketSource,
    cache: Arc<ValuationCache>,
    health: Arc<HealthState>,
    latency: Arc<LatencyStats>,
    refresh_interval: Duration,
}

impl CardRefresher {
    pub fn new(
        weights: WeightSource,
        market: MarketSource,
        cache: Arc<ValuationCache>,
        health: Arc<HealthState>,
        latency: Arc<LatencyStats>,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            weights,
            market,
            cache,
            health,
            latency,
            refresh_interval,
        }
    }

    /// Refresh every listed league concurrently. Used once at startup so a
    /// league switch can answer from cache straight away.
    pub async fn warm_up(&self, leagues: &[String]) {
        let results = join_all(leagues.iter().map(|league| self.refresh_once(league))).await;
        let installed = results.iter().filter(|r| r.is_some()).count();
        info!("[REFRESH] warm-up complete: {installed}/{} leagues installed", leagues.len());
    }

    pub async fn run(self, mut control_rx: mpsc::Receiver<RefreshMsg>) {
        let mut ticker = interval(self.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await; // skip immediate first tick, warm-up already ran

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let league = self.cache.active_league();
                    self.refresh_once(&league).await;
                }
                msg = control_rx.recv() => match msg {
                    Some(RefreshMsg::Refresh) => {
                        let league = self.cache.active_league();
                        info!("[REFRESH] refresh requested for {league}");
                        self.refresh_once(&league).await;
                        ticker.reset();
                    }
                    Some(RefreshMsg::SetLeague(league)) => {
                        self.cache.set_active_league(&league);
                        self.refresh_once(&league).await;
                        ticker.reset();
                    }
                    None => {
                        info!("[REFRESH] control channel closed, stopping");
                        break;
                    }
                },
            }
        }
    }

    /// One full cycle for `league`. Returns the snapshot if it was installed;
    /// None when a newer cycle for the same league superseded it.
    pub async fn refresh_once(&self, league: &str) -> Option<Arc<RefreshResult>> {
        let generation = self.cache.begin(league);
        self.health.begin_refresh();
        let started = Instant::now();

        let (weights, market) = tokio::join!(self.weights.load(), self.market.load(league));
        let population = merge(&market.records, &weights.records);
        let card_count = population.len();

        let inputs = RefreshInputs {
            league: league.to_string(),
            generation,
            population,
            market_origin: market.origin,
            weights_origin: weights.origin,
            weights_patch: weights.patch().map(str::to_string),
            refreshed_at_ns: now_ns(),
        };
        let refreshed_at_ns = inputs.refreshed_at_ns;
        let result = self.cache.recompute(inputs);

        let elapsed = started.elapsed();
        self.latency.record(elapsed);
        self.health.finish_refresh(
            refreshed_at_ns,
            card_count,
            market.origin,
            weights.origin,
            result.is_some(),
        );

        match &result {
            Some(snapshot) => {
                let worth = snapshot.valuations.values().filter(|v| v.worth_farming).count();
                info!(
                    league,
                    generation,
                    cards = card_count,
                    worth_farming = worth,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "[REFRESH] {league}: {card_count} cards valued, {worth} worth farming (market={}, weights={})",
                    market.origin,
                    weights.origin,
                );
            }
            None => warn!(league, generation, "[REFRESH] {league}: result superseded by a newer refresh"),
        }
        result
    }
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
