use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::error::AppError;
use crate::lookup::{find_card, Lookup, MatchKind};
use crate::state::ValuationCache;
use crate::types::{DataOrigin, EnrichedCard, RefreshMsg, RefreshResult, ValuationResult};

#[derive(Clone)]
pub struct ApiState {
    pub cache: Arc<ValuationCache>,
    pub control_tx: mpsc::Sender<RefreshMsg>,
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
    /// Leagues clients may switch to.
    pub leagues: Arc<Vec<String>>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/cards", get(get_cards))
        .route("/cards/:name", get(get_card))
        .route("/cards/:name/valuation", get(get_card_valuation))
        .route("/search", get(search_cards))
        .route("/leagues", get(get_leagues))
        .route("/league/:league", post(set_league))
        .route("/refresh", post(request_refresh))
        .route("/health", get(get_health))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CardsQuery {
    /// Keep only cards with this verdict.
    pub worth: Option<bool>,
    /// `efficiency` (default), `value`, `weight`, `comparison` or `name`.
    pub sort: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardResponse {
    #[serde(flatten)]
    pub card: EnrichedCard,
    pub valuation: Option<ValuationResult>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardsResponse {
    pub league: String,
    pub generation: u64,
    pub market_origin: DataOrigin,
    pub weights_origin: DataOrigin,
    pub weights_patch: Option<String>,
    pub refreshed_at_ns: u64,
    pub error: Option<String>,
    pub cards: Vec<CardResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub query: String,
    pub card: Option<CardResponse>,
    pub matched_by: Option<MatchKind>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaguesResponse {
    pub active: String,
    pub available: Vec<String>,
    /// Leagues that already have a valuation snapshot.
    pub cached: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub league: String,
    pub refreshing: bool,
    pub last_refresh_at_ns: Option<u64>,
    pub refresh_count: u64,
    pub discarded_refreshes: u64,
    pub card_count: usize,
    pub market_live: bool,
    pub weights_live: bool,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LatencyResponse {
    pub samples: u64,
    pub p50_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
    pub max_ms: Option<f64>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn active_snapshot(state: &ApiState) -> Result<Arc<RefreshResult>, AppError> {
    state.cache.active().ok_or_else(|| {
        AppError::NotFound(format!(
            "no valuations yet for league {}",
            state.cache.active_league()
        ))
    })
}

fn card_response(snapshot: &RefreshResult, card: &EnrichedCard) -> CardResponse {
    CardResponse {
        card: card.clone(),
        valuation: snapshot.valuation(card.name()).cloned(),
    }
}

async fn get_cards(
    State(state): State<ApiState>,
    Query(params): Query<CardsQuery>,
) -> Result<Json<CardsResponse>, AppError> {
    let snapshot = active_snapshot(&state)?;

    let mut cards: Vec<CardResponse> = snapshot
        .population
        .iter()
        .map(|card| card_response(&snapshot, card))
        .filter(|c| {
            params.worth.map_or(true, |worth| {
                c.valuation.as_ref().is_some_and(|v| v.worth_farming == worth)
            })
        })
        .collect();
    sort_cards(&mut cards, params.sort.as_deref().unwrap_or("efficiency"))?;

    Ok(Json(CardsResponse {
        league: snapshot.league.clone(),
        generation: snapshot.generation,
        market_origin: snapshot.market_origin,
        weights_origin: snapshot.weights_origin,
        weights_patch: snapshot.weights_patch.clone(),
        refreshed_at_ns: snapshot.refreshed_at_ns,
        error: snapshot.error.clone(),
        cards,
    }))
}

fn sort_cards(cards: &mut [CardResponse], key: &str) -> Result<(), AppError> {
    let metric = |c: &CardResponse, f: fn(&ValuationResult) -> f64| {
        c.valuation.as_ref().map_or(f64::NEG_INFINITY, f)
    };
    match key {
        "efficiency" => cards.sort_by(|a, b| {
            metric(b, |v| v.efficiency).total_cmp(&metric(a, |v| v.efficiency))
        }),
        "comparison" => cards.sort_by(|a, b| {
            metric(b, |v| v.comparison_to_average).total_cmp(&metric(a, |v| v.comparison_to_average))
        }),
        "value" => cards.sort_by(|a, b| b.card.chaos_value().total_cmp(&a.card.chaos_value())),
        "weight" => cards.sort_by(|a, b| b.card.weight.total_cmp(&a.card.weight)),
        "name" => cards.sort_by(|a, b| a.card.name().cmp(b.card.name())),
        other => return Err(AppError::InvalidInput(format!("unknown sort key '{other}'"))),
    }
    Ok(())
}

async fn get_card(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<Json<CardResponse>, AppError> {
    let snapshot = active_snapshot(&state)?;
    let card = snapshot
        .card(&name)
        .ok_or_else(|| AppError::NotFound(format!("card '{name}'")))?;
    Ok(Json(card_response(&snapshot, card)))
}

async fn get_card_valuation(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<Json<ValuationResult>, AppError> {
    state
        .cache
        .get(&name)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("valuation for '{name}'")))
}

async fn search_cards(
    State(state): State<ApiState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    let snapshot = active_snapshot(&state)?;
    let response = match find_card(&snapshot.population, &params.q) {
        Lookup::Found(card, kind) => SearchResponse {
            query: params.q.clone(),
            card: Some(card_response(&snapshot, card)),
            matched_by: Some(kind),
            suggestions: Vec::new(),
        },
        Lookup::Missing { suggestions } => SearchResponse {
            query: params.q.clone(),
            card: None,
            matched_by: None,
            suggestions,
        },
    };
    Ok(Json(response))
}

async fn get_leagues(State(state): State<ApiState>) -> Json<LeaguesResponse> {
    Json(LeaguesResponse {
        active: state.cache.active_league(),
        available: state.leagues.as_ref().clone(),
        cached: state.cache.leagues(),
    })
}

async fn set_league(
    State(state): State<ApiState>,
    Path(league): Path<String>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    if !state.leagues.contains(&league) {
        return Err(AppError::NotFound(format!("league '{league}'")));
    }
    state
        .control_tx
        .send(RefreshMsg::SetLeague(league.clone()))
        .await
        .map_err(|e| AppError::ChannelSend(e.to_string()))?;
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "league": league, "status": "switching" })),
    ))
}

async fn request_refresh(
    State(state): State<ApiState>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    state
        .control_tx
        .send(RefreshMsg::Refresh)
        .await
        .map_err(|e| AppError::ChannelSend(e.to_string()))?;
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "league": state.cache.active_league(), "status": "refreshing" })),
    ))
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let health = &state.health;
    let snapshot = state.cache.active();
    let last = health.last_refresh_at_ns();
    let status = match &snapshot {
        Some(s) if s.error.is_none() => "ok",
        Some(_) => "degraded",
        None => "starting",
    };
    Json(HealthResponse {
        status: status.to_string(),
        league: state.cache.active_league(),
        refreshing: health.refreshing(),
        last_refresh_at_ns: (last > 0).then_some(last),
        refresh_count: health.refresh_count(),
        discarded_refreshes: health.discarded_count(),
        card_count: snapshot.as_ref().map_or(0, |s| s.population.len()),
        market_live: health.market_live(),
        weights_live: health.weights_live(),
        error: snapshot.and_then(|s| s.error.clone()),
    })
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyResponse> {
    let percentiles = state.latency.percentiles_ms();
    Json(LatencyResponse {
        samples: state.latency.len(),
        p50_ms: percentiles.map(|p| p.0),
        p95_ms: percentiles.map(|p| p.1),
        p99_ms: percentiles.map(|p| p.2),
        max_ms: percentiles.map(|p| p.3),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
