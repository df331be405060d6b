#![allow(dead_code)]

use serde::Deserialize;

// ---------------------------------------------------------------------------
// API response types (mirror routes.rs shapes)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Valuation {
    pub worth_farming: bool,
    pub reason: String,
    pub comparison_to_average: f64,
    pub expected_value: f64,
    pub efficiency: f64,
    pub percentile_rank: f64,
    pub restriction: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRow {
    pub name: String,
    pub chaos_value: f64,
    pub weight: f64,
    pub drop_rate: f64,
    pub value_per_weight: f64,
    #[serde(default)]
    pub stack_size: u32,
    pub valuation: Option<Valuation>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CardsResponse {
    pub league: String,
    pub market_origin: String,
    pub weights_origin: String,
    pub weights_patch: Option<String>,
    pub refreshed_at_ns: u64,
    pub error: Option<String>,
    pub cards: Vec<CardRow>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub league: String,
    pub refreshing: bool,
    pub last_refresh_at_ns: Option<u64>,
    pub refresh_count: u64,
    pub card_count: usize,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LatencyResponse {
    pub samples: u64,
    pub p50_ms: Option<f64>,
    pub p99_ms: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LeaguesResponse {
    pub active: String,
    pub available: Vec<String>,
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Waiting(String),
    Error(String),
    Connecting,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub status: ConnectionStatus,
    pub cards: CardsResponse,
    pub health: HealthResponse,
    pub latency: LatencyResponse,
    pub leagues: LeaguesResponse,
    /// Show only cards judged worth farming.
    pub worth_only: bool,
    pub last_refresh: std::time::Instant,
    pub base_url: String,
}

impl AppState {
    pub fn new(base_url: String) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            cards: CardsResponse::default(),
            health: HealthResponse::default(),
            latency: LatencyResponse::default(),
            leagues: LeaguesResponse::default(),
            worth_only: false,
            last_refresh: std::time::Instant::now(),
            base_url,
        }
    }

    pub fn cards_url(&self) -> String {
        let mut url = format!("{}/cards?sort=efficiency", self.base_url);
        if self.worth_only {
            url.push_str("&worth=true");
        }
        url
    }

    pub async fn refresh(&mut self, client: &reqwest::Client) {
        let cards_url = self.cards_url();
        let health_url = format!("{}/health", self.base_url);
        let latency_url = format!("{}/stats/latency", self.base_url);
        let leagues_url = format!("{}/leagues", self.base_url);

        let (cards_res, health_res, latency_res, leagues_res) = tokio::join!(
            client.get(&cards_url).send(),
            client.get(&health_url).send(),
            client.get(&latency_url).send(),
            client.get(&leagues_url).send(),
        );

        if let Ok(h) = health_res {
            if let Ok(health) = h.json::<HealthResponse>().await {
                self.health = health;
            }
        }
        if let Ok(l) = latency_res {
            if let Ok(latency) = l.json::<LatencyResponse>().await {
                self.latency = latency;
            }
        }
        if let Ok(l) = leagues_res {
            if let Ok(leagues) = l.json::<LeaguesResponse>().await {
                self.leagues = leagues;
            }
        }

        match cards_res {
            Ok(resp) if resp.status() == reqwest::StatusCode::NOT_FOUND => {
                self.status = ConnectionStatus::Waiting("no valuations yet".to_string());
            }
            Ok(resp) => match resp.json::<CardsResponse>().await {
                Ok(cards) => {
                    self.cards = cards;
                    self.status = ConnectionStatus::Connected;
                    self.last_refresh = std::time::Instant::now();
                }
                Err(e) => self.status = ConnectionStatus::Error(format!("parse error: {e}")),
            },
            Err(e) => self.status = ConnectionStatus::Error(format!("{e}")),
        }
    }

    /// Ask the service to re-fetch prices for the active league.
    pub async fn request_refresh(&mut self, client: &reqwest::Client) {
        let url = format!("{}/refresh", self.base_url);
        if let Err(e) = client.post(&url).send().await {
            self.status = ConnectionStatus::Error(format!("{e}"));
        }
    }

    /// League after the active one in the configured list, wrapping around.
    pub fn next_league(&self) -> Option<String> {
        let available = &self.leagues.available;
        if available.is_empty() {
            return None;
        }
        let next = available
            .iter()
            .position(|l| *l == self.leagues.active)
            .map_or(0, |i| (i + 1) % available.len());
        available.get(next).cloned()
    }

    pub async fn switch_league(&mut self, client: &reqwest::Client) {
        let Some(league) = self.next_league() else {
            return;
        };
        let Ok(mut url) = reqwest::Url::parse(&self.base_url) else {
            self.status = ConnectionStatus::Error(format!("bad API_URL {}", self.base_url));
            return;
        };
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("league").push(&league);
        }
        match client.post(url).send().await {
            Ok(resp) if resp.status().is_success() => self.leagues.active = league,
            Ok(resp) => self.status = ConnectionStatus::Error(format!("league switch: {}", resp.status())),
            Err(e) => self.status = ConnectionStatus::Error(format!("{e}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

pub fn format_chaos(v: f64) -> String {
    if v >= 10_000.0 {
        format!("{:.1}k", v / 1000.0)
    } else if v >= 100.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.1}")
    }
}

pub fn format_comparison(v: Option<f64>) -> String {
    match v {
        Some(c) => format!("{c:+.0}%"),
        None => "—".to_string(),
    }
}

pub fn format_weight(w: f64) -> String {
    if w > 0.0 {
        format!("{w:.0}")
    } else {
        "—".to_string()
    }
}

/// Convert nanosecond epoch timestamp to HH:MM:SS string.
pub fn format_time_ns(ns: u64) -> String {
    let secs = ns / 1_000_000_000;
    let h = (secs / 3600) % 24;
    let m = (secs / 60) % 60;
    let s = secs % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

fn main() {
    // Helper module for the tui binary; entry point lives in src/bin/tui.rs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chaos_formatting() {
        assert_eq!(format_chaos(22539.61), "22.5k");
        assert_eq!(format_chaos(1187.5), "1188");
        assert_eq!(format_chaos(1.0), "1.0");
    }

    #[test]
    fn comparison_and_weight() {
        assert_eq!(format_comparison(Some(33.4)), "+33%");
        assert_eq!(format_comparison(Some(-100.0)), "-100%");
        assert_eq!(format_comparison(None), "—");
        assert_eq!(format_weight(0.0), "—");
        assert_eq!(format_weight(121400.0), "121400");
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate("Emperor's Luck", 20), "Emperor's Luck");
        assert_eq!(truncate("The Metalsmith's Gift", 8), "The Met…");
        assert_eq!(truncate("ééééé", 3), "éé…");
    }

    #[test]
    fn league_cycle_wraps() {
        let mut app = AppState::new("http://localhost:3000".to_string());
        assert_eq!(app.next_league(), None);
        app.leagues = LeaguesResponse {
            active: "Standard".to_string(),
            available: vec!["Phrecia".to_string(), "Standard".to_string()],
        };
        assert_eq!(app.next_league().as_deref(), Some("Phrecia"));
        app.leagues.active = "Gone".to_string();
        assert_eq!(app.next_league().as_deref(), Some("Phrecia"));
    }

    #[test]
    fn worth_filter_changes_query() {
        let mut app = AppState::new("http://h".to_string());
        assert_eq!(app.cards_url(), "http://h/cards?sort=efficiency");
        app.worth_only = true;
        assert_eq!(app.cards_url(), "http://h/cards?sort=efficiency&worth=true");
    }
}
