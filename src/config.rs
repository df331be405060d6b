use crate::error::{AppError, Result};

pub const NINJA_API_URL: &str = "https://poe.ninja";
pub const WEIGHTS_URL: &str = "Stacked Decks - Weights.csv";
pub const DEFAULT_LEAGUE: &str = "Phrecia";
pub const DEFAULT_LEAGUES: &[&str] = &["Phrecia", "Standard"];

/// The price request is abandoned and fallback data used after this long.
pub const MARKET_TIMEOUT_SECS: u64 = 15;

/// Deadline for fetching the weights sheet when it is served remotely.
pub const WEIGHTS_TIMEOUT_SECS: u64 = 10;

/// How often prices are re-fetched for the active league (seconds).
pub const REFRESH_INTERVAL_SECS: u64 = 600;

/// Channel capacity for refresh control messages and cache notifications.
pub const CHANNEL_CAPACITY: usize = 64;

/// Farming verdict thresholds.
///
/// These are hand-tuned heuristics; the documented worked examples depend on
/// their exact values, so recalibrate them only together with those examples.
pub mod farming_thresholds {
    /// Boss/area restricted cards are only worth farming at or above this price.
    pub const RESTRICTED_MIN_CHAOS: f64 = 150.0;
    /// Percentile rank (0 = best) that counts as "efficient" for any non-trivial card.
    pub const EFFICIENT_PERCENTILE: f64 = 40.0;
    pub const EFFICIENT_MIN_CHAOS: f64 = 1.0;
    /// Relaxed percentile rank accepted for cards of materially higher value.
    pub const RELAXED_PERCENTILE: f64 = 60.0;
    pub const RELAXED_MIN_CHAOS: f64 = 25.0;
    /// Percentile rank quoted as "top 20%" in explanations.
    pub const TOP_TIER_PERCENTILE: f64 = 20.0;
    /// Explanation footnotes.
    pub const HIGH_VALUE_CHAOS: f64 = 100.0;
    pub const FREQUENT_DROP_WEIGHT: f64 = 1000.0;
    pub const RARE_DROP_WEIGHT: f64 = 100.0;
    pub const RARE_DROP_MIN_CHAOS: f64 = 50.0;
}

#[derive(Debug, Clone)]
pub struct Config {
    pub ninja_api_url: String,
    /// `http(s)://` URL or a local path to the weights CSV (WEIGHTS_URL)
    pub weights_url: String,
    pub log_level: String,
    pub api_port: u16,
    /// League selected at startup (LEAGUE)
    pub league: String,
    /// Leagues offered to clients (LEAGUES, comma-separated)
    pub leagues: Vec<String>,
    pub market_timeout_secs: u64,
    pub weights_timeout_secs: u64,
    pub refresh_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let league = std::env::var("LEAGUE").unwrap_or_else(|_| DEFAULT_LEAGUE.to_string());
        let mut leagues: Vec<String> = std::env::var("LEAGUES")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| DEFAULT_LEAGUES.iter().map(|s| s.to_string()).collect());
        if !leagues.contains(&league) {
            leagues.insert(0, league.clone());
        }

        Ok(Self {
            ninja_api_url: std::env::var("NINJA_API_URL")
                .unwrap_or_else(|_| NINJA_API_URL.to_string()),
            weights_url: std::env::var("WEIGHTS_URL").unwrap_or_else(|_| WEIGHTS_URL.to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            league,
            leagues,
            market_timeout_secs: std::env::var("MARKET_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(MARKET_TIMEOUT_SECS),
            weights_timeout_secs: std::env::var("WEIGHTS_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(WEIGHTS_TIMEOUT_SECS),
            refresh_interval_secs: std::env::var("REFRESH_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|&secs| secs > 0)
                .unwrap_or(REFRESH_INTERVAL_SECS),
        })
    }
}
