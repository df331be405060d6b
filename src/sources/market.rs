use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::sources::deadline::with_deadline;
use crate::types::{DataOrigin, MarketRecord};

const CARD_ICON: &str = "https://web.poecdn.com/gen/image/WzI1LDE0LHsiZiI6IjJESXRlbXMvRGl2aW5hdGlvbi9JbnZlbnRvcnlJY29uIiwidyI6MSwiaCI6MSwic2NhbGUiOjF9XQ/f34bf8cbb5/InventoryIcon.png";

/// (id, name, chaos, divine, listings, stack size)
const FALLBACK_CARDS: &[(i64, &str, f64, f64, u32, u32)] = &[
    (23238, "Divine Justice", 1351.75, 8.60, 7, 1),
    (636, "House of Mirrors", 22539.61, 143.40, 69, 9),
    (120242, "The Doctor", 9500.00, 60.51, 35, 8),
    (120243, "The Nurse", 1187.50, 7.56, 48, 8),
    (120244, "The Apothecary", 12000.00, 76.43, 9, 5),
    (120245, "The Cheater", 5250.00, 33.44, 2, 1),
    (120246, "The Insane Cat", 3700.00, 23.57, 6, 1),
    (120247, "Rain of Chaos", 1.00, 0.01, 999, 1),
];

pub fn fallback_cards() -> Vec<MarketRecord> {
    FALLBACK_CARDS
        .iter()
        .map(|&(id, name, chaos_value, divine_value, listing_count, stack_size)| MarketRecord {
            id,
            name: name.to_string(),
            base_type: name.to_string(),
            icon: CARD_ICON.to_string(),
            chaos_value,
            divine_value,
            listing_count,
            stack_size,
        })
        .collect()
}

/// poe.ninja `itemoverview` response body.
#[derive(Debug, Deserialize)]
struct ItemOverview {
    #[serde(default)]
    lines: Vec<MarketRecord>,
}

#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    pub records: Vec<MarketRecord>,
    pub origin: DataOrigin,
}

/// Fetches divination card prices for a league from poe.ninja.
#[derive(Debug, Clone)]
pub struct MarketSource {
    client: reqwest::Client,
    api_url: String,
    timeout: Duration,
}

impl MarketSource {
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Never fails. A timeout, transport error or an empty answer all yield
    /// the built-in price list.
    pub async fn load(&self, league: &str) -> MarketSnapshot {
        let started = Instant::now();
        match with_deadline(self.timeout, self.fetch_lines(league)).await {
            Ok(records) if !records.is_empty() => {
                info!(
                    league,
                    count = records.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "[MARKET] fetched {} card prices for {league}",
                    records.len(),
                );
                MarketSnapshot {
                    records,
                    origin: DataOrigin::Live,
                }
            }
            Ok(_) => {
                warn!(league, "[MARKET] no cards returned for {league}, using built-in prices");
                fallback_snapshot()
            }
            Err(e) => {
                warn!(league, "[MARKET] price fetch failed ({e}), using built-in prices");
                fallback_snapshot()
            }
        }
    }

    async fn fetch_lines(&self, league: &str) -> Result<Vec<MarketRecord>> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/api/data/itemoverview", self.api_url),
            &[("league", league), ("type", "DivinationCard")],
        )
        .map_err(|e| AppError::Config(format!("invalid price API url: {e}")))?;
        debug!(%url, "[MARKET] requesting prices");

        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(AppError::Status(resp.status()));
        }
        let overview: ItemOverview = resp.json().await?;
        Ok(dedup_by_name(overview.lines))
    }
}

fn fallback_snapshot() -> MarketSnapshot {
    MarketSnapshot {
        records: fallback_cards(),
        origin: DataOrigin::Fallback,
    }
}

/// One record per card name; a later line replaces an earlier one in place.
fn dedup_by_name(lines: Vec<MarketRecord>) -> Vec<MarketRecord> {
    let mut out: Vec<MarketRecord> = Vec::with_capacity(lines.len());
    let mut positions: HashMap<String, usize> = HashMap::new();
    for line in lines {
        if line.name.trim().is_empty() {
            continue;
        }
        match positions.get(&line.name) {
            Some(&i) => out[i] = line,
            None => {
                positions.insert(line.name.clone(), out.len());
                out.push(line);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
    use serde_json::{json, Value};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn overview_route(body: Value) -> Router {
        Router::new().route(
            "/api/data/itemoverview",
            get(move |Query(q): Query<HashMap<String, String>>| {
                let body = body.clone();
                async move {
                    if q.get("type").map(String::as_str) != Some("DivinationCard") {
                        return (StatusCode::BAD_REQUEST, Json(json!({})));
                    }
                    if q.get("league").map_or(true, |l| l.is_empty()) {
                        return (StatusCode::BAD_REQUEST, Json(json!({})));
                    }
                    (StatusCode::OK, Json(body))
                }
            }),
        )
    }

    #[tokio::test]
    async fn live_lines_are_returned() {
        let base = serve(overview_route(json!({
            "lines": [
                {"id": 1, "name": "The Doctor", "baseType": "The Doctor", "icon": "x",
                 "chaosValue": 9000.0, "divineValue": 50.0, "listingCount": 12, "stackSize": 8,
                 "sparkline": {"data": []}},
                {"id": 2, "name": "Rain of Chaos", "chaosValue": 1.0},
                {"id": 3, "name": "The Doctor", "chaosValue": 9100.0, "stackSize": 8}
            ]
        })))
        .await;

        let source = MarketSource::new(&base, Duration::from_secs(2)).unwrap();
        let snapshot = source.load("Settlers of Kalguur").await;

        assert_eq!(snapshot.origin, DataOrigin::Live);
        assert_eq!(snapshot.records.len(), 2);
        assert_eq!(snapshot.records[0].name, "The Doctor");
        assert_eq!(snapshot.records[0].chaos_value, 9100.0);
        assert_eq!(snapshot.records[1].stack_size, 1);
        assert_eq!(snapshot.records[1].listing_count, 0);
    }

    #[tokio::test]
    async fn empty_lines_fall_back() {
        let base = serve(overview_route(json!({ "lines": [] }))).await;
        let source = MarketSource::new(&base, Duration::from_secs(2)).unwrap();
        let snapshot = source.load("Phrecia").await;
        assert_eq!(snapshot.origin, DataOrigin::Fallback);
        assert_eq!(snapshot.records, fallback_cards());
    }

    #[tokio::test]
    async fn server_error_falls_back() {
        let base = serve(Router::new().route(
            "/api/data/itemoverview",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        ))
        .await;
        let source = MarketSource::new(&base, Duration::from_secs(2)).unwrap();
        assert_eq!(source.load("Phrecia").await.origin, DataOrigin::Fallback);
    }

    #[tokio::test]
    async fn slow_server_hits_deadline() {
        let base = serve(Router::new().route(
            "/api/data/itemoverview",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({ "lines": [{"name": "Too Late", "chaosValue": 5.0}] }))
            }),
        ))
        .await;
        let source = MarketSource::new(&base, Duration::from_millis(100)).unwrap();

        let started = Instant::now();
        let snapshot = source.load("Phrecia").await;
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(snapshot.origin, DataOrigin::Fallback);
        assert!(snapshot.records.iter().all(|r| r.name != "Too Late"));
    }

    #[tokio::test]
    async fn unreachable_host_falls_back() {
        let source = MarketSource::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let snapshot = source.load("Phrecia").await;
        assert_eq!(snapshot.origin, DataOrigin::Fallback);
        assert_eq!(snapshot.records.len(), 8);
    }
}
