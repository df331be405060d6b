use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::sources::csv::parse_rows;
use crate::sources::deadline::with_deadline;
use crate::types::{DataOrigin, WeightRecord};

const FALLBACK_PATCH: &str = "3.25";

/// Built-in weights used whenever the sheet cannot be loaded.
const FALLBACK_WEIGHTS: &[(&str, f64)] = &[
    ("Rain of Chaos", 121_400.0),
    ("Mitts", 5_279.0),
    ("Emperor's Luck", 50_643.0),
    ("The Lover", 62_738.0),
    ("Destined to Crumble", 45_583.0),
    ("The King's Blade", 42_160.0),
    ("The Scholar", 46_346.0),
    ("Loyalty", 34_668.0),
    ("The Metalsmith's Gift", 34_178.0),
    ("The Carrion Crow", 22_356.0),
    ("House of Mirrors", 1.0),
    ("The Apothecary", 11.0),
    ("The Doctor", 16.0),
    ("The Nurse", 97.0),
];

pub fn fallback_weights() -> Vec<WeightRecord> {
    FALLBACK_WEIGHTS
        .iter()
        .map(|&(name, weight)| WeightRecord::new(name, weight, FALLBACK_PATCH))
        .collect()
}

#[derive(Debug, Clone)]
pub struct WeightTable {
    pub records: Vec<WeightRecord>,
    pub origin: DataOrigin,
}

impl WeightTable {
    /// Patch column the weights were read from.
    pub fn patch(&self) -> Option<&str> {
        self.records.first().map(|r| r.patch.as_str())
    }
}

#[derive(Debug, Clone)]
enum Location {
    Remote(String),
    Local(PathBuf),
}

/// Loads the stacked-deck weights sheet from a URL or a bundled file.
#[derive(Debug, Clone)]
pub struct WeightSource {
    client: reqwest::Client,
    location: Location,
    timeout: Duration,
}

impl WeightSource {
    pub fn new(location: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let location = if location.starts_with("http://") || location.starts_with("https://") {
            Location::Remote(location.to_string())
        } else {
            Location::Local(PathBuf::from(location))
        };
        Ok(Self {
            client,
            location,
            timeout,
        })
    }

    /// Never fails: any transport or parse problem yields the built-in table.
    pub async fn load(&self) -> WeightTable {
        let started = Instant::now();
        match self.fetch().await {
            Ok(records) => {
                info!(
                    count = records.len(),
                    patch = records.first().map(|r| r.patch.as_str()).unwrap_or(""),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "[WEIGHTS] loaded {} card weights",
                    records.len(),
                );
                WeightTable {
                    records,
                    origin: DataOrigin::Live,
                }
            }
            Err(e) => {
                warn!("[WEIGHTS] could not load weights sheet ({e}), using built-in table");
                WeightTable {
                    records: fallback_weights(),
                    origin: DataOrigin::Fallback,
                }
            }
        }
    }

    async fn fetch(&self) -> Result<Vec<WeightRecord>> {
        let text = match &self.location {
            Location::Remote(url) => {
                with_deadline(self.timeout, fetch_text(&self.client, url)).await?
            }
            Location::Local(path) => tokio::fs::read_to_string(path).await?,
        };
        debug!(bytes = text.len(), "[WEIGHTS] sheet received");

        let records = parse_weights_csv(&text)?;
        if records.is_empty() {
            return Err(AppError::EmptyResponse(
                "weights sheet has no usable rows".to_string(),
            ));
        }
        Ok(records)
    }
}

async fn fetch_text(client: &reqwest::Client, url: &str) -> Result<String> {
    let resp = client.get(url).send().await?;
    if !resp.status().is_success() {
        return Err(AppError::Status(resp.status()));
    }
    Ok(resp.text().await?)
}

/// Parse the weights sheet. The first row holds headers: a label column
/// followed by one column per patch. Weights are read from the most recent
/// patch column; rows without a usable number there are skipped.
pub fn parse_weights_csv(text: &str) -> Result<Vec<WeightRecord>> {
    let mut rows = parse_rows(text).into_iter();
    let headers = rows
        .next()
        .ok_or_else(|| AppError::MalformedTable("empty sheet".to_string()))?;

    let (column, patch) = latest_patch_column(&headers).ok_or_else(|| {
        AppError::MalformedTable(format!("no patch column among headers {headers:?}"))
    })?;

    let mut records: Vec<WeightRecord> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let name = row.first().map(|s| s.trim()).unwrap_or("");
        if name.is_empty() {
            continue;
        }
        let Some(weight) = row.get(column).and_then(|cell| parse_weight(cell)) else {
            continue;
        };

        let record = WeightRecord::new(name, weight, &patch);
        match positions.get(name) {
            Some(&i) => records[i] = record,
            None => {
                positions.insert(name.to_string(), records.len());
                records.push(record);
            }
        }
    }

    Ok(records)
}

/// Index and tag of the greatest version header. Ties go to the rightmost column.
fn latest_patch_column(headers: &[String]) -> Option<(usize, String)> {
    headers
        .iter()
        .enumerate()
        .skip(1)
        .filter_map(|(i, h)| parse_version(h).map(|v| (v, i, h.trim().to_string())))
        .max_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)))
        .map(|(_, i, tag)| (i, tag))
}

/// `3.25` → `[3, 25]`, `v3.24.1` → `[3, 24, 1]`. Needs at least major.minor.
fn parse_version(header: &str) -> Option<Vec<u32>> {
    let h = header.trim();
    let h = h.strip_prefix('v').or_else(|| h.strip_prefix('V')).unwrap_or(h);
    let parts: Vec<u32> = h
        .split('.')
        .map(|p| p.parse::<u32>().ok())
        .collect::<Option<_>>()?;
    (parts.len() >= 2).then_some(parts)
}

fn parse_weight(cell: &str) -> Option<f64> {
    let cleaned: String = cell
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && *c != '_')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|w| w.is_finite() && *w >= 0.0)
}
