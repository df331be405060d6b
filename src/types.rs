use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Source records
// ---------------------------------------------------------------------------

/// Drop weight of one card, taken from a single patch column of the weights sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightRecord {
    pub name: String,
    pub weight: f64,
    pub patch: String,
}

impl WeightRecord {
    pub fn new(name: &str, weight: f64, patch: &str) -> Self {
        Self {
            name: name.to_string(),
            weight,
            patch: patch.to_string(),
        }
    }
}

/// One poe.ninja `itemoverview` line for a divination card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketRecord {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub base_type: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub chaos_value: f64,
    #[serde(default)]
    pub divine_value: f64,
    #[serde(default)]
    pub listing_count: u32,
    #[serde(default = "default_stack_size")]
    pub stack_size: u32,
}

fn default_stack_size() -> u32 {
    1
}

/// Market record joined with its drop weight.
///
/// `drop_rate` is relative to the weight pool it was merged against and is
/// meaningless once the pool changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedCard {
    #[serde(flatten)]
    pub market: MarketRecord,
    pub weight: f64,
    pub drop_rate: f64,
    pub value_per_weight: f64,
}

impl EnrichedCard {
    pub fn name(&self) -> &str {
        &self.market.name
    }

    pub fn chaos_value(&self) -> f64 {
        self.market.chaos_value
    }
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

/// Content restriction of a card. Area restrictions take precedence in
/// explanations when a name is somehow on both lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Restriction {
    None,
    Boss,
    Area,
}

impl Restriction {
    pub fn is_restricted(self) -> bool {
        !matches!(self, Restriction::None)
    }
}

impl std::fmt::Display for Restriction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Restriction::None => "none",
            Restriction::Boss => "boss",
            Restriction::Area => "area",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationResult {
    pub worth_farming: bool,
    pub reason: String,
    /// Efficiency relative to the population mean, in percent.
    pub comparison_to_average: f64,
    /// Chaos value times drop rate within the priced pool.
    pub expected_value: f64,
    pub value_per_weight: f64,
    pub average_value_per_weight: f64,
    pub efficiency: f64,
    /// Position in the efficiency ranking, 0 = best.
    pub percentile_rank: f64,
    pub restriction: Restriction,
}

// ---------------------------------------------------------------------------
// Refresh snapshots
// ---------------------------------------------------------------------------

/// Whether a source answered with live data or its embedded table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataOrigin {
    Live,
    Fallback,
}

impl std::fmt::Display for DataOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataOrigin::Live => write!(f, "live"),
            DataOrigin::Fallback => write!(f, "fallback"),
        }
    }
}

/// Immutable output of one refresh cycle for one league.
#[derive(Debug, Clone)]
pub struct RefreshResult {
    pub league: String,
    pub generation: u64,
    pub population: Vec<EnrichedCard>,
    pub valuations: HashMap<String, ValuationResult>,
    pub market_origin: DataOrigin,
    pub weights_origin: DataOrigin,
    pub weights_patch: Option<String>,
    pub error: Option<String>,
    /// Nanosecond UTC epoch.
    pub refreshed_at_ns: u64,
    /// lowercase card name → index into `population`
    index: HashMap<String, usize>,
}

/// Everything a refresh cycle gathered before valuation.
#[derive(Debug, Clone)]
pub struct RefreshInputs {
    pub league: String,
    pub generation: u64,
    pub population: Vec<EnrichedCard>,
    pub market_origin: DataOrigin,
    pub weights_origin: DataOrigin,
    pub weights_patch: Option<String>,
    pub refreshed_at_ns: u64,
}

impl RefreshResult {
    pub fn new(inputs: RefreshInputs, valuations: HashMap<String, ValuationResult>) -> Self {
        let index = inputs
            .population
            .iter()
            .enumerate()
            .map(|(i, card)| (card.name().to_lowercase(), i))
            .collect();
        let error = if inputs.population.is_empty() {
            Some("No cards available".to_string())
        } else {
            None
        };
        Self {
            league: inputs.league,
            generation: inputs.generation,
            population: inputs.population,
            valuations,
            market_origin: inputs.market_origin,
            weights_origin: inputs.weights_origin,
            weights_patch: inputs.weights_patch,
            error,
            refreshed_at_ns: inputs.refreshed_at_ns,
            index,
        }
    }

    /// Case-insensitive exact lookup.
    pub fn card(&self, name: &str) -> Option<&EnrichedCard> {
        self.index
            .get(&name.to_lowercase())
            .and_then(|&i| self.population.get(i))
    }

    pub fn valuation(&self, name: &str) -> Option<&ValuationResult> {
        self.valuations
            .get(name)
            .or_else(|| self.card(name).and_then(|c| self.valuations.get(c.name())))
    }
}

/// Sent to subscribers whenever a snapshot replaces the previous one.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheUpdate {
    pub league: String,
    pub generation: u64,
    pub card_count: usize,
    pub active: bool,
}

/// Control messages for the refresh driver.
#[derive(Debug)]
pub enum RefreshMsg {
    Refresh,
    SetLeague(String),
}
