use std::collections::HashMap;

use crate::config::farming_thresholds::*;
use crate::types::{EnrichedCard, Restriction, ValuationResult};
use crate::valuation::reason::{explain, Facts};
use crate::valuation::restrictions::classify;

/// Log-dampened farming efficiency (higher = better card to farm).
/// The log keeps extremely expensive, extremely rare cards from dominating.
pub fn efficiency(chaos_value: f64, drop_rate: f64) -> f64 {
    chaos_value.max(1.0).log10() * drop_rate.sqrt() * 1000.0
}

/// Score one card against the whole population. Pure; never panics on
/// empty or degenerate populations.
pub fn evaluate(card: &EnrichedCard, population: &[EnrichedCard]) -> ValuationResult {
    if !(card.weight > 0.0) {
        return no_weight();
    }

    // Only cards with both a weight and a price take part in the ranking.
    let priced: Vec<&EnrichedCard> = population
        .iter()
        .filter(|c| c.weight > 0.0 && c.chaos_value() > 0.0)
        .collect();
    if priced.is_empty() {
        return insufficient_data(card);
    }

    let chaos_value = card.chaos_value();
    let restriction = classify(card.name());

    let total_weight: f64 = priced.iter().map(|c| c.weight).sum();
    let drop_rate = card.weight / total_weight;
    let expected_value = chaos_value * drop_rate;
    let card_efficiency = efficiency(chaos_value, drop_rate);

    // Stable sort: equal efficiencies keep population order.
    let mut ranked: Vec<(&str, f64)> = priced
        .iter()
        .map(|c| (c.name(), efficiency(c.chaos_value(), c.weight / total_weight)))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let count = ranked.len() as f64;
    let mean_efficiency = ranked.iter().map(|(_, e)| e).sum::<f64>() / count;
    let percentile_rank = ranked
        .iter()
        .position(|(name, _)| *name == card.name())
        .map(|i| i as f64 / count * 100.0)
        .unwrap_or(100.0);

    let average_value_per_weight =
        priced.iter().map(|c| c.chaos_value() / c.weight).sum::<f64>() / priced.len() as f64;
    let comparison_to_average = if mean_efficiency > 0.0 {
        (card_efficiency / mean_efficiency - 1.0) * 100.0
    } else {
        0.0
    };

    let worth_farming = verdict(restriction, chaos_value, percentile_rank);
    let reason = explain(
        &Facts {
            name: card.name(),
            chaos_value,
            weight: card.weight,
            percentile_rank,
            restriction,
        },
        worth_farming,
    );

    ValuationResult {
        worth_farming,
        reason,
        comparison_to_average,
        expected_value,
        value_per_weight: chaos_value / card.weight,
        average_value_per_weight,
        efficiency: card_efficiency,
        percentile_rank,
        restriction,
    }
}

/// Restricted cards must clear a high absolute price; everything else needs
/// a good efficiency rank, relaxed for cards of materially higher value.
pub fn verdict(restriction: Restriction, chaos_value: f64, percentile_rank: f64) -> bool {
    if restriction.is_restricted() {
        chaos_value >= RESTRICTED_MIN_CHAOS
    } else {
        (percentile_rank <= EFFICIENT_PERCENTILE && chaos_value >= EFFICIENT_MIN_CHAOS)
            || (percentile_rank <= RELAXED_PERCENTILE && chaos_value >= RELAXED_MIN_CHAOS)
    }
}

/// Evaluate every card of a population, keyed by card name (last write wins).
pub fn evaluate_population(population: &[EnrichedCard]) -> HashMap<String, ValuationResult> {
    population
        .iter()
        .map(|card| (card.name().to_string(), evaluate(card, population)))
        .collect()
}

fn no_weight() -> ValuationResult {
    ValuationResult {
        worth_farming: false,
        reason: "No drop weight data available for this card".to_string(),
        comparison_to_average: -100.0,
        expected_value: 0.0,
        value_per_weight: 0.0,
        average_value_per_weight: 0.0,
        efficiency: 0.0,
        percentile_rank: 100.0,
        restriction: Restriction::None,
    }
}

fn insufficient_data(card: &EnrichedCard) -> ValuationResult {
    ValuationResult {
        worth_farming: false,
        reason: "Insufficient data to make a calculation".to_string(),
        comparison_to_average: 0.0,
        expected_value: 0.0,
        value_per_weight: card.value_per_weight,
        average_value_per_weight: 0.0,
        efficiency: 0.0,
        percentile_rank: 100.0,
        restriction: classify(card.name()),
    }
}
