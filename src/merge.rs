use std::collections::HashMap;

use crate::types::{EnrichedCard, MarketRecord, WeightRecord};

/// Join market lines with drop weights by case-insensitive name.
///
/// `drop_rate` is taken against the total of every known weight, including
/// cards that have no market line. Exactly one output per market record,
/// in market order; weight-only cards are never synthesised.
pub fn merge(market: &[MarketRecord], weights: &[WeightRecord]) -> Vec<EnrichedCard> {
    // lowercase name → (index of last occurrence, weight)
    let weight_by_name: HashMap<String, (usize, f64)> = weights
        .iter()
        .enumerate()
        .map(|(i, w)| (w.name.to_lowercase(), (i, w.weight)))
        .collect();
    // Summed in list order so repeated merges are bit-for-bit identical.
    let total_weight: f64 = weights
        .iter()
        .enumerate()
        .filter(|(i, w)| weight_by_name.get(&w.name.to_lowercase()).map(|e| e.0) == Some(*i))
        .map(|(_, w)| w.weight)
        .sum();

    market
        .iter()
        .map(|record| {
            let weight = weight_by_name
                .get(&record.name.to_lowercase())
                .map(|e| e.1)
                .unwrap_or(0.0);
            let drop_rate = if total_weight > 0.0 {
                weight / total_weight
            } else {
                0.0
            };
            let value_per_weight = if weight > 0.0 {
                record.chaos_value / weight
            } else {
                0.0
            };
            EnrichedCard {
                market: record.clone(),
                weight,
                drop_rate,
                value_per_weight,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(name: &str, chaos: f64) -> MarketRecord {
        MarketRecord {
            id: 0,
            name: name.to_string(),
            base_type: name.to_string(),
            icon: String::new(),
            chaos_value: chaos,
            divine_value: 0.0,
            listing_count: 1,
            stack_size: 1,
        }
    }

    fn weights() -> Vec<WeightRecord> {
        vec![
            WeightRecord::new("The Doctor", 16.0, "3.25"),
            WeightRecord::new("Rain of Chaos", 121_400.0, "3.25"),
            WeightRecord::new("The Nurse", 97.0, "3.25"),
            WeightRecord::new("Mitts", 5_279.0, "3.25"),
        ]
    }

    #[test]
    fn joins_case_insensitively() {
        let cards = merge(&[line("the doctor", 9500.0)], &weights());
        assert_eq!(cards[0].weight, 16.0);
        assert!((cards[0].value_per_weight - 9500.0 / 16.0).abs() < 1e-9);
    }

    #[test]
    fn drop_rate_uses_whole_weight_pool() {
        let cards = merge(&[line("The Doctor", 9500.0)], &weights());
        let total = 16.0 + 121_400.0 + 97.0 + 5_279.0;
        assert!((cards[0].drop_rate - 16.0 / total).abs() < 1e-15);
    }

    #[test]
    fn drop_rates_over_the_pool_sum_to_one() {
        let market: Vec<MarketRecord> = weights().iter().map(|w| line(&w.name, 1.0)).collect();
        let cards = merge(&market, &weights());
        let sum: f64 = cards.iter().map(|c| c.drop_rate).sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn unmatched_card_gets_zeroes() {
        let cards = merge(&[line("Unknown Card", 40.0)], &weights());
        assert_eq!(cards[0].weight, 0.0);
        assert_eq!(cards[0].drop_rate, 0.0);
        assert_eq!(cards[0].value_per_weight, 0.0);
    }

    #[test]
    fn weight_only_cards_are_not_synthesised() {
        let cards = merge(&[line("The Nurse", 1187.5)], &weights());
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].name(), "The Nurse");
    }

    #[test]
    fn empty_weight_pool_yields_zero_rates() {
        let cards = merge(&[line("The Nurse", 1187.5)], &[]);
        assert_eq!(cards[0].drop_rate, 0.0);
        assert!(cards[0].drop_rate.is_finite());
    }

    #[test]
    fn repeated_weight_names_count_once() {
        let w = vec![
            WeightRecord::new("Mitts", 100.0, "3.24"),
            WeightRecord::new("Loyalty", 300.0, "3.25"),
            WeightRecord::new("MITTS", 100.0, "3.25"),
        ];
        let cards = merge(&[line("Mitts", 2.0)], &w);
        assert_eq!(cards[0].weight, 100.0);
        assert!((cards[0].drop_rate - 0.25).abs() < 1e-12);
    }

    #[test]
    fn merge_is_pure() {
        let market = vec![line("The Doctor", 9500.0), line("Nope", 3.0)];
        let w = weights();
        assert_eq!(merge(&market, &w), merge(&market, &w));
    }
}
