//! Best-effort card lookup for user-typed names.
//!
//! Tiers are tried in order and the first hit wins. On a miss, up to five
//! names within a small edit distance are offered instead.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::EnrichedCard;

const MAX_SUGGESTION_DISTANCE: usize = 3;
const MAX_SUGGESTIONS: usize = 5;

/// How a query was matched to a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    AddedThe,
    CaseInsensitive,
    DroppedThe,
    Partial,
    Normalized,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<'a> {
    Found(&'a EnrichedCard, MatchKind),
    Missing { suggestions: Vec<String> },
}

pub fn find_card<'a>(cards: &'a [EnrichedCard], query: &str) -> Lookup<'a> {
    let query = query.trim();
    if query.is_empty() || cards.is_empty() {
        return Lookup::Missing {
            suggestions: Vec::new(),
        };
    }

    match match_tiers(cards, query) {
        Some((card, kind)) => {
            debug!("[LOOKUP] \"{query}\" -> \"{}\" ({kind:?})", card.name());
            Lookup::Found(card, kind)
        }
        None => {
            let suggestions = suggestions(cards, query);
            debug!("[LOOKUP] \"{query}\" not found, {} suggestions", suggestions.len());
            Lookup::Missing { suggestions }
        }
    }
}

fn match_tiers<'a>(cards: &'a [EnrichedCard], query: &str) -> Option<(&'a EnrichedCard, MatchKind)> {
    if let Some(card) = first(cards, |name: &str| name == query) {
        return Some((card, MatchKind::Exact));
    }

    if !query.starts_with("The ") {
        let with_the = format!("The {query}");
        if let Some(card) = first(cards, |name: &str| name == with_the) {
            return Some((card, MatchKind::AddedThe));
        }
    }

    let lower = query.to_lowercase();
    if let Some(card) = first(cards, |name: &str| name.to_lowercase() == lower) {
        return Some((card, MatchKind::CaseInsensitive));
    }

    if let Some(rest) = query.strip_prefix("The ") {
        let rest_lower = rest.to_lowercase();
        if let Some(card) = first(cards, |name: &str| name.to_lowercase() == rest_lower) {
            return Some((card, MatchKind::DroppedThe));
        }
    }

    if let Some(card) = first(cards, |name: &str| {
        let name = name.to_lowercase();
        name.contains(&lower) || lower.contains(&name)
    }) {
        return Some((card, MatchKind::Partial));
    }

    let normalized_query = normalize(query);
    if !normalized_query.is_empty() {
        if let Some(card) = first(cards, |name: &str| {
            let name = normalize(name);
            !name.is_empty()
                && (name.contains(&normalized_query) || normalized_query.contains(&name))
        }) {
            return Some((card, MatchKind::Normalized));
        }
    }

    None
}

fn first<'a>(cards: &'a [EnrichedCard], pred: impl Fn(&str) -> bool) -> Option<&'a EnrichedCard> {
    cards.iter().find(|c| pred(c.name()))
}

/// Lowercase with quotes and light punctuation stripped.
fn normalize(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '\'' | '"' | ',' | '.' | '(' | ')'))
        .collect()
}

/// Card names within edit distance 3 of the query, in card order.
fn suggestions(cards: &[EnrichedCard], query: &str) -> Vec<String> {
    let lower = query.to_lowercase();
    cards
        .iter()
        .filter(|c| levenshtein(&c.name().to_lowercase(), &lower) <= MAX_SUGGESTION_DISTANCE)
        .map(|c| c.name().to_string())
        .take(MAX_SUGGESTIONS)
        .collect()
}

pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MarketRecord;

    fn cards(names: &[&str]) -> Vec<EnrichedCard> {
        names
            .iter()
            .map(|name| EnrichedCard {
                market: MarketRecord {
                    id: 0,
                    name: name.to_string(),
                    base_type: name.to_string(),
                    icon: String::new(),
                    chaos_value: 1.0,
                    divine_value: 0.0,
                    listing_count: 0,
                    stack_size: 1,
                },
                weight: 1.0,
                drop_rate: 0.0,
                value_per_weight: 1.0,
            })
            .collect()
    }

    fn found(cards: &[EnrichedCard], query: &str) -> Option<(String, MatchKind)> {
        match find_card(cards, query) {
            Lookup::Found(card, kind) => Some((card.name().to_string(), kind)),
            Lookup::Missing { .. } => None,
        }
    }

    #[test]
    fn tiers_in_order() {
        let pool = cards(&["The Doctor", "Emperor's Luck", "Rain of Chaos", "Mitts", "Doctor"]);
        assert_eq!(found(&pool, "Doctor"), Some(("Doctor".into(), MatchKind::Exact)));
        assert_eq!(found(&pool, "The Doctor"), Some(("The Doctor".into(), MatchKind::Exact)));
        assert_eq!(found(&pool, "rain of chaos"), Some(("Rain of Chaos".into(), MatchKind::CaseInsensitive)));
        assert_eq!(found(&pool, "The Mitts"), Some(("Mitts".into(), MatchKind::DroppedThe)));
        assert_eq!(found(&pool, "emperor"), Some(("Emperor's Luck".into(), MatchKind::Partial)));
        assert_eq!(found(&pool, "emperors luck"), Some(("Emperor's Luck".into(), MatchKind::Normalized)));
    }

    #[test]
    fn prefixing_the_beats_case_folding() {
        let pool = cards(&["nurse", "The Nurse"]);
        assert_eq!(found(&pool, "Nurse"), Some(("The Nurse".into(), MatchKind::AddedThe)));
    }

    #[test]
    fn miss_offers_close_names() {
        let pool = cards(&["The Doctor", "The Nurse", "Rain of Chaos"]);
        match find_card(&pool, "The Doktar") {
            Lookup::Missing { suggestions } => assert_eq!(suggestions, vec!["The Doctor".to_string()]),
            other => panic!("expected miss, got {other:?}"),
        }
    }

    #[test]
    fn suggestions_are_capped() {
        let pool = cards(&["Aaa1", "Aaa2", "Aaa3", "Aaa4", "Aaa5", "Aaa6"]);
        match find_card(&pool, "Aaa0x") {
            Lookup::Missing { suggestions } => {
                assert_eq!(suggestions, vec!["Aaa1", "Aaa2", "Aaa3", "Aaa4", "Aaa5"]);
            }
            other => panic!("expected miss, got {other:?}"),
        }
    }

    #[test]
    fn blank_query_or_empty_pool_misses() {
        let pool = cards(&["The Doctor"]);
        assert_eq!(find_card(&pool, "   "), Lookup::Missing { suggestions: vec![] });
        assert_eq!(find_card(&[], "The Doctor"), Lookup::Missing { suggestions: vec![] });
    }

    #[test]
    fn edit_distance() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("doctor", ""), 6);
        assert_eq!(levenshtein("nurse", "nurse"), 0);
    }
}
