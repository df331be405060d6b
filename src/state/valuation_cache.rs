use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::config::CHANNEL_CAPACITY;
use crate::types::{CacheUpdate, EnrichedCard, RefreshInputs, RefreshResult, ValuationResult};
use crate::valuation::evaluate_population;

// ---------------------------------------------------------------------------
// ValuationCache
// ---------------------------------------------------------------------------

/// Latest valuation snapshot per league.
///
/// Snapshots are immutable and swapped whole, so a reader holding an
/// `Arc<RefreshResult>` never sees a half-updated population. Each refresh
/// takes a generation from `begin`; a result whose generation is older than
/// the newest one begun for its league is dropped on `commit`.
pub struct ValuationCache {
    /// league → current snapshot
    snapshots: DashMap<String, Arc<RefreshResult>>,
    /// league → newest generation handed out by `begin`
    begun: DashMap<String, u64>,
    next_generation: AtomicU64,
    active_league: RwLock<String>,
    updates: broadcast::Sender<CacheUpdate>,
}

impl ValuationCache {
    pub fn new(active_league: &str) -> Arc<Self> {
        let (updates, _) = broadcast::channel(CHANNEL_CAPACITY);
        Arc::new(Self {
            snapshots: DashMap::new(),
            begun: DashMap::new(),
            next_generation: AtomicU64::new(0),
            active_league: RwLock::new(active_league.to_string()),
            updates,
        })
    }

    /// Reserve a generation for a refresh of `league` that is about to start.
    /// Any refresh begun earlier for the same league becomes stale.
    pub fn begin(&self, league: &str) -> u64 {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut newest = self.begun.entry(league.to_string()).or_insert(0);
        if *newest < generation {
            *newest = generation;
        }
        generation
    }

    /// Install a finished snapshot. Returns false when it was superseded.
    pub fn commit(&self, result: Arc<RefreshResult>) -> bool {
        let newest = self.begun.get(&result.league).map(|g| *g).unwrap_or(0);
        if result.generation < newest {
            warn!(
                "[CACHE] discarding stale refresh for {} (generation {} < {})",
                result.league, result.generation, newest
            );
            return false;
        }

        let installed = match self.snapshots.entry(result.league.clone()) {
            Entry::Occupied(mut slot) => {
                if slot.get().generation < result.generation {
                    slot.insert(Arc::clone(&result));
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&result));
                true
            }
        };
        if !installed {
            warn!(
                "[CACHE] discarding refresh for {}: generation {} already superseded",
                result.league, result.generation
            );
            return false;
        }

        let active = result.league == self.active_league();
        info!(
            league = %result.league,
            generation = result.generation,
            cards = result.population.len(),
            "[CACHE] snapshot installed for {} ({} cards, market={}, weights={})",
            result.league,
            result.population.len(),
            result.market_origin,
            result.weights_origin,
        );
        // No subscribers is not an error.
        let _ = self.updates.send(CacheUpdate {
            league: result.league.clone(),
            generation: result.generation,
            card_count: result.population.len(),
            active,
        });
        true
    }

    /// Value every card of the merged population and commit the snapshot.
    /// Returns the snapshot only when it was installed.
    pub fn recompute(&self, inputs: RefreshInputs) -> Option<Arc<RefreshResult>> {
        let valuations = evaluate_population(&inputs.population);
        let result = Arc::new(RefreshResult::new(inputs, valuations));
        self.commit(Arc::clone(&result)).then_some(result)
    }

    pub fn snapshot(&self, league: &str) -> Option<Arc<RefreshResult>> {
        self.snapshots.get(league).map(|s| Arc::clone(s.value()))
    }

    /// Snapshot of the league currently selected.
    pub fn active(&self) -> Option<Arc<RefreshResult>> {
        self.snapshot(&self.active_league())
    }

    /// Valuation for a card of the active league (case-insensitive exact name).
    pub fn get(&self, name: &str) -> Option<ValuationResult> {
        self.active()?.valuation(name).cloned()
    }

    /// Enriched card of the active league (case-insensitive exact name).
    pub fn get_card(&self, name: &str) -> Option<EnrichedCard> {
        self.active()?.card(name).cloned()
    }

    pub fn active_league(&self) -> String {
        self.active_league
            .read()
            .map(|l| l.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Switch the active league. Returns true if it changed. Subscribers are
    /// told immediately when a snapshot for the new league is already held.
    pub fn set_active_league(&self, league: &str) -> bool {
        {
            let mut current = self
                .active_league
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if *current == league {
                return false;
            }
            *current = league.to_string();
        }
        info!("[CACHE] active league is now {league}");

        if let Some(snapshot) = self.snapshot(league) {
            let _ = self.updates.send(CacheUpdate {
                league: league.to_string(),
                generation: snapshot.generation,
                card_count: snapshot.population.len(),
                active: true,
            });
        }
        true
    }

    /// Leagues with an installed snapshot, sorted.
    pub fn leagues(&self) -> Vec<String> {
        let mut leagues: Vec<String> = self.snapshots.iter().map(|e| e.key().clone()).collect();
        leagues.sort();
        leagues
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheUpdate> {
        self.updates.subscribe()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::merge;
    use crate::sources::market::fallback_cards;
    use crate::sources::weights::fallback_weights;
    use crate::types::DataOrigin;

    fn inputs(cache: &ValuationCache, league: &str) -> RefreshInputs {
        RefreshInputs {
            league: league.to_string(),
            generation: cache.begin(league),
            population: merge(&fallback_cards(), &fallback_weights()),
            market_origin: DataOrigin::Fallback,
            weights_origin: DataOrigin::Fallback,
            weights_patch: Some("3.25".to_string()),
            refreshed_at_ns: 1,
        }
    }

    #[test]
    fn empty_cache_has_nothing() {
        let cache = ValuationCache::new("Phrecia");
        assert!(cache.active().is_none());
        assert!(cache.get("The Doctor").is_none());
        assert!(cache.get_card("The Doctor").is_none());
        assert!(cache.leagues().is_empty());
    }

    #[test]
    fn recompute_installs_and_lookups_ignore_case() {
        let cache = ValuationCache::new("Phrecia");
        let snapshot = cache.recompute(inputs(&cache, "Phrecia")).expect("installed");
        assert_eq!(snapshot.population.len(), 8);
        assert!(snapshot.error.is_none());

        let doctor = cache.get_card("the doctor").expect("card");
        assert_eq!(doctor.name(), "The Doctor");
        assert_eq!(doctor.weight, 16.0);
        let valuation = cache.get("THE DOCTOR").expect("valuation");
        assert_eq!(valuation, snapshot.valuations["The Doctor"]);
        assert!(cache.get("The Doc").is_none());
    }

    #[test]
    fn stale_generation_is_discarded() {
        let cache = ValuationCache::new("Phrecia");
        let slow = inputs(&cache, "Phrecia");
        let fast = inputs(&cache, "Phrecia");
        let fast_generation = fast.generation;

        assert!(cache.recompute(fast).is_some());
        assert!(cache.recompute(slow).is_none());
        assert_eq!(cache.active().expect("snapshot").generation, fast_generation);
    }

    #[test]
    fn older_begun_refresh_cannot_land_first() {
        let cache = ValuationCache::new("Phrecia");
        let first = inputs(&cache, "Phrecia");
        let _second = inputs(&cache, "Phrecia");
        assert!(cache.recompute(first).is_none());
        assert!(cache.active().is_none());
    }

    #[test]
    fn generations_are_tracked_per_league() {
        let cache = ValuationCache::new("Phrecia");
        let phrecia = inputs(&cache, "Phrecia");
        let standard = inputs(&cache, "Standard");
        assert!(cache.recompute(standard).is_some());
        assert!(cache.recompute(phrecia).is_some());
        assert_eq!(cache.leagues(), vec!["Phrecia".to_string(), "Standard".to_string()]);
    }

    #[test]
    fn empty_population_records_error() {
        let cache = ValuationCache::new("Phrecia");
        let mut empty = inputs(&cache, "Phrecia");
        empty.population.clear();
        let snapshot = cache.recompute(empty).expect("installed");
        assert_eq!(snapshot.error.as_deref(), Some("No cards available"));
        assert!(snapshot.valuations.is_empty());
    }

    #[test]
    fn subscribers_are_notified() {
        let cache = ValuationCache::new("Phrecia");
        let mut rx = cache.subscribe();

        let generation = cache.recompute(inputs(&cache, "Standard")).expect("installed").generation;
        let update = rx.try_recv().expect("update");
        assert_eq!(
            update,
            CacheUpdate {
                league: "Standard".to_string(),
                generation,
                card_count: 8,
                active: false,
            }
        );

        assert!(cache.set_active_league("Standard"));
        let switched = rx.try_recv().expect("switch update");
        assert!(switched.active);
        assert_eq!(switched.league, "Standard");
        assert!(!cache.set_active_league("Standard"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn active_league_switch_changes_reads() {
        let cache = ValuationCache::new("Phrecia");
        cache.recompute(inputs(&cache, "Standard"));
        assert!(cache.get_card("Rain of Chaos").is_none());
        cache.set_active_league("Standard");
        assert_eq!(cache.active_league(), "Standard");
        assert!(cache.get_card("rain of chaos").is_some());
    }
}
