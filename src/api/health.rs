//! Shared health state for the /health endpoint.
//! Updated by the refresher, read by the API.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use crate::types::DataOrigin;

/// Shared refresh health. Written once per refresh cycle.
#[derive(Default)]
pub struct HealthState {
    /// Refresh cycles currently running.
    pub refreshes_in_flight: AtomicU64,
    /// Nanosecond timestamp of the last completed refresh (0 = none).
    pub last_refresh_at_ns: AtomicU64,
    pub refresh_count: AtomicU64,
    /// Cycles whose result was superseded before it could be installed.
    pub discarded_count: AtomicU64,
    pub last_card_count: AtomicUsize,
    pub market_live: AtomicBool,
    pub weights_live: AtomicBool,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_refresh(&self) {
        self.refreshes_in_flight.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a finished cycle. `installed` is false when a newer refresh won.
    pub fn finish_refresh(
        &self,
        at_ns: u64,
        card_count: usize,
        market: DataOrigin,
        weights: DataOrigin,
        installed: bool,
    ) {
        self.refreshes_in_flight.fetch_sub(1, Ordering::Relaxed);
        self.refresh_count.fetch_add(1, Ordering::Relaxed);
        if !installed {
            self.discarded_count.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.last_refresh_at_ns.store(at_ns, Ordering::Relaxed);
        self.last_card_count.store(card_count, Ordering::Relaxed);
        self.market_live.store(market == DataOrigin::Live, Ordering::Relaxed);
        self.weights_live.store(weights == DataOrigin::Live, Ordering::Relaxed);
    }

    pub fn refreshing(&self) -> bool {
        self.refreshes_in_flight.load(Ordering::Relaxed) > 0
    }

    pub fn last_refresh_at_ns(&self) -> u64 {
        self.last_refresh_at_ns.load(Ordering::Relaxed)
    }

    pub fn refresh_count(&self) -> u64 {
        self.refresh_count.load(Ordering::Relaxed)
    }

    pub fn discarded_count(&self) -> u64 {
        self.discarded_count.load(Ordering::Relaxed)
    }

    pub fn last_card_count(&self) -> usize {
        self.last_card_count.load(Ordering::Relaxed)
    }

    pub fn market_live(&self) -> bool {
        self.market_live.load(Ordering::Relaxed)
    }

    pub fn weights_live(&self) -> bool {
        self.weights_live.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_refresh_lifecycle() {
        let health = HealthState::new();
        health.begin_refresh();
        assert!(health.refreshing());

        health.finish_refresh(42, 8, DataOrigin::Live, DataOrigin::Fallback, true);
        assert!(!health.refreshing());
        assert_eq!(health.last_refresh_at_ns(), 42);
        assert_eq!(health.last_card_count(), 8);
        assert!(health.market_live());
        assert!(!health.weights_live());
    }

    #[test]
    fn superseded_refresh_keeps_previous_state() {
        let health = HealthState::new();
        health.begin_refresh();
        health.finish_refresh(42, 8, DataOrigin::Live, DataOrigin::Live, true);
        health.begin_refresh();
        health.finish_refresh(99, 0, DataOrigin::Fallback, DataOrigin::Fallback, false);

        assert_eq!(health.refresh_count(), 2);
        assert_eq!(health.discarded_count(), 1);
        assert_eq!(health.last_refresh_at_ns(), 42);
        assert!(health.market_live());
    }
}
